// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile and account activation routes.

use crate::error::{AppError, Result};
use crate::models::User;
use crate::routes::extract::AppPath;
use crate::services::accounts;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/{id}", get(get_user))
        .route("/users/activate/{token}", put(activate))
}

/// User as returned by the API; never includes the password hash.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub username: String,
    /// Only shown to the account owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_active: bool,
    pub role: String,
    pub created_at: String,
}

impl UserProfile {
    /// View for anyone.
    pub fn public(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: None,
            is_active: user.is_active,
            role: user.role.name.clone(),
            created_at: user.created_at.clone(),
        }
    }

    /// View for the account owner.
    pub fn private(user: &User) -> Self {
        Self {
            email: Some(user.email.clone()),
            ..Self::public(user)
        }
    }
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<u64>,
) -> Result<Json<UserProfile>> {
    let user = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    Ok(Json(UserProfile::public(&user)))
}

/// Redeem the activation link from the invitation email.
async fn activate(
    State(state): State<Arc<AppState>>,
    AppPath(token): AppPath<String>,
) -> Result<Json<UserProfile>> {
    let user = accounts::activate_user(&state, &token).await?;
    Ok(Json(UserProfile::private(&user)))
}
