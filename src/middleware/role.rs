// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role hierarchy gate for elevated writes.
//!
//! Must be layered inside [`super::auth::require_auth`]; it reads the
//! [`AuthUser`] that middleware attached and never looks at the token.

use crate::db::DataStore;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Allow `user` if their role level is at least that of `required`.
///
/// An unknown `required` role is a server misconfiguration, not a client
/// error.
pub async fn authorize_role(
    db: &dyn DataStore,
    user: &User,
    required: &str,
) -> Result<(), AppError> {
    let role = db.get_role_by_name(required).await?.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("role '{}' is not defined", required))
    })?;

    if user.role.level < role.level {
        tracing::warn!(
            user_id = user.id,
            role = %user.role.name,
            required = %role.name,
            "Insufficient role"
        );
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Middleware state: the app plus the role the wrapped routes require.
pub type RoleGate = (Arc<AppState>, &'static str);

/// Middleware that rejects users below the required role with 403.
pub async fn require_role(
    State((state, required)): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request.extensions().get::<AuthUser>().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "role gate for '{}' ran without an authenticated user",
            required
        ))
    })?;

    authorize_role(state.db.as_ref(), &user.user, required).await?;
    Ok(next.run(request).await)
}
