// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user resolved from the session token.
///
/// Handlers behind [`require_auth`] take this as `Extension<AuthUser>`
/// and never look at the token themselves.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> u64 {
        self.user.id
    }
}

/// Extract the token from an `Authorization` value.
///
/// The value must be exactly `Bearer <token>`: two space-separated parts
/// with the literal scheme name.
pub fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Middleware that requires a valid session token for an existing user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    let token = bearer_token(header_value).ok_or_else(|| {
        tracing::warn!("Malformed Authorization header");
        AppError::Unauthorized
    })?;

    let subject = state.tokens.verify(token)?;
    let user_id: u64 = subject.parse().map_err(|_| {
        tracing::warn!(subject = %subject, "Token subject is not a user ID");
        AppError::Unauthorized
    })?;

    let user = state.db.get_user_by_id(user_id).await?.ok_or_else(|| {
        tracing::warn!(user_id, "Token for unknown user");
        AppError::Unauthorized
    })?;

    request.extensions_mut().insert(AuthUser { user });
    Ok(next.run(request).await)
}
