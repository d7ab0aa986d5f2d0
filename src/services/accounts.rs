// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration, activation and sign-in.

use crate::crypto;
use crate::error::{AppError, Result};
use crate::models::user::DEFAULT_ROLE;
use crate::models::{NewUser, Role, User};
use crate::services::mailer::EmailTemplate;
use crate::services::saga::Saga;
use crate::services::GoogleProfile;
use crate::AppState;
use serde::Deserialize;
use validator::Validate;

/// Registration payload.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 60))]
    pub username: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 6, max = 72))]
    pub password: String,
}

/// Password login payload.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 72))]
    pub password: String,
}

/// A fresh session for a signed-in user.
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
}

async fn default_role(state: &AppState) -> Result<Role> {
    state.db.get_role_by_name(DEFAULT_ROLE).await?.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("role '{}' is not defined", DEFAULT_ROLE))
    })
}

fn issue_session(state: &AppState, user: User) -> Result<Session> {
    let token = state.tokens.issue_session(user.id)?;
    Ok(Session { token, user })
}

/// Create an inactive account and email its activation link.
///
/// If the email cannot be delivered the account is deleted again, so no
/// account exists that could never be activated.
pub async fn register_user(state: &AppState, request: RegisterRequest) -> Result<User> {
    request.validate()?;

    let role = default_role(state).await?;
    let password_hash = state.passwords.hash(request.password).await?;

    // Only the digest is stored; the plaintext goes out in the email.
    let activation_token = crypto::random_hex::<32>()?;
    let token_hash = crypto::sha256_hex(&activation_token);
    let expires_at = chrono::Utc::now()
        + chrono::Duration::from_std(state.config.invitation_ttl)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid invitation TTL: {}", e)))?;

    let user = state
        .db
        .create_and_invite(
            NewUser {
                username: request.username.trim().to_string(),
                email: request.email.trim().to_lowercase(),
                password_hash: Some(password_hash),
                is_active: false,
                role,
            },
            &token_hash,
            expires_at,
        )
        .await?;

    let mut saga = Saga::new("register_user");
    let db = state.db.clone();
    let user_id = user.id;
    saga.register("delete_user", move || async move {
        db.delete_user(user_id).await?;
        Ok::<(), anyhow::Error>(())
    });

    let template = EmailTemplate::UserInvitation {
        username: user.username.clone(),
        activation_url: format!(
            "{}/activate/{}",
            state.config.frontend_url, activation_token
        ),
    };

    match state
        .mailer
        .send(
            &template,
            &user.username,
            &user.email,
            state.config.mail_sandbox(),
        )
        .await
    {
        Ok(status) => {
            saga.complete();
            tracing::info!(user_id, status, "Invitation email sent");
            Ok(user)
        }
        Err(e) => {
            tracing::error!(user_id, error = %e, "Invitation email failed, removing account");
            saga.compensate().await;
            Err(AppError::Internal(anyhow::anyhow!(
                "failed to send invitation email: {}",
                e
            )))
        }
    }
}

/// Redeem an emailed activation token.
pub async fn activate_user(state: &AppState, activation_token: &str) -> Result<User> {
    let token_hash = crypto::sha256_hex(activation_token);
    let user = state
        .db
        .activate_user(&token_hash, chrono::Utc::now())
        .await
        .map_err(|e| match e {
            crate::db::StoreError::NotFound => {
                AppError::NotFound("activation token is invalid or already used".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, "Account activated");
    Ok(user)
}

/// Password sign-in.
pub async fn login(state: &AppState, request: LoginRequest) -> Result<Session> {
    request.validate()?;

    let email = request.email.trim().to_lowercase();
    let Some(user) = state.db.get_user_by_email(&email).await? else {
        tracing::warn!("Login for unknown email");
        return Err(AppError::Unauthorized);
    };
    // Google-only accounts have no password.
    let Some(hash) = user.password_hash.clone() else {
        tracing::warn!(user_id = user.id, "Password login for account without password");
        return Err(AppError::Unauthorized);
    };

    if !state.passwords.verify(request.password, hash).await? {
        tracing::warn!(user_id = user.id, "Wrong password");
        return Err(AppError::Unauthorized);
    }
    if !user.is_active {
        tracing::warn!(user_id = user.id, "Login before activation");
        return Err(AppError::Forbidden);
    }

    issue_session(state, user)
}

/// Sign in with a verified Google profile, creating the account on first use.
pub async fn login_with_google(state: &AppState, profile: GoogleProfile) -> Result<Session> {
    let role = default_role(state).await?;
    let user = state
        .db
        .upsert_oauth_user(NewUser {
            username: profile.name,
            email: profile.email.trim().to_lowercase(),
            password_hash: None,
            is_active: true,
            role,
        })
        .await?;

    tracing::info!(user_id = user.id, "Google sign-in");
    issue_session(state, user)
}
