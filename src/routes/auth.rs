// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and session routes: registration, password login and
//! "Sign in with Google".

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::{rate_limit, require_auth, AuthUser};
use crate::routes::extract::AppJson;
use crate::routes::users::UserProfile;
use crate::services::accounts::{self, LoginRequest, RegisterRequest};
use crate::services::OidcError;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed OAuth `state` stays usable.
const STATE_MAX_AGE: Duration = Duration::from_secs(15 * 60);

pub fn routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let throttled = Router::new()
        .route("/auth/register", post(register))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let authenticated = Router::new()
        .route("/auth/user", get(current_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/google", get(google_start))
        .route("/auth/google/callback", get(google_callback))
        .route("/auth/logout", get(logout))
        .merge(throttled)
        .merge(authenticated)
}

// ─── Password accounts ───────────────────────────────────────

/// Create an account; the activation link is emailed.
async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let user = accounts::register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::private(&user))))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let session = accounts::login(&state, payload).await?;
    tracing::info!(user_id = session.user.id, "Password login");

    Ok(Json(LoginResponse {
        user: UserProfile::private(&session.user),
        token: session.token,
    }))
}

/// The signed-in user.
async fn current_user(Extension(user): Extension<AuthUser>) -> Json<UserProfile> {
    Json(UserProfile::private(&user.user))
}

// ─── Google sign-in ──────────────────────────────────────────

/// Query parameters for starting OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to redirect back to after OAuth completes.
    /// Must live under FRONTEND_URL.
    #[serde(default)]
    redirect_uri: Option<String>,
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Start OAuth flow - redirect to Google's consent screen.
async fn google_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
) -> Result<Redirect> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".to_string()))?;

    let frontend_url = match params.redirect_uri {
        Some(uri) if uri.starts_with(&state.config.frontend_url) => uri,
        Some(uri) => {
            tracing::warn!(redirect_uri = %uri, "Ignoring redirect outside the frontend");
            state.config.frontend_url.clone()
        }
        None => state.config.frontend_url.clone(),
    };

    let oauth_state = sign_state(&frontend_url, now_millis()?, &state.config.oauth_state_key)?;

    tracing::info!(frontend_url = %frontend_url, "Starting OAuth flow, redirecting to Google");
    Ok(Redirect::temporary(&google.authorize_url(&oauth_state)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, sign the user in, hand the session
/// token to the frontend.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".to_string()))?;

    // Decode and verify frontend URL from state parameter
    let frontend_url =
        verify_and_decode_state(&params.state, &state.config.oauth_state_key, now_millis()?)
            .unwrap_or_else(|| {
                tracing::warn!(
                    "Invalid or tampered state parameter, falling back to default frontend URL"
                );
                state.config.frontend_url.clone()
            });

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return Ok(redirect_with_error(&frontend_url, &error));
    }
    let Some(code) = params.code else {
        return Ok(redirect_with_error(&frontend_url, "missing_code"));
    };

    let profile = match google.exchange_code(&code).await {
        Ok(profile) => profile,
        Err(OidcError::Invalid(reason)) => {
            tracing::warn!(reason = %reason, "Google sign-in rejected");
            return Ok(redirect_with_error(&frontend_url, "access_denied"));
        }
        Err(OidcError::Transient(reason)) => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Google sign-in unavailable: {}",
                reason
            )));
        }
    };

    let session = accounts::login_with_google(&state, profile).await?;

    // Redirect to frontend with token
    Ok(Redirect::temporary(&format!(
        "{}?token={}",
        frontend_url,
        urlencoding::encode(&session.token)
    )))
}

fn redirect_with_error(frontend_url: &str, error: &str) -> Redirect {
    Redirect::temporary(&format!(
        "{}?error={}",
        frontend_url,
        urlencoding::encode(error)
    ))
}

/// Sign `frontend_url` and a millisecond timestamp into an OAuth `state`.
///
/// Format before encoding: `frontend_url|timestamp_hex|signature_hex`.
pub fn sign_state(frontend_url: &str, timestamp_ms: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", frontend_url, timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify HMAC signature and age, then return the frontend URL from the
/// OAuth state parameter.
pub fn verify_and_decode_state(state: &str, secret: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // The URL may itself contain '|', so split from the right.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let frontend_url = parts.next()?;

    let signature = hex::decode(signature_hex).ok()?;
    let payload = format!("{}|{}", frontend_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_ms.saturating_sub(issued_ms) > STATE_MAX_AGE.as_millis() {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(frontend_url.to_string())
}

/// Logout - sessions are stateless, the client discards its token.
async fn logout(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(&state.config.frontend_url)
}
