// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! On Cloud Run, secrets are injected as environment variables through
//! secret bindings, so everything comes from the process environment
//! (plus a `.env` file for local development).

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which [`crate::db::Documents`] backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Server ---
    pub port: u16,
    /// Public base URL of this API
    pub api_url: String,
    /// Frontend URL for activation links and OAuth redirects
    pub frontend_url: String,
    /// `production` sends real mail; anything else uses the sandbox
    pub app_env: String,

    // --- Data store ---
    pub store_backend: StoreBackend,
    pub gcp_project_id: String,
    /// Insert missing default roles at startup
    pub seed_default_roles: bool,

    // --- Session tokens ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub session_ttl: Duration,
    /// Lifetime of an account activation link
    pub invitation_ttl: Duration,

    // --- Mail ---
    pub mailtrap_api_key: String,
    pub mailtrap_inbox_id: Option<String>,
    pub from_email: String,

    // --- Object storage ---
    pub storage_bucket: String,

    // --- Google sign-in ---
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_url: String,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,

    // --- Rate limiting ---
    /// Time to regain one request token
    pub rate_limit_interval: Duration,
    pub rate_limit_burst: u32,
}

impl Config {
    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            api_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            app_env: "test".to_string(),
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            seed_default_roles: true,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            jwt_issuer: "reviews-api".to_string(),
            jwt_audience: "reviews-api".to_string(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            invitation_ttl: Duration::from_secs(3 * 24 * 60 * 60),
            mailtrap_api_key: "test_mailtrap_key".to_string(),
            mailtrap_inbox_id: None,
            from_email: "no-reply@example.com".to_string(),
            storage_bucket: "test-bucket".to_string(),
            google_client_id: "test-client.apps.googleusercontent.com".to_string(),
            google_client_secret: "test_google_secret".to_string(),
            google_redirect_url: "http://localhost:8080/v1/auth/google/callback".to_string(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            rate_limit_interval: Duration::from_secs(5 * 60 * 60),
            rate_limit_burst: 1,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from any variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            var(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let or_default = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let port = parse_or(&var, "PORT", 8080u16)?;
        let api_url = or_default("API_URL", &format!("http://localhost:{}", port));
        let frontend_url = or_default("FRONTEND_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();

        let store_backend = match var("STORE_BACKEND") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("STORE_BACKEND", v.clone()))?,
            None => StoreBackend::Firestore,
        };

        let google_redirect_url = or_default(
            "GOOGLE_REDIRECT_URL",
            &format!("{}/v1/auth/google/callback", api_url),
        );

        Ok(Self {
            port,
            api_url,
            frontend_url,
            app_env: or_default("APP_ENV", "development"),
            store_backend,
            gcp_project_id: or_default("GCP_PROJECT_ID", "local-dev"),
            seed_default_roles: parse_or(&var, "SEED_DEFAULT_ROLES", false)?,
            jwt_signing_key: required("JWT_SIGNING_KEY")?.into_bytes(),
            jwt_issuer: or_default("JWT_ISSUER", "reviews-api"),
            jwt_audience: or_default("JWT_AUDIENCE", "reviews-api"),
            session_ttl: Duration::from_secs(parse_or(&var, "SESSION_TTL_SECS", 86_400u64)?),
            invitation_ttl: Duration::from_secs(parse_or(
                &var,
                "INVITATION_TTL_SECS",
                259_200u64,
            )?),
            mailtrap_api_key: required("MAILTRAP_API_KEY")?,
            mailtrap_inbox_id: var("MAILTRAP_INBOX_ID").filter(|v| !v.trim().is_empty()),
            from_email: or_default("FROM_EMAIL", "no-reply@example.com"),
            storage_bucket: or_default("STORAGE_BUCKET", "reviews-notes"),
            google_client_id: or_default("GOOGLE_CLIENT_ID", ""),
            google_client_secret: var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            google_redirect_url,
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
            rate_limit_interval: Duration::from_secs(parse_or(
                &var,
                "RATE_LIMIT_INTERVAL_SECS",
                18_000u64,
            )?),
            rate_limit_burst: parse_or(&var, "RATE_LIMIT_BURST", 1u32)?,
        })
    }

    /// Mail is only delivered for real in production.
    pub fn mail_sandbox(&self) -> bool {
        self.app_env != "production"
    }
}

fn parse_or<F, T>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw.clone())),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
