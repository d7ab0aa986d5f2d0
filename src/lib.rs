// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Reviews API: schools, professors, reviews and study notes
//!
//! This crate provides the backend API, including account registration,
//! session tokens, Google sign-in, role-gated writes and per-client
//! rate limiting.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DataStore;
use services::{
    GoogleOAuthClient, Mailer, ObjectStorage, PasswordHasher, RateLimiter, TokenService,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn DataStore>,
    pub tokens: TokenService,
    /// Throttles account registration and review posting
    pub rate_limiter: RateLimiter,
    pub mailer: Arc<dyn Mailer>,
    pub storage: Arc<dyn ObjectStorage>,
    pub passwords: PasswordHasher,
    /// `None` when no Google client ID is configured
    pub google: Option<GoogleOAuthClient>,
}

impl AppState {
    /// Build the state from configuration and the external collaborators.
    pub fn new(
        config: Config,
        db: Arc<dyn DataStore>,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn ObjectStorage>,
        passwords: PasswordHasher,
    ) -> anyhow::Result<Self> {
        let tokens = TokenService::new(
            &config.jwt_signing_key,
            &config.jwt_issuer,
            &config.jwt_audience,
            config.session_ttl,
        );
        let rate_limiter = RateLimiter::new(config.rate_limit_interval, config.rate_limit_burst);

        let google = if config.google_client_id.is_empty() {
            tracing::info!("GOOGLE_CLIENT_ID not set, Google sign-in disabled");
            None
        } else {
            Some(GoogleOAuthClient::new(
                config.google_client_id.clone(),
                config.google_client_secret.clone(),
                config.google_redirect_url.clone(),
            )?)
        };

        Ok(Self {
            config,
            db,
            tokens,
            rate_limiter,
            mailer,
            storage,
            passwords,
            google,
        })
    }
}
