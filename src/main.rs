// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reviews API Server
//!
//! Serves schools, professors, reviews and study notes, with password and
//! Google sign-in, role-gated catalog writes and per-client throttling.

use reviews_api::{
    config::{Config, StoreBackend},
    db::{store::seed_default_roles, DataStore, FirestoreDb, MemoryDb},
    services::{GcsStorage, MailtrapMailer, PasswordHasher},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, env = %config.app_env, "Starting Reviews API");

    let db: Arc<dyn DataStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    // The in-memory store always needs roles; Firestore only on request.
    if config.seed_default_roles || config.store_backend == StoreBackend::Memory {
        seed_default_roles(db.as_ref()).await?;
        tracing::info!("Default roles seeded");
    }

    let mailer = Arc::new(MailtrapMailer::new(
        config.mailtrap_api_key.clone(),
        config.from_email.clone(),
        config.mailtrap_inbox_id.clone(),
    ));
    let storage = Arc::new(GcsStorage::new(config.storage_bucket.clone()));

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        mailer,
        storage,
        PasswordHasher::new(),
    )?);

    // Build router
    let app = reviews_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    // Peer addresses feed the rate limiter when no proxy header is present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reviews_api=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
