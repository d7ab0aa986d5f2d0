// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client throttling for sensitive endpoints.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Proxy headers consulted for the client address, most specific first.
const CLIENT_IP_HEADERS: &[&str] = &["true-client-ip", "x-real-ip"];

/// Best-effort client address for rate limiting.
///
/// Cloud Run sits behind Google's front end, so the peer address is the
/// proxy; the forwarding headers carry the real client.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    for name in CLIENT_IP_HEADERS {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    // First hop is the original client.
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware that admits one request per available bucket token.
///
/// A client has a single bucket shared by every throttled route, so a review
/// post and a registration from the same address draw on one allowance.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client = client_key(request.headers(), peer);

    if !state.rate_limiter.allow(&client) {
        tracing::warn!(
            client = %client,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        return Err(AppError::RateLimited {
            retry_after: state.rate_limiter.retry_after(),
        });
    }

    Ok(next.run(request).await)
}
