// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Google sign-in redirects and OAuth state handling.
//!
//! These tests verify that frontend URLs survive the round trip through
//! the signed OAuth state parameter, and that the callback never redirects
//! anywhere the state does not vouch for.

use axum::http::{header, Response, StatusCode};
use axum::body::Body;
use reviews_api::config::Config;
use reviews_api::routes::auth::{sign_state, verify_and_decode_state};
use std::time::{SystemTime, UNIX_EPOCH};

mod common;

use common::{create_test_app, create_test_app_with, empty_request};

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis()
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}

/// Pull the `state` query parameter out of the Google consent URL.
fn state_param(url: &str) -> String {
    let (_, query) = url.split_once('?').unwrap();
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("state="))
        .map(|s| urlencoding::decode(s).unwrap().into_owned())
        .expect("no state parameter")
}

#[test]
fn test_state_roundtrip_keeps_url_with_separator() {
    let secret = b"state_secret";
    let url = "http://localhost:3000/path?a=1|2";
    let now = now_ms();

    let state = sign_state(url, now, secret).unwrap();
    assert_eq!(
        verify_and_decode_state(&state, secret, now),
        Some(url.to_string())
    );
}

#[tokio::test]
async fn test_google_start_redirects_with_signed_state() {
    let app = create_test_app().await;
    let config = &app.state.config;

    let response = app
        .send(empty_request(
            "GET",
            "/v1/auth/google?redirect_uri=http://localhost:3000/professors",
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let url = location(&response);
    assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    assert!(url.contains(&format!("client_id={}", config.google_client_id)));

    let state = state_param(&url);
    assert_eq!(
        verify_and_decode_state(&state, &config.oauth_state_key, now_ms()),
        Some("http://localhost:3000/professors".to_string())
    );
}

#[tokio::test]
async fn test_google_start_ignores_foreign_redirect() {
    let app = create_test_app().await;
    let config = &app.state.config;

    let response = app
        .send(empty_request(
            "GET",
            "/v1/auth/google?redirect_uri=https://evil.example/steal",
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let state = state_param(&location(&response));
    assert_eq!(
        verify_and_decode_state(&state, &config.oauth_state_key, now_ms()),
        Some(config.frontend_url.clone())
    );
}

#[tokio::test]
async fn test_callback_error_redirects_to_signed_frontend() {
    let app = create_test_app().await;
    let state = sign_state(
        "http://localhost:3000/back",
        now_ms(),
        &app.state.config.oauth_state_key,
    )
    .unwrap();

    let response = app
        .send(empty_request(
            "GET",
            &format!("/v1/auth/google/callback?error=access_denied&state={state}"),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "http://localhost:3000/back?error=access_denied"
    );
}

#[tokio::test]
async fn test_callback_without_code() {
    let app = create_test_app().await;
    let state = sign_state(
        "http://localhost:3000",
        now_ms(),
        &app.state.config.oauth_state_key,
    )
    .unwrap();

    let response = app
        .send(empty_request(
            "GET",
            &format!("/v1/auth/google/callback?state={state}"),
            None,
        ))
        .await;
    assert_eq!(
        location(&response),
        "http://localhost:3000?error=missing_code"
    );
}

#[tokio::test]
async fn test_callback_with_forged_state_uses_default_frontend() {
    let app = create_test_app().await;
    let forged = sign_state("https://evil.example", now_ms(), b"attacker_key").unwrap();

    let response = app
        .send(empty_request(
            "GET",
            &format!("/v1/auth/google/callback?error=access_denied&state={forged}"),
            None,
        ))
        .await;
    assert_eq!(
        location(&response),
        format!("{}?error=access_denied", app.state.config.frontend_url)
    );
}

#[tokio::test]
async fn test_google_disabled_without_client_id() {
    let config = Config {
        google_client_id: String::new(),
        ..Config::test_default()
    };
    let app = create_test_app_with(config, None).await;

    let response = app.send(empty_request("GET", "/v1/auth/google", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_redirects_to_frontend() {
    let app = create_test_app().await;

    let response = app.send(empty_request("GET", "/v1/auth/logout", None)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), app.state.config.frontend_url);
}
