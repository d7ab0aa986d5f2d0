// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use reviews_api::db::StoreError;
use reviews_api::error::AppError;
use reviews_api::services::TokenError;

async fn body(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_token_errors_become_unauthorized() {
    for err in [
        TokenError::InvalidSignature,
        TokenError::Expired,
        TokenError::NotYetValid,
        TokenError::Malformed,
        TokenError::InvalidClaims,
    ] {
        assert!(matches!(AppError::from(err), AppError::Unauthorized));
    }

    let err = AppError::from(TokenError::Signing("bad key".to_string()));
    assert!(matches!(err, AppError::Internal(_)));
}

#[test]
fn test_store_errors_map_to_client_errors() {
    assert!(matches!(
        AppError::from(StoreError::NotFound),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        AppError::from(StoreError::Duplicate("email")),
        AppError::Validation(msg) if msg == "email already exists"
    ));
    assert!(matches!(
        AppError::from(StoreError::Timeout("get_user")),
        AppError::Timeout
    ));
}

#[tokio::test]
async fn test_internal_errors_hide_details() {
    let (status, json) = body(AppError::Internal(anyhow::anyhow!("secret path /etc"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "internal_error");
    assert!(json.get("details").is_none());

    let (status, json) = body(AppError::Database("connection reset".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json.get("details").is_none());
}

#[tokio::test]
async fn test_validation_carries_details() {
    let (status, json) = body(AppError::Validation("rating out of range".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["details"], "rating out of range");
}

#[test]
fn test_rate_limited_sets_retry_after() {
    let response = AppError::RateLimited {
        retry_after: "18000".to_string(),
    }
    .into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "18000");
}

#[test]
fn test_timeout_is_gateway_timeout() {
    assert_eq!(
        AppError::Timeout.into_response().status(),
        StatusCode::GATEWAY_TIMEOUT
    );
}
