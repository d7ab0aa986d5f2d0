// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Review posting and professor pages.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use reviews_api::config::Config;
use reviews_api::db::{collections, DataStore};
use reviews_api::models::{NewProfessor, NewSchool, Professor};
use serde_json::json;

mod common;

use common::{body_json, create_test_app_with, empty_request, json_request, TestApp};

async fn app() -> TestApp {
    let config = Config {
        rate_limit_burst: 100,
        ..Config::test_default()
    };
    create_test_app_with(config, None).await
}

async fn professor(app: &TestApp) -> Professor {
    let school = app
        .db
        .create_school(NewSchool {
            name: "Instituto Tecnológico".to_string(),
            address: "Av. Central 100".to_string(),
        })
        .await
        .unwrap();
    app.db
        .create_professor(NewProfessor {
            name: "Dra. Ruiz".to_string(),
            subject: "Cálculo".to_string(),
            school_id: school.id,
        })
        .await
        .unwrap()
}

fn review(difficulty: i32, rating: i32, tags: &[&str]) -> serde_json::Value {
    json!({
        "text": "Explica muy bien",
        "subject": "Cálculo I",
        "difficulty": difficulty,
        "rating": rating,
        "would_take_again": true,
        "tags": tags,
    })
}

#[tokio::test]
async fn test_review_requires_session() {
    let app = app().await;
    let professor = professor(&app).await;

    let response = app
        .send(json_request(
            "POST",
            &format!("/v1/reviews/{}", professor.id),
            None,
            review(5, 4, &[]),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.db.count(collections::REVIEWS), 0);
}

#[tokio::test]
async fn test_review_is_created() {
    let app = app().await;
    let professor = professor(&app).await;
    let (user, token) = app.user_with_role("ana", "user").await;

    let response = app
        .send(json_request(
            "POST",
            &format!("/v1/reviews/{}", professor.id),
            Some(&token),
            review(7, 4, &["Muchas Tareas"]),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["professor_id"], professor.id);
    assert_eq!(body["user_id"], user.id);
    assert_eq!(body["difficulty"], 7);
    assert_eq!(app.db.count(collections::REVIEWS), 1);
}

#[tokio::test]
async fn test_review_for_missing_professor_writes_nothing() {
    let app = app().await;
    let (_, token) = app.user_with_role("ana", "user").await;

    let response = app
        .send(json_request(
            "POST",
            "/v1/reviews/4242",
            Some(&token),
            review(5, 4, &[]),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.db.count(collections::REVIEWS), 0);
}

#[tokio::test]
async fn test_out_of_range_scores_write_nothing() {
    let app = app().await;
    let professor = professor(&app).await;
    let (_, token) = app.user_with_role("ana", "user").await;
    let uri = format!("/v1/reviews/{}", professor.id);

    for (difficulty, rating) in [(0, 3), (11, 3), (5, 0), (5, 6)] {
        let response = app
            .send(json_request(
                "POST",
                &uri,
                Some(&token),
                review(difficulty, rating, &[]),
            ))
            .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "difficulty {difficulty}, rating {rating}"
        );
    }
    assert_eq!(app.db.count(collections::REVIEWS), 0);
}

#[tokio::test]
async fn test_unknown_tag_is_rejected() {
    let app = app().await;
    let professor = professor(&app).await;
    let (_, token) = app.user_with_role("ana", "user").await;

    let response = app
        .send(json_request(
            "POST",
            &format!("/v1/reviews/{}", professor.id),
            Some(&token),
            review(5, 4, &["Muy Fácil"]),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["details"].as_str().unwrap().contains("Muy Fácil"));
}

#[tokio::test]
async fn test_malformed_body_gets_json_error() {
    let app = app().await;
    let professor = professor(&app).await;
    let (_, token) = app.user_with_role("ana", "user").await;

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/reviews/{}", professor.id))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from("{\"text\": \"Explica"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"].is_string());
    assert_eq!(app.db.count(collections::REVIEWS), 0);
}

#[tokio::test]
async fn test_non_numeric_professor_id_gets_json_error() {
    let app = app().await;

    let response = app
        .send(empty_request("GET", "/v1/professor/ruiz", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_professor_page_lists_reviews_and_tags() {
    let app = app().await;
    let professor = professor(&app).await;
    let (_, ana) = app.user_with_role("ana", "user").await;
    let (_, luis) = app.user_with_role("luis", "user").await;
    let uri = format!("/v1/reviews/{}", professor.id);

    for (token, tags) in [
        (&ana, vec!["Muchas Tareas", "Califica Duro"]),
        (&luis, vec!["Muchas Tareas"]),
    ] {
        let response = app
            .send(json_request("POST", &uri, Some(token), review(6, 3, &tags)))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .send(empty_request(
            "GET",
            &format!("/v1/professor/{}", professor.id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["professor"]["name"], "Dra. Ruiz");
    assert_eq!(body["reviews"].as_array().unwrap().len(), 2);

    let mut tags: Vec<&str> = body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    tags.sort();
    assert_eq!(tags, vec!["Califica Duro", "Muchas Tareas"]);
}

#[tokio::test]
async fn test_missing_professor_page() {
    let app = app().await;
    let response = app
        .send(empty_request("GET", "/v1/professor/4242", None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
