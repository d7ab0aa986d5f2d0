// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study notes with attachments.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use reviews_api::db::{collections, DataStore};
use reviews_api::models::{NewProfessor, NewSchool, Professor};

mod common;

use common::{body_json, create_test_app, empty_request, TestApp};

const BOUNDARY: &str = "----reviews-test-boundary";
const PDF: &[u8] = b"%PDF-1.4";
const PNG: &[u8] = b"\x89PNG";

/// Parts of a multipart form: (field name, optional file name, body).
type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(professor_id: u64, token: &str, parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/v1/notes/{professor_id}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn note_parts<'a>(files: &[(&'a str, &'a [u8])]) -> Vec<Part<'a>> {
    let mut parts: Vec<Part> = vec![
        ("title", None, "Parcial 1".as_bytes()),
        ("subject", None, "Calculo".as_bytes()),
        ("content", None, "Resumen de derivadas".as_bytes()),
    ];
    for (filename, data) in files {
        parts.push(("files", Some(*filename), *data));
    }
    parts
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

#[tokio::test]
async fn test_notes_require_session() {
    let app = create_test_app().await;
    let response = app.send(empty_request("GET", "/v1/notes/1", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_list_view_and_delete() {
    let app = create_test_app().await;
    let professor = professor(&app).await;
    let (user, token) = app.user_with_role("ana", "user").await;

    let parts = note_parts(&[("apuntes 1.pdf", PDF), ("pizarra.PNG", PNG)]);
    let response = app.send(upload_request(professor.id, &token, &parts)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let note = body_json(response).await;
    let note_id = note["id"].as_u64().unwrap();
    assert_eq!(note["user_id"], user.id);
    assert_eq!(note["title"], "Parcial 1");
    let urls = note["files_url"].as_array().unwrap();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].as_str().unwrap().ends_with("-apuntes_1.pdf"));
    assert_eq!(app.storage.len(), 2);

    let response = app
        .send(empty_request(
            "GET",
            &format!("/v1/notes/{}", professor.id),
            Some(&token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .send(empty_request(
            "GET",
            &format!("/v1/notes/{note_id}/view"),
            Some(&token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["content"], "Resumen de derivadas");

    let response = app
        .send(empty_request(
            "DELETE",
            &format!("/v1/notes/{note_id}"),
            Some(&token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.db.count(collections::NOTES), 0);
    assert!(app.storage.is_empty());
}

#[tokio::test]
async fn test_only_owner_can_delete() {
    let app = create_test_app().await;
    let professor = professor(&app).await;
    let (_, owner) = app.user_with_role("ana", "user").await;
    let (_, other) = app.user_with_role("luis", "user").await;

    let parts = note_parts(&[("apuntes.pdf", PDF)]);
    let response = app.send(upload_request(professor.id, &owner, &parts)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let note_id = body_json(response).await["id"].as_u64().unwrap();

    let response = app
        .send(empty_request(
            "DELETE",
            &format!("/v1/notes/{note_id}"),
            Some(&other),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.db.count(collections::NOTES), 1);
    assert_eq!(app.storage.len(), 1);

    let response = app
        .send(empty_request("DELETE", "/v1/notes/4242", Some(&owner)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_disallowed_file_type_uploads_nothing() {
    let app = create_test_app().await;
    let professor = professor(&app).await;
    let (_, token) = app.user_with_role("ana", "user").await;

    let parts = note_parts(&[("apuntes.pdf", PDF), ("virus.exe", "MZ".as_bytes())]);
    let response = app.send(upload_request(professor.id, &token, &parts)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["details"].as_str().unwrap().contains(".exe"));
    assert!(app.storage.is_empty());
    assert_eq!(app.db.count(collections::NOTES), 0);
}

#[tokio::test]
async fn test_note_needs_files_and_fields() {
    let app = create_test_app().await;
    let professor = professor(&app).await;
    let (_, token) = app.user_with_role("ana", "user").await;

    let no_files = note_parts(&[]);
    let response = app
        .send(upload_request(professor.id, &token, &no_files))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let no_title: Vec<Part> = note_parts(&[("apuntes.pdf", PDF)])
        .into_iter()
        .filter(|(name, _, _)| *name != "title")
        .collect();
    let response = app
        .send(upload_request(professor.id, &token, &no_title))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let six = vec![("a.pdf", PDF); 6];
    let response = app
        .send(upload_request(professor.id, &token, &note_parts(&six)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.storage.is_empty());
}

#[tokio::test]
async fn test_note_for_missing_professor() {
    let app = create_test_app().await;
    let (_, token) = app.user_with_role("ana", "user").await;

    let parts = note_parts(&[("apuntes.pdf", PDF)]);
    let response = app.send(upload_request(4242, &token, &parts)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.storage.is_empty());
}
