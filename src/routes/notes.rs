// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study notes with file attachments. All routes require authentication.

use crate::crypto;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{NewNote, Note};
use crate::routes::extract::AppPath;
use crate::services::saga::Saga;
use crate::services::storage::{check_upload, sanitize_filename, MAX_UPLOAD_BYTES};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use std::sync::Arc;
use validator::Validate;

/// Attachments accepted per note.
const MAX_FILES: usize = 5;

/// Routes share the `{id}` segment: a professor for listing and creating,
/// a note for viewing and deleting.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/notes/{id}",
            get(list_notes)
                .post(create_note)
                .delete(delete_note)
                // Room for every attachment plus the text fields.
                .layer(DefaultBodyLimit::max(MAX_FILES * MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route("/notes/{id}/view", get(get_note))
}

async fn list_notes(
    State(state): State<Arc<AppState>>,
    AppPath(professor_id): AppPath<u64>,
) -> Result<Json<Vec<Note>>> {
    Ok(Json(state.db.notes_for_professor(professor_id).await?))
}

async fn get_note(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<u64>,
) -> Result<Json<Note>> {
    let note = state
        .db
        .get_note(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Note {} not found", id)))?;
    Ok(Json(note))
}

#[derive(Debug, Default, Validate)]
struct NoteFields {
    #[validate(length(min = 1, max = 100))]
    title: String,
    #[validate(length(min = 1, max = 100))]
    subject: String,
    #[validate(length(min = 1, max = 5000))]
    content: String,
}

struct Attachment {
    filename: String,
    content_type: &'static str,
    bytes: Vec<u8>,
}

fn bad_multipart(e: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("invalid multipart body: {}", e))
}

/// Read the text fields and check every file before anything is uploaded.
async fn read_form(mut multipart: Multipart) -> Result<(NoteFields, Vec<Attachment>)> {
    let mut fields = NoteFields::default();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| AppError::Validation("file name missing".to_string()))?;
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                let content_type =
                    check_upload(&filename, bytes.len()).map_err(AppError::Validation)?;
                files.push(Attachment {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => fields.title = field.text().await.map_err(bad_multipart)?,
            "subject" => fields.subject = field.text().await.map_err(bad_multipart)?,
            "content" => fields.content = field.text().await.map_err(bad_multipart)?,
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    fields.validate()?;
    if files.is_empty() {
        return Err(AppError::Validation("no files uploaded".to_string()));
    }
    if files.len() > MAX_FILES {
        return Err(AppError::Validation(format!(
            "at most {} files per note",
            MAX_FILES
        )));
    }
    Ok((fields, files))
}

/// Upload attachments and store the note.
///
/// Uploaded objects are removed again if the note cannot be stored.
async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppPath(professor_id): AppPath<u64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Note>)> {
    if state.db.get_professor(professor_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Professor {} not found",
            professor_id
        )));
    }

    let (fields, files) = read_form(multipart).await?;

    let mut saga = Saga::new("create_note");
    let mut files_url = Vec::with_capacity(files.len());
    let outcome = async {
        for file in files {
            let key = format!(
                "{}-{}",
                crypto::random_hex::<8>()?,
                sanitize_filename(&file.filename)
            );
            state
                .storage
                .upload(&key, file.content_type, file.bytes)
                .await
                .map_err(|e| AppError::Internal(e.into()))?;

            let storage = state.storage.clone();
            let uploaded = key.clone();
            saga.register("upload", move || async move {
                storage.delete(&uploaded).await?;
                Ok::<(), anyhow::Error>(())
            });
            files_url.push(state.storage.public_url(&key));
        }

        let note = state
            .db
            .create_note(NewNote {
                title: fields.title,
                subject: fields.subject,
                content: fields.content,
                files_url,
                user_id: user.id(),
                professor_id,
            })
            .await?;
        Ok::<Note, AppError>(note)
    }
    .await;

    match outcome {
        Ok(note) => {
            saga.complete();
            tracing::info!(note_id = note.id, professor_id, user_id = user.id(), "Note created");
            Ok((StatusCode::CREATED, Json(note)))
        }
        Err(e) => {
            saga.compensate().await;
            Err(e)
        }
    }
}

/// Delete a note and its files. Only the owner may do this.
async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<u64>,
) -> Result<StatusCode> {
    let note = state
        .db
        .get_note(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Note {} not found", id)))?;

    if !note.is_owned_by(user.id()) {
        tracing::warn!(note_id = id, user_id = user.id(), "Delete of someone else's note");
        return Err(AppError::Forbidden);
    }

    state.db.delete_note(id).await?;

    // Attachments are removed best effort once the note is gone.
    for url in &note.files_url {
        let Some(key) = state.storage.key_for_url(url) else {
            tracing::warn!(note_id = id, url = %url, "Attachment URL not in our bucket");
            continue;
        };
        if let Err(e) = state.storage.delete(&key).await {
            tracing::error!(note_id = id, key = %key, error = %e, "Failed to delete attachment");
        }
    }

    tracing::info!(note_id = id, user_id = user.id(), "Note deleted");
    Ok(StatusCode::NO_CONTENT)
}
