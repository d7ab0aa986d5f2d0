// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object storage for note attachments.
//!
//! Production uses the Google Cloud Storage JSON API with an access token
//! from the instance metadata server; tests use [`MemoryStorage`].

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Largest accepted attachment.
pub const MAX_UPLOAD_BYTES: usize = 3 * 1024 * 1024;

/// Accepted attachment extensions and the content type stored for each.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("pdf", "application/pdf"),
];

const TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const API_BASE: &str = "https://storage.googleapis.com";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage transport error: {0}")]
    Transport(String),

    #[error("storage returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to obtain storage credentials: {0}")]
    Credentials(String),
}

/// Check an attachment before upload and return its content type.
///
/// The error message is meant for the client.
pub fn check_upload(filename: &str, size: usize) -> Result<&'static str, String> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| format!("file '{}' has no extension", filename))?;

    let content_type = ALLOWED_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, ct)| *ct)
        .ok_or_else(|| format!("file type '.{}' is not allowed", extension))?;

    if size == 0 {
        return Err(format!("file '{}' is empty", filename));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(format!("file '{}' exceeds the 3 MiB limit", filename));
    }

    Ok(content_type)
}

/// Keep object keys to a safe character set.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, key: &str, content_type: &str, bytes: Vec<u8>)
        -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// URL clients use to fetch the object.
    fn public_url(&self, key: &str) -> String;

    /// Inverse of [`ObjectStorage::public_url`].
    fn key_for_url(&self, url: &str) -> Option<String>;
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Google Cloud Storage bucket.
pub struct GcsStorage {
    http: reqwest::Client,
    bucket: String,
    token: Mutex<Option<CachedToken>>,
}

impl GcsStorage {
    pub fn new(bucket: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bucket,
            token: Mutex::new(None),
        }
    }

    /// Access token for the runtime service account, refreshed a minute
    /// before it expires.
    async fn access_token(&self) -> Result<String, StorageError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + Duration::from_secs(60) {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http
            .get(TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StorageError::Credentials(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StorageError::Credentials(format!(
                "metadata server returned {}",
                response.status()
            )));
        }
        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| StorageError::Credentials(e.to_string()))?;

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    async fn check_response(response: reqwest::Response) -> Result<(), StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ObjectStorage for GcsStorage {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StorageError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            API_BASE,
            self.bucket,
            urlencoding::encode(key)
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .timeout(Duration::from_secs(30))
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        Self::check_response(response).await?;
        tracing::debug!(bucket = %self.bucket, key, "Uploaded object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            API_BASE,
            self.bucket,
            urlencoding::encode(key)
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        // Already gone is fine.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check_response(response).await
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", API_BASE, self.bucket, key)
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&format!("{}/{}/", API_BASE, self.bucket))
            .map(str::to_string)
    }
}

/// In-process object store.
#[derive(Default)]
pub struct MemoryStorage {
    objects: DashMap<String, (String, Vec<u8>)>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StorageError> {
        self.objects
            .insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://notes/{}", key)
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix("memory://notes/").map(str::to_string)
    }
}
