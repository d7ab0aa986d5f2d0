// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data store layer.
//!
//! Handlers talk to [`DataStore`], an object-safe trait of domain operations.
//! It is implemented once, in [`store`], on top of any [`Documents`] backend:
//! Firestore in production and an in-process map for tests and local runs.

pub mod documents;
pub mod firestore;
pub mod memory;
pub mod store;
pub mod transaction;

pub use documents::{Documents, FieldValue};
pub use firestore::FirestoreDb;
pub use memory::MemoryDb;
pub use transaction::{run_in_transaction, Transaction};

use crate::models::{
    Invitation, NewNote, NewProfessor, NewReview, NewSchool, NewUser, Note, PageQuery, Professor,
    Review, Role, School, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// Upper bound on every individual store call.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Keyed by SHA-256 hex of the activation token
    pub const INVITATIONS: &str = "invitations";
    /// Keyed by role name
    pub const ROLES: &str = "roles";
    pub const SCHOOLS: &str = "schools";
    pub const PROFESSORS: &str = "professors";
    pub const REVIEWS: &str = "reviews";
    pub const NOTES: &str = "notes";
}

/// Errors surfaced by the data store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// Constraint violation; the message is safe to show to callers.
    #[error("{0}")]
    Validation(String),

    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("store operation '{0}' timed out")]
    Timeout(&'static str),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(e: impl std::fmt::Display) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Run a store call with [`QUERY_TIMEOUT`] as its ceiling.
///
/// On expiry the inner future is dropped, which aborts the in-flight request.
pub async fn timed<T, F>(op: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(op)),
    }
}

/// Domain operations used by the HTTP layer.
#[async_trait]
pub trait DataStore: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user_by_id(&self, id: u64) -> Result<Option<User>, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Create an inactive user and its invitation in one transaction.
    ///
    /// A taken email or username fails with [`StoreError::Duplicate`].
    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<User, StoreError>;

    /// Delete a user together with any pending invitations.
    async fn delete_user(&self, id: u64) -> Result<(), StoreError>;

    /// Activate the user owning `token_hash` and consume the invitation.
    ///
    /// Unknown or expired invitations fail with [`StoreError::NotFound`].
    async fn activate_user(&self, token_hash: &str, now: DateTime<Utc>)
        -> Result<User, StoreError>;

    /// Find a user by email or create an already active one.
    ///
    /// An existing account that was never activated is activated, and its
    /// pending invitations are deleted, when `user.is_active` is set.
    async fn upsert_oauth_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_invitation(&self, token_hash: &str) -> Result<Option<Invitation>, StoreError>;

    // ─── Roles ───────────────────────────────────────────────────

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    async fn put_role(&self, role: &Role) -> Result<(), StoreError>;

    // ─── Schools and professors ──────────────────────────────────

    async fn create_school(&self, school: NewSchool) -> Result<School, StoreError>;

    async fn get_school(&self, id: u64) -> Result<Option<School>, StoreError>;

    async fn search_schools(&self, page: &PageQuery) -> Result<Vec<School>, StoreError>;

    async fn random_schools(&self, limit: usize) -> Result<Vec<School>, StoreError>;

    /// Insert a professor after checking the school exists, atomically.
    async fn create_professor(&self, professor: NewProfessor) -> Result<Professor, StoreError>;

    async fn get_professor(&self, id: u64) -> Result<Option<Professor>, StoreError>;

    async fn professors_for_school(
        &self,
        school_id: u64,
        page: &PageQuery,
    ) -> Result<Vec<Professor>, StoreError>;

    async fn search_professors(&self, page: &PageQuery) -> Result<Vec<Professor>, StoreError>;

    // ─── Reviews ─────────────────────────────────────────────────

    /// Insert a review after checking the professor exists, atomically.
    async fn create_review(&self, review: NewReview) -> Result<Review, StoreError>;

    /// Reviews for a professor, newest first.
    async fn reviews_for_professor(&self, professor_id: u64) -> Result<Vec<Review>, StoreError>;

    // ─── Notes ───────────────────────────────────────────────────

    async fn create_note(&self, note: NewNote) -> Result<Note, StoreError>;

    async fn get_note(&self, id: u64) -> Result<Option<Note>, StoreError>;

    async fn delete_note(&self, id: u64) -> Result<(), StoreError>;

    async fn notes_for_professor(&self, professor_id: u64) -> Result<Vec<Note>, StoreError>;
}
