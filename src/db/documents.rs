// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document-level access shared by the store backends.

use crate::db::{StoreError, Transaction};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A value compared against a document field in [`Documents::find_by`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Id(u64),
    Text(String),
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Id(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// A collection-of-documents backend.
///
/// Documents are serde values keyed by a string ID inside a named collection.
/// Implementations do not apply timeouts; callers wrap each call in
/// [`crate::db::timed`].
#[async_trait]
pub trait Documents: Send + Sync {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    async fn begin<'a>(&'a self) -> Result<Self::Tx<'a>, StoreError>;

    async fn get<T>(&self, collection: &'static str, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send;

    async fn put<T>(&self, collection: &'static str, id: &str, doc: &T) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync;

    async fn delete(&self, collection: &'static str, id: &str) -> Result<(), StoreError>;

    /// All documents whose `field` equals `value`.
    async fn find_by<T>(
        &self,
        collection: &'static str,
        field: &'static str,
        value: FieldValue,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send;

    /// Every document in the collection.
    async fn list<T>(&self, collection: &'static str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send;

    /// Allocate an identifier for a new document.
    fn next_id(&self) -> Result<u64, StoreError>;
}
