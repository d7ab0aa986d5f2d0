// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Atomic multi-document writes.
//!
//! A precondition read and the dependent writes run against one
//! [`Transaction`]. Writes are staged on the handle and become visible only
//! when [`run_in_transaction`] commits; any error rolls everything back.
//! No network call to the mailer, object storage or OAuth provider may be
//! made while a transaction is open.

use crate::db::{FieldValue, StoreError};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Handle to an open store transaction.
#[async_trait]
pub trait Transaction: Send + Sized {
    /// Read a document by ID.
    async fn get<T>(&mut self, collection: &'static str, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send;

    /// All documents whose `field` equals `value`, read as part of the
    /// transaction.
    async fn find_by<T>(
        &mut self,
        collection: &'static str,
        field: &'static str,
        value: FieldValue,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send;

    /// Stage a full-document write.
    fn put<T>(&mut self, collection: &'static str, id: &str, doc: &T) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync;

    /// Stage a delete.
    fn delete(&mut self, collection: &'static str, id: &str) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Run `f` inside `tx`, committing on success and rolling back on error.
///
/// A failed rollback is logged; the caller always receives the error that
/// aborted the transaction.
pub async fn run_in_transaction<Tx, T, F>(mut tx: Tx, f: F) -> Result<T, StoreError>
where
    Tx: Transaction,
    F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, Result<T, StoreError>>,
{
    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(
                    error = %rollback_err,
                    cause = %err,
                    "Transaction rollback failed"
                );
            }
            Err(err)
        }
    }
}
