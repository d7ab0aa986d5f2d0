// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore document backend.
//!
//! Documents are stored with their numeric ID (or natural key, for roles and
//! invitations) as the Firestore document ID.

use crate::db::{Documents, FieldValue, StoreError, Transaction};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl Documents for FirestoreDb {
    type Tx<'a> = FirestoreTx<'a>;

    async fn begin<'a>(&'a self) -> Result<FirestoreTx<'a>, StoreError> {
        let client = &self.client;
        let inner = client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;
        let reader = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(inner.transaction_id().clone()),
        );
        Ok(FirestoreTx {
            client,
            reader,
            inner,
        })
    }

    async fn get<T>(&self, collection: &'static str, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(StoreError::backend)
    }

    async fn put<T>(&self, collection: &'static str, id: &str, doc: &T) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: T = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn delete(&self, collection: &'static str, id: &str) -> Result<(), StoreError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn find_by<T>(
        &self,
        collection: &'static str,
        field: &'static str,
        value: FieldValue,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        query_by(&self.client, collection, field, value)
            .await
            .map_err(StoreError::backend)
    }

    async fn list<T>(&self, collection: &'static str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        self.client
            .fluent()
            .select()
            .from(collection)
            .obj()
            .query()
            .await
            .map_err(StoreError::backend)
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        crate::crypto::random_id().map_err(StoreError::backend)
    }
}

/// Documents in `collection` whose `field` equals `value`.
async fn query_by<T>(
    client: &firestore::FirestoreDb,
    collection: &'static str,
    field: &'static str,
    value: FieldValue,
) -> firestore::FirestoreResult<Vec<T>>
where
    T: DeserializeOwned + Send,
{
    let query = client.fluent().select().from(collection);

    let query = match value {
        FieldValue::Id(id) => query.filter(move |q| q.field(field).eq(id)),
        FieldValue::Text(text) => query.filter(move |q| q.field(field).eq(text.clone())),
    };

    query.obj().query().await
}

/// An open Firestore transaction.
///
/// Reads go through `reader`, a client bound to the transaction ID, so
/// Firestore tracks them and fails the commit if a document read here
/// changed in the meantime. Writes are added to the transaction and sent
/// in one commit.
pub struct FirestoreTx<'a> {
    client: &'a firestore::FirestoreDb,
    reader: firestore::FirestoreDb,
    inner: firestore::FirestoreTransaction<'a>,
}

#[async_trait]
impl<'a> Transaction for FirestoreTx<'a> {
    async fn get<T>(&mut self, collection: &'static str, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        self.reader
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to read in transaction: {}", e)))
    }

    async fn find_by<T>(
        &mut self,
        collection: &'static str,
        field: &'static str,
        value: FieldValue,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        query_by(&self.reader, collection, field, value)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to query in transaction: {}", e)))
    }

    fn put<T>(&mut self, collection: &'static str, id: &str, doc: &T) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        self.client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .add_to_transaction(&mut self.inner)
            .map_err(|e| {
                StoreError::Backend(format!("Failed to add write to transaction: {}", e))
            })?;
        Ok(())
    }

    fn delete(&mut self, collection: &'static str, id: &str) -> Result<(), StoreError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .add_to_transaction(&mut self.inner)
            .map_err(|e| {
                StoreError::Backend(format!("Failed to add deletion to transaction: {}", e))
            })?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.inner
            .commit()
            .await
            .map_err(|e| StoreError::Backend(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.inner
            .rollback()
            .await
            .map_err(|e| StoreError::Backend(format!("Transaction rollback failed: {}", e)))
    }
}
