// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Used by the test suite and by `STORE_BACKEND=memory` for local runs.
//! Documents are kept as JSON values so they go through the same serde
//! mapping as Firestore documents. Transactions are serialized: one open
//! [`MemoryTx`] at a time, so a read inside a transaction cannot be
//! invalidated before its commit.

use crate::db::{Documents, FieldValue, StoreError, Transaction};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;

type Collection = BTreeMap<String, Value>;
type Tables = HashMap<&'static str, Collection>;

/// In-memory database. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<Mutex<Tables>>,
    next_id: Arc<AtomicU64>,
    tx_lock: Arc<tokio::sync::Mutex<()>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &'static str) -> usize {
        self.lock()
            .map(|tables| tables.get(collection).map_or(0, |c| c.len()))
            .unwrap_or(0)
    }
}

fn to_value<T: Serialize>(doc: &T) -> Result<Value, StoreError> {
    serde_json::to_value(doc).map_err(StoreError::backend)
}

fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, StoreError> {
    T::deserialize(value).map_err(StoreError::backend)
}

fn field_matches(doc: &Value, field: &str, value: &FieldValue) -> bool {
    match (doc.get(field), value) {
        (Some(Value::Number(n)), FieldValue::Id(id)) => n.as_u64() == Some(*id),
        (Some(Value::String(s)), FieldValue::Text(text)) => s == text,
        _ => false,
    }
}

#[async_trait]
impl Documents for MemoryDb {
    type Tx<'a> = MemoryTx;

    async fn begin<'a>(&'a self) -> Result<MemoryTx, StoreError> {
        let guard = self.tx_lock.clone().lock_owned().await;
        Ok(MemoryTx {
            db: self.clone(),
            staged: Vec::new(),
            _guard: guard,
        })
    }

    async fn get<T>(&self, collection: &'static str, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let tables = self.lock()?;
        tables
            .get(collection)
            .and_then(|c| c.get(id))
            .map(from_value)
            .transpose()
    }

    async fn put<T>(&self, collection: &'static str, id: &str, doc: &T) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let value = to_value(doc)?;
        self.lock()?
            .entry(collection)
            .or_default()
            .insert(id.to_string(), value);
        Ok(())
    }

    async fn delete(&self, collection: &'static str, id: &str) -> Result<(), StoreError> {
        if let Some(c) = self.lock()?.get_mut(collection) {
            c.remove(id);
        }
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
        let tables = self.lock()?;
        let Some(c) = tables.get(collection) else {
            return Ok(Vec::new());
        };
        c.values()
            .filter(|doc| field_matches(doc, field, &value))
            .map(from_value)
            .collect()
    }

    async fn list<T>(&self, collection: &'static str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let tables = self.lock()?;
        let Some(c) = tables.get(collection) else {
            return Ok(Vec::new());
        };
        c.values().map(from_value).collect()
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

enum Staged {
    Put {
        collection: &'static str,
        id: String,
        value: Value,
    },
    Delete {
        collection: &'static str,
        id: String,
    },
}

/// Transaction over [`MemoryDb`]: writes are staged and applied under a
/// single lock acquisition at commit. Holds the store's transaction lock
/// until it is committed, rolled back or dropped.
pub struct MemoryTx {
    db: MemoryDb,
    staged: Vec<Staged>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl Transaction for MemoryTx {
    async fn get<T>(&mut self, collection: &'static str, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        Documents::get(&self.db, collection, id).await
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
        Documents::find_by(&self.db, collection, field, value).await
    }

    fn put<T>(&mut self, collection: &'static str, id: &str, doc: &T) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        self.staged.push(Staged::Put {
            collection,
            id: id.to_string(),
            value: to_value(doc)?,
        });
        Ok(())
    }

    fn delete(&mut self, collection: &'static str, id: &str) -> Result<(), StoreError> {
        self.staged.push(Staged::Delete {
            collection,
            id: id.to_string(),
        });
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut tables = self.db.lock()?;
        for op in self.staged {
            match op {
                Staged::Put {
                    collection,
                    id,
                    value,
                } => {
                    tables.entry(collection).or_default().insert(id, value);
                }
                Staged::Delete { collection, id } => {
                    if let Some(c) = tables.get_mut(collection) {
                        c.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
