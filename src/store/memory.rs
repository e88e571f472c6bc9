use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::{RecordStore, StoreResult, Swap, holds, merge, record_id};
use crate::error::StoreError;

/// Process-local store; collections keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    sequences: Mutex<HashMap<String, i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(record: &Value, id: &str) -> bool {
    record.get("id").and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| matches(r, id)))
            .cloned())
    }

    async fn create(&self, collection: &str, record: Value) -> StoreResult<Value> {
        let id = record_id(collection, &record)?.to_string();
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        if records.iter().any(|r| matches(r, &id)) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id,
            });
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> StoreResult<Option<Value>> {
        let mut collections = self.collections.write().await;
        let Some(record) = collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| matches(r, id)))
        else {
            return Ok(None);
        };
        merge(record, partial);
        Ok(Some(record.clone()))
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        expected: &Value,
        partial: Value,
    ) -> StoreResult<Swap<Value>> {
        let mut collections = self.collections.write().await;
        let Some(record) = collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| matches(r, id)))
        else {
            return Ok(Swap::Missing);
        };
        if !holds(record, expected) {
            return Ok(Swap::Stale);
        }
        merge(record, partial);
        Ok(Swap::Done(record.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| !matches(r, id));
        Ok(records.len() != before)
    }

    async fn clear(&self, collection: &str) -> StoreResult<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }

    async fn next_sequence(&self, name: &str, start: i64) -> StoreResult<i64> {
        let mut sequences = self.sequences.lock().await;
        let value = sequences
            .entry(name.to_string())
            .and_modify(|value| *value += 1)
            .or_insert(start);
        Ok(*value)
    }
}
