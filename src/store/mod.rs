//! Record store: namespaced collections of JSON records keyed by a string `id`.
//!
//! The storage medium is pluggable through [`RecordStore`]; repositories work
//! with typed records through [`Collection`].

use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::{AppResult, StoreError},
    models::{Banner, Cart, Category, Combo, Order, Product, User},
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage contract. No transactions and no schema enforcement: callers own
/// their invariants.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Value>>;

    async fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    async fn create(&self, collection: &str, record: Value) -> StoreResult<Value>;

    /// Shallow-merges the top-level keys of `partial` into the stored record.
    async fn update(&self, collection: &str, id: &str, partial: Value)
    -> StoreResult<Option<Value>>;

    /// Like [`update`](Self::update), but only while every top-level key of
    /// `expected` still has the given value in the stored record.
    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        expected: &Value,
        partial: Value,
    ) -> StoreResult<Swap<Value>>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    async fn clear(&self, collection: &str) -> StoreResult<()>;

    /// Advances the named counter and returns its new value. A counter that
    /// does not exist yet is created holding `start`.
    async fn next_sequence(&self, name: &str, start: i64) -> StoreResult<i64>;
}

/// Outcome of a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub enum Swap<T> {
    Done(T),
    /// No record with that id.
    Missing,
    /// The record no longer matches what the caller read; nothing was written.
    Stale,
}

impl<T> Swap<T> {
    fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Swap<U>, E> {
        Ok(match self {
            Swap::Done(value) => Swap::Done(f(value)?),
            Swap::Missing => Swap::Missing,
            Swap::Stale => Swap::Stale,
        })
    }
}

/// Whether `record` carries every top-level value of `expected`.
pub(crate) fn holds(record: &Value, expected: &Value) -> bool {
    match expected {
        Value::Object(expected) => expected
            .iter()
            .all(|(key, value)| record.get(key) == Some(value)),
        expected => record == expected,
    }
}

pub(crate) fn record_id<'a>(collection: &str, record: &'a Value) -> StoreResult<&'a str> {
    record
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Corrupt {
            collection: collection.to_string(),
            reason: "record has no string id".to_string(),
        })
}

pub(crate) fn merge(target: &mut Value, partial: Value) {
    match (target, partial) {
        (Value::Object(target), Value::Object(partial)) => {
            for (key, value) in partial {
                target.insert(key, value);
            }
        }
        (target, partial) => *target = partial,
    }
}

/// A type persisted in its own collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn record_id(&self) -> String;
}

/// Typed view over one collection of a [`RecordStore`].
pub struct Collection<T> {
    store: Arc<dyn RecordStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn all(&self) -> AppResult<Vec<T>> {
        let raw = self.store.get_all(T::COLLECTION).await?;
        let records = raw
            .into_iter()
            .map(decode::<T>)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> AppResult<Option<T>> {
        let raw = self.store.get_by_id(T::COLLECTION, id).await?;
        Ok(raw.map(decode::<T>).transpose()?)
    }

    pub async fn insert(&self, record: &T) -> AppResult<T> {
        let value = serde_json::to_value(record)?;
        let created = self.store.create(T::COLLECTION, value).await?;
        Ok(decode(created)?)
    }

    /// Overwrites every field of an existing record; `None` if it is gone.
    pub async fn save(&self, record: &T) -> AppResult<Option<T>> {
        let value = serde_json::to_value(record)?;
        self.patch(&record.record_id(), value).await
    }

    pub async fn patch(&self, id: &str, partial: Value) -> AppResult<Option<T>> {
        let updated = self.store.update(T::COLLECTION, id, partial).await?;
        Ok(updated.map(decode::<T>).transpose()?)
    }

    /// [`save`](Self::save) guarded by the top-level values in `expected`.
    pub async fn save_if(&self, record: &T, expected: &Value) -> AppResult<Swap<T>> {
        let value = serde_json::to_value(record)?;
        let swapped = self
            .store
            .update_if(T::COLLECTION, &record.record_id(), expected, value)
            .await?;
        Ok(swapped.try_map(decode::<T>)?)
    }

    pub async fn remove(&self, id: &str) -> AppResult<bool> {
        Ok(self.store.delete(T::COLLECTION, id).await?)
    }

    pub async fn clear(&self) -> AppResult<()> {
        Ok(self.store.clear(T::COLLECTION).await?)
    }
}

fn decode<T: Record>(value: Value) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|err| StoreError::Corrupt {
        collection: T::COLLECTION.to_string(),
        reason: err.to_string(),
    })
}

macro_rules! uuid_record {
    ($ty:ty, $collection:literal) => {
        impl Record for $ty {
            const COLLECTION: &'static str = $collection;

            fn record_id(&self) -> String {
                self.id.to_string()
            }
        }
    };
}

uuid_record!(Product, "products");
uuid_record!(Category, "categories");
uuid_record!(Combo, "combos");
uuid_record!(Banner, "banners");
uuid_record!(Order, "orders");
uuid_record!(User, "users");

impl Record for Cart {
    const COLLECTION: &'static str = "carts";

    fn record_id(&self) -> String {
        self.id.clone()
    }
}
