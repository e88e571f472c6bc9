//! Keyed async mutual exclusion.
//!
//! Status transitions of one order, stock mutations of one product and
//! mutations of one cart each run under their own key so that a
//! check-then-commit sequence is never interleaved with another writer of
//! the same resource.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Holds one or more keys of a [`KeyedLocks`] until dropped.
#[derive(Debug)]
pub struct KeyGuard {
    keys: Vec<String>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl KeyGuard {
    pub fn covers(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().await;
        if slots.len() > PRUNE_THRESHOLD {
            // Only the map itself holds an idle slot.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn lock(&self, key: impl Into<String>) -> KeyGuard {
        self.lock_many([key.into()]).await
    }

    /// Acquires every key in sorted order, so overlapping callers cannot deadlock.
    pub async fn lock_many<I>(&self, keys: I) -> KeyGuard
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let slot = self.slot(key).await;
            guards.push(slot.lock_owned().await);
        }

        KeyGuard {
            keys,
            _guards: guards,
        }
    }
}

/// Lock namespaces shared by the services.
#[derive(Debug, Default)]
pub struct LockRegistry {
    pub orders: KeyedLocks,
    pub stock: KeyedLocks,
    pub carts: KeyedLocks,
}
