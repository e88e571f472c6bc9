use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::AppResult,
    models::Cart,
    store::{Collection, RecordStore},
};

/// One cart record per session id.
#[derive(Clone)]
pub struct CartRepository {
    records: Collection<Cart>,
}

impl CartRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            records: Collection::new(store),
        }
    }

    /// The stored cart, or a fresh empty one.
    pub async fn get(&self, cart_id: &str) -> AppResult<Cart> {
        Ok(self
            .records
            .get(cart_id)
            .await?
            .unwrap_or_else(|| Cart::empty(cart_id)))
    }

    pub async fn save(&self, cart: &mut Cart) -> AppResult<()> {
        cart.updated_at = Utc::now();
        if self.records.save(cart).await?.is_none() {
            self.records.insert(cart).await?;
        }
        Ok(())
    }

    pub async fn clear(&self, cart_id: &str) -> AppResult<()> {
        self.records.remove(cart_id).await?;
        Ok(())
    }
}
