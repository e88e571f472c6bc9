mod common;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;

use seasonal_storefront::{
    config::AppConfig,
    error::{AppError, StoreError},
    models::{Order, OrderStatus, Product},
    services::{cart_service, order_service},
    state::AppState,
    store::{MemoryStore, RecordStore, StoreResult, Swap},
};

use common::{JWT_SECRET, admin, customer_info, seed_product, variant_stock};

/// Memory store whose writes to orders can be switched to fail.
#[derive(Default)]
struct FailingOrderWrites {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FailingOrderWrites {
    fn check(&self, collection: &str) -> StoreResult<()> {
        if collection == "orders" && self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Db(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FailingOrderWrites {
    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Value>> {
        self.inner.get_all(collection).await
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        self.inner.get_by_id(collection, id).await
    }

    async fn create(&self, collection: &str, record: Value) -> StoreResult<Value> {
        self.check(collection)?;
        self.inner.create(collection, record).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> StoreResult<Option<Value>> {
        self.check(collection)?;
        self.inner.update(collection, id, partial).await
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        expected: &Value,
        partial: Value,
    ) -> StoreResult<Swap<Value>> {
        self.check(collection)?;
        self.inner.update_if(collection, id, expected, partial).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.check(collection)?;
        self.inner.delete(collection, id).await
    }

    async fn clear(&self, collection: &str) -> StoreResult<()> {
        self.check(collection)?;
        self.inner.clear(collection).await
    }

    async fn next_sequence(&self, name: &str, start: i64) -> StoreResult<i64> {
        self.inner.next_sequence(name, start).await
    }
}

async fn setup(
    stock: i64,
    quantity: i64,
) -> anyhow::Result<(AppState, Arc<FailingOrderWrites>, Product, Order)> {
    let store = Arc::new(FailingOrderWrites::default());
    let state = AppState::new(store.clone(), AppConfig::ephemeral(JWT_SECRET));
    let product = seed_product(&state, "Nativity Set", 650_000, &[("Resin", stock, 0)]).await?;
    cart_service::add_item(&state, "crib", product.id, Some(product.variants[0].id), quantity).await?;
    let order = order_service::create_order(&state, "crib", None, customer_info()).await?;
    Ok((state, store, product, order))
}

#[tokio::test]
async fn failed_processing_commit_gives_the_stock_back() -> anyhow::Result<()> {
    let (state, store, product, order) = setup(5, 2).await?;

    store.failing.store(true, Ordering::SeqCst);
    let err = order_service::update_status(&state, order.id, OrderStatus::Processing, None, &admin())
        .await
        .unwrap_err();
    store.failing.store(false, Ordering::SeqCst);

    assert!(matches!(err, AppError::Store(StoreError::Db(_))), "{err:?}");
    assert_eq!(variant_stock(&state, &product, 0).await?, 5);
    let stored = order_service::get_by_code(&state, &order.order_code).await?;
    assert_eq!(stored.status, OrderStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn failed_cancel_commit_takes_the_stock_again() -> anyhow::Result<()> {
    let (state, store, product, order) = setup(2, 2).await?;
    let admin = admin();
    order_service::update_status(&state, order.id, OrderStatus::Processing, None, &admin).await?;
    assert_eq!(variant_stock(&state, &product, 0).await?, 0);

    store.failing.store(true, Ordering::SeqCst);
    let err = order_service::update_status(&state, order.id, OrderStatus::Cancelled, None, &admin)
        .await
        .unwrap_err();
    store.failing.store(false, Ordering::SeqCst);

    // The store's failure is reported, and the stock handed back for the
    // cancel is taken again even though none was left beforehand.
    assert!(matches!(err, AppError::Store(StoreError::Db(_))), "{err:?}");
    assert_eq!(variant_stock(&state, &product, 0).await?, 0);
    let stored = order_service::get_by_code(&state, &order.order_code).await?;
    assert_eq!(stored.status, OrderStatus::Processing);

    let cancelled = order_service::cancel_order(&state, order.id, &admin).await?;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(variant_stock(&state, &product, 0).await?, 2);
    Ok(())
}
