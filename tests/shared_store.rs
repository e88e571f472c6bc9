//! Several service instances over one record store, each with its own
//! in-process locks, as when more than one server shares a database.

mod common;

use std::{collections::HashSet, sync::Arc};

use seasonal_storefront::{
    config::AppConfig,
    error::AppError,
    models::OrderStatus,
    services::{cart_service, order_service},
    state::AppState,
    store::{MemoryStore, RecordStore},
};

use common::{JWT_SECRET, admin, customer_info, seed_product, variant_stock};

fn instances() -> [AppState; 2] {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    [
        AppState::new(store.clone(), AppConfig::ephemeral(JWT_SECRET)),
        AppState::new(store, AppConfig::ephemeral(JWT_SECRET)),
    ]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn order_codes_stay_unique_across_instances() -> anyhow::Result<()> {
    let [a, b] = instances();
    let product = seed_product(&a, "Paper Lantern", 40_000, &[("Red", 100, 0)]).await?;
    let variant = product.variants[0].id;

    let handles: Vec<_> = (0..10)
        .map(|n| {
            let state = if n % 2 == 0 { a.clone() } else { b.clone() };
            let product_id = product.id;
            tokio::spawn(async move {
                let cart_id = format!("lantern-{n}");
                cart_service::add_item(&state, &cart_id, product_id, Some(variant), 1).await?;
                order_service::create_order(&state, &cart_id, None, customer_info()).await
            })
        })
        .collect();

    let mut codes = HashSet::new();
    for handle in handles {
        codes.insert(handle.await??.order_code);
    }
    assert_eq!(codes.len(), 10);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_instances_never_overdraw_stock() -> anyhow::Result<()> {
    let [a, b] = instances();
    let product = seed_product(&a, "Music Box", 400_000, &[("Walnut", 3, 0)]).await?;
    let variant = product.variants[0].id;

    let mut orders = Vec::new();
    for n in 0..2 {
        let cart_id = format!("box-{n}");
        cart_service::add_item(&a, &cart_id, product.id, Some(variant), 2).await?;
        orders.push(order_service::create_order(&a, &cart_id, None, customer_info()).await?);
    }

    let admin = admin();
    let handles: Vec<_> = [a.clone(), b.clone()]
        .into_iter()
        .zip(orders.iter().map(|o| o.id))
        .map(|(state, order_id)| {
            tokio::spawn(async move {
                order_service::update_status(&state, order_id, OrderStatus::Processing, None, &admin)
                    .await
            })
        })
        .collect();

    let mut processed = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => processed += 1,
            Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!(processed, 1);
    assert_eq!(variant_stock(&a, &product, 0).await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_order_is_processed_once_across_instances() -> anyhow::Result<()> {
    let [a, b] = instances();
    let product = seed_product(&a, "Gift Box", 55_000, &[("Large", 5, 0)]).await?;
    cart_service::add_item(&a, "gift", product.id, Some(product.variants[0].id), 2).await?;
    let order = order_service::create_order(&a, "gift", None, customer_info()).await?;

    let admin = admin();
    let handles: Vec<_> = [a.clone(), b.clone()]
        .into_iter()
        .map(|state| {
            let order_id = order.id;
            tokio::spawn(async move {
                order_service::update_status(&state, order_id, OrderStatus::Processing, None, &admin)
                    .await
            })
        })
        .collect();

    let mut processed = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => processed += 1,
            Err(AppError::Conflict(_) | AppError::InvalidTransition { .. }) => {}
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!(processed, 1);
    assert_eq!(variant_stock(&a, &product, 0).await?, 3);

    let stored = order_service::get_by_code(&b, &order.order_code).await?;
    assert_eq!(stored.status, OrderStatus::Processing);
    assert_eq!(stored.status_history.len(), 2);
    Ok(())
}

#[tokio::test]
async fn status_write_from_a_stale_read_is_refused() -> anyhow::Result<()> {
    let [a, b] = instances();
    let product = seed_product(&a, "Star Topper", 120_000, &[("Gold", 4, 0)]).await?;
    cart_service::add_item(&a, "topper", product.id, Some(product.variants[0].id), 1).await?;
    let order = order_service::create_order(&a, "topper", None, customer_info()).await?;

    a.orders
        .update_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled, None)
        .await?;
    let err = b
        .orders
        .update_status(order.id, OrderStatus::Pending, OrderStatus::Processing, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");

    let stored = b.orders.get_by_id(order.id).await?.map(|o| o.status);
    assert_eq!(stored, Some(OrderStatus::Cancelled));
    Ok(())
}
