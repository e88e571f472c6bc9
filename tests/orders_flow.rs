mod common;

use chrono::{Datelike, Duration, Utc};
use seasonal_storefront::{
    dto::catalog::UpdateProductRequest,
    error::AppError,
    models::{Actor, OrderFilter, OrderStatus},
    services::{cart_service, catalog_service, order_service},
    state::AppState,
};
use uuid::Uuid;

use common::{admin, customer_info, seed_product, state, variant_stock};

const CART: &str = "session-42";

/// Places a pending order for `quantity` units of the product's first variant.
async fn place_order(
    state: &AppState,
    product: &seasonal_storefront::models::Product,
    quantity: i64,
    actor: Option<&Actor>,
) -> anyhow::Result<seasonal_storefront::models::Order> {
    let cart_id = format!("cart-{}", Uuid::new_v4());
    cart_service::add_item(state, &cart_id, product.id, Some(product.variants[0].id), quantity)
        .await?;
    Ok(order_service::create_order(state, &cart_id, actor, customer_info()).await?)
}

#[tokio::test]
async fn create_order_snapshots_cart_and_clears_it() -> anyhow::Result<()> {
    let state = state();
    let product = seed_product(&state, "Snow Globe", 180_000, &[("Small", 5, 0)]).await?;
    cart_service::add_item(&state, CART, product.id, Some(product.variants[0].id), 2).await?;

    let order = order_service::create_order(&state, CART, None, customer_info()).await?;

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.status_history.len(), 1);
    assert_eq!(order.user_id, None);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.subtotal, 360_000);
    assert_eq!(order.shipping_fee, 30_000);
    assert_eq!(order.total, 390_000);
    assert_eq!(
        order.order_code,
        format!("NOEL-{}-0001", Utc::now().year())
    );

    assert!(cart_service::is_empty(&state, CART).await?);
    // Stock is untouched until the order is processed.
    assert_eq!(variant_stock(&state, &product, 0).await?, 5);
    Ok(())
}

#[tokio::test]
async fn order_codes_follow_a_per_year_sequence() -> anyhow::Result<()> {
    let state = state();
    let product = seed_product(&state, "Stocking", 70_000, &[("Red", 50, 0)]).await?;

    let first = place_order(&state, &product, 1, None).await?;
    let second = place_order(&state, &product, 1, None).await?;
    let year = Utc::now().year();

    assert_eq!(first.order_code, format!("NOEL-{year}-0001"));
    assert_eq!(second.order_code, format!("NOEL-{year}-0002"));
    assert_eq!(
        order_service::get_by_code(&state, &second.order_code).await?.id,
        second.id
    );
    Ok(())
}

#[tokio::test]
async fn processing_deducts_and_cancelling_restores() -> anyhow::Result<()> {
    let state = state();
    let admin = admin();
    let product = seed_product(&state, "Nutcracker", 300_000, &[("30cm", 5, 0)]).await?;
    let order = place_order(&state, &product, 2, None).await?;

    let processing =
        order_service::update_status(&state, order.id, OrderStatus::Processing, None, &admin)
            .await?;
    assert_eq!(processing.status, OrderStatus::Processing);
    assert_eq!(variant_stock(&state, &product, 0).await?, 3);

    let cancelled = order_service::update_status(
        &state,
        order.id,
        OrderStatus::Cancelled,
        Some("customer called".into()),
        &admin,
    )
    .await?;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(variant_stock(&state, &product, 0).await?, 5);

    let history: Vec<OrderStatus> = cancelled.status_history.iter().map(|e| e.status).collect();
    assert_eq!(
        history,
        vec![
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Cancelled
        ]
    );
    assert_eq!(
        cancelled.status_history[2].note.as_deref(),
        Some("customer called")
    );
    Ok(())
}

#[tokio::test]
async fn skipping_ahead_is_rejected_without_side_effects() -> anyhow::Result<()> {
    let state = state();
    let product = seed_product(&state, "Angel", 110_000, &[("Gold", 5, 0)]).await?;
    let order = place_order(&state, &product, 2, None).await?;

    let err = order_service::update_status(&state, order.id, OrderStatus::Shipped, None, &admin())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    assert_eq!(variant_stock(&state, &product, 0).await?, 5);
    let stored = order_service::get_by_code(&state, &order.order_code).await?;
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stored.status_history.len(), 1);
    Ok(())
}

#[tokio::test]
async fn processing_twice_deducts_once() -> anyhow::Result<()> {
    let state = state();
    let admin = admin();
    let product = seed_product(&state, "Reindeer", 95_000, &[("Plush", 6, 0)]).await?;
    let order = place_order(&state, &product, 2, None).await?;

    order_service::update_status(&state, order.id, OrderStatus::Processing, None, &admin).await?;
    let err =
        order_service::update_status(&state, order.id, OrderStatus::Processing, None, &admin)
            .await
            .unwrap_err();

    assert!(matches!(err, AppError::InvalidTransition { .. }));
    assert_eq!(variant_stock(&state, &product, 0).await?, 4);
    Ok(())
}

#[tokio::test]
async fn shortfall_aborts_the_whole_deduction() -> anyhow::Result<()> {
    let state = state();
    let plenty = seed_product(&state, "Ribbon", 20_000, &[("Red", 10, 0)]).await?;
    let scarce = seed_product(&state, "Star", 60_000, &[("Gold", 3, 0)]).await?;

    cart_service::add_item(&state, CART, plenty.id, Some(plenty.variants[0].id), 4).await?;
    cart_service::add_item(&state, CART, scarce.id, Some(scarce.variants[0].id), 3).await?;
    let order = order_service::create_order(&state, CART, None, customer_info()).await?;

    // Another sale drains the scarce variant before processing.
    catalog_service::set_stock(&state, &admin(), scarce.id, scarce.variants[0].id, 1).await?;

    let err =
        order_service::update_status(&state, order.id, OrderStatus::Processing, None, &admin())
            .await
            .unwrap_err();
    match err {
        AppError::InsufficientStock {
            item,
            requested,
            available,
        } => {
            assert_eq!(item, "Star");
            assert_eq!(requested, 3);
            assert_eq!(available, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(variant_stock(&state, &plenty, 0).await?, 10);
    assert_eq!(variant_stock(&state, &scarce, 0).await?, 1);
    Ok(())
}

#[tokio::test]
async fn stale_cart_blocks_checkout_and_is_kept() -> anyhow::Result<()> {
    let state = state();
    let product = seed_product(&state, "Advent Calendar", 220_000, &[("Wood", 5, 0)]).await?;
    cart_service::add_item(&state, CART, product.id, Some(product.variants[0].id), 1).await?;

    catalog_service::update_product(
        &state,
        &admin(),
        product.id,
        UpdateProductRequest {
            active: Some(false),
            ..Default::default()
        },
    )
    .await?;

    let validation = cart_service::validate(&state, CART).await?;
    assert!(!validation.valid);

    let err = order_service::create_order(&state, CART, None, customer_info())
        .await
        .unwrap_err();
    match err {
        AppError::ValidationFailed(errors) => {
            assert_eq!(errors, validation.errors);
            assert!(errors[0].contains("Advent Calendar"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(cart_service::get_item_count(&state, CART).await?, 1);
    assert!(state.orders.all().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_cart_cannot_check_out() -> anyhow::Result<()> {
    let state = state();
    let err = order_service::create_order(&state, CART, None, customer_info())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));
    Ok(())
}

#[tokio::test]
async fn orders_do_not_follow_the_cart_or_catalog() -> anyhow::Result<()> {
    let state = state();
    let product = seed_product(&state, "Tree Skirt", 140_000, &[("Round", 8, 0)]).await?;
    let variant = Some(product.variants[0].id);
    cart_service::add_item(&state, CART, product.id, variant, 2).await?;
    let order = order_service::create_order(&state, CART, None, customer_info()).await?;

    cart_service::add_item(&state, CART, product.id, variant, 5).await?;
    catalog_service::update_product(
        &state,
        &admin(),
        product.id,
        UpdateProductRequest {
            price: Some(1),
            name: Some("Renamed".into()),
            ..Default::default()
        },
    )
    .await?;
    catalog_service::delete_product(&state, &admin(), product.id).await?;

    let stored = order_service::get_by_code(&state, &order.order_code).await?;
    assert_eq!(stored.items, order.items);
    assert_eq!(stored.items[0].name, "Tree Skirt");
    assert_eq!(stored.total, order.total);
    Ok(())
}

#[tokio::test]
async fn every_unlisted_transition_is_rejected() -> anyhow::Result<()> {
    let state = state();
    let admin = admin();
    let product = seed_product(&state, "Sleigh Bell", 10_000, &[("Brass", 1_000, 0)]).await?;

    // Path from pending to each starting status.
    let paths: [(OrderStatus, &[OrderStatus]); 5] = [
        (OrderStatus::Pending, &[]),
        (OrderStatus::Processing, &[OrderStatus::Processing]),
        (
            OrderStatus::Shipped,
            &[OrderStatus::Processing, OrderStatus::Shipped],
        ),
        (
            OrderStatus::Delivered,
            &[
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
            ],
        ),
        (OrderStatus::Cancelled, &[OrderStatus::Cancelled]),
    ];

    for (from, path) in paths {
        for target in OrderStatus::ALL {
            if from.can_transition_to(target) {
                continue;
            }
            let order = place_order(&state, &product, 1, None).await?;
            for step in path {
                order_service::update_status(&state, order.id, *step, None, &admin).await?;
            }
            let stock_before = variant_stock(&state, &product, 0).await?;

            let err = order_service::update_status(&state, order.id, target, None, &admin)
                .await
                .unwrap_err();
            assert!(
                matches!(err, AppError::InvalidTransition { .. }),
                "{from} -> {target} gave {err:?}"
            );
            assert_eq!(variant_stock(&state, &product, 0).await?, stock_before);
        }
    }
    Ok(())
}

#[tokio::test]
async fn update_status_requires_an_admin() -> anyhow::Result<()> {
    let state = state();
    let product = seed_product(&state, "Cookie Tin", 75_000, &[("Tin", 5, 0)]).await?;
    let order = place_order(&state, &product, 1, None).await?;

    let err = order_service::update_status(
        &state,
        order.id,
        OrderStatus::Processing,
        None,
        &Actor::customer(Uuid::new_v4()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    assert_eq!(variant_stock(&state, &product, 0).await?, 5);
    Ok(())
}

#[tokio::test]
async fn customers_cancel_only_their_own_pending_orders() -> anyhow::Result<()> {
    let state = state();
    let owner = Actor::customer(Uuid::new_v4());
    let stranger = Actor::customer(Uuid::new_v4());
    let product = seed_product(&state, "Mitten", 45_000, &[("Pair", 10, 0)]).await?;

    let order = place_order(&state, &product, 1, Some(&owner)).await?;
    let err = order_service::cancel_order(&state, order.id, &stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let cancelled = order_service::cancel_order(&state, order.id, &owner).await?;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let processing = place_order(&state, &product, 1, Some(&owner)).await?;
    order_service::update_status(&state, processing.id, OrderStatus::Processing, None, &admin())
        .await?;
    let err = order_service::cancel_order(&state, processing.id, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    let missing = order_service::cancel_order(&state, Uuid::new_v4(), &owner)
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn admin_cancel_of_processing_order_restores_stock() -> anyhow::Result<()> {
    let state = state();
    let admin = admin();
    let product = seed_product(&state, "Hot Cocoa", 35_000, &[("Box", 7, 0)]).await?;
    let order = place_order(&state, &product, 3, None).await?;

    order_service::update_status(&state, order.id, OrderStatus::Processing, None, &admin).await?;
    assert_eq!(variant_stock(&state, &product, 0).await?, 4);

    order_service::cancel_order(&state, order.id, &admin).await?;
    assert_eq!(variant_stock(&state, &product, 0).await?, 7);

    let shipped = place_order(&state, &product, 1, None).await?;
    order_service::update_status(&state, shipped.id, OrderStatus::Processing, None, &admin).await?;
    order_service::update_status(&state, shipped.id, OrderStatus::Shipped, None, &admin).await?;
    let err = order_service::cancel_order(&state, shipped.id, &admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
    Ok(())
}

#[tokio::test]
async fn stats_exclude_cancelled_revenue() -> anyhow::Result<()> {
    let state = state();
    let admin = admin();

    let empty = order_service::get_stats(&state, None, None).await?;
    assert_eq!(empty.total_orders, 0);
    assert_eq!(empty.average_order_value, 0.0);

    let product = seed_product(&state, "Pine Candle", 100_000, &[("Jar", 20, 0)]).await?;
    let a = place_order(&state, &product, 1, None).await?; // 130_000
    let b = place_order(&state, &product, 6, None).await?; // 600_000
    let c = place_order(&state, &product, 2, None).await?; // 230_000

    order_service::update_status(&state, b.id, OrderStatus::Processing, None, &admin).await?;
    order_service::update_status(&state, c.id, OrderStatus::Cancelled, None, &admin).await?;

    let stats = order_service::get_stats(&state, None, None).await?;
    assert_eq!(stats.total_orders, 3);
    assert_eq!(stats.pending_orders, 1);
    assert_eq!(stats.processing_orders, 1);
    assert_eq!(stats.cancelled_orders, 1);
    assert_eq!(stats.total_revenue, a.total + b.total);
    assert_eq!(stats.average_order_value, (a.total + b.total) as f64 / 2.0);

    let future = order_service::get_stats(&state, Some(Utc::now() + Duration::days(1)), None).await?;
    assert_eq!(future.total_orders, 0);
    assert_eq!(future.average_order_value, 0.0);
    Ok(())
}

#[tokio::test]
async fn orders_are_listed_per_user_and_filtered() -> anyhow::Result<()> {
    let state = state();
    let owner = Actor::customer(Uuid::new_v4());
    let product = seed_product(&state, "Gingerbread", 55_000, &[("House", 10, 0)]).await?;

    let first = place_order(&state, &product, 1, Some(&owner)).await?;
    let second = place_order(&state, &product, 1, Some(&owner)).await?;
    place_order(&state, &product, 1, None).await?;

    let mine = order_service::get_my_orders(&state, &owner).await?;
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().any(|o| o.id == first.id));
    assert!(mine.iter().any(|o| o.id == second.id));

    let page = order_service::filter(
        &state,
        &OrderFilter {
            search: Some(second.order_code.to_lowercase()),
            ..Default::default()
        },
        1,
        20,
        &admin(),
    )
    .await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id, second.id);

    let err = order_service::filter(&state, &OrderFilter::default(), 1, 20, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = order_service::get_by_id(&state, first.id, &Actor::customer(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    assert_eq!(order_service::get_by_id(&state, first.id, &owner).await?.id, first.id);
    Ok(())
}
