use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    error::{AppError, AppResult},
    locks::KeyGuard,
    middleware::auth::ensure_admin,
    models::{
        Actor, CustomerInfo, Order, OrderFilter, OrderItem, OrderStats, OrderStatus, Paginated,
        StatusEntry,
    },
    services::{
        cart_service,
        inventory_service::{self, StockAdjustment},
    },
    state::AppState,
};

fn invalid_transition(from: OrderStatus, to: OrderStatus) -> AppError {
    AppError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn ensure_customer_info(customer: &CustomerInfo) -> AppResult<()> {
    let missing: Vec<&str> = [
        ("full_name", &customer.full_name),
        ("phone", &customer.phone),
        ("address", &customer.address),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();

    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing customer fields: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

async fn audit(state: &AppState, actor: Option<Uuid>, action: &str, metadata: serde_json::Value) {
    if let Err(err) = log_audit(&state.store, actor, action, Some("orders"), Some(metadata)).await {
        tracing::warn!(error = %err, "audit log failed");
    }
}

/// Turns the cart into a pending order and empties the cart.
///
/// The cart stays locked for the whole operation. If the order cannot be
/// stored the cart is left untouched; if the cart cannot be cleared the
/// stored order is removed again.
pub async fn create_order(
    state: &AppState,
    cart_id: &str,
    actor: Option<&Actor>,
    customer: CustomerInfo,
) -> AppResult<Order> {
    ensure_customer_info(&customer)?;
    let _guard = cart_service::lock_cart(state, cart_id).await;

    let cart = state.carts.get(cart_id).await?;
    let validation = cart_service::validate_cart(state, &cart).await?;
    if !validation.valid {
        return Err(AppError::ValidationFailed(validation.errors));
    }
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let now = Utc::now();
    let subtotal = cart.subtotal();
    let shipping_fee = cart_service::shipping_fee_for(&state.config.shop, subtotal);
    let order = Order {
        id: Uuid::new_v4(),
        order_code: state.orders.generate_order_code(now).await?,
        user_id: actor.map(|a| a.id),
        customer,
        items: cart.items.iter().map(OrderItem::from).collect(),
        subtotal,
        shipping_fee,
        total: subtotal + shipping_fee,
        status: OrderStatus::Pending,
        status_history: vec![StatusEntry {
            status: OrderStatus::Pending,
            timestamp: now,
            note: Some("Order placed".into()),
        }],
        created_at: now,
        updated_at: now,
    };

    let order = state.orders.create(&order).await?;

    if let Err(err) = state.carts.clear(cart_id).await {
        tracing::warn!(error = %err, order_code = %order.order_code, "cart clear failed, rolling back order");
        if let Err(rollback) = state.orders.delete(order.id).await {
            tracing::error!(error = %rollback, order_id = %order.id, "order rollback failed");
        }
        return Err(err);
    }

    tracing::info!(
        order_code = %order.order_code,
        total = order.total,
        items = order.items.len(),
        "order created"
    );
    audit(
        state,
        order.user_id,
        "order_created",
        serde_json::json!({ "order_id": order.id, "order_code": order.order_code }),
    )
    .await;

    Ok(order)
}

type StockRequirements = BTreeMap<(Uuid, Option<Uuid>), (i64, String)>;

/// Quantity per product and variant across all lines, keeping the first
/// line's name for error reporting.
fn stock_requirements(order: &Order) -> StockRequirements {
    let mut required = BTreeMap::new();
    for item in &order.items {
        let entry = required
            .entry((item.product_id, item.variant_id))
            .or_insert_with(|| (0, item.name.clone()));
        entry.0 += item.quantity;
    }
    required
}

/// Stock side effect of a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StockMovement {
    Deduct,
    Restore,
}

impl StockMovement {
    fn for_transition(from: OrderStatus, to: OrderStatus) -> Option<Self> {
        match (from, to) {
            (OrderStatus::Pending, OrderStatus::Processing) => Some(Self::Deduct),
            (OrderStatus::Processing, OrderStatus::Cancelled) => Some(Self::Restore),
            _ => None,
        }
    }

    fn reversed(self) -> Self {
        match self {
            Self::Deduct => Self::Restore,
            Self::Restore => Self::Deduct,
        }
    }

    fn delta(self, quantity: i64) -> i64 {
        match self {
            Self::Deduct => -quantity,
            Self::Restore => quantity,
        }
    }
}

async fn ensure_in_stock(state: &AppState, required: &StockRequirements) -> AppResult<()> {
    for ((product_id, variant_id), (quantity, name)) in required {
        let available = inventory_service::stock_of(state, *product_id, *variant_id).await?;
        if available < *quantity {
            return Err(AppError::InsufficientStock {
                item: name.clone(),
                requested: *quantity,
                available,
            });
        }
    }
    Ok(())
}

/// Applies `movement` to every requirement under `guard`. A checked
/// deduction refuses to take more than is left at the moment of each write.
/// A failure part way through undoes the adjustments already made before
/// returning the error.
async fn move_stock(
    state: &AppState,
    guard: &KeyGuard,
    required: &StockRequirements,
    movement: StockMovement,
    checked: bool,
) -> AppResult<()> {
    let mut applied: Vec<(Uuid, Uuid, i64)> = Vec::new();
    for ((product_id, variant_id), (quantity, name)) in required {
        let Some(variant_id) = *variant_id else {
            tracing::warn!(%product_id, item = %name, ?movement, "line has no variant, stock untouched");
            continue;
        };
        let outcome = match movement {
            StockMovement::Deduct if checked => {
                inventory_service::take_stock_guarded(state, guard, *product_id, variant_id, *quantity)
                    .await
            }
            _ => {
                let delta = movement.delta(*quantity);
                inventory_service::adjust_stock_guarded(state, guard, *product_id, variant_id, delta)
                    .await
            }
        };
        match outcome {
            Ok(StockAdjustment::Applied { .. }) => {
                applied.push((*product_id, variant_id, movement.delta(*quantity)));
            }
            Ok(StockAdjustment::NotFound) => {
                tracing::warn!(%product_id, %variant_id, ?movement, "variant missing, stock untouched");
            }
            Err(err) => {
                let err = match err {
                    AppError::InsufficientStock {
                        requested,
                        available,
                        ..
                    } => AppError::InsufficientStock {
                        item: name.clone(),
                        requested,
                        available,
                    },
                    other => other,
                };
                for (product_id, variant_id, delta) in applied.into_iter().rev() {
                    if let Err(undo) = inventory_service::adjust_stock_guarded(
                        state, guard, product_id, variant_id, -delta,
                    )
                    .await
                    {
                        tracing::error!(error = %undo, %product_id, %variant_id, "stock undo failed");
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Moves stock as the transition requires and records the new status while
/// the affected products stay locked. A deduction is all or nothing. If the
/// status cannot be stored the movement is reversed unconditionally and the
/// store's error is returned, whatever the reversal's outcome.
async fn apply_transition(
    state: &AppState,
    order: &Order,
    target: OrderStatus,
    note: Option<String>,
) -> AppResult<Order> {
    let Some(movement) = StockMovement::for_transition(order.status, target) else {
        return state
            .orders
            .update_status(order.id, order.status, target, note)
            .await?
            .ok_or_else(|| AppError::not_found("Order"));
    };

    let required = stock_requirements(order);
    let product_ids: Vec<Uuid> = required.keys().map(|key| key.0).collect();
    let guard = inventory_service::lock_products(state, product_ids).await;

    if movement == StockMovement::Deduct {
        ensure_in_stock(state, &required).await?;
    }
    move_stock(state, &guard, &required, movement, true).await?;

    let err = match state.orders.update_status(order.id, order.status, target, note).await {
        Ok(Some(updated)) => return Ok(updated),
        Ok(None) => AppError::not_found("Order"),
        Err(err) => err,
    };
    tracing::error!(error = %err, order_code = %order.order_code, to = %target, "status commit failed, reversing stock");
    match move_stock(state, &guard, &required, movement.reversed(), false).await {
        Ok(()) => tracing::warn!(order_code = %order.order_code, "stock movement reversed"),
        Err(undo) => {
            tracing::error!(error = %undo, order_code = %order.order_code, "stock reversal failed")
        }
    }
    Err(err)
}

async fn load_order(state: &AppState, order_id: Uuid) -> AppResult<Order> {
    state
        .orders
        .get_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

/// Moves an order along the lifecycle. Entering `processing` deducts stock,
/// cancelling a `processing` order restores it.
pub async fn update_status(
    state: &AppState,
    order_id: Uuid,
    target: OrderStatus,
    note: Option<String>,
    actor: &Actor,
) -> AppResult<Order> {
    ensure_admin(actor)?;
    let _guard = state.locks.orders.lock(order_id.to_string()).await;

    let order = load_order(state, order_id).await?;
    let from = order.status;
    if !from.can_transition_to(target) {
        return Err(invalid_transition(from, target));
    }

    let updated = apply_transition(state, &order, target, note).await?;

    tracing::info!(
        order_code = %updated.order_code,
        from = %from,
        to = %target,
        "order status changed"
    );
    audit(
        state,
        Some(actor.id),
        "order_status_update",
        serde_json::json!({ "order_id": order_id, "from": from, "to": target }),
    )
    .await;

    Ok(updated)
}

/// Customers may cancel their own pending orders; admins may cancel pending
/// or processing ones.
pub async fn cancel_order(state: &AppState, order_id: Uuid, actor: &Actor) -> AppResult<Order> {
    let _guard = state.locks.orders.lock(order_id.to_string()).await;

    let order = load_order(state, order_id).await?;
    let from = order.status;
    let target = OrderStatus::Cancelled;

    if !actor.is_admin() {
        if order.user_id != Some(actor.id) {
            return Err(AppError::Forbidden);
        }
        if from != OrderStatus::Pending {
            return Err(invalid_transition(from, target));
        }
    } else if !from.can_transition_to(target) {
        return Err(invalid_transition(from, target));
    }

    let note = if actor.is_admin() {
        "Cancelled by admin"
    } else {
        "Cancelled by customer"
    };
    let updated = apply_transition(state, &order, target, Some(note.into())).await?;

    tracing::info!(order_code = %updated.order_code, from = %from, "order cancelled");
    audit(
        state,
        Some(actor.id),
        "order_cancelled",
        serde_json::json!({ "order_id": order_id, "from": from }),
    )
    .await;

    Ok(updated)
}

pub async fn get_stats(
    state: &AppState,
    date_from: Option<DateTime<Utc>>,
    date_to: Option<DateTime<Utc>>,
) -> AppResult<OrderStats> {
    state.orders.stats(date_from, date_to).await
}

/// Owners and admins only.
pub async fn get_by_id(state: &AppState, order_id: Uuid, actor: &Actor) -> AppResult<Order> {
    let order = load_order(state, order_id).await?;
    if !actor.is_admin() && order.user_id != Some(actor.id) {
        return Err(AppError::Forbidden);
    }
    Ok(order)
}

/// Lookup for the order confirmation page, open to guests.
pub async fn get_by_code(state: &AppState, order_code: &str) -> AppResult<Order> {
    state
        .orders
        .get_by_code(order_code)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

pub async fn get_my_orders(state: &AppState, actor: &Actor) -> AppResult<Vec<Order>> {
    state.orders.get_by_user(actor.id).await
}

pub async fn filter(
    state: &AppState,
    filter: &OrderFilter,
    page: i64,
    limit: i64,
    actor: &Actor,
) -> AppResult<Paginated<Order>> {
    ensure_admin(actor)?;
    state.orders.filter(filter, page, limit).await
}
