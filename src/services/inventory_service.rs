//! Stock lookups and adjustments.
//!
//! Variant stock lives inside the product record, so every stock mutation
//! holds the product's key in the stock lock namespace for the whole
//! read-modify-write.

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    locks::KeyGuard,
    models::Product,
    state::AppState,
    store::Swap,
};

/// Outcome of a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    Applied { stock: i64 },
    /// The product or the variant does not exist; nothing was changed.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LowStockEntry {
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_id: Uuid,
    pub variant_name: String,
    pub stock: i64,
}

/// Base price plus the variant's modifier when the variant exists.
pub fn price_of(product: &Product, variant_id: Option<Uuid>) -> i64 {
    let modifier = variant_id
        .and_then(|id| product.variant(id))
        .map(|v| v.price_modifier)
        .unwrap_or(0);
    product.price + modifier
}

/// Variant stock, or total stock when no variant is named. An unknown
/// variant has no stock.
pub fn stock_in(product: &Product, variant_id: Option<Uuid>) -> i64 {
    match variant_id {
        Some(id) => product.variant(id).map(|v| v.stock).unwrap_or(0),
        None => product.total_stock(),
    }
}

pub async fn stock_of(state: &AppState, product_id: Uuid, variant_id: Option<Uuid>) -> AppResult<i64> {
    Ok(state
        .products
        .get_by_id(product_id)
        .await?
        .map(|p| stock_in(&p, variant_id))
        .unwrap_or(0))
}

/// At least one unit left.
pub async fn is_available(
    state: &AppState,
    product_id: Uuid,
    variant_id: Option<Uuid>,
) -> AppResult<bool> {
    Ok(stock_of(state, product_id, variant_id).await? > 0)
}

pub async fn lock_products<I>(state: &AppState, product_ids: I) -> KeyGuard
where
    I: IntoIterator<Item = Uuid>,
{
    state
        .locks
        .stock
        .lock_many(product_ids.into_iter().map(|id| id.to_string()))
        .await
}

/// Adds `delta` to a variant's stock. The result is not clamped; callers
/// check availability before deducting.
pub async fn adjust_stock(
    state: &AppState,
    product_id: Uuid,
    variant_id: Uuid,
    delta: i64,
) -> AppResult<StockAdjustment> {
    let guard = lock_products(state, [product_id]).await;
    adjust_stock_guarded(state, &guard, product_id, variant_id, delta).await
}

/// Same as [`adjust_stock`] for a caller already holding the product's stock key.
pub async fn adjust_stock_guarded(
    state: &AppState,
    guard: &KeyGuard,
    product_id: Uuid,
    variant_id: Uuid,
    delta: i64,
) -> AppResult<StockAdjustment> {
    change_stock(state, guard, product_id, variant_id, StockChange::Add(delta)).await
}

/// Removes `quantity` units only if that many are left at the moment of the
/// write, failing with `InsufficientStock` otherwise.
pub async fn take_stock_guarded(
    state: &AppState,
    guard: &KeyGuard,
    product_id: Uuid,
    variant_id: Uuid,
    quantity: i64,
) -> AppResult<StockAdjustment> {
    change_stock(state, guard, product_id, variant_id, StockChange::Take(quantity)).await
}

#[derive(Debug, Clone, Copy)]
enum StockChange {
    Add(i64),
    Take(i64),
}

const MAX_STOCK_ATTEMPTS: usize = 8;

/// Read-modify-write of one variant. The write only lands if the product's
/// variants are unchanged since the read, so writers in other processes
/// cannot be overwritten; a stale read is retried.
async fn change_stock(
    state: &AppState,
    guard: &KeyGuard,
    product_id: Uuid,
    variant_id: Uuid,
    change: StockChange,
) -> AppResult<StockAdjustment> {
    if !guard.covers(&product_id.to_string()) {
        return Err(AppError::Internal(anyhow::anyhow!(
            "stock key for product {product_id} is not held"
        )));
    }

    for _ in 0..MAX_STOCK_ATTEMPTS {
        let Some(mut product) = state.products.get_by_id(product_id).await? else {
            return Ok(StockAdjustment::NotFound);
        };
        let Some(current) = product.variant(variant_id).map(|v| v.stock) else {
            return Ok(StockAdjustment::NotFound);
        };

        let delta = match change {
            StockChange::Add(delta) => delta,
            StockChange::Take(quantity) if current < quantity => {
                return Err(AppError::InsufficientStock {
                    item: product.name,
                    requested: quantity,
                    available: current,
                });
            }
            StockChange::Take(quantity) => -quantity,
        };
        let stock = current
            .checked_add(delta)
            .ok_or_else(|| AppError::BadRequest("Stock is out of range".into()))?;

        let seen = product.variants.clone();
        if let Some(variant) = product.variant_mut(variant_id) {
            variant.stock = stock;
        }
        product.updated_at = Utc::now();

        match state.products.save_if_variants(&product, &seen).await? {
            Swap::Done(_) => {
                tracing::debug!(%product_id, %variant_id, delta, stock, "stock adjusted");
                return Ok(StockAdjustment::Applied { stock });
            }
            Swap::Missing => return Ok(StockAdjustment::NotFound),
            Swap::Stale => {
                tracing::debug!(%product_id, %variant_id, "stock changed during adjustment, retrying");
            }
        }
    }

    Err(AppError::Conflict(format!(
        "stock of product {product_id} kept changing, try again"
    )))
}

/// Variants at or below `threshold`, lowest stock first.
pub async fn low_stock(state: &AppState, threshold: i64) -> AppResult<Vec<LowStockEntry>> {
    let mut entries: Vec<LowStockEntry> = state
        .products
        .all()
        .await?
        .into_iter()
        .flat_map(|p| {
            p.variants
                .iter()
                .filter(|v| v.stock <= threshold)
                .map(|v| LowStockEntry {
                    product_id: p.id,
                    product_name: p.name.clone(),
                    variant_id: v.id,
                    variant_name: v.name.clone(),
                    stock: v.stock,
                })
                .collect::<Vec<_>>()
        })
        .collect();
    entries.sort_by_key(|e| e.stock);
    Ok(entries)
}
