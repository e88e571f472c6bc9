use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
    config::ShopConfig,
    error::{AppError, AppResult},
    locks::KeyGuard,
    models::{Cart, CartItem, CartSummary, CartValidation, LineKey, Product},
    services::inventory_service::{price_of, stock_in},
    state::AppState,
};

const COMBO_PREFIX: &str = "[Combo]";

pub fn shipping_fee_for(shop: &ShopConfig, subtotal: i64) -> i64 {
    if subtotal < shop.free_shipping_threshold {
        shop.shipping_fee
    } else {
        0
    }
}

pub(crate) async fn lock_cart(state: &AppState, cart_id: &str) -> KeyGuard {
    state.locks.carts.lock(cart_id).await
}

fn ensure_quantity(quantity: i64) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }
    Ok(())
}

async fn load_product(state: &AppState, product_id: Uuid) -> AppResult<Product> {
    state
        .products
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))
}

/// Total quantity the cart would hold for one product and variant.
fn combined_quantity(held: i64, quantity: i64) -> AppResult<i64> {
    held.checked_add(quantity)
        .ok_or_else(|| AppError::BadRequest("Quantity is too large".into()))
}

fn ensure_stock(product: &Product, variant_id: Option<Uuid>, requested: i64) -> AppResult<()> {
    let available = stock_in(product, variant_id);
    if available < requested {
        return Err(AppError::InsufficientStock {
            item: product.name.clone(),
            requested,
            available,
        });
    }
    Ok(())
}

fn variant_name(product: &Product, variant_id: Option<Uuid>) -> Option<String> {
    variant_id
        .and_then(|id| product.variant(id))
        .map(|v| v.name.clone())
}

pub async fn get_cart(state: &AppState, cart_id: &str) -> AppResult<Cart> {
    state.carts.get(cart_id).await
}

/// Adds a product line, merging with an existing line of the same product
/// and variant. Stock is checked against everything the cart already holds
/// for that product and variant.
pub async fn add_item(
    state: &AppState,
    cart_id: &str,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i64,
) -> AppResult<Cart> {
    ensure_quantity(quantity)?;
    let _guard = lock_cart(state, cart_id).await;

    let product = load_product(state, product_id).await?;
    let mut cart = state.carts.get(cart_id).await?;
    let requested = combined_quantity(cart.quantity_of(product_id, variant_id), quantity)?;
    ensure_stock(&product, variant_id, requested)?;

    let key = LineKey::new(product_id, variant_id, None);
    match cart.line_mut(key) {
        Some(line) => line.quantity = combined_quantity(line.quantity, quantity)?,
        None => cart.items.push(CartItem {
            product_id,
            variant_id,
            combo_id: None,
            quantity,
            price: price_of(&product, variant_id),
            name: product.name.clone(),
            image: product.primary_image(),
            variant_name: variant_name(&product, variant_id),
        }),
    }

    state.carts.save(&mut cart).await?;
    tracing::debug!(cart_id, %product_id, quantity, "cart item added");
    Ok(cart)
}

/// Adds every component of a combo as its own line. The combo's discount
/// price is spread evenly over the component units.
pub async fn add_combo(state: &AppState, cart_id: &str, combo_id: Uuid) -> AppResult<Cart> {
    let _guard = lock_cart(state, cart_id).await;

    let combo = state
        .combos
        .get_by_id(combo_id)
        .await?
        .ok_or_else(|| AppError::not_found("Combo"))?;
    if !combo.active {
        return Err(AppError::BadRequest(format!(
            "Combo \"{}\" is no longer available",
            combo.name
        )));
    }
    let units = combo
        .items
        .iter()
        .try_fold(0_i64, |units, item| combined_quantity(units, item.quantity))?;
    if units < 1 {
        return Err(AppError::BadRequest(format!(
            "Combo \"{}\" has no items",
            combo.name
        )));
    }
    let unit_price = combo.discount_price / units;

    let mut cart = state.carts.get(cart_id).await?;
    for item in &combo.items {
        ensure_quantity(item.quantity)?;
        let product = load_product(state, item.product_id).await?;
        let requested =
            combined_quantity(cart.quantity_of(item.product_id, item.variant_id), item.quantity)?;
        ensure_stock(&product, item.variant_id, requested)?;

        let key = LineKey::new(item.product_id, item.variant_id, Some(combo.id));
        match cart.line_mut(key) {
            Some(line) => line.quantity = combined_quantity(line.quantity, item.quantity)?,
            None => cart.items.push(CartItem {
                product_id: item.product_id,
                variant_id: item.variant_id,
                combo_id: Some(combo.id),
                quantity: item.quantity,
                price: unit_price,
                name: format!("{COMBO_PREFIX} {}", product.name),
                image: product.primary_image(),
                variant_name: variant_name(&product, item.variant_id),
            }),
        }
    }

    state.carts.save(&mut cart).await?;
    tracing::debug!(cart_id, %combo_id, "combo added to cart");
    Ok(cart)
}

/// Sets the quantity of the first line holding the product and variant.
/// Zero or less removes that line.
pub async fn update_quantity(
    state: &AppState,
    cart_id: &str,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i64,
) -> AppResult<Cart> {
    let _guard = lock_cart(state, cart_id).await;
    let mut cart = state.carts.get(cart_id).await?;

    let Some(index) = cart
        .items
        .iter()
        .position(|i| i.product_id == product_id && i.variant_id == variant_id)
    else {
        return Err(AppError::not_found("Cart item"));
    };

    if quantity <= 0 {
        cart.items.remove(index);
    } else {
        let product = load_product(state, product_id).await?;
        let elsewhere = cart.quantity_of(product_id, variant_id) - cart.items[index].quantity;
        ensure_stock(&product, variant_id, combined_quantity(elsewhere, quantity)?)?;
        cart.items[index].quantity = quantity;
    }

    state.carts.save(&mut cart).await?;
    tracing::debug!(cart_id, %product_id, quantity, "cart quantity updated");
    Ok(cart)
}

pub async fn remove_item(
    state: &AppState,
    cart_id: &str,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    combo_id: Option<Uuid>,
) -> AppResult<Cart> {
    let _guard = lock_cart(state, cart_id).await;
    let mut cart = state.carts.get(cart_id).await?;
    let key = LineKey::new(product_id, variant_id, combo_id);
    cart.items.retain(|i| i.key() != key);
    state.carts.save(&mut cart).await?;
    tracing::debug!(cart_id, %product_id, "cart item removed");
    Ok(cart)
}

pub async fn clear_cart(state: &AppState, cart_id: &str) -> AppResult<()> {
    let _guard = lock_cart(state, cart_id).await;
    state.carts.clear(cart_id).await?;
    tracing::debug!(cart_id, "cart cleared");
    Ok(())
}

pub async fn get_subtotal(state: &AppState, cart_id: &str) -> AppResult<i64> {
    Ok(state.carts.get(cart_id).await?.subtotal())
}

pub async fn get_shipping_fee(state: &AppState, cart_id: &str) -> AppResult<i64> {
    let subtotal = get_subtotal(state, cart_id).await?;
    Ok(shipping_fee_for(&state.config.shop, subtotal))
}

pub async fn get_total(state: &AppState, cart_id: &str) -> AppResult<i64> {
    let subtotal = get_subtotal(state, cart_id).await?;
    Ok(subtotal + shipping_fee_for(&state.config.shop, subtotal))
}

pub async fn get_item_count(state: &AppState, cart_id: &str) -> AppResult<i64> {
    Ok(state.carts.get(cart_id).await?.item_count())
}

pub async fn is_empty(state: &AppState, cart_id: &str) -> AppResult<bool> {
    Ok(state.carts.get(cart_id).await?.is_empty())
}

pub async fn summary(state: &AppState, cart_id: &str) -> AppResult<CartSummary> {
    let cart = state.carts.get(cart_id).await?;
    let subtotal = cart.subtotal();
    let shipping_fee = shipping_fee_for(&state.config.shop, subtotal);
    Ok(CartSummary {
        subtotal,
        shipping_fee,
        total: subtotal + shipping_fee,
        item_count: cart.item_count(),
        cart,
    })
}

pub async fn validate(state: &AppState, cart_id: &str) -> AppResult<CartValidation> {
    let cart = state.carts.get(cart_id).await?;
    validate_cart(state, &cart).await
}

/// Checks every line against the live catalog and collects all problems.
/// Stock is compared with the cart's combined quantity per product and
/// variant, so split lines cannot pass individually while overdrawing.
pub async fn validate_cart(state: &AppState, cart: &Cart) -> AppResult<CartValidation> {
    let mut errors = Vec::new();
    let mut required: BTreeMap<(Uuid, Option<Uuid>), (i64, String)> = BTreeMap::new();

    for item in &cart.items {
        let entry = required
            .entry((item.product_id, item.variant_id))
            .or_insert_with(|| (0, item.name.clone()));
        entry.0 += item.quantity;
    }

    for ((product_id, variant_id), (quantity, name)) in required {
        match state.products.get_by_id(product_id).await? {
            None => errors.push(format!("Product \"{name}\" no longer exists")),
            Some(product) if !product.active => {
                errors.push(format!("Product \"{}\" is no longer available", product.name))
            }
            Some(product) => {
                let available = stock_in(&product, variant_id);
                if available < quantity {
                    errors.push(format!(
                        "Product \"{}\" only has {available} left",
                        product.name
                    ));
                }
            }
        }
    }

    Ok(CartValidation {
        valid: errors.is_empty(),
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipping_is_free_from_threshold() {
        let shop = ShopConfig::default();
        assert_eq!(shipping_fee_for(&shop, 499_999), 30_000);
        assert_eq!(shipping_fee_for(&shop, 500_000), 0);
        assert_eq!(shipping_fee_for(&shop, 0), 30_000);
    }
}
