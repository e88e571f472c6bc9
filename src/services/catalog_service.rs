use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::catalog::{
        BannerRequest, CategoryRequest, ComboRequest, CreateProductRequest, NewVariant,
        UpdateProductRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::ensure_admin,
    models::{Actor, Banner, Category, Combo, ComboItem, Paginated, Product, ProductFilter, Variant},
    services::inventory_service::{self, price_of, stock_in},
    state::AppState,
    store::Swap,
};

async fn audit(state: &AppState, actor: &Actor, action: &str, resource: &str, id: Uuid) {
    if let Err(err) = log_audit(
        &state.store,
        Some(actor.id),
        action,
        Some(resource),
        Some(serde_json::json!({ "id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
}

fn ensure_non_negative(field: &str, value: i64) -> AppResult<()> {
    if value < 0 {
        return Err(AppError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(())
}

fn build_variant(variant: NewVariant) -> AppResult<Variant> {
    ensure_non_negative("stock", variant.stock)?;
    Ok(Variant {
        id: Uuid::new_v4(),
        name: variant.name,
        variant_type: variant.variant_type,
        value: variant.value,
        stock: variant.stock,
        price_modifier: variant.price_modifier,
    })
}

async fn load_product(state: &AppState, product_id: Uuid) -> AppResult<Product> {
    state
        .products
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))
}

/// Stores an edited product unless its stock changed after `seen` was read.
async fn save_product(state: &AppState, product: &Product, seen: &[Variant]) -> AppResult<Product> {
    match state.products.save_if_variants(product, seen).await? {
        Swap::Done(product) => Ok(product),
        Swap::Missing => Err(AppError::not_found("Product")),
        Swap::Stale => Err(AppError::Conflict(format!(
            "stock of \"{}\" changed meanwhile, try again",
            product.name
        ))),
    }
}

pub async fn list_products(
    state: &AppState,
    filter: &ProductFilter,
    page: i64,
    limit: i64,
) -> AppResult<Paginated<Product>> {
    state.products.filter(filter, page, limit).await
}

pub async fn get_product_by_slug(state: &AppState, slug: &str) -> AppResult<Product> {
    state
        .products
        .get_by_slug(slug)
        .await?
        .filter(|p| p.active)
        .ok_or_else(|| AppError::not_found("Product"))
}

pub async fn get_combo_by_slug(state: &AppState, slug: &str) -> AppResult<Combo> {
    state
        .combos
        .get_by_slug(slug)
        .await?
        .filter(|c| c.active)
        .ok_or_else(|| AppError::not_found("Combo"))
}

/// Current catalog value of a combo's contents; items that no longer
/// resolve to a product are left out.
pub async fn combo_original_price(state: &AppState, items: &[ComboItem]) -> AppResult<i64> {
    let mut total = 0;
    for item in items {
        if let Some(product) = state.products.get_by_id(item.product_id).await? {
            total += price_of(&product, item.variant_id) * item.quantity;
        }
    }
    Ok(total)
}

pub async fn combo_in_stock(state: &AppState, combo_id: Uuid) -> AppResult<bool> {
    let combo = state
        .combos
        .get_by_id(combo_id)
        .await?
        .ok_or_else(|| AppError::not_found("Combo"))?;
    for item in &combo.items {
        let available = match state.products.get_by_id(item.product_id).await? {
            Some(product) => stock_in(&product, item.variant_id),
            None => 0,
        };
        if available < item.quantity {
            return Ok(false);
        }
    }
    Ok(true)
}

pub async fn create_product(
    state: &AppState,
    actor: &Actor,
    payload: CreateProductRequest,
) -> AppResult<Product> {
    ensure_admin(actor)?;
    ensure_non_negative("price", payload.price)?;
    if state.products.get_by_slug(&payload.slug).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "slug \"{}\" is already used",
            payload.slug
        )));
    }
    if state.categories.get_by_id(payload.category_id).await?.is_none() {
        return Err(AppError::not_found("Category"));
    }

    let variants = payload
        .variants
        .into_iter()
        .map(build_variant)
        .collect::<AppResult<Vec<_>>>()?;
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4(),
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        price: payload.price,
        images: payload.images,
        category_id: payload.category_id,
        variants,
        featured: payload.featured,
        active: payload.active,
        created_at: now,
        updated_at: now,
    };

    let product = state.products.create(&product).await?;
    audit(state, actor, "product_create", "products", product.id).await;
    Ok(product)
}

pub async fn update_product(
    state: &AppState,
    actor: &Actor,
    product_id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<Product> {
    ensure_admin(actor)?;
    let _guard = inventory_service::lock_products(state, [product_id]).await;
    let mut product = load_product(state, product_id).await?;
    let seen = product.variants.clone();

    if let Some(slug) = payload.slug {
        if slug != product.slug && state.products.get_by_slug(&slug).await?.is_some() {
            return Err(AppError::Conflict(format!("slug \"{slug}\" is already used")));
        }
        product.slug = slug;
    }
    if let Some(category_id) = payload.category_id {
        if state.categories.get_by_id(category_id).await?.is_none() {
            return Err(AppError::not_found("Category"));
        }
        product.category_id = category_id;
    }
    if let Some(price) = payload.price {
        ensure_non_negative("price", price)?;
        product.price = price;
    }
    if let Some(name) = payload.name {
        product.name = name;
    }
    if let Some(description) = payload.description {
        product.description = description;
    }
    if let Some(images) = payload.images {
        product.images = images;
    }
    if let Some(featured) = payload.featured {
        product.featured = featured;
    }
    if let Some(active) = payload.active {
        product.active = active;
    }
    product.updated_at = Utc::now();

    let product = save_product(state, &product, &seen).await?;
    audit(state, actor, "product_update", "products", product.id).await;
    Ok(product)
}

/// Placed orders keep their own snapshot of the product, so deletion does
/// not touch them.
pub async fn delete_product(state: &AppState, actor: &Actor, product_id: Uuid) -> AppResult<()> {
    ensure_admin(actor)?;
    let _guard = inventory_service::lock_products(state, [product_id]).await;
    if !state.products.delete(product_id).await? {
        return Err(AppError::not_found("Product"));
    }
    audit(state, actor, "product_delete", "products", product_id).await;
    Ok(())
}

pub async fn add_variant(
    state: &AppState,
    actor: &Actor,
    product_id: Uuid,
    variant: NewVariant,
) -> AppResult<Product> {
    ensure_admin(actor)?;
    let variant = build_variant(variant)?;
    let _guard = inventory_service::lock_products(state, [product_id]).await;
    let mut product = load_product(state, product_id).await?;
    let seen = product.variants.clone();
    product.variants.push(variant);
    product.updated_at = Utc::now();

    let product = save_product(state, &product, &seen).await?;
    audit(state, actor, "variant_create", "products", product.id).await;
    Ok(product)
}

/// Overwrites a variant's stock with an absolute count.
pub async fn set_stock(
    state: &AppState,
    actor: &Actor,
    product_id: Uuid,
    variant_id: Uuid,
    stock: i64,
) -> AppResult<Product> {
    ensure_admin(actor)?;
    ensure_non_negative("stock", stock)?;
    let _guard = inventory_service::lock_products(state, [product_id]).await;
    let mut product = load_product(state, product_id).await?;
    let seen = product.variants.clone();
    let variant = product
        .variant_mut(variant_id)
        .ok_or_else(|| AppError::not_found("Variant"))?;
    let previous = variant.stock;
    variant.stock = stock;
    product.updated_at = Utc::now();

    let product = save_product(state, &product, &seen).await?;
    tracing::info!(%product_id, %variant_id, previous, stock, "stock set");
    audit(state, actor, "stock_set", "products", product.id).await;
    Ok(product)
}

pub async fn create_category(
    state: &AppState,
    actor: &Actor,
    payload: CategoryRequest,
) -> AppResult<Category> {
    ensure_admin(actor)?;
    if state.categories.get_by_slug(&payload.slug).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "slug \"{}\" is already used",
            payload.slug
        )));
    }
    let category = Category {
        id: Uuid::new_v4(),
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        image: payload.image,
        order: payload.order,
    };
    let category = state.categories.create(&category).await?;
    audit(state, actor, "category_create", "categories", category.id).await;
    Ok(category)
}

pub async fn update_category(
    state: &AppState,
    actor: &Actor,
    category_id: Uuid,
    payload: CategoryRequest,
) -> AppResult<Category> {
    ensure_admin(actor)?;
    let existing = state
        .categories
        .get_by_id(category_id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    if payload.slug != existing.slug && state.categories.get_by_slug(&payload.slug).await?.is_some()
    {
        return Err(AppError::Conflict(format!(
            "slug \"{}\" is already used",
            payload.slug
        )));
    }
    let category = Category {
        id: category_id,
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        image: payload.image,
        order: payload.order,
    };
    state
        .categories
        .save(&category)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))
}

pub async fn delete_category(state: &AppState, actor: &Actor, category_id: Uuid) -> AppResult<()> {
    ensure_admin(actor)?;
    if !state.categories.delete(category_id).await? {
        return Err(AppError::not_found("Category"));
    }
    audit(state, actor, "category_delete", "categories", category_id).await;
    Ok(())
}

pub async fn create_banner(
    state: &AppState,
    actor: &Actor,
    payload: BannerRequest,
) -> AppResult<Banner> {
    ensure_admin(actor)?;
    let now = Utc::now();
    let banner = Banner {
        id: Uuid::new_v4(),
        title: payload.title,
        subtitle: payload.subtitle,
        image: payload.image,
        link: payload.link,
        order: payload.order,
        active: payload.active,
        created_at: now,
        updated_at: now,
    };
    state.banners.create(&banner).await
}

pub async fn update_banner(
    state: &AppState,
    actor: &Actor,
    banner_id: Uuid,
    payload: BannerRequest,
) -> AppResult<Banner> {
    ensure_admin(actor)?;
    let existing = state
        .banners
        .get_by_id(banner_id)
        .await?
        .ok_or_else(|| AppError::not_found("Banner"))?;
    let banner = Banner {
        title: payload.title,
        subtitle: payload.subtitle,
        image: payload.image,
        link: payload.link,
        order: payload.order,
        active: payload.active,
        updated_at: Utc::now(),
        ..existing
    };
    state
        .banners
        .save(&banner)
        .await?
        .ok_or_else(|| AppError::not_found("Banner"))
}

pub async fn delete_banner(state: &AppState, actor: &Actor, banner_id: Uuid) -> AppResult<()> {
    ensure_admin(actor)?;
    if !state.banners.delete(banner_id).await? {
        return Err(AppError::not_found("Banner"));
    }
    Ok(())
}

fn discount_percent(original: i64, discounted: i64) -> i32 {
    if original <= 0 || discounted >= original {
        return 0;
    }
    (((original - discounted) * 100) / original) as i32
}

async fn build_combo(state: &AppState, id: Uuid, payload: ComboRequest) -> AppResult<Combo> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("A combo needs at least one item".into()));
    }
    ensure_non_negative("discount_price", payload.discount_price)?;
    for item in &payload.items {
        if item.quantity < 1 {
            return Err(AppError::BadRequest("Combo item quantity must be at least 1".into()));
        }
        let product = load_product(state, item.product_id).await?;
        if item.variant_id.is_some_and(|id| product.variant(id).is_none()) {
            return Err(AppError::not_found("Variant"));
        }
    }

    let original_price = combo_original_price(state, &payload.items).await?;
    let now = Utc::now();
    Ok(Combo {
        id,
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        images: payload.images,
        items: payload.items,
        original_price,
        discount_price: payload.discount_price,
        discount_percent: discount_percent(original_price, payload.discount_price),
        featured: payload.featured,
        active: payload.active,
        created_at: now,
        updated_at: now,
    })
}

pub async fn create_combo(
    state: &AppState,
    actor: &Actor,
    payload: ComboRequest,
) -> AppResult<Combo> {
    ensure_admin(actor)?;
    if state.combos.get_by_slug(&payload.slug).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "slug \"{}\" is already used",
            payload.slug
        )));
    }
    let combo = build_combo(state, Uuid::new_v4(), payload).await?;
    let combo = state.combos.create(&combo).await?;
    audit(state, actor, "combo_create", "combos", combo.id).await;
    Ok(combo)
}

pub async fn update_combo(
    state: &AppState,
    actor: &Actor,
    combo_id: Uuid,
    payload: ComboRequest,
) -> AppResult<Combo> {
    ensure_admin(actor)?;
    let existing = state
        .combos
        .get_by_id(combo_id)
        .await?
        .ok_or_else(|| AppError::not_found("Combo"))?;
    if payload.slug != existing.slug && state.combos.get_by_slug(&payload.slug).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "slug \"{}\" is already used",
            payload.slug
        )));
    }
    let mut combo = build_combo(state, combo_id, payload).await?;
    combo.created_at = existing.created_at;
    state
        .combos
        .save(&combo)
        .await?
        .ok_or_else(|| AppError::not_found("Combo"))
}

pub async fn delete_combo(state: &AppState, actor: &Actor, combo_id: Uuid) -> AppResult<()> {
    ensure_admin(actor)?;
    if !state.combos.delete(combo_id).await? {
        return Err(AppError::not_found("Combo"));
    }
    audit(state, actor, "combo_delete", "combos", combo_id).await;
    Ok(())
}
