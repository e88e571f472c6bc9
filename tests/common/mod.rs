#![allow(dead_code)]

use chrono::Utc;
use seasonal_storefront::{
    config::AppConfig,
    models::{Actor, Category, Combo, ComboItem, CustomerInfo, Product, Variant, VariantType},
    state::AppState,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub fn state() -> AppState {
    AppState::in_memory(AppConfig::ephemeral(JWT_SECRET))
}

pub fn admin() -> Actor {
    Actor::admin(Uuid::new_v4())
}

pub fn customer_info() -> CustomerInfo {
    CustomerInfo {
        full_name: "Nguyen Van A".into(),
        phone: "0901234567".into(),
        email: Some("a@example.com".into()),
        address: "12 Ly Thuong Kiet".into(),
        province: "Ha Noi".into(),
        district: "Hoan Kiem".into(),
        ward: "Hang Bai".into(),
        note: None,
    }
}

pub async fn seed_category(state: &AppState) -> anyhow::Result<Category> {
    let category = Category {
        id: Uuid::new_v4(),
        name: "Ornaments".into(),
        slug: format!("ornaments-{}", Uuid::new_v4()),
        description: String::new(),
        image: String::new(),
        order: 1,
    };
    Ok(state.categories.create(&category).await?)
}

/// A product whose variants are given as (name, stock, price modifier).
pub async fn seed_product(
    state: &AppState,
    name: &str,
    price: i64,
    variants: &[(&str, i64, i64)],
) -> anyhow::Result<Product> {
    let category = seed_category(state).await?;
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4(),
        name: name.into(),
        slug: format!("{}-{}", name.to_lowercase().replace(' ', "-"), Uuid::new_v4()),
        description: format!("{name} for the holidays"),
        price,
        images: vec![format!("/img/{}.jpg", name.to_lowercase())],
        category_id: category.id,
        variants: variants
            .iter()
            .map(|(variant, stock, modifier)| Variant {
                id: Uuid::new_v4(),
                name: variant.to_string(),
                variant_type: VariantType::Size,
                value: variant.to_string(),
                stock: *stock,
                price_modifier: *modifier,
            })
            .collect(),
        featured: false,
        active: true,
        created_at: now,
        updated_at: now,
    };
    Ok(state.products.create(&product).await?)
}

pub async fn seed_combo(
    state: &AppState,
    items: Vec<ComboItem>,
    discount_price: i64,
) -> anyhow::Result<Combo> {
    let now = Utc::now();
    let combo = Combo {
        id: Uuid::new_v4(),
        name: "Cozy Bundle".into(),
        slug: format!("cozy-bundle-{}", Uuid::new_v4()),
        description: String::new(),
        images: vec![],
        items,
        original_price: 0,
        discount_price,
        discount_percent: 0,
        featured: true,
        active: true,
        created_at: now,
        updated_at: now,
    };
    Ok(state.combos.create(&combo).await?)
}

pub async fn variant_stock(state: &AppState, product: &Product, index: usize) -> anyhow::Result<i64> {
    let product = state
        .products
        .get_by_id(product.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product vanished"))?;
    Ok(product.variants[index].stock)
}
