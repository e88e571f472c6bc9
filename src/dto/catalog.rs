use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Combo, ComboItem, Product, VariantType};

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewVariant {
    pub name: String,
    #[serde(rename = "type")]
    pub variant_type: VariantType,
    pub value: String,
    pub stock: i64,
    #[serde(default)]
    pub price_modifier: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub images: Vec<String>,
    pub category_id: Uuid,
    #[serde(default)]
    pub variants: Vec<NewVariant>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<Uuid>,
    pub featured: Option<bool>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStockRequest {
    pub stock: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BannerRequest {
    pub title: String,
    pub subtitle: Option<String>,
    pub image: String,
    pub link: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ComboRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub items: Vec<ComboItem>,
    pub discount_price: i64,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeaturedResponse {
    pub products: Vec<Product>,
    pub combos: Vec<Combo>,
}
