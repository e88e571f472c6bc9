use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VariantType {
    Color,
    Size,
}

/// A sellable configuration of a product carrying its own stock and price delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Variant {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub variant_type: VariantType,
    /// Raw color code or size label.
    pub value: String,
    pub stock: i64,
    pub price_modifier: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub images: Vec<String>,
    pub category_id: Uuid,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub featured: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn variant(&self, variant_id: Uuid) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    pub fn variant_mut(&mut self, variant_id: Uuid) -> Option<&mut Variant> {
        self.variants.iter_mut().find(|v| v.id == variant_id)
    }

    pub fn total_stock(&self) -> i64 {
        self.variants.iter().map(|v| v.stock).sum()
    }

    pub fn primary_image(&self) -> String {
        self.images.first().cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComboItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i64,
}

/// A bundle of products sold together at a discounted price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Combo {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub items: Vec<ComboItem>,
    pub original_price: i64,
    pub discount_price: i64,
    pub discount_percent: i32,
    #[serde(default)]
    pub featured: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Banner {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub image: String,
    pub link: Option<String>,
    pub order: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    /// Defaults to active products only.
    pub active: Option<bool>,
}

/// Identity of a cart line: adding an item with the same key merges quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
}

impl LineKey {
    pub fn new(product_id: Uuid, variant_id: Option<Uuid>, combo_id: Option<Uuid>) -> Self {
        Self {
            product_id,
            variant_id,
            combo_id,
        }
    }
}

/// Denormalized snapshot of a chosen product/variant; `price` is the unit
/// price captured when the line was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub quantity: i64,
    pub price: i64,
    pub name: String,
    pub image: String,
    pub variant_name: Option<String>,
}

impl CartItem {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.variant_id, self.combo_id)
    }

    pub fn line_total(&self) -> i64 {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    /// Session identifier the cart belongs to.
    pub id: String,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn line(&self, key: LineKey) -> Option<&CartItem> {
        self.items.iter().find(|i| i.key() == key)
    }

    pub fn line_mut(&mut self, key: LineKey) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.key() == key)
    }

    /// Quantity of a product/variant held across all lines, combo lines included.
    pub fn quantity_of(&self, product_id: Uuid, variant_id: Option<Uuid>) -> i64 {
        self.items
            .iter()
            .filter(|i| i.product_id == product_id && i.variant_id == variant_id)
            .map(|i| i.quantity)
            .sum()
    }

    pub fn subtotal(&self) -> i64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CartValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Cart contents with the derived money figures.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartSummary {
    pub cart: Cart,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub total: i64,
    pub item_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn allowed_targets(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Processing, OrderStatus::Cancelled],
            OrderStatus::Processing => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

/// Shipping contact captured at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerInfo {
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub province: String,
    pub district: String,
    pub ward: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub name: String,
    pub variant_name: Option<String>,
    pub quantity: i64,
    pub price: i64,
    pub image: String,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            variant_id: item.variant_id,
            combo_id: item.combo_id,
            name: item.name.clone(),
            variant_name: item.variant_name.clone(),
            quantity: item.quantity,
            price: item.price,
            image: item.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_code: String,
    pub user_id: Option<Uuid>,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub total: i64,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Matches order code, customer name or phone.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_revenue: i64,
    pub pending_orders: i64,
    pub processing_orders: i64,
    pub shipped_orders: i64,
    pub delivered_orders: i64,
    pub cancelled_orders: i64,
    pub average_order_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a [`User`], without credentials.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub phone: String,
    pub full_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            phone: user.phone,
            full_name: user.full_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn customer(id: Uuid) -> Self {
        Self {
            id,
            role: UserRole::Customer,
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self {
            id,
            role: UserRole::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    /// Cuts one page out of an already filtered and sorted list.
    pub fn from_vec(items: Vec<T>, page: i64, limit: i64) -> Self {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let total = items.len() as i64;
        let total_pages = (total + limit - 1) / limit;
        let offset = ((page - 1) * limit) as usize;
        let data = items
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();
        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_matches_lifecycle() {
        use OrderStatus::*;
        let expected: [(OrderStatus, &[OrderStatus]); 5] = [
            (Pending, &[Processing, Cancelled]),
            (Processing, &[Shipped, Cancelled]),
            (Shipped, &[Delivered]),
            (Delivered, &[]),
            (Cancelled, &[]),
        ];

        for (from, allowed) in expected {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn self_transitions_are_rejected() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn paginate_slices_and_counts_pages() {
        let page = Paginated::from_vec((1..=45).collect::<Vec<_>>(), 3, 20);
        assert_eq!(page.data, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);

        let page = Paginated::from_vec(vec![1, 2, 3], 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.data, vec![1]);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
