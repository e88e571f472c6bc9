use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    audit::AuditEntry,
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddComboRequest, AddItemRequest, RemoveItemRequest, UpdateQuantityRequest},
        catalog::{
            BannerRequest, CategoryRequest, ComboRequest, CreateProductRequest,
            FeaturedResponse, NewVariant, SetStockRequest, UpdateProductRequest,
        },
        orders::{CheckoutRequest, UpdateStatusRequest},
    },
    models::{
        Banner, Cart, CartItem, CartSummary, CartValidation, Category, Combo, ComboItem,
        CustomerInfo, Order, OrderItem, OrderStats, OrderStatus, Product, StatusEntry,
        UserProfile, UserRole, Variant, VariantType,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, catalog, health, orders},
    services::inventory_service::LowStockEntry,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        catalog::list_products,
        catalog::get_product,
        catalog::list_categories,
        catalog::list_combos,
        catalog::get_combo,
        catalog::list_banners,
        catalog::list_featured,
        catalog::list_category_products,
        cart::get_cart,
        cart::add_item,
        cart::update_quantity,
        cart::remove_item,
        cart::clear_cart,
        cart::add_combo,
        cart::validate_cart,
        orders::checkout,
        orders::list_my_orders,
        orders::get_order_by_code,
        orders::get_order,
        orders::cancel_order,
        admin::list_all_orders,
        admin::order_stats,
        admin::list_pending_orders,
        admin::update_order_status,
        admin::list_low_stock,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::add_variant,
        admin::set_stock,
        admin::create_category,
        admin::update_category,
        admin::delete_category,
        admin::create_banner,
        admin::update_banner,
        admin::delete_banner,
        admin::create_combo,
        admin::update_combo,
        admin::delete_combo,
        admin::list_audit_logs
    ),
    components(
        schemas(
            FeaturedResponse,
            UserProfile,
            UserRole,
            Product,
            Variant,
            VariantType,
            Category,
            Combo,
            ComboItem,
            Banner,
            Cart,
            CartItem,
            CartSummary,
            CartValidation,
            Order,
            OrderItem,
            OrderStatus,
            StatusEntry,
            CustomerInfo,
            OrderStats,
            LowStockEntry,
            AuditEntry,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddItemRequest,
            UpdateQuantityRequest,
            RemoveItemRequest,
            AddComboRequest,
            CheckoutRequest,
            UpdateStatusRequest,
            CreateProductRequest,
            UpdateProductRequest,
            NewVariant,
            SetStockRequest,
            CategoryRequest,
            BannerRequest,
            ComboRequest,
            Meta,
            ApiResponse<Product>,
            ApiResponse<Order>,
            ApiResponse<CartSummary>,
            ApiResponse<OrderStats>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Catalog", description = "Storefront catalog endpoints"),
        (name = "Cart", description = "Session cart endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Admin", description = "Back-office endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
