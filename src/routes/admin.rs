use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, list_audit},
    dto::{
        catalog::{
            BannerRequest, CategoryRequest, ComboRequest, CreateProductRequest, NewVariant,
            SetStockRequest, UpdateProductRequest,
        },
        orders::{StatsQuery, UpdateStatusRequest},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{Banner, Category, Combo, Order, OrderStats, OrderStatus, Product},
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, OrderListQuery},
    services::{
        catalog_service,
        inventory_service::{self, LowStockEntry},
        order_service,
    },
    state::AppState,
};

const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/stats", get(order_stats))
        .route("/orders/pending", get(list_pending_orders))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/inventory/low-stock", get(list_low_stock))
        .route("/products", post(create_product))
        .route("/products/{id}", patch(update_product).delete(delete_product))
        .route("/products/{id}/variants", post(add_variant))
        .route("/products/{id}/variants/{variant_id}/stock", put(set_stock))
        .route("/categories", post(create_category))
        .route("/categories/{id}", put(update_category).delete(delete_category))
        .route("/banners", post(create_banner))
        .route("/banners/{id}", put(update_banner).delete(delete_banner))
        .route("/combos", post(create_combo))
        .route("/combos/{id}", put(update_combo).delete(delete_combo))
        .route("/audit-logs", get(list_audit_logs))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Filter all orders (admin only)", body = ApiResponse<Vec<Order>>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let (page, per_page) = query.pagination().normalize();
    let orders =
        order_service::filter(&state, &query.filter(), page, per_page, &user.actor()).await?;
    Ok(Json(ApiResponse::page("OK", orders)))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Order statistics for the dashboard", body = ApiResponse<OrderStats>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn order_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<ApiResponse<OrderStats>>> {
    ensure_admin(&user.actor())?;
    let stats = order_service::get_stats(&state, query.date_from, query.date_to).await?;
    Ok(Json(ApiResponse::success("OK", stats, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/pending",
    responses(
        (status = 200, description = "Orders waiting to be processed, oldest first", body = ApiResponse<Vec<Order>>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_pending_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    ensure_admin(&user.actor())?;
    let mut orders = state.orders.get_by_status(OrderStatus::Pending).await?;
    orders.sort_by_key(|o| o.created_at);
    Ok(Json(ApiResponse::success("OK", orders, Some(Meta::empty()))))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Update order status", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Invalid transition or insufficient stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order =
        order_service::update_status(&state, id, payload.status, payload.note, &user.actor())
            .await?;
    Ok(Json(ApiResponse::success("Status updated", order, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Variants at or below the threshold", body = ApiResponse<Vec<LowStockEntry>>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<Vec<LowStockEntry>>>> {
    ensure_admin(&user.actor())?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let entries = inventory_service::low_stock(&state, threshold).await?;
    Ok(Json(ApiResponse::success("OK", entries, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Create product", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Slug already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = catalog_service::create_product(&state, &user.actor(), payload).await?;
    Ok(Json(ApiResponse::success("Product created", product, Some(Meta::empty()))))
}

#[utoipa::path(
    patch,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Update product", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = catalog_service::update_product(&state, &user.actor(), id, payload).await?;
    Ok(Json(ApiResponse::success("Product updated", product, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Delete product"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    catalog_service::delete_product(&state, &user.actor(), id).await?;
    Ok(Json(ApiResponse::success("Product deleted", id, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/admin/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = NewVariant,
    responses(
        (status = 200, description = "Add a variant", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn add_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewVariant>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = catalog_service::add_variant(&state, &user.actor(), id, payload).await?;
    Ok(Json(ApiResponse::success("Variant added", product, Some(Meta::empty()))))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}/variants/{variant_id}/stock",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("variant_id" = Uuid, Path, description = "Variant ID")
    ),
    request_body = SetStockRequest,
    responses(
        (status = 200, description = "Set variant stock", body = ApiResponse<Product>),
        (status = 400, description = "Negative stock"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, variant_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SetStockRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product =
        catalog_service::set_stock(&state, &user.actor(), id, variant_id, payload.stock).await?;
    Ok(Json(ApiResponse::success("Stock updated", product, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Create category", body = ApiResponse<Category>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Slug already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let category = catalog_service::create_category(&state, &user.actor(), payload).await?;
    Ok(Json(ApiResponse::success("Category created", category, Some(Meta::empty()))))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Replace category", body = ApiResponse<Category>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let category = catalog_service::update_category(&state, &user.actor(), id, payload).await?;
    Ok(Json(ApiResponse::success("Category updated", category, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Delete category"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    catalog_service::delete_category(&state, &user.actor(), id).await?;
    Ok(Json(ApiResponse::success("Category deleted", id, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/admin/banners",
    request_body = BannerRequest,
    responses(
        (status = 200, description = "Create banner", body = ApiResponse<Banner>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_banner(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BannerRequest>,
) -> AppResult<Json<ApiResponse<Banner>>> {
    let banner = catalog_service::create_banner(&state, &user.actor(), payload).await?;
    Ok(Json(ApiResponse::success("Banner created", banner, Some(Meta::empty()))))
}

#[utoipa::path(
    put,
    path = "/api/admin/banners/{id}",
    params(("id" = Uuid, Path, description = "Banner ID")),
    request_body = BannerRequest,
    responses(
        (status = 200, description = "Replace banner", body = ApiResponse<Banner>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_banner(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BannerRequest>,
) -> AppResult<Json<ApiResponse<Banner>>> {
    let banner = catalog_service::update_banner(&state, &user.actor(), id, payload).await?;
    Ok(Json(ApiResponse::success("Banner updated", banner, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/api/admin/banners/{id}",
    params(("id" = Uuid, Path, description = "Banner ID")),
    responses(
        (status = 200, description = "Delete banner"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_banner(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    catalog_service::delete_banner(&state, &user.actor(), id).await?;
    Ok(Json(ApiResponse::success("Banner deleted", id, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/admin/combos",
    request_body = ComboRequest,
    responses(
        (status = 200, description = "Create combo", body = ApiResponse<Combo>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Slug already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ComboRequest>,
) -> AppResult<Json<ApiResponse<Combo>>> {
    let combo = catalog_service::create_combo(&state, &user.actor(), payload).await?;
    Ok(Json(ApiResponse::success("Combo created", combo, Some(Meta::empty()))))
}

#[utoipa::path(
    put,
    path = "/api/admin/combos/{id}",
    params(("id" = Uuid, Path, description = "Combo ID")),
    request_body = ComboRequest,
    responses(
        (status = 200, description = "Replace combo", body = ApiResponse<Combo>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ComboRequest>,
) -> AppResult<Json<ApiResponse<Combo>>> {
    let combo = catalog_service::update_combo(&state, &user.actor(), id, payload).await?;
    Ok(Json(ApiResponse::success("Combo updated", combo, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/api/admin/combos/{id}",
    params(("id" = Uuid, Path, description = "Combo ID")),
    responses(
        (status = 200, description = "Delete combo"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    catalog_service::delete_combo(&state, &user.actor(), id).await?;
    Ok(Json(ApiResponse::success("Combo deleted", id, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    responses(
        (status = 200, description = "Audit trail", body = ApiResponse<Vec<AuditEntry>>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<AuditEntry>>>> {
    ensure_admin(&user.actor())?;
    let mut entries = list_audit(&state.store).await?;
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(ApiResponse::success("OK", entries, Some(Meta::empty()))))
}
