use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::cart::{AddComboRequest, AddItemRequest, RemoveItemRequest, UpdateQuantityRequest},
    error::AppResult,
    models::{Cart, CartSummary, CartValidation},
    response::{ApiResponse, Meta},
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{cart_id}", get(get_cart).delete(clear_cart))
        .route(
            "/{cart_id}/items",
            post(add_item).patch(update_quantity).delete(remove_item),
        )
        .route("/{cart_id}/combos", post(add_combo))
        .route("/{cart_id}/validate", get(validate_cart))
}

#[utoipa::path(
    get,
    path = "/api/carts/{cart_id}",
    params(("cart_id" = String, Path, description = "Session cart id")),
    responses(
        (status = 200, description = "Cart with totals", body = ApiResponse<CartSummary>)
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let summary = cart_service::summary(&state, &cart_id).await?;
    Ok(Json(ApiResponse::success("OK", summary, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/carts/{cart_id}/items",
    params(("cart_id" = String, Path, description = "Session cart id")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Item added", body = ApiResponse<Cart>),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock")
    ),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart_service::add_item(
        &state,
        &cart_id,
        payload.product_id,
        payload.variant_id,
        payload.quantity,
    )
    .await?;
    Ok(Json(ApiResponse::success("Item added", cart, Some(Meta::empty()))))
}

#[utoipa::path(
    patch,
    path = "/api/carts/{cart_id}/items",
    params(("cart_id" = String, Path, description = "Session cart id")),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity updated", body = ApiResponse<Cart>),
        (status = 404, description = "Line not found"),
        (status = 409, description = "Insufficient stock")
    ),
    tag = "Cart"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart_service::update_quantity(
        &state,
        &cart_id,
        payload.product_id,
        payload.variant_id,
        payload.quantity,
    )
    .await?;
    Ok(Json(ApiResponse::success("Quantity updated", cart, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{cart_id}/items",
    params(("cart_id" = String, Path, description = "Session cart id")),
    request_body = RemoveItemRequest,
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<Cart>)
    ),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Json(payload): Json<RemoveItemRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart_service::remove_item(
        &state,
        &cart_id,
        payload.product_id,
        payload.variant_id,
        payload.combo_id,
    )
    .await?;
    Ok(Json(ApiResponse::success("Item removed", cart, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{cart_id}",
    params(("cart_id" = String, Path, description = "Session cart id")),
    responses(
        (status = 200, description = "Cart cleared", body = ApiResponse<Cart>)
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    cart_service::clear_cart(&state, &cart_id).await?;
    Ok(Json(ApiResponse::success(
        "Cart cleared",
        Cart::empty(cart_id),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/carts/{cart_id}/combos",
    params(("cart_id" = String, Path, description = "Session cart id")),
    request_body = AddComboRequest,
    responses(
        (status = 200, description = "Combo added", body = ApiResponse<Cart>),
        (status = 404, description = "Combo or product not found"),
        (status = 409, description = "Insufficient stock")
    ),
    tag = "Cart"
)]
pub async fn add_combo(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Json(payload): Json<AddComboRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart_service::add_combo(&state, &cart_id, payload.combo_id).await?;
    Ok(Json(ApiResponse::success("Combo added", cart, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/carts/{cart_id}/validate",
    params(("cart_id" = String, Path, description = "Session cart id")),
    responses(
        (status = 200, description = "Checkout readiness of the cart", body = ApiResponse<CartValidation>)
    ),
    tag = "Cart"
)]
pub async fn validate_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> AppResult<Json<ApiResponse<CartValidation>>> {
    let validation = cart_service::validate(&state, &cart_id).await?;
    Ok(Json(ApiResponse::success("OK", validation, Some(Meta::empty()))))
}
