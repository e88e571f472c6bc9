use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::CheckoutRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::{ApiResponse, Meta},
    services::order_service,
    state::AppState,
};

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout))
        .route("/mine", get(list_my_orders))
        .route("/code/{order_code}", get(get_order_by_code))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", post(cancel_order))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order placed from the cart", body = ApiResponse<Order>),
        (status = 400, description = "Cart is empty"),
        (status = 422, description = "Cart failed validation")
    ),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let actor = user.map(|u| u.actor());
    let order =
        order_service::create_order(&state, &payload.cart_id, actor.as_ref(), payload.customer)
            .await?;
    Ok(Json(ApiResponse::success("Order placed", order, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/orders/mine",
    responses(
        (status = 200, description = "Orders of the current user, newest first", body = ApiResponse<Vec<Order>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = order_service::get_my_orders(&state, &user.actor()).await?;
    let total = orders.len() as i64;
    Ok(Json(ApiResponse::success(
        "OK",
        orders,
        Some(Meta::new(1, total.max(1), total)),
    )))
}

#[utoipa::path(
    get,
    path = "/api/orders/code/{order_code}",
    params(("order_code" = String, Path, description = "Order code, e.g. NOEL-2024-0001")),
    responses(
        (status = 200, description = "Order by code", body = ApiResponse<Order>),
        (status = 404, description = "Not Found")
    ),
    tag = "Orders"
)]
pub async fn get_order_by_code(
    State(state): State<AppState>,
    Path(order_code): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::get_by_code(&state, &order_code).await?;
    Ok(Json(ApiResponse::success("OK", order, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order detail", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::get_by_id(&state, id, &user.actor()).await?;
    Ok(Json(ApiResponse::success("OK", order, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order can no longer be cancelled")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::cancel_order(&state, id, &user.actor()).await?;
    Ok(Json(ApiResponse::success("Order cancelled", order, Some(Meta::empty()))))
}
