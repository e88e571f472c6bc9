use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::catalog::FeaturedResponse,
    error::{AppError, AppResult},
    models::{Banner, Category, Combo, Product},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery},
    services::catalog_service,
    state::AppState,
};

const FEATURED_LIMIT: usize = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{slug}", get(get_product))
        .route("/featured", get(list_featured))
        .route("/categories", get(list_categories))
        .route("/categories/{slug}/products", get(list_category_products))
        .route("/combos", get(list_combos))
        .route("/combos/{slug}", get(get_combo))
        .route("/banners", get(list_banners))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Active products matching the filter", body = ApiResponse<Vec<Product>>)
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let (page, per_page) = query.pagination().normalize();
    let products = catalog_service::list_products(&state, &query.filter(), page, per_page).await?;
    Ok(Json(ApiResponse::page("OK", products)))
}

#[utoipa::path(
    get,
    path = "/api/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product detail", body = ApiResponse<Product>),
        (status = 404, description = "Not Found")
    ),
    tag = "Catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = catalog_service::get_product_by_slug(&state, &slug).await?;
    Ok(Json(ApiResponse::success("OK", product, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Categories in display order", body = ApiResponse<Vec<Category>>)
    ),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let categories = state.categories.get_ordered().await?;
    Ok(Json(ApiResponse::success("OK", categories, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/categories/{slug}/products",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Active products of the category", body = ApiResponse<Vec<Product>>),
        (status = 404, description = "Not Found")
    ),
    tag = "Catalog"
)]
pub async fn list_category_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let category = state
        .categories
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    let products = state.products.get_by_category(category.id).await?;
    Ok(Json(ApiResponse::success("OK", products, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/featured",
    responses(
        (status = 200, description = "Featured products and combos for the home page", body = ApiResponse<FeaturedResponse>)
    ),
    tag = "Catalog"
)]
pub async fn list_featured(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<FeaturedResponse>>> {
    let featured = FeaturedResponse {
        products: state.products.get_featured(Some(FEATURED_LIMIT)).await?,
        combos: state.combos.get_featured(Some(FEATURED_LIMIT)).await?,
    };
    Ok(Json(ApiResponse::success("OK", featured, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/combos",
    params(Pagination),
    responses(
        (status = 200, description = "Active combos", body = ApiResponse<Vec<Combo>>)
    ),
    tag = "Catalog"
)]
pub async fn list_combos(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Vec<Combo>>>> {
    let (page, per_page) = pagination.normalize();
    let combos = state.combos.get_active(page, per_page).await?;
    Ok(Json(ApiResponse::page("OK", combos)))
}

#[utoipa::path(
    get,
    path = "/api/combos/{slug}",
    params(("slug" = String, Path, description = "Combo slug")),
    responses(
        (status = 200, description = "Combo detail", body = ApiResponse<Combo>),
        (status = 404, description = "Not Found")
    ),
    tag = "Catalog"
)]
pub async fn get_combo(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<Combo>>> {
    let combo = catalog_service::get_combo_by_slug(&state, &slug).await?;
    Ok(Json(ApiResponse::success("OK", combo, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/banners",
    responses(
        (status = 200, description = "Active banners in display order", body = ApiResponse<Vec<Banner>>)
    ),
    tag = "Catalog"
)]
pub async fn list_banners(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Banner>>>> {
    let banners = state.banners.get_active().await?;
    Ok(Json(ApiResponse::success("OK", banners, Some(Meta::empty()))))
}
