mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use seasonal_storefront::{
    models::{ComboItem, UserRole},
    routes::build_app,
    services::auth_service::issue_token,
};

use common::{JWT_SECRET, customer_info, seed_combo, seed_product, state, variant_stock};

async fn send(app: &Router, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_and_fallback() -> anyhow::Result<()> {
    let app = build_app(state());

    let (status, body) = send(&app, get("/health", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = send(&app, get("/nope", None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/nope");
    Ok(())
}

#[tokio::test]
async fn guest_checkout_then_admin_processing() -> anyhow::Result<()> {
    let state = state();
    let product = seed_product(&state, "Porcelain Angel", 150_000, &[("White", 4, 0)]).await?;
    let app = build_app(state.clone());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/carts/guest-1/items",
            json!({ "product_id": product.id, "variant_id": product.variants[0].id, "quantity": 3 }),
            None,
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/carts/guest-1/items",
            json!({ "product_id": product.id, "variant_id": product.variants[0].id, "quantity": 2 }),
            None,
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/orders",
            json!({ "cart_id": "guest-1", "customer": customer_info() }),
            None,
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order_id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["total"], 450_000 + 30_000);

    let status_uri = format!("/api/admin/orders/{order_id}/status");
    let (status, _) = send(
        &app,
        json_request("PATCH", &status_uri, json!({ "status": "processing" }), None),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let customer_token = issue_token(JWT_SECRET, Uuid::new_v4(), UserRole::Customer)?;
    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &status_uri,
            json!({ "status": "processing" }),
            Some(&customer_token),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = issue_token(JWT_SECRET, Uuid::new_v4(), UserRole::Admin)?;
    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &status_uri,
            json!({ "status": "processing", "note": "packed" }),
            Some(&admin_token),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "processing");
    assert_eq!(variant_stock(&state, &product, 0).await?, 1);

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &status_uri,
            json!({ "status": "delivered" }),
            Some(&admin_token),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = send(&app, get("/api/admin/orders/stats", Some(&admin_token))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["processing_orders"], 1);
    Ok(())
}

#[tokio::test]
async fn registered_customer_sees_own_orders() -> anyhow::Result<()> {
    let state = state();
    let product = seed_product(&state, "Wool Hat", 90_000, &[("Grey", 10, 0)]).await?;
    let app = build_app(state);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            json!({
                "email": "mai@example.com",
                "phone": "0912345678",
                "full_name": "Tran Thi Mai",
                "password": "s3cret-pass"
            }),
            None,
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "identifier": "0912345678", "password": "s3cret-pass" }),
            None,
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["data"]["token"]
        .as_str()
        .and_then(|t| t.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();

    send(
        &app,
        json_request(
            "POST",
            "/api/carts/mai/items",
            json!({ "product_id": product.id, "variant_id": product.variants[0].id, "quantity": 1 }),
            None,
        ),
    )
    .await?;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/orders",
            json!({ "cart_id": "mai", "customer": customer_info() }),
            Some(&token),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, body) = send(&app, get("/api/orders/mine", Some(&token))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let cancel_uri = format!("/api/orders/{order_id}/cancel");
    let (status, _) = send(&app, json_request("POST", &cancel_uri, json!({}), None)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, json_request("POST", &cancel_uri, json!({}), Some(&token))).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, _) = send(&app, json_request("POST", &cancel_uri, json!({}), Some(&token))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "identifier": "mai@example.com", "password": "wrong" }),
            None,
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn storefront_listings_and_pending_queue() -> anyhow::Result<()> {
    let state = state();
    let product = seed_product(&state, "Red Scarf", 120_000, &[("Long", 6, 0)]).await?;
    seed_combo(
        &state,
        vec![ComboItem {
            product_id: product.id,
            variant_id: Some(product.variants[0].id),
            quantity: 2,
        }],
        200_000,
    )
    .await?;
    let category = state
        .categories
        .get_by_id(product.category_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("category missing"))?;
    let app = build_app(state.clone());

    let (status, body) = send(&app, get("/api/featured", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["products"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["data"]["combos"].as_array().map(Vec::len), Some(1));

    let uri = format!("/api/categories/{}/products", category.slug);
    let (status, body) = send(&app, get(&uri, None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], product.id.to_string());

    let (status, _) = send(&app, get("/api/categories/missing/products", None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &app,
        json_request(
            "POST",
            "/api/carts/queue/items",
            json!({ "product_id": product.id, "variant_id": product.variants[0].id, "quantity": 1 }),
            None,
        ),
    )
    .await?;
    send(
        &app,
        json_request(
            "POST",
            "/api/orders",
            json!({ "cart_id": "queue", "customer": customer_info() }),
            None,
        ),
    )
    .await?;

    let admin_token = issue_token(JWT_SECRET, Uuid::new_v4(), UserRole::Admin)?;
    let (status, body) = send(&app, get("/api/admin/orders/pending", Some(&admin_token))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}
