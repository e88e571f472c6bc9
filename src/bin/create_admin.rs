use std::sync::Arc;

use seasonal_storefront::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::auth::RegisterRequest,
    models::UserRole,
    services::auth_service::create_user,
    state::AppState,
    store::PgStore,
};

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{name} is not set"))
}

/// Bootstraps a back-office account from ADMIN_EMAIL, ADMIN_PHONE,
/// ADMIN_NAME and ADMIN_PASSWORD.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required to create an admin"))?;

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    let state = AppState::new(Arc::new(PgStore::new(create_orm_conn(pool))), config);

    let payload = RegisterRequest {
        email: required("ADMIN_EMAIL")?,
        phone: required("ADMIN_PHONE")?,
        full_name: std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
        password: required("ADMIN_PASSWORD")?,
    };
    let admin = create_user(&state, payload, UserRole::Admin)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    println!("Admin created: {} ({})", admin.email, admin.id);
    Ok(())
}
