use std::env;

/// Pricing and numbering rules of the shop. Single currency, amounts are whole units.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    pub order_code_prefix: String,
    pub shipping_fee: i64,
    pub free_shipping_threshold: i64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            order_code_prefix: "NOEL".to_string(),
            shipping_fee: 30_000,
            free_shipping_threshold: 500_000,
        }
    }
}

impl ShopConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let order_code_prefix = env::var("ORDER_CODE_PREFIX")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(defaults.order_code_prefix);
        let shipping_fee = env::var("SHIPPING_FEE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults.shipping_fee);
        let free_shipping_threshold = env::var("FREE_SHIPPING_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults.free_shipping_threshold);
        Self {
            order_code_prefix,
            shipping_fee,
            free_shipping_threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub shop: ShopConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            shop: ShopConfig::from_env(),
        })
    }

    /// In-memory configuration used by tests and local experiments.
    pub fn ephemeral(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: jwt_secret.into(),
            shop: ShopConfig::default(),
        }
    }
}
