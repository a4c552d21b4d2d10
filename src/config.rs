//! Runtime settings read from the environment (`.env` is loaded first).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopifySettings {
    /// `my-shop.myshopify.com`
    pub shop: String,
    pub access_token: String,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    pub shopify: ShopifySettings,
    pub nats_url: Option<String>,
    pub recent_order_limit: usize,
    /// Sessions untouched for this many minutes are evicted.
    pub session_idle_minutes: i64,
}

impl Settings {
    pub const DEFAULT_PORT: u16 = 8083;
    pub const DEFAULT_API_VERSION: &'static str = "2024-10";
    pub const DEFAULT_RECENT_ORDER_LIMIT: usize = 5;
    pub const DEFAULT_SESSION_IDLE_MINUTES: i64 = 60;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            port: parse_or(var("PORT"), "PORT", Self::DEFAULT_PORT)?,
            shopify: ShopifySettings {
                shop: required("SHOPIFY_SHOP")?,
                access_token: required("SHOPIFY_ACCESS_TOKEN")?,
                api_version: var("SHOPIFY_API_VERSION").unwrap_or_else(|| Self::DEFAULT_API_VERSION.to_string()),
            },
            nats_url: var("NATS_URL"),
            recent_order_limit: parse_or(var("RECENT_ORDER_LIMIT"), "RECENT_ORDER_LIMIT", Self::DEFAULT_RECENT_ORDER_LIMIT)?,
            session_idle_minutes: match parse_or(var("SESSION_IDLE_MINUTES"), "SESSION_IDLE_MINUTES", Self::DEFAULT_SESSION_IDLE_MINUTES)? {
                m if m > 0 => m,
                m => return Err(ConfigError::Invalid { name: "SESSION_IDLE_MINUTES", value: m.to_string() }),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}
