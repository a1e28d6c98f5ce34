//! Client configuration

use rust_decimal::Decimal;
use shared::PricingConfig;
use std::path::PathBuf;
use std::str::FromStr;

/// Cart client configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | CART_API_URL | http://localhost:3900 | Cart API base URL |
/// | CART_REQUEST_TIMEOUT_SECS | 30 | Per-request timeout |
/// | CART_STORAGE_PATH | ./data/cart.redb | Local storage file |
/// | CART_FREE_SHIPPING_THRESHOLD | 10000 | Free shipping strictly above this subtotal |
/// | CART_FLAT_SHIPPING_FEE | 100 | Shipping fee below the threshold |
/// | CART_TAX_RATE_PERCENT | 18 | Tax rate |
/// | CART_AUTH_TOKEN | – | Bearer token of a signed-in user |
/// | LOG_LEVEL | info | Log filter |
/// | LOG_DIR | – | Directory for daily log files |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:3900")
    pub base_url: String,

    /// Bearer token for authenticated requests
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Local storage file; `None` keeps guest data in memory only
    pub storage_path: Option<PathBuf>,

    /// Constants for locally recomputed totals
    pub pricing: PricingConfig,

    pub log_level: String,
    pub log_dir: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
            storage_path: None,
            pricing: PricingConfig::default(),
            log_level: "info".into(),
            log_dir: None,
        }
    }

    /// Load configuration from the environment (and a `.env` file, if any)
    ///
    /// Unset or unparsable variables fall back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();
        let defaults = PricingConfig::default();

        Self {
            base_url: std::env::var("CART_API_URL")
                .unwrap_or_else(|_| "http://localhost:3900".into()),
            token: std::env::var("CART_AUTH_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            timeout: env_parse("CART_REQUEST_TIMEOUT_SECS").unwrap_or(30),
            storage_path: Some(
                std::env::var("CART_STORAGE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./data/cart.redb")),
            ),
            pricing: PricingConfig {
                free_shipping_threshold: env_decimal("CART_FREE_SHIPPING_THRESHOLD")
                    .unwrap_or(defaults.free_shipping_threshold),
                flat_shipping_fee: env_decimal("CART_FLAT_SHIPPING_FEE")
                    .unwrap_or(defaults.flat_shipping_fee),
                tax_rate_percent: env_decimal("CART_TAX_RATE_PERCENT")
                    .unwrap_or(defaults.tax_rate_percent),
            },
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:3900")
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_decimal(key: &str) -> Option<Decimal> {
    env_parse::<Decimal>(key).filter(|d| !d.is_sign_negative())
}
