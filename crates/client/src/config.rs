//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPLIVE_API_BASE_URL` - Base URL of the ShopLive REST backend
//!
//! ## Optional
//! - `SHOPLIVE_ORDER_EVENTS_URL` - WebSocket endpoint for order status
//!   events (default: base URL with the scheme swapped to ws/wss and path
//!   `/ws/orders`)
//! - `SHOPLIVE_CREDENTIALS_PATH` - Path of the persisted session file
//!   (default: `shoplive-session.json`)
//! - `SHOPLIVE_RECONNECT_DELAY_MS` - Fixed delay between push-channel
//!   reconnect attempts (default: 3000)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_CREDENTIALS_PATH: &str = "shoplive-session.json";
const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;
const DEFAULT_EVENTS_PATH: &str = "/ws/orders";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// ShopLive client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend
    pub api_base_url: Url,
    /// WebSocket endpoint for the order status push topic
    pub order_events_url: Url,
    /// Path of the durable session store file
    pub credentials_path: PathBuf,
    /// Fixed delay between push-channel reconnect attempts
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_url("SHOPLIVE_API_BASE_URL", &get_required_env("SHOPLIVE_API_BASE_URL")?)?;

        let order_events_url = match get_optional_env("SHOPLIVE_ORDER_EVENTS_URL") {
            Some(raw) => parse_url("SHOPLIVE_ORDER_EVENTS_URL", &raw)?,
            None => derive_events_url(&api_base_url)?,
        };

        let credentials_path = PathBuf::from(get_env_or_default(
            "SHOPLIVE_CREDENTIALS_PATH",
            DEFAULT_CREDENTIALS_PATH,
        ));

        let reconnect_delay_ms = get_env_or_default(
            "SHOPLIVE_RECONNECT_DELAY_MS",
            &DEFAULT_RECONNECT_DELAY_MS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPLIVE_RECONNECT_DELAY_MS".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url,
            order_events_url,
            credentials_path,
            reconnect_delay: Duration::from_millis(reconnect_delay_ms),
        })
    }

    /// Build a configuration for a known backend URL (embedding and tests).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the events URL cannot be derived from the
    /// base URL.
    pub fn new(api_base_url: Url) -> Result<Self, ConfigError> {
        let order_events_url = derive_events_url(&api_base_url)?;
        Ok(Self {
            api_base_url,
            order_events_url,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        })
    }

    /// Resolve a relative resource path against the API base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base_url.as_str().trim_end_matches('/'))
    }
}

/// Derive the ws/wss order-events URL from the REST base URL.
fn derive_events_url(base: &Url) -> Result<Url, ConfigError> {
    let mut url = base.clone();
    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme).map_err(|()| {
        ConfigError::InvalidEnvVar(
            "SHOPLIVE_API_BASE_URL".to_string(),
            format!("cannot derive a websocket URL from scheme {}", base.scheme()),
        )
    })?;
    url.set_path(DEFAULT_EVENTS_PATH);
    url.set_query(None);
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a URL-valued variable.
fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ClientConfig::new(Url::parse("https://api.shoplive.test/").unwrap()).unwrap();
        assert_eq!(
            config.endpoint("/customer/my/orders"),
            "https://api.shoplive.test/customer/my/orders"
        );
    }

    #[test]
    fn test_events_url_derived_from_https_base() {
        let config = ClientConfig::new(Url::parse("https://api.shoplive.test").unwrap()).unwrap();
        assert_eq!(config.order_events_url.scheme(), "wss");
        assert_eq!(config.order_events_url.path(), "/ws/orders");
    }

    #[test]
    fn test_events_url_derived_from_http_base() {
        let config = ClientConfig::new(Url::parse("http://127.0.0.1:8080").unwrap()).unwrap();
        assert_eq!(config.order_events_url.scheme(), "ws");
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(Url::parse("http://localhost:8080").unwrap()).unwrap();
        assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(
            config.credentials_path,
            PathBuf::from("shoplive-session.json")
        );
    }
}
