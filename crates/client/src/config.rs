//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKETFRONT_BASE_URL` - Base URL of the storefront backend
//!
//! ## Optional
//! - `MARKETFRONT_GRAPHQL_PATH` - GraphQL endpoint path (default: /graphql)
//! - `MARKETFRONT_CSRF_BOOTSTRAP_PATH` - GET path whose side effect sets the
//!   `XSRF-TOKEN` cookie (default: /api/cart; no dedicated endpoint exists)
//! - `MARKETFRONT_GRAPHQL_TIMEOUT_SECS` - GraphQL operation timeout (default: 30)
//! - `MARKETFRONT_MIN_QUANTITY` - Minimum cart line quantity (default: 1)
//! - `MARKETFRONT_TOKEN_DIR` - Directory holding the persisted bearer token
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the storefront backend.
    pub base_url: Url,
    /// Path of the GraphQL endpoint, relative to `base_url`.
    pub graphql_path: String,
    /// GET path whose only purpose is provoking the CSRF cookie.
    pub csrf_bootstrap_path: String,
    /// Timeout applied to GraphQL operations only; REST calls have none.
    pub graphql_timeout: Duration,
    /// Minimum allowed cart line quantity.
    pub min_quantity: u32,
    /// Directory where the bearer token is persisted between runs.
    pub token_dir: Option<PathBuf>,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

impl StorefrontConfig {
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

        let base_url = get_required_env("MARKETFRONT_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETFRONT_BASE_URL".to_string(), e.to_string())
            })?;
        let graphql_path = get_env_or_default("MARKETFRONT_GRAPHQL_PATH", "/graphql");
        let csrf_bootstrap_path =
            get_env_or_default("MARKETFRONT_CSRF_BOOTSTRAP_PATH", "/api/cart");
        let graphql_timeout_secs = get_env_or_default("MARKETFRONT_GRAPHQL_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "MARKETFRONT_GRAPHQL_TIMEOUT_SECS".to_string(),
                    e.to_string(),
                )
            })?;
        let min_quantity = get_env_or_default("MARKETFRONT_MIN_QUANTITY", "1")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETFRONT_MIN_QUANTITY".to_string(), e.to_string())
            })?;
        let token_dir = get_optional_env("MARKETFRONT_TOKEN_DIR").map(PathBuf::from);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            base_url,
            graphql_path,
            csrf_bootstrap_path,
            graphql_timeout: Duration::from_secs(graphql_timeout_secs),
            min_quantity,
            token_dir,
            sentry_dsn,
        })
    }

    /// Build a configuration for a known base URL with all defaults.
    ///
    /// Used by tests and embedders that do not configure via environment.
    #[must_use]
    pub fn for_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            graphql_path: "/graphql".to_string(),
            csrf_bootstrap_path: "/api/cart".to_string(),
            graphql_timeout: Duration::from_secs(30),
            min_quantity: 1,
            token_dir: None,
            sentry_dsn: None,
        }
    }

    /// Full URL of the GraphQL endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured path cannot be joined to the base URL.
    pub fn graphql_endpoint(&self) -> Result<Url, url::ParseError> {
        self.base_url.join(&self.graphql_path)
    }

    /// Full URL of the CSRF bootstrap endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured path cannot be joined to the base URL.
    pub fn csrf_bootstrap_endpoint(&self) -> Result<Url, url::ParseError> {
        self.base_url.join(&self.csrf_bootstrap_path)
    }
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_for_base_url_defaults() {
        let config = StorefrontConfig::for_base_url("http://localhost:8080".parse().unwrap());
        assert_eq!(config.graphql_path, "/graphql");
        assert_eq!(config.csrf_bootstrap_path, "/api/cart");
        assert_eq!(config.graphql_timeout, Duration::from_secs(30));
        assert_eq!(config.min_quantity, 1);
    }

    #[test]
    fn test_graphql_endpoint_join() {
        let config = StorefrontConfig::for_base_url("http://localhost:8080".parse().unwrap());
        assert_eq!(
            config.graphql_endpoint().unwrap().as_str(),
            "http://localhost:8080/graphql"
        );
    }

    #[test]
    fn test_csrf_bootstrap_endpoint_join() {
        let config = StorefrontConfig::for_base_url("https://shop.example.com".parse().unwrap());
        assert_eq!(
            config.csrf_bootstrap_endpoint().unwrap().as_str(),
            "https://shop.example.com/api/cart"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("MARKETFRONT_BASE_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: MARKETFRONT_BASE_URL"
        );
    }
}
