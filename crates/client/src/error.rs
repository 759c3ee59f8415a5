//! Unified error handling for storefront API operations.
//!
//! All client operations return `Result<T, ApiError>`. The only automatic
//! recovery anywhere in the crate is the single retry after a CSRF 403; every
//! other failure propagates to the caller, which owns user-facing messaging.

use serde::Deserialize;
use thiserror::Error;

use marketfront_core::CartItemId;

use crate::cart::decode::CartDecodeError;

/// Errors that can occur when talking to the storefront backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection refused, DNS, timeout).
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status with no CSRF involvement.
    #[error("request failed with status {status}: {body}")]
    Status {
        /// HTTP status code returned by the backend.
        status: reqwest::StatusCode,
        /// Response body text, truncated for logging.
        body: String,
    },

    /// The mutation was rejected with 403 twice: once with the original
    /// token and once more after a forced re-acquire.
    #[error("CSRF token rejected after retry: {0}")]
    CsrfRejected(String),

    /// A cart item lookup missed local state; no request was issued.
    #[error("cart item not found: {0}")]
    ItemNotFound(CartItemId),

    /// Form-level validation failure, resolved before any request.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The server payload did not match the expected cart schema.
    #[error("failed to decode cart payload: {0}")]
    Decode(#[from] CartDecodeError),

    /// A malformed URL was produced from configuration.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// GraphQL operation returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQl(Vec<GraphQlError>),
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

/// A GraphQL error returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQlError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_not_found_display() {
        let err = ApiError::ItemNotFound(CartItemId::from("item-42-0"));
        assert_eq!(err.to_string(), "cart item not found: item-42-0");
    }

    #[test]
    fn test_status_display() {
        let err = ApiError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "upstream down".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request failed with status 502 Bad Gateway: upstream down"
        );
    }

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQlError {
                message: "Field not found".to_string(),
                path: vec![],
            },
            GraphQlError {
                message: "Invalid ID".to_string(),
                path: vec![],
            },
        ];
        let err = ApiError::GraphQl(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_graphql_error_path_only() {
        let errors = vec![GraphQlError {
            message: String::new(),
            path: vec![
                serde_json::Value::String("placeOrder".to_string()),
                serde_json::Value::Number(0.into()),
            ],
        }];
        let err = ApiError::GraphQl(errors);
        assert_eq!(err.to_string(), "GraphQL errors: path: placeOrder.0");
    }

    #[test]
    fn test_graphql_error_empty_vec() {
        let err = ApiError::GraphQl(vec![]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: (no error details provided)"
        );
    }
}
