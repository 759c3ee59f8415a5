//! Shared HTTP transport, header assembly, and the CSRF retry funnel.
//!
//! Every REST call in the crate goes through [`execute_with_csrf_retry`]:
//! one place that builds headers, inspects status codes, performs the single
//! re-acquire-and-retry cycle on 403, and logs truncated response bodies.

use std::future::Future;
use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::cookie::Jar;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use tracing::debug;
use url::Url;

use crate::auth::TokenStore;
use crate::config::StorefrontConfig;
use crate::csrf::{CsrfTokenSource, XSRF_HEADER};
use crate::error::{ApiError, Result};

/// Maximum response body length carried in errors and logs.
const MAX_LOGGED_BODY: usize = 500;

/// HTTP transport shared by the cart synchronizer and GraphQL client.
///
/// Owns the `reqwest` client and the cookie jar backing the CSRF accessor,
/// so every request carries the session cookies (`credentials: include`).
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    csrf: CsrfTokenSource,
}

impl Transport {
    /// Build the transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed or the CSRF
    /// bootstrap path cannot be joined to the base URL.
    pub fn new(config: &StorefrontConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        let bootstrap_url = config.csrf_bootstrap_endpoint()?;
        let csrf = CsrfTokenSource::new(http.clone(), jar, bootstrap_url);

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            csrf,
        })
    }

    /// The underlying `reqwest` client.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Base URL of the backend.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The CSRF token accessor bound to this transport's cookie jar.
    #[must_use]
    pub const fn csrf(&self) -> &CsrfTokenSource {
        &self.csrf
    }
}

// =============================================================================
// Header Builder
// =============================================================================

/// Assembles outgoing request headers for mutating calls.
///
/// Pure composition: content type, optional bearer token from the store, and
/// the CSRF token from the accessor (awaited). Retry logic lives with the
/// caller, never here.
pub struct HeaderBuilder {
    tokens: Arc<dyn TokenStore>,
    csrf: CsrfTokenSource,
}

impl HeaderBuilder {
    /// Create a builder over a token store and CSRF accessor.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>, csrf: CsrfTokenSource) -> Self {
        Self { tokens, csrf }
    }

    /// The CSRF accessor this builder consults.
    #[must_use]
    pub const fn csrf(&self) -> &CsrfTokenSource {
        &self.csrf
    }

    /// Build the full header set for an outgoing request.
    pub async fn build(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.tokens.bearer_token() {
            match HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => tracing::warn!("bearer token is not a valid header value: {e}"),
            }
        }

        if let Some(token) = self.csrf.ensure_token().await {
            match HeaderValue::from_str(&token) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(XSRF_HEADER), value);
                }
                Err(e) => tracing::warn!("CSRF token is not a valid header value: {e}"),
            }
        }

        headers
    }
}

// =============================================================================
// CSRF Retry Funnel
// =============================================================================

/// Execute a request with the single re-acquire-and-retry cycle on 403.
///
/// The retry sequence is strictly sequential: the second attempt never starts
/// before the token has been re-acquired and the headers rebuilt. A second
/// 403 propagates as [`ApiError::CsrfRejected`] with no further retries.
pub async fn execute_with_csrf_retry<F, Fut>(headers: &HeaderBuilder, send: F) -> Result<reqwest::Response>
where
    F: Fn(HeaderMap) -> Fut,
    Fut: Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
{
    let first = send(headers.build().await).await?;
    if first.status() != StatusCode::FORBIDDEN {
        return check_status(first).await;
    }

    debug!("CSRF token rejected, re-acquiring and retrying once");
    headers.csrf().refresh_token().await;

    let second = send(headers.build().await).await?;
    if second.status() == StatusCode::FORBIDDEN {
        let body = second.text().await.unwrap_or_default();
        return Err(ApiError::CsrfRejected(truncate_body(&body)));
    }
    check_status(second).await
}

/// Surface non-success statuses as typed failures with the body text.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(
        status = %status,
        body = %truncate_body(&body),
        "storefront API returned non-success status"
    );
    Err(ApiError::Status {
        status,
        body: truncate_body(&body),
    })
}

/// Truncate a response body for logs and error payloads.
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_LOGGED_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body_short_passthrough() {
        assert_eq!(truncate_body("oops"), "oops");
    }

    #[test]
    fn test_truncate_body_caps_length() {
        let long = "x".repeat(2000);
        assert_eq!(truncate_body(&long).len(), MAX_LOGGED_BODY);
    }
}
