//! CSRF token accessor backed by the shared cookie jar.
//!
//! The backend sets an `XSRF-TOKEN` cookie as a side effect of any GET to a
//! cart/catalog endpoint; the client can only ever read it. Mutating calls
//! echo the value back in the `X-XSRF-TOKEN` header.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, instrument};
use url::Url;

/// Cookie name the backend uses for the CSRF token.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Header name mutating requests must carry.
pub const XSRF_HEADER: &str = "x-xsrf-token";

/// Reads the CSRF token from the cookie jar, bootstrapping it on demand.
#[derive(Clone)]
pub struct CsrfTokenSource {
    http: reqwest::Client,
    jar: Arc<Jar>,
    bootstrap_url: Url,
}

impl CsrfTokenSource {
    /// Create a token source over a client and the jar it was built with.
    ///
    /// `bootstrap_url` is any harmless GET endpoint that provokes the server
    /// into setting the cookie; no dedicated endpoint is guaranteed to exist.
    #[must_use]
    pub const fn new(http: reqwest::Client, jar: Arc<Jar>, bootstrap_url: Url) -> Self {
        Self {
            http,
            jar,
            bootstrap_url,
        }
    }

    /// Read the current token from the cookie jar without any I/O.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.bootstrap_url)?;
        let raw = header.to_str().ok()?;
        raw.split("; ").find_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            if name != XSRF_COOKIE {
                return None;
            }
            // Cookie values arrive percent-encoded; fall back to the raw
            // value if decoding fails.
            Some(
                urlencoding::decode(value)
                    .map_or_else(|_| value.to_string(), std::borrow::Cow::into_owned),
            )
        })
    }

    /// Return the cached token, acquiring one with a single round trip if
    /// absent.
    ///
    /// If the server does not set the cookie, returns `None`; the caller
    /// proceeds without a token and will observe a 403 on the next mutation.
    pub async fn ensure_token(&self) -> Option<String> {
        if let Some(token) = self.token() {
            return Some(token);
        }
        self.bootstrap().await;
        self.token()
    }

    /// Force a re-acquire regardless of the cached value.
    ///
    /// Used by the 403 retry path after the backend rejected the old token.
    pub async fn refresh_token(&self) -> Option<String> {
        self.bootstrap().await;
        self.token()
    }

    /// Issue the side-effect GET that provokes the `Set-Cookie`.
    #[instrument(skip(self))]
    async fn bootstrap(&self) {
        match self.http.get(self.bootstrap_url.clone()).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "CSRF bootstrap request completed");
            }
            Err(e) => {
                // A failed bootstrap degrades to token-less operation.
                debug!("CSRF bootstrap request failed: {e}");
            }
        }
    }
}
