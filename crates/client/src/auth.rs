//! Bearer-token storage and authentication context.
//!
//! The bearer token lives under a fixed key in a [`TokenStore`]; its absence
//! never blocks guest cart operations. [`AuthContext`] is an explicit injected
//! context object: created once at application root, resolved after the
//! initial user load, and reset only on logout.

use std::path::PathBuf;
use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use marketfront_core::UserId;

/// Fixed storage key for the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

// =============================================================================
// Token Store
// =============================================================================

/// Persistent storage for the bearer token.
///
/// Implementations must be safe to share across concurrent operations; the
/// header builder reads the token on every mutating call.
pub trait TokenStore: Send + Sync {
    /// Read the stored bearer token, if any.
    fn bearer_token(&self) -> Option<SecretString>;

    /// Replace the stored bearer token.
    fn set_bearer_token(&self, token: SecretString);

    /// Remove the stored bearer token.
    fn clear(&self);
}

/// In-memory token store for tests and short-lived sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<SecretString>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn bearer_token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set_bearer_token(&self, token: SecretString) {
        *self
            .token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token);
    }

    fn clear(&self) {
        *self
            .token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

/// File-backed token store.
///
/// Persists the token as a single line in a file named [`TOKEN_KEY`] under
/// the given directory, surviving client restarts.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store rooted at the given directory.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            path: dir.join(TOKEN_KEY),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn bearer_token(&self) -> Option<SecretString> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(SecretString::from(trimmed.to_string()))
    }

    fn set_bearer_token(&self, token: SecretString) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.path, token.expose_secret()) {
            tracing::warn!("failed to persist bearer token: {e}");
        }
    }

    fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("failed to remove bearer token file: {e}");
        }
    }
}

// =============================================================================
// Auth Context
// =============================================================================

/// Role attached to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Admin,
}

impl UserRole {
    /// Landing page to send an already-authenticated user to.
    #[must_use]
    pub const fn landing_page(self) -> &'static str {
        match self {
            Self::Customer => "/",
            Self::Admin => "/admin",
        }
    }
}

/// Minimal identity of the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's backend ID.
    pub id: UserId,
    /// User's email address.
    pub email: String,
    /// User's role.
    pub role: UserRole,
}

/// Authentication state as observed by route guards.
#[derive(Debug, Clone, Default)]
pub enum AuthStatus {
    /// Initial user load has not resolved yet.
    #[default]
    Loading,
    /// No authenticated session.
    Anonymous,
    /// Authenticated session with a known user.
    Authenticated(CurrentUser),
}

impl AuthStatus {
    /// Whether this status carries an authenticated user.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Shared authentication context.
///
/// Starts in [`AuthStatus::Loading`]; resolved exactly once by the initial
/// user load and thereafter mutated only by login and logout.
#[derive(Default)]
pub struct AuthContext {
    status: RwLock<AuthStatus>,
}

impl AuthContext {
    /// Create a context in the `Loading` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current status.
    #[must_use]
    pub fn snapshot(&self) -> AuthStatus {
        self.status
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Resolve the context to an authenticated or anonymous state.
    pub fn resolve(&self, status: AuthStatus) {
        *self
            .status
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = status;
    }

    /// Log out: clear the stored token and reset to `Anonymous`.
    pub fn logout(&self, tokens: &dyn TokenStore) {
        tokens.clear();
        self.resolve(AuthStatus::Anonymous);
    }
}
