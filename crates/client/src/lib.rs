//! Marketfront storefront client.
//!
//! Typed client for a REST/GraphQL e-commerce backend: cart synchronization
//! with CSRF-protected mutations, checkout step progression, and auth-gated
//! route guards.
//!
//! # Architecture
//!
//! - `reqwest` with a shared cookie jar, so every call carries the session
//!   cookies and the CSRF accessor can read the `XSRF-TOKEN` cookie
//! - REST for cart operations, GraphQL for auth/profile/checkout
//! - The server is the source of truth: every successful cart mutation
//!   re-fetches the canonical cart and replaces local state wholesale
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marketfront_client::auth::MemoryTokenStore;
//! use marketfront_client::cart::CartSynchronizer;
//! use marketfront_client::config::StorefrontConfig;
//! use marketfront_client::http::Transport;
//! use marketfront_core::ProductId;
//!
//! let config = StorefrontConfig::from_env()?;
//! let transport = Transport::new(&config)?;
//! let tokens = Arc::new(MemoryTokenStore::new());
//! let cart = CartSynchronizer::new(&transport, &config, tokens);
//!
//! cart.ensure_initial_fetch().await?;
//! let cart_state = cart.add_item(ProductId::new(42), 2, None).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod csrf;
pub mod error;
pub mod graphql;
pub mod guards;
pub mod http;

pub use error::{ApiError, Result};
