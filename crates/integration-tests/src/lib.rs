//! Hermetic integration tests for the Marketfront client.
//!
//! Every test spins up an in-process mock backend on an ephemeral port and
//! drives the real client against it; no external services are required.
//!
//! # Test Categories
//!
//! - `cart_sync` - cart fetch/mutate round trips and the CSRF retry path
//! - `checkout_flow` - login, user load, and order placement over GraphQL
//!
//! Run with: `cargo test -p marketfront-integration-tests`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
