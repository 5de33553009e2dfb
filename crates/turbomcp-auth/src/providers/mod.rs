//! Authentication Providers
//!
//! This module contains various authentication provider implementations.

pub mod api_key;

pub use api_key::ApiKeyProvider;
