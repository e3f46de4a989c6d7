//! HTTP client module for the admin backend.
//!
//! This module provides the `ApiClient` for calling the backend's health,
//! token-issuance, direct collection and cloud-function proxy endpoints.
//! `ApiClient` also implements `TokenIssuer`, so it can feed the token cache.

pub mod client;
pub mod error;

pub use client::{ApiClient, HealthStatus, CLOUD_FUNCTION_NAME};
pub use error::ApiError;
