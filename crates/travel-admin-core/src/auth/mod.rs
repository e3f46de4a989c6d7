//! Upstream credential management.
//!
//! This module provides:
//! - `TokenManager`: the access-token cache with single-flight refresh
//! - `TokenStore`: the on-disk copy of the last issued token
//! - `CredentialStore`: app secrets in the OS keychain via keyring
//!
//! Tokens are considered expired five minutes before the lifetime the
//! platform reports.

pub mod credentials;
pub mod token;

pub use credentials::CredentialStore;
pub use token::{
    AccessToken, AppCredentials, TokenGrant, TokenIssuer, TokenManager, TokenStore,
    TOKEN_EXPIRY_MARGIN_SECS,
};
