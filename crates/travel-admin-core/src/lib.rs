//! Core library for the travel admin dashboard backend.
//!
//! Holds the pieces that keep the dashboard working when the cloud does not:
//!
//! - [`auth::TokenManager`]: the upstream access-token cache
//! - [`gateway::DataGateway`]: direct, proxied, then local/mock data access
//! - [`store::LocalStore`]: the on-disk offline copy of each collection
//! - [`api::ApiClient`]: HTTP access to the admin backend
//! - [`config::Config`]: client configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod models;
pub mod store;

pub use api::{ApiClient, ApiError};
pub use auth::TokenManager;
pub use config::Config;
pub use gateway::{DataGateway, FetchOutcome, Tier};
pub use models::{CloudReply, CloudRequest, Collection, Stats};
pub use store::LocalStore;
