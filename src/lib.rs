//! Data-access core for a vehicle marketplace app.
//!
//! Thin, cache-backed services over a remote platform that provides
//! relational rows, blob storage, and auth sessions. The platform is an
//! injected capability ([`gateway`]); local SQLite and filesystem adapters
//! back development and the integration tests.
//!
//! - [`services::ListingRepository`]: CRUD over the `car` entity
//! - [`services::ImageAssets`]: per-listing image upload, listing, signing
//! - [`services::Favorites`]: user↔listing relation with toggle semantics
//! - [`services::ListingPublisher`]: the create-listing-with-photos flow
//! - [`cache::QueryCache`]: staleness windows, invalidation, optimistic
//!   rollback
//! - [`client::MarketClient`]: the facade UI code talks to

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod services;

pub use client::MarketClient;
pub use config::PlatformConfig;
pub use errors::{CoreError, CoreResult};
