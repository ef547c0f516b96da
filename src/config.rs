//! Configuration for the local platform adapters.
//!
//! Read from environment variables with development defaults. The hosted
//! platform's endpoint and credentials belong to the app's bootstrap layer,
//! not to this crate.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// SQLite URL for the relational adapter.
    pub database_url: String,

    /// Root directory for the disk blob adapter.
    pub storage_dir: String,

    /// Base URL prepended to blob paths when deriving access URLs.
    pub blob_base_url: String,

    /// Whether blobs are served publicly (no signed-URL fallback needed).
    pub blob_public: bool,

    /// Secret mixed into signed-URL tokens.
    pub signing_secret: String,
}

impl PlatformConfig {
    /// Parse environment variables into a config, defaulting anything unset.
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("CARMARKET_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/carmarket.db".into());
        let storage_dir =
            env::var("CARMARKET_STORAGE_DIR").unwrap_or_else(|_| "./data/images".into());
        let blob_base_url = env::var("CARMARKET_BLOB_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/storage".into());

        let blob_public = match env::var("CARMARKET_BLOB_PUBLIC") {
            Ok(value) => value
                .parse::<bool>()
                .with_context(|| format!("parsing CARMARKET_BLOB_PUBLIC value `{}`", value))?,
            Err(env::VarError::NotPresent) => false,
            Err(err) => return Err(err).context("reading CARMARKET_BLOB_PUBLIC"),
        };

        let signing_secret =
            env::var("CARMARKET_SIGNING_SECRET").unwrap_or_else(|_| "dev-secret".into());

        Ok(Self {
            database_url,
            storage_dir,
            blob_base_url,
            blob_public,
            signing_secret,
        })
    }
}
