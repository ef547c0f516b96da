//! Capability traits for the remote platform.
//!
//! The core never talks to a concrete backend directly. Services receive
//! these traits as injected `Arc<dyn …>` dependencies, so tests can
//! substitute in-memory fakes and the hosted platform stays swappable.
//! Three capability groups: relational rows ([`RelationalStore`]), blobs
//! ([`BlobStore`]), and auth sessions ([`AuthProvider`]).
//!
//! Local adapters backed by SQLite and the filesystem live in the
//! submodules; they serve development and the integration test suite.

pub mod disk;
pub mod session;
pub mod sqlite;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use thiserror::Error;

pub use disk::{DiskBlobOptions, DiskBlobStore};
pub use session::LocalAuth;
pub use sqlite::SqliteStore;

/// Transport, constraint, or backend failure from the platform.
///
/// The backend's own message is preserved verbatim for diagnostics; callers
/// propagate this unchanged rather than wrapping or rewording it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("invalid blob path `{0}`")]
    InvalidBlobPath(String),

    #[error("blob `{0}` not found")]
    BlobNotFound(String),

    #[error("blob `{0}` already exists")]
    BlobAlreadyExists(String),

    /// Any other backend-reported failure, message kept as received.
    #[error("{0}")]
    Backend(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub(crate) enum Clause {
    Eq(String, Value),
    InSet(String, Vec<Value>),
}

/// Conjunction of equality and in-set predicates over one table, plus an
/// optional result window.
///
/// ```
/// use carmarket::gateway::Filter;
///
/// let filter = Filter::new().eq("user_id", "u1").limit(10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub(crate) clauses: Vec<Clause>,
    pub(crate) limit: Option<usize>,
    pub(crate) offset: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column = value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(column.into(), value.into()));
        self
    }

    /// Require `column` to be one of `values`. An empty set matches no rows.
    pub fn in_set<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.clauses.push(Clause::InSet(column.into(), values));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Relational row capability: equality/in-set selects, return-inserted-row
/// inserts, and filtered deletes. Rows cross the boundary as JSON objects
/// keyed by column name.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Rows matching the filter. An empty result is not an error.
    async fn select(&self, table: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Insert one row and return the stored rows, including store-assigned
    /// columns such as `id` and `created_at`.
    async fn insert(&self, table: &str, row: Value) -> StoreResult<Vec<Value>>;

    /// Delete rows matching the filter; returns the number removed.
    async fn delete(&self, table: &str, filter: &Filter) -> StoreResult<u64>;
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub content_type: Option<String>,

    /// Overwrite an existing blob at the same path instead of failing.
    pub upsert: bool,
}

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// One entry of a blob folder listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BlobEntry {
    /// File name within the folder.
    pub name: String,

    pub size_bytes: i64,

    pub last_modified: Option<DateTime<Utc>>,

    pub content_type: Option<String>,
}

/// Blob capability: path-addressed uploads, folder listing, and URL
/// derivation.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Bytes, options: &UploadOptions) -> StoreResult<()>;

    /// Entries directly under `folder`. A missing folder lists as empty.
    /// Ordering follows the store's enumeration order, not upload order.
    async fn list(&self, folder: &str, options: &ListOptions) -> StoreResult<Vec<BlobEntry>>;

    /// Durable public URL for the path, if the store exposes one. Pure
    /// derivation, no round trip.
    fn public_url(&self, path: &str) -> Option<String>;

    /// Time-limited signed URL. Derived on each call; callers must treat it
    /// as ephemeral and never persist it.
    async fn signed_url(&self, path: &str, ttl_seconds: u64) -> StoreResult<String>;
}

/// An authenticated account session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

pub type SessionCallback = Box<dyn Fn(Option<&Session>) + Send + Sync>;

/// Handle returned by [`AuthProvider::subscribe`]. Dropping it (or calling
/// [`unsubscribe`](SessionSubscription::unsubscribe)) detaches the callback.
pub struct SessionSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SessionSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Auth capability: current-session lookup, change subscription, sign-out.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_session(&self) -> StoreResult<Option<Session>>;

    /// Register `callback` to run on every session change. The callback
    /// receives the new session, or `None` after sign-out.
    fn subscribe(&self, callback: SessionCallback) -> SessionSubscription;

    async fn sign_out(&self) -> StoreResult<()>;
}
