//! Error taxonomy for the marketplace data-access core.
//!
//! Gateway adapters surface [`StoreError`](crate::gateway::StoreError); the
//! service layer wraps it here and adds the caller-facing categories. Store
//! messages are preserved verbatim for diagnostics; nothing is swallowed or
//! retried below the cache layer.

use crate::gateway::StoreError;
use crate::services::validation::ValidationErrors;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Caller passed an empty or malformed identifier. Raised before any
    /// network call; a programming error at the call site, never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No active session where one is required.
    #[error("no active session")]
    Unauthenticated,

    /// A requested single entity does not exist. Distinct from an empty
    /// collection result, which is not an error.
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    /// The store accepted an insert but returned no row.
    #[error("insert into `{table}` returned no row")]
    NotInserted { table: &'static str },

    /// The store returned a row the domain model cannot decode.
    #[error("malformed `{table}` row from store: {detail}")]
    MalformedRow { table: &'static str, detail: String },

    /// Transport, auth, or constraint failure from the relational/blob store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// One or more files of a multi-image upload batch failed. Files written
    /// before the failure are not rolled back.
    #[error("{failed} of {total} image uploads failed")]
    PartialUpload {
        failed: usize,
        total: usize,
        #[source]
        source: Box<CoreError>,
    },

    /// A listing draft failed field validation.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// True for errors that indicate a missing entity rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}
