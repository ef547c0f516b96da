//! Image assets attached to a listing.

use serde::{Deserialize, Serialize};

/// Outcome of a single file upload within a batch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UploadResult {
    /// Full blob path: `{owner_id}/{listing_id}/{file_name}`.
    pub path: String,

    /// Content type sent to the store (derived from the file extension).
    pub content_type: String,

    pub size_bytes: usize,
}

/// A listable image with a resolved access URL.
///
/// The URL is either a durable public one or a time-limited signed one.
/// Signed URLs are derived per read and must never be persisted; cache them
/// only within the staleness window of the request that produced them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageRef {
    /// File name within the listing's folder.
    pub name: String,

    /// Full blob path.
    pub path: String,

    pub url: String,
}
