//! Image assets: per-listing uploads and URL resolution.
//!
//! Images live under the blob folder `{owner_id}/{listing_id}`. Uploads run
//! concurrently and the batch fails as a whole on the first error; files
//! already written stay in the store and the folder listing remains the
//! source of truth. Reads resolve a durable public URL when the store has
//! one and fall back to a one-hour signed URL otherwise.

use super::ensure_id;
use crate::errors::{CoreError, CoreResult};
use crate::gateway::{BlobStore, ListOptions, UploadOptions};
use crate::models::{ImageRef, UploadResult};
use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

pub const SIGNED_URL_TTL_SECS: u64 = 60 * 60;

const FOLDER_LIST_LIMIT: usize = 1000;
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Uploads, lists, and signs image assets for listings.
#[derive(Clone)]
pub struct ImageAssets {
    blobs: Arc<dyn BlobStore>,
}

impl ImageAssets {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Upload every local image into the listing's folder, all files
    /// concurrently. Any individual failure fails the batch with
    /// [`CoreError::PartialUpload`]; files written before the failure are
    /// not rolled back.
    pub async fn upload(
        &self,
        owner_id: &str,
        listing_id: &str,
        local_uris: &[String],
    ) -> CoreResult<Vec<UploadResult>> {
        ensure_id(owner_id, "owner id")?;
        ensure_id(listing_id, "listing id")?;

        let folder = folder_path(owner_id, listing_id);
        let uploads = local_uris.iter().map(|uri| self.upload_one(&folder, uri));
        let outcomes = join_all(uploads).await;

        let total = outcomes.len();
        let mut results = Vec::with_capacity(total);
        let mut failed = 0;
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) => {
                    failed += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(source) = first_error {
            return Err(CoreError::PartialUpload {
                failed,
                total,
                source: Box::new(source),
            });
        }
        Ok(results)
    }

    async fn upload_one(&self, folder: &str, uri: &str) -> CoreResult<UploadResult> {
        let base_name = uri.rsplit('/').next().unwrap_or(uri);
        let file_name = timestamped_name(base_name, Utc::now().timestamp_millis());
        let content_type = content_type_for(&file_name);

        let local_path = uri.strip_prefix("file://").unwrap_or(uri);
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(crate::gateway::StoreError::Io)?;
        let size_bytes = bytes.len();

        let path = format!("{folder}/{file_name}");
        self.blobs
            .upload(
                &path,
                Bytes::from(bytes),
                &UploadOptions {
                    content_type: Some(content_type.clone()),
                    upsert: true,
                },
            )
            .await?;

        debug!(%path, size_bytes, "uploaded listing image");
        Ok(UploadResult {
            path,
            content_type,
            size_bytes,
        })
    }

    /// All images in the listing's folder with resolved access URLs.
    /// A file whose signed-URL generation fails is skipped with a warning
    /// rather than failing the whole listing.
    pub async fn list_images(&self, owner_id: &str, listing_id: &str) -> CoreResult<Vec<ImageRef>> {
        ensure_id(owner_id, "owner id")?;
        ensure_id(listing_id, "listing id")?;

        let folder = folder_path(owner_id, listing_id);
        let entries = self
            .blobs
            .list(
                &folder,
                &ListOptions {
                    limit: FOLDER_LIST_LIMIT,
                    offset: 0,
                },
            )
            .await?;

        let mut images = Vec::with_capacity(entries.len());
        for entry in entries {
            let path = format!("{folder}/{}", entry.name);
            if let Some(url) = self.blobs.public_url(&path) {
                images.push(ImageRef {
                    name: entry.name,
                    path,
                    url,
                });
                continue;
            }
            match self.blobs.signed_url(&path, SIGNED_URL_TTL_SECS).await {
                Ok(url) => images.push(ImageRef {
                    name: entry.name,
                    path,
                    url,
                }),
                Err(err) => {
                    warn!(%path, error = %err, "skipping image: signed URL generation failed");
                }
            }
        }
        Ok(images)
    }

    /// First image of the listing, if any.
    pub async fn first_image(
        &self,
        owner_id: &str,
        listing_id: &str,
    ) -> CoreResult<Option<ImageRef>> {
        Ok(self
            .list_images(owner_id, listing_id)
            .await?
            .into_iter()
            .next())
    }
}

pub(crate) fn folder_path(owner_id: &str, listing_id: &str) -> String {
    format!("{owner_id}/{listing_id}")
}

/// Collision-resistant file name: millisecond timestamp plus the original
/// base name, so re-uploading the same file later lands on a new path.
fn timestamped_name(base_name: &str, at_millis: i64) -> String {
    format!("{at_millis}_{base_name}")
}

fn content_type_for(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .and_then(|extension| match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            "heic" => Some("image/heic"),
            "bmp" => Some("image/bmp"),
            _ => None,
        })
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}
