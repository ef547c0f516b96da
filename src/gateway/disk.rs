//! Local blob adapter backed by the filesystem.
//!
//! Implements [`BlobStore`] with payloads under `base_path/{path}`. Writes
//! go through a temp file, fsync, and rename so a crashed upload never
//! leaves a half-written blob at its final path. Access URLs are derived
//! from a configured base: durable public URLs when the store is marked
//! public, time-limited token-signed URLs otherwise.

use super::{BlobEntry, BlobStore, ListOptions, StoreError, StoreResult, UploadOptions};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_BLOB_PATH_LEN: usize = 1024;

#[derive(Debug, Clone)]
pub struct DiskBlobOptions {
    /// Base URL prepended to blob paths when deriving access URLs.
    pub base_url: String,

    /// Whether blobs are reachable without a token. When false,
    /// `public_url` returns `None` and callers fall back to signed URLs.
    pub public: bool,

    /// Secret mixed into signed-URL tokens.
    pub signing_secret: String,
}

/// Filesystem-backed [`BlobStore`].
pub struct DiskBlobStore {
    base_path: PathBuf,
    options: DiskBlobOptions,
}

impl DiskBlobStore {
    pub fn new(base_path: impl Into<PathBuf>, options: DiskBlobOptions) -> Self {
        Self {
            base_path: base_path.into(),
            options,
        }
    }

    /// Basic path validation to avoid trivial traversal vectors. Rejects
    /// empty paths, leading slashes, `..` segments, and control characters.
    fn ensure_path_safe(&self, path: &str) -> StoreResult<()> {
        if path.is_empty() || path.len() > MAX_BLOB_PATH_LEN {
            return Err(StoreError::InvalidBlobPath(path.to_string()));
        }
        if path.starts_with('/') || path.contains("..") {
            return Err(StoreError::InvalidBlobPath(path.to_string()));
        }
        if path
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidBlobPath(path.to_string()));
        }
        Ok(())
    }

    fn blob_path(&self, path: &str) -> PathBuf {
        let mut full = self.base_path.clone();
        full.push(path);
        full
    }

    fn token_for(&self, path: &str, expires: i64) -> String {
        let digest = md5::compute(format!(
            "{}|{}|{}",
            self.options.signing_secret, path, expires
        ));
        URL_SAFE_NO_PAD.encode(digest.0)
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn upload(&self, path: &str, bytes: Bytes, options: &UploadOptions) -> StoreResult<()> {
        self.ensure_path_safe(path)?;

        let file_path = self.blob_path(path);
        if !options.upsert && fs::try_exists(&file_path).await? {
            return Err(StoreError::BlobAlreadyExists(path.to_string()));
        }

        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| StoreError::InvalidBlobPath(path.to_string()))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        let write = async {
            file.write_all(&bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(())
        };
        if let Err(err) = write.await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        debug!(path, size = bytes.len(), "stored blob");
        Ok(())
    }

    async fn list(&self, folder: &str, options: &ListOptions) -> StoreResult<Vec<BlobEntry>> {
        self.ensure_path_safe(folder)?;

        let dir_path = self.blob_path(folder);
        let mut dir = match fs::read_dir(&dir_path).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::Io(err)),
        };

        let mut entries = Vec::new();
        while let Some(dirent) = dir.next_entry().await? {
            let name = dirent.file_name().to_string_lossy().into_owned();
            // Skip subfolders and in-flight temp files.
            if name.starts_with(".tmp-") {
                continue;
            }
            let metadata = dirent.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
            let content_type = content_type_from_name(&name);
            entries.push(BlobEntry {
                name,
                size_bytes: metadata.len() as i64,
                last_modified,
                content_type,
            });
        }

        // Enumeration order is filesystem-dependent; sort by name so the
        // listing contract is stable.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let windowed = entries
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect();
        Ok(windowed)
    }

    fn public_url(&self, path: &str) -> Option<String> {
        if !self.options.public {
            return None;
        }
        Some(format!("{}/{}", self.options.base_url, path))
    }

    async fn signed_url(&self, path: &str, ttl_seconds: u64) -> StoreResult<String> {
        self.ensure_path_safe(path)?;

        if !fs::try_exists(self.blob_path(path)).await? {
            return Err(StoreError::BlobNotFound(path.to_string()));
        }

        let expires = Utc::now().timestamp() + ttl_seconds as i64;
        let token = self.token_for(path, expires);
        Ok(format!(
            "{}/{}?expires={}&token={}",
            self.options.base_url, path, expires, token
        ))
    }
}

/// Best-effort content type from the file extension.
fn content_type_from_name(name: &str) -> Option<String> {
    let extension = name.rsplit('.').next()?;
    let content_type = match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(content_type.to_string())
}
