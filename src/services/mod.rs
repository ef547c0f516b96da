//! Service layer: listing repository, image assets, favorites, publishing,
//! and draft validation. Each service takes its gateway capability as an
//! injected dependency and propagates store errors unchanged.

pub mod favorites;
pub mod images;
pub mod listings;
pub mod publish;
pub mod validation;

pub use favorites::Favorites;
pub use images::ImageAssets;
pub use listings::{ListingRepository, Page};
pub use publish::ListingPublisher;

use crate::errors::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Fail fast on empty identifiers before any network call.
pub(crate) fn ensure_id(value: &str, what: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidArgument(format!("{what} is empty")));
    }
    Ok(())
}

/// Decode one store row into a domain type; a mismatch is a store-contract
/// violation, not a caller error.
pub(crate) fn decode_row<T: DeserializeOwned>(table: &'static str, row: Value) -> CoreResult<T> {
    serde_json::from_value(row).map_err(|err| CoreError::MalformedRow {
        table,
        detail: err.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory gateway fakes for unit tests.

    use crate::gateway::{
        BlobEntry, BlobStore, Clause, Filter, ListOptions, RelationalStore, StoreError,
        StoreResult, UploadOptions,
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::Value;
    use std::{
        collections::{BTreeMap, HashMap, HashSet},
        sync::Mutex,
    };

    /// Relational fake: tables as JSON row vectors, with an optional
    /// one-shot injected failure.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        tables: Mutex<HashMap<String, Vec<Value>>>,
        fail_message: Mutex<Option<String>>,
    }

    impl MemoryStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Make the next store call fail with `message`.
        pub(crate) fn fail_next(&self, message: impl Into<String>) {
            *self.fail_message.lock().unwrap() = Some(message.into());
        }

        pub(crate) fn rows(&self, table: &str) -> Vec<Value> {
            self.tables
                .lock()
                .unwrap()
                .get(table)
                .cloned()
                .unwrap_or_default()
        }

        fn take_failure(&self) -> StoreResult<()> {
            if let Some(message) = self.fail_message.lock().unwrap().take() {
                return Err(StoreError::Backend(message));
            }
            Ok(())
        }

        fn matches(row: &Value, filter: &Filter) -> bool {
            filter.clauses.iter().all(|clause| match clause {
                Clause::Eq(column, value) => row.get(column) == Some(value),
                Clause::InSet(column, values) => row
                    .get(column)
                    .is_some_and(|candidate| values.contains(candidate)),
            })
        }
    }

    #[async_trait]
    impl RelationalStore for MemoryStore {
        async fn select(&self, table: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
            self.take_failure()?;
            let tables = self.tables.lock().unwrap();
            let rows = tables
                .get(table)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| Self::matches(row, filter))
                        .skip(filter.offset.unwrap_or(0))
                        .take(filter.limit.unwrap_or(usize::MAX))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            Ok(rows)
        }

        async fn insert(&self, table: &str, row: Value) -> StoreResult<Vec<Value>> {
            self.take_failure()?;
            let mut stored = row;
            let object = stored
                .as_object_mut()
                .ok_or_else(|| StoreError::Backend("row must be an object".into()))?;
            if !object.contains_key("id") {
                object.insert("id".into(), Value::from(uuid::Uuid::new_v4().to_string()));
            }
            let mut tables = self.tables.lock().unwrap();
            tables
                .entry(table.to_string())
                .or_default()
                .push(stored.clone());
            Ok(vec![stored])
        }

        async fn delete(&self, table: &str, filter: &Filter) -> StoreResult<u64> {
            self.take_failure()?;
            let mut tables = self.tables.lock().unwrap();
            let Some(rows) = tables.get_mut(table) else {
                return Ok(0);
            };
            let before = rows.len();
            rows.retain(|row| !Self::matches(row, filter));
            Ok((before - rows.len()) as u64)
        }
    }

    /// Blob fake: path→bytes map, configurable public URLs and per-path
    /// signed-URL failures.
    #[derive(Default)]
    pub(crate) struct MemoryBlobStore {
        blobs: Mutex<BTreeMap<String, Bytes>>,
        public: bool,
        fail_signed_for: Mutex<HashSet<String>>,
    }

    impl MemoryBlobStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn public() -> Self {
            Self {
                public: true,
                ..Self::default()
            }
        }

        /// Signed-URL generation for `path` will fail.
        pub(crate) fn break_signing(&self, path: impl Into<String>) {
            self.fail_signed_for.lock().unwrap().insert(path.into());
        }

        pub(crate) fn paths(&self) -> Vec<String> {
            self.blobs.lock().unwrap().keys().cloned().collect()
        }
    }

    #[async_trait]
    impl BlobStore for MemoryBlobStore {
        async fn upload(
            &self,
            path: &str,
            bytes: Bytes,
            options: &UploadOptions,
        ) -> StoreResult<()> {
            let mut blobs = self.blobs.lock().unwrap();
            if !options.upsert && blobs.contains_key(path) {
                return Err(StoreError::BlobAlreadyExists(path.to_string()));
            }
            blobs.insert(path.to_string(), bytes);
            Ok(())
        }

        async fn list(&self, folder: &str, options: &ListOptions) -> StoreResult<Vec<BlobEntry>> {
            let prefix = format!("{folder}/");
            let blobs = self.blobs.lock().unwrap();
            let entries = blobs
                .iter()
                .filter_map(|(path, bytes)| {
                    let name = path.strip_prefix(&prefix)?;
                    (!name.contains('/')).then(|| BlobEntry {
                        name: name.to_string(),
                        size_bytes: bytes.len() as i64,
                        last_modified: None,
                        content_type: None,
                    })
                })
                .skip(options.offset)
                .take(options.limit)
                .collect();
            Ok(entries)
        }

        fn public_url(&self, path: &str) -> Option<String> {
            self.public.then(|| format!("public://{path}"))
        }

        async fn signed_url(&self, path: &str, ttl_seconds: u64) -> StoreResult<String> {
            if self.fail_signed_for.lock().unwrap().contains(path) {
                return Err(StoreError::Backend(format!("cannot sign `{path}`")));
            }
            if !self.blobs.lock().unwrap().contains_key(path) {
                return Err(StoreError::BlobNotFound(path.to_string()));
            }
            Ok(format!("signed://{path}?ttl={ttl_seconds}"))
        }
    }
}
