//! Listing creation orchestrator: insert the row, then upload its photos.

use super::{ImageAssets, ListingRepository};
use crate::errors::{CoreError, CoreResult};
use crate::models::{Car, CarDraft};
use tracing::debug;

/// Composes the repository and the image manager into one "create listing
/// with photos" flow.
///
/// The two steps are explicitly sequenced: photos are only uploaded once the
/// insert has resolved and assigned an id. If the upload fails afterwards,
/// the listing row persists without its images; there is no compensating
/// delete, and the caller sees the upload error.
#[derive(Clone)]
pub struct ListingPublisher {
    listings: ListingRepository,
    images: ImageAssets,
}

impl ListingPublisher {
    pub fn new(listings: ListingRepository, images: ImageAssets) -> Self {
        Self { listings, images }
    }

    pub async fn create_with_images(
        &self,
        draft: &CarDraft,
        owner_id: Option<&str>,
        local_uris: &[String],
    ) -> CoreResult<Car> {
        let owner = owner_id
            .filter(|owner| !owner.trim().is_empty())
            .ok_or(CoreError::Unauthenticated)?;

        let car = self.listings.insert(draft, owner).await?;
        self.images.upload(owner, &car.id, local_uris).await?;

        debug!(car_id = %car.id, photos = local_uris.len(), "published listing");
        Ok(car)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listings::CAR_TABLE;
    use crate::services::testing::{MemoryBlobStore, MemoryStore};
    use std::io::Write;
    use std::sync::Arc;

    struct Harness {
        store: Arc<MemoryStore>,
        blobs: Arc<MemoryBlobStore>,
        publisher: ListingPublisher,
        scratch: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let publisher = ListingPublisher::new(
            ListingRepository::new(store.clone()),
            ImageAssets::new(blobs.clone()),
        );
        Harness {
            store,
            blobs,
            publisher,
            scratch: tempfile::tempdir().unwrap(),
        }
    }

    impl Harness {
        fn local_image(&self, name: &str) -> String {
            let path = self.scratch.path().join(name);
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(b"pixels").unwrap();
            path.to_string_lossy().into_owned()
        }
    }

    fn draft() -> CarDraft {
        CarDraft {
            brand: "Skoda".into(),
            model: "Octavia".into(),
            ..CarDraft::default()
        }
    }

    #[tokio::test]
    async fn creates_the_listing_then_uploads_into_its_folder() {
        let h = harness();
        let uris = vec![h.local_image("a.jpg"), h.local_image("b.jpg")];

        let car = h
            .publisher
            .create_with_images(&draft(), Some("u1"), &uris)
            .await
            .unwrap();

        assert_eq!(car.user_id, "u1");
        let paths = h.blobs.paths();
        assert_eq!(paths.len(), 2);
        let prefix = format!("u1/{}/", car.id);
        assert!(paths.iter().all(|path| path.starts_with(&prefix)));
    }

    #[tokio::test]
    async fn missing_owner_aborts_before_any_side_effect() {
        let h = harness();
        for owner in [None, Some("")] {
            let err = h
                .publisher
                .create_with_images(&draft(), owner, &[])
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Unauthenticated));
        }
        assert!(h.store.rows(CAR_TABLE).is_empty());
        assert!(h.blobs.paths().is_empty());
    }

    #[tokio::test]
    async fn failed_insert_uploads_nothing() {
        let h = harness();
        h.store.fail_next("insert refused");
        let uris = vec![h.local_image("a.jpg")];

        let err = h
            .publisher
            .create_with_images(&draft(), Some("u1"), &uris)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("insert refused"));
        assert!(h.blobs.paths().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_leaves_the_listing_row_in_place() {
        let h = harness();
        let uris = vec![h
            .scratch
            .path()
            .join("does-not-exist.jpg")
            .to_string_lossy()
            .into_owned()];

        let err = h
            .publisher
            .create_with_images(&draft(), Some("u1"), &uris)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PartialUpload { .. }));
        // Known inconsistency window: the row exists without images.
        assert_eq!(h.store.rows(CAR_TABLE).len(), 1);
    }
}
