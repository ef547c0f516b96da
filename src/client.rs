//! Cache-backed facade over the service layer.
//!
//! This is the surface UI code consumes. Every read goes through the query
//! cache under a semantic key; every write goes through `mutate` so
//! dependent keys are invalidated on settlement and optimistic values roll
//! back on failure.

use crate::cache::{OptimisticUpdate, QueryCache};
use crate::config::PlatformConfig;
use crate::errors::{CoreError, CoreResult};
use crate::gateway::{
    AuthProvider, BlobStore, DiskBlobOptions, DiskBlobStore, RelationalStore, SqliteStore,
};
use crate::models::{Car, CarDraft, ImageRef};
use crate::services::{
    Favorites, ImageAssets, ListingPublisher, ListingRepository, Page, validation,
};
use std::sync::Arc;
use std::time::Duration;

/// Query keys used by the facade. Exposed so UI layers can target the same
/// entries for manual invalidation.
pub mod keys {
    use crate::cache::QueryKey;

    pub fn cars() -> QueryKey {
        QueryKey::new(["cars"])
    }

    pub fn user_cars(user_id: &str) -> QueryKey {
        QueryKey::new(["userCars", user_id])
    }

    pub fn car(car_id: &str) -> QueryKey {
        QueryKey::new(["car", car_id])
    }

    pub fn car_photos(owner_id: &str, car_id: &str) -> QueryKey {
        QueryKey::new(["carPhotos", owner_id, car_id])
    }

    pub fn is_favorite(car_id: &str) -> QueryKey {
        QueryKey::new(["isFavorite", car_id])
    }

    pub fn favorites(user_id: &str) -> QueryKey {
        QueryKey::new(["favorites", user_id])
    }
}

const BROWSE_STALE: Duration = Duration::from_secs(60);
const DETAIL_STALE: Duration = Duration::from_secs(24 * 60);
/// Kept below the one-hour signed-URL validity so a cached listing never
/// outlives its URLs.
const PHOTOS_STALE: Duration = Duration::from_secs(30 * 60);
const FAVORITE_STALE: Duration = Duration::from_secs(60);

pub struct MarketClient {
    cache: Arc<QueryCache>,
    auth: Arc<dyn AuthProvider>,
    listings: ListingRepository,
    images: ImageAssets,
    favorites: Favorites,
    publisher: ListingPublisher,
}

impl MarketClient {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        blobs: Arc<dyn BlobStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let listings = ListingRepository::new(Arc::clone(&relational));
        let favorites = Favorites::new(relational);
        let images = ImageAssets::new(blobs);
        let publisher = ListingPublisher::new(listings.clone(), images.clone());
        Self {
            cache: Arc::new(QueryCache::new()),
            auth,
            listings,
            images,
            favorites,
            publisher,
        }
    }

    /// Wire up the local SQLite + disk adapters from configuration.
    pub async fn connect_local(
        config: &PlatformConfig,
        auth: Arc<dyn AuthProvider>,
    ) -> CoreResult<Self> {
        let relational = SqliteStore::connect(&config.database_url).await?;
        relational.init_schema().await?;
        let blobs = DiskBlobStore::new(
            &config.storage_dir,
            DiskBlobOptions {
                base_url: config.blob_base_url.clone(),
                public: config.blob_public,
                signing_secret: config.signing_secret.clone(),
            },
        );
        Ok(Self::new(Arc::new(relational), Arc::new(blobs), auth))
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    async fn session_user(&self) -> CoreResult<Option<String>> {
        Ok(self
            .auth
            .current_session()
            .await?
            .map(|session| session.user_id))
    }

    async fn require_user(&self) -> CoreResult<String> {
        self.session_user()
            .await?
            .ok_or(CoreError::Unauthenticated)
    }

    /// Browse the marketplace (first page).
    pub async fn browse_listings(&self) -> CoreResult<Vec<Car>> {
        self.cache
            .query(&keys::cars(), BROWSE_STALE, || async move {
                self.listings.list_all(Page::default()).await
            })
            .await
    }

    /// One listing by id, cached with a long staleness window.
    pub async fn listing(&self, car_id: &str) -> CoreResult<Car> {
        self.cache
            .query(&keys::car(car_id), DETAIL_STALE, || async move {
                self.listings.get_by_id(car_id).await
            })
            .await
    }

    /// All listings owned by `user_id`.
    pub async fn user_listings(&self, user_id: &str) -> CoreResult<Vec<Car>> {
        self.cache
            .query(&keys::user_cars(user_id), BROWSE_STALE, || async move {
                self.listings.list_by_owner(user_id).await
            })
            .await
    }

    /// Resolved image URLs for a listing. Signed URLs are ephemeral, so the
    /// staleness window stays below their validity.
    pub async fn listing_photos(&self, owner_id: &str, car_id: &str) -> CoreResult<Vec<ImageRef>> {
        self.cache
            .query(&keys::car_photos(owner_id, car_id), PHOTOS_STALE, || async move {
                self.images.list_images(owner_id, car_id).await
            })
            .await
    }

    /// Whether the signed-in user has favorited `car_id`. Signed out, this
    /// is simply `false`, not an error.
    pub async fn is_favorite(&self, car_id: &str) -> CoreResult<bool> {
        let Some(user_id) = self.session_user().await? else {
            return Ok(false);
        };
        self.cache
            .query(&keys::is_favorite(car_id), FAVORITE_STALE, || async move {
                self.favorites.is_favorite(&user_id, car_id).await
            })
            .await
    }

    /// The signed-in user's favorited listings; empty when signed out.
    pub async fn my_favorites(&self) -> CoreResult<Vec<Car>> {
        let Some(user_id) = self.session_user().await? else {
            return Ok(Vec::new());
        };
        let key = keys::favorites(&user_id);
        self.cache
            .query(&key, BROWSE_STALE, || async move {
                self.favorites.list_favorites(&user_id).await
            })
            .await
    }

    /// Toggle the favorite state of `car_id` with an optimistic flip of the
    /// cached flag. On failure the previous flag is restored; either way
    /// the favorites list and the flag are invalidated on settlement.
    pub async fn toggle_favorite(&self, car_id: &str) -> CoreResult<()> {
        let user_id = self.require_user().await?;
        let key = keys::is_favorite(car_id);

        let current = self.cache.get::<bool>(&key).unwrap_or(false);
        let optimistic = OptimisticUpdate::new(key.clone(), !current);
        let invalidates = [keys::favorites(&user_id), key];

        self.cache
            .mutate(Some(optimistic), &invalidates, || async move {
                self.favorites.toggle(car_id, &user_id).await
            })
            .await
    }

    /// Validate the draft, then create the listing with its photos. On
    /// settlement the browse and owner listings are invalidated.
    pub async fn publish_listing(&self, draft: &CarDraft, local_uris: &[String]) -> CoreResult<Car> {
        validation::validate_draft(draft).map_err(CoreError::Validation)?;
        let user_id = self.require_user().await?;

        let invalidates = [keys::cars(), keys::user_cars(&user_id)];
        self.cache
            .mutate(None, &invalidates, || async move {
                self.publisher
                    .create_with_images(draft, Some(&user_id), local_uris)
                    .await
            })
            .await
    }
}
