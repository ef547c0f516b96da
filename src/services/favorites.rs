//! Favorites — the user↔listing relation with toggle semantics.
//!
//! `toggle` is a read-then-write flip, not an atomic upsert. Two concurrent
//! toggles for the same pair can both observe the same state; the store's
//! unique `(user_id, car_id)` constraint is the backstop for the insert
//! side. Acceptable for a single user toggling their own favorite.

use super::{decode_row, ensure_id};
use crate::errors::CoreResult;
use crate::gateway::{Filter, RelationalStore};
use crate::models::{Car, Favorite};
use crate::services::listings::CAR_TABLE;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const FAVORITES_TABLE: &str = "favorites";

#[derive(Clone)]
pub struct Favorites {
    store: Arc<dyn RelationalStore>,
}

impl Favorites {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    /// Whether the relation row for `(user_id, car_id)` exists.
    pub async fn is_favorite(&self, user_id: &str, car_id: &str) -> CoreResult<bool> {
        ensure_id(user_id, "user id")?;
        ensure_id(car_id, "car id")?;

        let rows = self
            .store
            .select(FAVORITES_TABLE, &pair_filter(user_id, car_id).limit(1))
            .await?;
        Ok(!rows.is_empty())
    }

    /// Flip the favorite state: delete the row when present, insert it when
    /// absent.
    pub async fn toggle(&self, car_id: &str, user_id: &str) -> CoreResult<()> {
        ensure_id(user_id, "user id")?;
        ensure_id(car_id, "car id")?;

        let existing = self
            .store
            .select(FAVORITES_TABLE, &pair_filter(user_id, car_id).limit(1))
            .await?;

        match existing.into_iter().next() {
            Some(row) => {
                let favorite: Favorite = decode_row(FAVORITES_TABLE, row)?;
                self.store
                    .delete(FAVORITES_TABLE, &Filter::new().eq("id", favorite.id))
                    .await?;
                debug!(user_id, car_id, "favorite removed");
            }
            None => {
                self.store
                    .insert(
                        FAVORITES_TABLE,
                        json!({ "user_id": user_id, "car_id": car_id }),
                    )
                    .await?;
                debug!(user_id, car_id, "favorite added");
            }
        }
        Ok(())
    }

    /// All listings the user has favorited. Two steps: relation rows first,
    /// then an in-set fetch of the listings, skipped entirely when the user
    /// has no favorites.
    pub async fn list_favorites(&self, user_id: &str) -> CoreResult<Vec<Car>> {
        ensure_id(user_id, "user id")?;

        let relations = self
            .store
            .select(FAVORITES_TABLE, &Filter::new().eq("user_id", user_id))
            .await?;

        let car_ids = relations
            .into_iter()
            .map(|row| decode_row::<Favorite>(FAVORITES_TABLE, row).map(|favorite| favorite.car_id))
            .collect::<CoreResult<Vec<_>>>()?;
        if car_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .select(CAR_TABLE, &Filter::new().in_set("id", car_ids))
            .await?;
        rows.into_iter()
            .map(|row| decode_row(CAR_TABLE, row))
            .collect()
    }
}

fn pair_filter(user_id: &str, car_id: &str) -> Filter {
    Filter::new().eq("user_id", user_id).eq("car_id", car_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreError;
    use crate::models::CarDraft;
    use crate::services::listings::ListingRepository;
    use crate::services::testing::MemoryStore;

    fn service() -> (Arc<MemoryStore>, Favorites) {
        let store = Arc::new(MemoryStore::new());
        let favorites = Favorites::new(store.clone());
        (store, favorites)
    }

    #[tokio::test]
    async fn paired_toggles_return_to_the_original_state() {
        let (_, favorites) = service();

        assert!(!favorites.is_favorite("u1", "c1").await.unwrap());
        favorites.toggle("c1", "u1").await.unwrap();
        assert!(favorites.is_favorite("u1", "c1").await.unwrap());
        favorites.toggle("c1", "u1").await.unwrap();
        assert!(!favorites.is_favorite("u1", "c1").await.unwrap());
    }

    #[tokio::test]
    async fn toggle_keeps_at_most_one_relation_row() {
        let (store, favorites) = service();
        favorites.toggle("c1", "u1").await.unwrap();
        favorites.toggle("c1", "u1").await.unwrap();
        favorites.toggle("c1", "u1").await.unwrap();
        assert_eq!(store.rows(FAVORITES_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn listing_favorites_resolves_cars_and_short_circuits_when_empty() {
        let (store, favorites) = service();
        let repository = ListingRepository::new(store.clone());

        assert!(favorites.list_favorites("u1").await.unwrap().is_empty());

        let car = repository
            .insert(
                &CarDraft {
                    brand: "Audi".into(),
                    model: "A4".into(),
                    ..CarDraft::default()
                },
                "seller",
            )
            .await
            .unwrap();
        repository
            .insert(
                &CarDraft {
                    brand: "Seat".into(),
                    model: "Ibiza".into(),
                    ..CarDraft::default()
                },
                "seller",
            )
            .await
            .unwrap();

        favorites.toggle(&car.id, "u1").await.unwrap();
        let favorited = favorites.list_favorites("u1").await.unwrap();
        assert_eq!(favorited.len(), 1);
        assert_eq!(favorited[0].brand, "Audi");
    }

    #[tokio::test]
    async fn empty_ids_fail_fast() {
        let (_, favorites) = service();
        let err = favorites.toggle("", "u1").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        let err = favorites.is_favorite("u1", "").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn store_failure_during_toggle_propagates() {
        let (store, favorites) = service();
        store.fail_next("constraint violation");
        let err = favorites.toggle("c1", "u1").await.unwrap_err();
        assert!(err.to_string().contains("constraint violation"));
    }
}
