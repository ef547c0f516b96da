//! Listing repository — CRUD and query operations over the `car` table.

use super::{decode_row, ensure_id};
use crate::errors::{CoreError, CoreResult};
use crate::gateway::{Filter, RelationalStore};
use crate::models::{Car, CarDraft};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub const CAR_TABLE: &str = "car";

const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 100;

/// Result window for browse queries. The limit is clamped to
/// `1..=MAX_PAGE_SIZE`, so no caller can request an unbounded fetch.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// CRUD over the `car` entity. Owns the mapping between the domain type and
/// the storage rows; all reads are pure queries, result lifetime is the
/// cache layer's concern.
#[derive(Clone)]
pub struct ListingRepository {
    store: Arc<dyn RelationalStore>,
}

impl ListingRepository {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    /// Insert a listing owned by `owner_id` and return the stored row with
    /// its assigned id. The store returning zero rows is a contract
    /// violation surfaced as [`CoreError::NotInserted`].
    pub async fn insert(&self, draft: &CarDraft, owner_id: &str) -> CoreResult<Car> {
        ensure_id(owner_id, "owner id")?;

        let mut row = serde_json::to_value(draft).map_err(|err| CoreError::MalformedRow {
            table: CAR_TABLE,
            detail: err.to_string(),
        })?;
        let Value::Object(fields) = &mut row else {
            return Err(CoreError::MalformedRow {
                table: CAR_TABLE,
                detail: "draft did not serialize to an object".into(),
            });
        };
        fields.insert("user_id".into(), Value::from(owner_id));

        let rows = self.store.insert(CAR_TABLE, row).await?;
        let Some(stored) = rows.into_iter().next() else {
            return Err(CoreError::NotInserted { table: CAR_TABLE });
        };

        let car: Car = decode_row(CAR_TABLE, stored)?;
        debug!(car_id = %car.id, owner = owner_id, "inserted listing");
        Ok(car)
    }

    /// Fetch one listing by id. Missing rows are [`CoreError::NotFound`],
    /// unlike empty collection results elsewhere.
    pub async fn get_by_id(&self, id: &str) -> CoreResult<Car> {
        ensure_id(id, "car id")?;

        let rows = self
            .store
            .select(CAR_TABLE, &Filter::new().eq("id", id).limit(1))
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Err(CoreError::NotFound {
                entity: "car",
                id: id.to_string(),
            });
        };
        decode_row(CAR_TABLE, row)
    }

    /// All listings owned by `owner_id`. An owner with none gets an empty
    /// vector, not an error.
    pub async fn list_by_owner(&self, owner_id: &str) -> CoreResult<Vec<Car>> {
        ensure_id(owner_id, "owner id")?;

        let rows = self
            .store
            .select(CAR_TABLE, &Filter::new().eq("user_id", owner_id))
            .await?;
        rows.into_iter()
            .map(|row| decode_row(CAR_TABLE, row))
            .collect()
    }

    /// Browse query over all listings, windowed by `page`.
    pub async fn list_all(&self, page: Page) -> CoreResult<Vec<Car>> {
        let limit = page.limit.clamp(1, MAX_PAGE_SIZE);
        let rows = self
            .store
            .select(CAR_TABLE, &Filter::new().limit(limit).offset(page.offset))
            .await?;
        rows.into_iter()
            .map(|row| decode_row(CAR_TABLE, row))
            .collect()
    }
}
