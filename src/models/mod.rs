//! Domain models for the marketplace core.
//!
//! These entities mirror the persisted schema (`car` and `favorites` tables,
//! per-listing blob folders). They cross the gateway boundary as JSON rows
//! and map to and from these types via `serde`.

pub mod car;
pub mod favorite;
pub mod image;

pub use car::{Car, CarDraft, CarStatus, FuelType, Transmission};
pub use favorite::Favorite;
pub use image::{ImageRef, UploadResult};
