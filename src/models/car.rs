//! The `car` entity — one vehicle for sale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fuel type enum, stored as lowercase strings in the `fuel` column.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
    Electric,
    Hybrid,
    Other,
}

/// Transmission enum. `semi-automatic` carries a hyphen on the wire.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transmission {
    Manual,
    Automatic,
    Cvt,
    #[serde(rename = "semi-automatic")]
    SemiAutomatic,
}

/// Listing availability state.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CarStatus {
    Available,
    Reserved,
    Sold,
    Maintenance,
    Inactive,
}

/// A stored listing row.
///
/// `id`, `user_id`, and `created_at` are assigned at insert time (`id` by
/// the store, `user_id` by the repository from the authenticated caller)
/// and are immutable afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Car {
    /// Opaque unique identifier, assigned exactly once by the store.
    pub id: String,

    /// Owning account. Exactly one per listing.
    pub user_id: String,

    pub brand: String,
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<FuelType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<Transmission>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// 17-character vehicle identification number, validated before insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CarStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert shape for a listing: everything the seller provides.
///
/// Omitted optional fields are left to the store's column defaults. The
/// serialized form skips `None` fields so the insert row only names columns
/// the caller actually set.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CarDraft {
    pub brand: String,
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<FuelType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<Transmission>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CarStatus>,
}
