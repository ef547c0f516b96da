//! The user↔listing favorite relation.

use serde::{Deserialize, Serialize};

/// One row of the `favorites` table.
///
/// At most one row exists per `(user_id, car_id)` pair; the store's unique
/// constraint is the backstop for concurrent toggles.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub car_id: String,
}
