use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Grid coordinate of a spot inside its lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spot {
    /// Unique within the lot's layout.
    pub id: String,
    pub position: Position,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingLot {
    pub id: String,
    pub city: String,
    pub name: String,
    /// Row-major order as generated; spot CRUD appends or edits in place.
    pub layout: Vec<Spot>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LotUpdate {
    pub city: Option<String>,
    pub name: Option<String>,
}

/// A spot to add. Its category is resolved from the raw vehicle type.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotDraft {
    pub position: Position,
    #[serde(rename = "type")]
    pub vehicle_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotUpdate {
    pub position: Option<Position>,
    #[serde(rename = "type")]
    pub vehicle_type: Option<String>,
}
