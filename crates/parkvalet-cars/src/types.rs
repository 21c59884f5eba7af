use serde::{Deserialize, Serialize};

/// A vehicle registered by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    pub user_id: String,
    pub registration: String,
    /// Raw vehicle type (e.g. "Sedan"), resolved to a category on demand.
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarUpdate {
    pub registration: Option<String>,
    #[serde(rename = "type")]
    pub vehicle_type: Option<String>,
}
