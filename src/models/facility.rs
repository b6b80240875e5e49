use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub building_id: String,
    pub facility_manager_id: Option<String>,
    pub is_active: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Capability record for a user who manages facilities. One manager can
/// own several facilities; facilities point back at this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityManager {
    pub id: String,
    pub user_id: String,
}
