use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

/// Capability record binding one user to the group they direct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDirector {
    pub id: String,
    pub user_id: String,
    pub group_id: String,
}
