use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub employee_id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub image: Option<String>,
    pub role: Role,
    pub group_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    GroupDirector,
    FacilityManager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::GroupDirector => "GROUP_DIRECTOR",
            Role::FacilityManager => "FACILITY_MANAGER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "GROUP_DIRECTOR" => Role::GroupDirector,
            "FACILITY_MANAGER" => Role::FacilityManager,
            "ADMIN" => Role::Admin,
            _ => Role::User,
        }
    }
}
