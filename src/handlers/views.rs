use serde::Serialize;

use crate::db::queries::{BookingRecord, FacilityRecord};
use crate::models::{BookingStatus, Building, CancellationStatus, Facility, Role, User};

fn fmt_opt(dt: &Option<chrono::NaiveDateTime>) -> Option<String> {
    dt.as_ref()
        .map(|v| v.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub employee_id: String,
    pub name: String,
    pub role: Role,
    pub image: Option<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            employee_id: user.employee_id.clone(),
            name: user.name.clone(),
            role: user.role,
            image: user.image.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityView {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl From<&Facility> for FacilityView {
    fn from(facility: &Facility) -> Self {
        Self {
            slug: facility.slug.clone(),
            name: facility.name.clone(),
            description: facility.description.clone(),
            is_active: facility.is_active,
        }
    }
}

/// Facility row on the admin screen, with building and manager identity.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityAdminView {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub building: String,
    pub manager_name: Option<String>,
    pub manager_employee_id: Option<String>,
    pub is_active: bool,
    pub deleted_at: Option<String>,
}

impl From<&FacilityRecord> for FacilityAdminView {
    fn from(record: &FacilityRecord) -> Self {
        Self {
            slug: record.facility.slug.clone(),
            name: record.facility.name.clone(),
            description: record.facility.description.clone(),
            building: record.building_name.clone(),
            manager_name: record.manager_name.clone(),
            manager_employee_id: record.manager_employee_id.clone(),
            is_active: record.facility.is_active,
            deleted_at: fmt_opt(&record.facility.deleted_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingView {
    pub id: String,
    pub name: String,
}

impl From<&Building> for BuildingView {
    fn from(building: &Building) -> Self {
        Self {
            id: building.id.clone(),
            name: building.name.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub date: String,
    pub start: String,
    pub end: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFacilityView {
    pub slug: String,
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterView {
    pub employee_id: String,
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub slug: String,
    pub title: String,
    pub purpose: String,
    pub status: BookingStatus,
    pub cancellation_status: CancellationStatus,
    pub remark: Option<String>,
    pub cancellation_remark: Option<String>,
    pub facility: BookingFacilityView,
    pub group: String,
    pub requested_by: RequesterView,
    pub time: SlotView,
    pub status_update_at_gd: Option<String>,
    pub status_update_at_fm: Option<String>,
    pub status_update_at_admin: Option<String>,
    pub cancellation_requested_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
}

impl From<&BookingRecord> for BookingView {
    fn from(record: &BookingRecord) -> Self {
        let b = &record.booking;
        Self {
            slug: b.slug.clone(),
            title: b.title.clone(),
            purpose: b.purpose.clone(),
            status: b.status,
            cancellation_status: b.cancellation_status,
            remark: b.remark.clone(),
            cancellation_remark: b.cancellation_remark.clone(),
            facility: BookingFacilityView {
                slug: record.facility_slug.clone(),
                name: record.facility_name.clone(),
            },
            group: record.group_name.clone(),
            requested_by: RequesterView {
                employee_id: record.requester_employee_id.clone(),
                name: record.requester_name.clone(),
            },
            time: SlotView {
                date: record.time.date.format("%Y-%m-%d").to_string(),
                start: record.time.start.format("%H:%M").to_string(),
                end: record.time.end.format("%H:%M").to_string(),
            },
            status_update_at_gd: fmt_opt(&b.status_update_at_gd),
            status_update_at_fm: fmt_opt(&b.status_update_at_fm),
            status_update_at_admin: fmt_opt(&b.status_update_at_admin),
            cancellation_requested_at: fmt_opt(&b.cancellation_requested_at),
            cancelled_at: fmt_opt(&b.cancelled_at),
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
