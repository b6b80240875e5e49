use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::{conflict_on_unique, AppError};
use crate::models::{Facility, FacilityManager, User};

pub struct NewFacilityInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub building_id: String,
    pub manager_employee_id: String,
}

pub struct UpdateFacilityInput {
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub building_id: Option<String>,
    pub manager_employee_id: Option<String>,
}

fn lookup_manager_user(tx: &Transaction, employee_id: &str) -> Result<User, AppError> {
    queries::get_user_by_employee_id(tx, employee_id)?
        .ok_or_else(|| AppError::NotFound(format!("user not found: {employee_id}")))
}

/// Grants the facility-manager capability, recomputing the role column in
/// the caller's transaction. Idempotent for users who already hold it.
fn promote_manager(tx: &Transaction, user: &User) -> Result<FacilityManager, AppError> {
    if let Some(existing) = queries::get_facility_manager_for_user(tx, &user.id)? {
        return Ok(existing);
    }
    let manager = FacilityManager {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
    };
    queries::insert_facility_manager(tx, &manager)?;
    queries::recompute_user_role(tx, &user.id)?;
    Ok(manager)
}

/// Drops the capability record when its last active facility is gone,
/// resetting the user's role in the same transaction.
fn demote_manager_if_idle(tx: &Transaction, manager_id: &str) -> Result<(), AppError> {
    if queries::count_active_facilities_for_manager(tx, manager_id)? > 0 {
        return Ok(());
    }
    let user_id: Option<String> = tx
        .query_row(
            "SELECT user_id FROM facility_managers WHERE id = ?1",
            [manager_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(user_id) = user_id else {
        return Ok(());
    };
    queries::delete_facility_manager(tx, manager_id)?;
    queries::recompute_user_role(tx, &user_id)?;
    tracing::info!(user_id = %user_id, "facility manager capability revoked");
    Ok(())
}

pub fn create_facility(
    conn: &mut Connection,
    input: NewFacilityInput,
) -> Result<Facility, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("facility name is required".to_string()));
    }

    let slug = match &input.slug {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => input
            .name
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-"),
    };

    let tx = conn.transaction()?;

    let building_exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM buildings WHERE id = ?1",
        [&input.building_id],
        |row| row.get(0),
    )?;
    if !building_exists {
        return Err(AppError::BadRequest(format!(
            "unknown building: {}",
            input.building_id
        )));
    }

    let manager_user = lookup_manager_user(&tx, &input.manager_employee_id)?;
    let manager = promote_manager(&tx, &manager_user)?;

    let facility = Facility {
        id: Uuid::new_v4().to_string(),
        slug,
        name: input.name.trim().to_string(),
        description: input.description,
        building_id: input.building_id,
        facility_manager_id: Some(manager.id),
        is_active: true,
        deleted_at: None,
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_facility(&tx, &facility).map_err(|e| conflict_on_unique(e, "facility slug"))?;

    tx.commit()?;
    Ok(facility)
}

pub fn update_facility(
    conn: &mut Connection,
    input: UpdateFacilityInput,
) -> Result<Facility, AppError> {
    let tx = conn.transaction()?;

    let facility = queries::get_facility_by_slug(&tx, &input.slug)?
        .ok_or_else(|| AppError::NotFound(format!("facility not found: {}", input.slug)))?;

    let name = input.name.unwrap_or_else(|| facility.name.clone());
    let description = input.description.or_else(|| facility.description.clone());
    let building_id = input
        .building_id
        .unwrap_or_else(|| facility.building_id.clone());
    queries::update_facility_fields(&tx, &facility.id, &name, description.as_deref(), &building_id)?;

    let mut manager_id = facility.facility_manager_id.clone();
    if let Some(employee_id) = &input.manager_employee_id {
        let new_user = lookup_manager_user(&tx, employee_id)?;
        let new_manager = promote_manager(&tx, &new_user)?;
        if Some(new_manager.id.as_str()) != facility.facility_manager_id.as_deref() {
            queries::set_facility_manager(&tx, &facility.id, &new_manager.id)?;
            if let Some(old_id) = &facility.facility_manager_id {
                demote_manager_if_idle(&tx, old_id)?;
            }
        }
        manager_id = Some(new_manager.id);
    }

    let updated = Facility {
        name,
        description,
        building_id,
        facility_manager_id: manager_id,
        ..facility
    };

    tx.commit()?;
    Ok(updated)
}

/// Soft delete: the row survives for the booking history, the manager is
/// demoted when this was their last active facility.
pub fn retire_facility(conn: &mut Connection, slug: &str) -> Result<(), AppError> {
    let tx = conn.transaction()?;

    let facility = queries::get_facility_by_slug(&tx, slug)?
        .ok_or_else(|| AppError::NotFound(format!("facility not found: {slug}")))?;
    if !facility.is_active {
        return Err(AppError::BadRequest(format!(
            "facility already retired: {slug}"
        )));
    }

    queries::soft_delete_facility(&tx, &facility.id)?;
    if let Some(manager_id) = &facility.facility_manager_id {
        demote_manager_if_idle(&tx, manager_id)?;
    }

    tx.commit()?;
    tracing::info!(slug = %slug, "facility retired");
    Ok(())
}
