use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::{conflict_on_unique, AppError};
use crate::models::{Actor, Booking, BookingStatus, BookingTime, CancellationStatus};
use crate::services::transitions;

pub struct NewBookingInput {
    pub title: String,
    pub slug: Option<String>,
    pub purpose: String,
    pub date: String,
    pub start: String,
    pub end: String,
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    let suffix = Uuid::new_v4().to_string();
    format!("{slug}-{}", &suffix[..8])
}

/// Validates the slot, applies the self-approval shortcut, and persists
/// Booking + BookingTime in one transaction.
pub fn create_booking(
    conn: &mut Connection,
    actor: &Actor,
    facility_slug: &str,
    input: NewBookingInput,
) -> Result<queries::BookingRecord, AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    if input.purpose.trim().is_empty() {
        return Err(AppError::BadRequest("purpose is required".to_string()));
    }

    let date = NaiveDate::parse_from_str(&input.date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date: {}", input.date)))?;
    let start = parse_time(&input.start)
        .ok_or_else(|| AppError::BadRequest(format!("invalid start time: {}", input.start)))?;
    let end = parse_time(&input.end)
        .ok_or_else(|| AppError::BadRequest(format!("invalid end time: {}", input.end)))?;
    if start >= end {
        return Err(AppError::BadRequest(
            "start time must be before end time".to_string(),
        ));
    }

    let user = actor.user();
    let group_id = user
        .group_id
        .clone()
        .ok_or_else(|| AppError::BadRequest("requester does not belong to a group".to_string()))?;

    let slug = match &input.slug {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => slugify(&input.title),
    };

    let tx = conn.transaction()?;

    let facility = queries::get_facility_by_slug(&tx, facility_slug)?
        .ok_or_else(|| AppError::NotFound(format!("facility not found: {facility_slug}")))?;
    if !facility.is_active {
        return Err(AppError::BadRequest(format!(
            "facility is retired: {facility_slug}"
        )));
    }

    let is_fm = matches!(&actor, Actor::FacilityManager { manager, .. }
        if facility.facility_manager_id.as_deref() == Some(manager.id.as_str()));
    let is_gd = matches!(&actor, Actor::GroupDirector { director, .. }
        if director.group_id == group_id);

    let status = transitions::initial_status(is_gd, is_fm);
    let now = Utc::now().naive_utc();

    let mut booking = Booking {
        id: Uuid::new_v4().to_string(),
        slug,
        title: input.title.trim().to_string(),
        purpose: input.purpose.trim().to_string(),
        status,
        cancellation_status: CancellationStatus::NotRequested,
        remark: None,
        status_update_at_gd: None,
        status_update_at_fm: None,
        status_update_at_admin: None,
        status_update_by_gd_id: None,
        status_update_by_fm_id: None,
        cancellation_remark: None,
        cancellation_requested_at: None,
        cancellation_update_at_gd: None,
        cancellation_update_at_fm: None,
        cancelled_at: None,
        facility_id: facility.id.clone(),
        group_id,
        requested_by_id: user.id.clone(),
        created_at: now,
    };

    match (&actor, status) {
        (Actor::GroupDirector { director, .. }, BookingStatus::ApprovedByGd) => {
            booking.status_update_at_gd = Some(now);
            booking.status_update_by_gd_id = Some(director.id.clone());
        }
        (Actor::FacilityManager { manager, .. }, BookingStatus::ApprovedByFm) => {
            booking.status_update_at_fm = Some(now);
            booking.status_update_by_fm_id = Some(manager.id.clone());
        }
        _ => {}
    }

    queries::insert_booking(&tx, &booking).map_err(|e| conflict_on_unique(e, "booking slug"))?;
    queries::insert_booking_time(
        &tx,
        &BookingTime {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            date,
            start: date.and_time(start),
            end: date.and_time(end),
        },
    )?;

    let record = queries::get_booking_record_by_slug(&tx, &booking.slug)?
        .ok_or_else(|| AppError::Internal("created booking vanished".to_string()))?;

    tx.commit()?;

    tracing::info!(
        slug = %record.booking.slug,
        status = record.booking.status.as_str(),
        "booking created"
    );

    Ok(record)
}
