use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::approvals::DecisionRequest;
use crate::handlers::views::BookingView;
use crate::models::{Actor, CancellationStatus};
use crate::services::transitions::{self, Stage};
use crate::session::CurrentActor;
use crate::state::AppState;

// POST /bookings/cancel
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub slug: String,
    pub remark: String,
    pub employee_id: Option<String>,
}

pub async fn request_cancellation(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<CancelRequest>,
) -> Result<Json<BookingView>, AppError> {
    let user = actor.user();
    if let Some(employee_id) = &body.employee_id {
        if employee_id != &user.employee_id {
            return Err(AppError::Unauthorized(
                "employee id does not match the session".to_string(),
            ));
        }
    }

    let remark = body.remark.trim();
    if remark.is_empty() {
        return Err(AppError::BadRequest(
            "a remark is required to request cancellation".to_string(),
        ));
    }

    let record = {
        let mut db = state.db.lock().unwrap();
        let tx = db.transaction()?;

        let booking = queries::get_booking_by_slug(&tx, &body.slug)?
            .ok_or_else(|| AppError::NotFound(format!("booking not found: {}", body.slug)))?;
        if booking.requested_by_id != user.id {
            return Err(AppError::Unauthorized(
                "only the requester may cancel their booking".to_string(),
            ));
        }
        if !booking.status.is_approved() {
            return Err(AppError::BadRequest(format!(
                "only approved bookings can be cancelled (current status: {})",
                booking.status.as_str()
            )));
        }
        if booking.cancellation_status != CancellationStatus::NotRequested {
            return Err(AppError::BadRequest(format!(
                "cancellation already requested (current: {})",
                booking.cancellation_status.as_str()
            )));
        }

        let applied = queries::request_cancellation(&tx, &booking.id, remark)?;
        if !applied {
            return Err(AppError::BadRequest(
                "booking changed concurrently, refresh and retry".to_string(),
            ));
        }

        let record = queries::get_booking_record_by_slug(&tx, &body.slug)?
            .ok_or_else(|| AppError::Internal("updated booking vanished".to_string()))?;
        tx.commit()?;
        record
    };

    tracing::info!(slug = %record.booking.slug, "cancellation requested");

    Ok(Json(BookingView::from(&record)))
}

// GET /bookings/cancel/gd
pub async fn gd_pending(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let Actor::GroupDirector { director, .. } = &actor else {
        return Err(AppError::Unauthorized(
            "group director role required".to_string(),
        ));
    };

    let records = {
        let db = state.db.lock().unwrap();
        queries::list_pending_cancellations_for_group(&db, &director.group_id)?
    };

    Ok(Json(records.iter().map(BookingView::from).collect()))
}

// POST /bookings/cancel/gd
pub async fn gd_decide(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<BookingView>, AppError> {
    let Actor::GroupDirector { director, .. } = &actor else {
        return Err(AppError::Unauthorized(
            "group director role required".to_string(),
        ));
    };

    let record = {
        let mut db = state.db.lock().unwrap();
        let tx = db.transaction()?;

        let booking = queries::get_booking_by_slug(&tx, &body.slug)?
            .ok_or_else(|| AppError::NotFound(format!("booking not found: {}", body.slug)))?;
        if booking.group_id != director.group_id {
            return Err(AppError::Unauthorized(
                "booking is outside your group".to_string(),
            ));
        }

        let next = transitions::next_cancellation(
            booking.cancellation_status,
            Stage::GroupDirector,
            body.decision(),
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let applied = queries::update_cancellation_by_gd(&tx, &booking.id, next)?;
        if !applied {
            return Err(AppError::BadRequest(
                "booking changed concurrently, refresh and retry".to_string(),
            ));
        }

        let record = queries::get_booking_record_by_slug(&tx, &body.slug)?
            .ok_or_else(|| AppError::Internal("updated booking vanished".to_string()))?;
        tx.commit()?;
        record
    };

    tracing::info!(
        slug = %record.booking.slug,
        cancellation = record.booking.cancellation_status.as_str(),
        "group director cancellation decision applied"
    );

    Ok(Json(BookingView::from(&record)))
}

// GET /bookings/cancel/fm
pub async fn fm_pending(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let Actor::FacilityManager { manager, .. } = &actor else {
        return Err(AppError::Unauthorized(
            "facility manager role required".to_string(),
        ));
    };

    let records = {
        let db = state.db.lock().unwrap();
        queries::list_pending_cancellations_for_manager(&db, &manager.id)?
    };

    Ok(Json(records.iter().map(BookingView::from).collect()))
}

// POST /bookings/cancel/fm
pub async fn fm_decide(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<BookingView>, AppError> {
    let Actor::FacilityManager { manager, .. } = &actor else {
        return Err(AppError::Unauthorized(
            "facility manager role required".to_string(),
        ));
    };

    let record = {
        let mut db = state.db.lock().unwrap();
        let tx = db.transaction()?;

        let booking = queries::get_booking_by_slug(&tx, &body.slug)?
            .ok_or_else(|| AppError::NotFound(format!("booking not found: {}", body.slug)))?;

        let facility = queries::get_facility_by_id(&tx, &booking.facility_id)?
            .ok_or_else(|| AppError::Internal("booking has no facility".to_string()))?;
        if facility.facility_manager_id.as_deref() != Some(manager.id.as_str()) {
            return Err(AppError::Unauthorized(
                "booking is not on your facility".to_string(),
            ));
        }

        // Validate the edge before touching the row.
        transitions::next_cancellation(
            booking.cancellation_status,
            Stage::FacilityManager,
            body.decision(),
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let applied = if body.approved {
            queries::approve_cancellation_by_fm(&tx, &booking.id)?
        } else {
            queries::reject_cancellation_by_fm(&tx, &booking.id)?
        };
        if !applied {
            return Err(AppError::BadRequest(
                "booking changed concurrently, refresh and retry".to_string(),
            ));
        }

        let record = queries::get_booking_record_by_slug(&tx, &body.slug)?
            .ok_or_else(|| AppError::Internal("updated booking vanished".to_string()))?;
        tx.commit()?;
        record
    };

    tracing::info!(
        slug = %record.booking.slug,
        cancellation = record.booking.cancellation_status.as_str(),
        "facility manager cancellation decision applied"
    );

    Ok(Json(BookingView::from(&record)))
}

// POST /bookings/cancel/facility
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityCancelRequest {
    pub slug: String,
    pub remark: String,
    pub employee_id: Option<String>,
}

pub async fn facility_cancel(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<FacilityCancelRequest>,
) -> Result<Json<BookingView>, AppError> {
    let Actor::FacilityManager { manager, .. } = &actor else {
        return Err(AppError::Unauthorized(
            "facility manager role required".to_string(),
        ));
    };

    let remark = body.remark.trim();
    if remark.is_empty() {
        return Err(AppError::BadRequest(
            "a remark is required to cancel a booking".to_string(),
        ));
    }

    let record = {
        let mut db = state.db.lock().unwrap();
        let tx = db.transaction()?;

        let booking = queries::get_booking_by_slug(&tx, &body.slug)?
            .ok_or_else(|| AppError::NotFound(format!("booking not found: {}", body.slug)))?;

        let facility = queries::get_facility_by_id(&tx, &booking.facility_id)?
            .ok_or_else(|| AppError::Internal("booking has no facility".to_string()))?;
        if facility.facility_manager_id.as_deref() != Some(manager.id.as_str()) {
            return Err(AppError::Unauthorized(
                "booking is not on your facility".to_string(),
            ));
        }

        let applied = queries::force_cancel_by_fm(&tx, &booking.id, remark)?;
        if !applied {
            return Err(AppError::BadRequest(
                "booking is already cancelled".to_string(),
            ));
        }

        let record = queries::get_booking_record_by_slug(&tx, &body.slug)?
            .ok_or_else(|| AppError::Internal("updated booking vanished".to_string()))?;
        tx.commit()?;
        record
    };

    tracing::info!(slug = %record.booking.slug, "booking force-cancelled by facility manager");

    Ok(Json(BookingView::from(&record)))
}
