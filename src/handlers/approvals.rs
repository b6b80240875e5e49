use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::views::BookingView;
use crate::models::Actor;
use crate::services::transitions::{self, Decision, Stage};
use crate::session::CurrentActor;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub slug: String,
    pub approved: bool,
    pub remark: Option<String>,
}

impl DecisionRequest {
    pub fn decision(&self) -> Decision {
        if self.approved {
            Decision::Approve
        } else {
            Decision::Reject
        }
    }

    /// Rejections must carry a remark so the requester learns why.
    pub fn validated_remark(&self) -> Result<Option<String>, AppError> {
        let trimmed = self
            .remark
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        if !self.approved && trimmed.is_none() {
            return Err(AppError::BadRequest(
                "a remark is required when rejecting".to_string(),
            ));
        }
        Ok(trimmed)
    }
}

// GET /employee/approvals/gd
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
        queries::list_pending_approvals_for_group(&db, &director.group_id)?
    };

    Ok(Json(records.iter().map(BookingView::from).collect()))
}

// POST /employee/approvals/gd
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
    let remark = body.validated_remark()?;

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

        let next = transitions::next_status(booking.status, Stage::GroupDirector, body.decision())
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let applied = queries::update_status_by_gd(
            &tx,
            &booking.id,
            booking.status,
            next,
            &director.id,
            remark.as_deref(),
        )?;
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
        status = record.booking.status.as_str(),
        "group director decision applied"
    );

    Ok(Json(BookingView::from(&record)))
}

// GET /employee/approvals/fm
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
        queries::list_pending_approvals_for_manager(&db, &manager.id)?
    };

    Ok(Json(records.iter().map(BookingView::from).collect()))
}

// POST /employee/approvals/fm
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
    let remark = body.validated_remark()?;

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

        let next =
            transitions::next_status(booking.status, Stage::FacilityManager, body.decision())
                .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let applied = queries::update_status_by_fm(
            &tx,
            &booking.id,
            booking.status,
            next,
            &manager.id,
            remark.as_deref(),
        )?;
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
        status = record.booking.status.as_str(),
        "facility manager decision applied"
    );

    Ok(Json(BookingView::from(&record)))
}
