use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, BookingScope};
use crate::errors::AppError;
use crate::handlers::approvals::DecisionRequest;
use crate::handlers::facility::BookingListQuery;
use crate::handlers::views::{BookingView, BuildingView, FacilityAdminView, FacilityView};
use crate::models::Actor;
use crate::services::facility_admin::{self, NewFacilityInput, UpdateFacilityInput};
use crate::services::transitions::{self, Stage};
use crate::session::CurrentActor;
use crate::state::AppState;

fn require_admin(actor: &Actor) -> Result<(), AppError> {
    match actor {
        Actor::Admin { .. } => Ok(()),
        _ => Err(AppError::Unauthorized("admin role required".to_string())),
    }
}

// GET /admin/bookings
#[derive(Serialize)]
pub struct AdminBookingsResponse {
    pub bookings: Vec<BookingView>,
    pub facilities: Vec<FacilityView>,
}

pub async fn bookings(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<AdminBookingsResponse>, AppError> {
    require_admin(&actor)?;

    let (records, facilities) = {
        let db = state.db.lock().unwrap();
        let records = queries::list_bookings(&db, &BookingScope::All, &query.into_filter(true))?;
        let facilities = queries::list_active_facilities(&db)?;
        (records, facilities)
    };

    Ok(Json(AdminBookingsResponse {
        bookings: records.iter().map(BookingView::from).collect(),
        facilities: facilities.iter().map(FacilityView::from).collect(),
    }))
}

// POST /admin/approval
pub async fn approval(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<BookingView>, AppError> {
    require_admin(&actor)?;
    let remark = body.validated_remark()?;

    let record = {
        let mut db = state.db.lock().unwrap();
        let tx = db.transaction()?;

        let booking = queries::get_booking_by_slug(&tx, &body.slug)?
            .ok_or_else(|| AppError::NotFound(format!("booking not found: {}", body.slug)))?;

        let next = transitions::next_status(booking.status, Stage::Admin, body.decision())
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let applied = queries::update_status_by_admin(
            &tx,
            &booking.id,
            booking.status,
            next,
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
        "admin decision applied"
    );

    Ok(Json(BookingView::from(&record)))
}

// GET /admin/facility
#[derive(Serialize)]
pub struct AdminFacilitiesResponse {
    pub facilities: Vec<FacilityAdminView>,
    pub buildings: Vec<BuildingView>,
}

pub async fn facilities(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<AdminFacilitiesResponse>, AppError> {
    require_admin(&actor)?;

    let (records, buildings) = {
        let db = state.db.lock().unwrap();
        (
            queries::list_facility_records(&db)?,
            queries::list_buildings(&db)?,
        )
    };

    Ok(Json(AdminFacilitiesResponse {
        facilities: records.iter().map(FacilityAdminView::from).collect(),
        buildings: buildings.iter().map(BuildingView::from).collect(),
    }))
}

// POST /admin/facility/add
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFacilityRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub building_id: String,
    pub manager_employee_id: String,
}

pub async fn add_facility(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<AddFacilityRequest>,
) -> Result<(StatusCode, Json<FacilityView>), AppError> {
    require_admin(&actor)?;

    let facility = {
        let mut db = state.db.lock().unwrap();
        facility_admin::create_facility(
            &mut db,
            NewFacilityInput {
                name: body.name,
                slug: body.slug,
                description: body.description,
                building_id: body.building_id,
                manager_employee_id: body.manager_employee_id,
            },
        )?
    };

    tracing::info!(slug = %facility.slug, "facility created");

    Ok((StatusCode::CREATED, Json(FacilityView::from(&facility))))
}

// PUT /admin/facility
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFacilityRequest {
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub building_id: Option<String>,
    pub manager_employee_id: Option<String>,
}

pub async fn update_facility(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<UpdateFacilityRequest>,
) -> Result<Json<FacilityView>, AppError> {
    require_admin(&actor)?;

    let facility = {
        let mut db = state.db.lock().unwrap();
        facility_admin::update_facility(
            &mut db,
            UpdateFacilityInput {
                slug: body.slug,
                name: body.name,
                description: body.description,
                building_id: body.building_id,
                manager_employee_id: body.manager_employee_id,
            },
        )?
    };

    tracing::info!(slug = %facility.slug, "facility updated");

    Ok(Json(FacilityView::from(&facility)))
}

// POST /admin/facility
#[derive(Deserialize)]
pub struct RetireFacilityRequest {
    pub slug: String,
}

pub async fn retire_facility(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<RetireFacilityRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&actor)?;

    {
        let mut db = state.db.lock().unwrap();
        facility_admin::retire_facility(&mut db, &body.slug)?;
    }

    Ok(Json(serde_json::json!({ "message": "facility retired" })))
}
