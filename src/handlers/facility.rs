use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, BookingFilter, BookingScope};
use crate::errors::AppError;
use crate::handlers::views::{BookingView, FacilityView};
use crate::models::Actor;
use crate::services::booking::{self, NewBookingInput};
use crate::session::CurrentActor;
use crate::state::AppState;

// GET /facility/:slug
#[derive(Serialize)]
pub struct FacilityPageResponse {
    pub facility: FacilityView,
    pub bookings: Vec<BookingView>,
}

pub async fn facility_page(
    State(state): State<Arc<AppState>>,
    CurrentActor(_actor): CurrentActor,
    Path(slug): Path<String>,
) -> Result<Json<FacilityPageResponse>, AppError> {
    let db = state.db.lock().unwrap();

    let facility = queries::get_facility_by_slug(&db, &slug)?
        .filter(|f| f.is_active)
        .ok_or_else(|| AppError::NotFound(format!("facility not found: {slug}")))?;

    let bookings = queries::list_bookings_for_facility(&db, &facility.id)?;

    Ok(Json(FacilityPageResponse {
        facility: FacilityView::from(&facility),
        bookings: bookings.iter().map(BookingView::from).collect(),
    }))
}

// POST /facility/:slug
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub title: String,
    pub slug: Option<String>,
    pub purpose: String,
    pub date: String,
    pub start: String,
    pub end: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(facility_slug): Path<String>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let record = {
        let mut db = state.db.lock().unwrap();
        booking::create_booking(
            &mut db,
            &actor,
            &facility_slug,
            NewBookingInput {
                title: body.title,
                slug: body.slug,
                purpose: body.purpose,
                date: body.date,
                start: body.start,
                end: body.end,
            },
        )?
    };

    Ok((StatusCode::CREATED, Json(BookingView::from(&record))))
}

// GET /facility/bookings/gd and /facility/bookings/fm
#[derive(Deserialize)]
pub struct BookingListQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub facility: Option<String>,
    pub user: Option<String>,
}

impl BookingListQuery {
    pub fn into_filter(self, lenient_month_end: bool) -> BookingFilter {
        BookingFilter {
            month: self.month,
            year: self.year,
            facility_slug: self.facility,
            employee_id: self.user,
            lenient_month_end,
        }
    }
}

pub async fn gd_bookings(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let Actor::GroupDirector { director, .. } = &actor else {
        return Err(AppError::Unauthorized(
            "group director role required".to_string(),
        ));
    };

    let records = {
        let db = state.db.lock().unwrap();
        queries::list_bookings(
            &db,
            &BookingScope::Group(director.group_id.clone()),
            &query.into_filter(false),
        )?
    };

    Ok(Json(records.iter().map(BookingView::from).collect()))
}

pub async fn fm_bookings(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let Actor::FacilityManager { manager, .. } = &actor else {
        return Err(AppError::Unauthorized(
            "facility manager role required".to_string(),
        ));
    };

    let records = {
        let db = state.db.lock().unwrap();
        queries::list_bookings(
            &db,
            &BookingScope::Manager(manager.id.clone()),
            &query.into_filter(false),
        )?
    };

    Ok(Json(records.iter().map(BookingView::from).collect()))
}
