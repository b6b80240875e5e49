use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::views::{FacilityView, UserView};
use crate::session::CurrentActor;
use crate::state::AppState;

// GET /dashboard
#[derive(Serialize)]
pub struct DashboardResponse {
    pub user: UserView,
    pub facilities: Vec<FacilityView>,
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<DashboardResponse>, AppError> {
    let facilities = {
        let db = state.db.lock().unwrap();
        queries::list_active_facilities(&db)?
    };

    Ok(Json(DashboardResponse {
        user: UserView::from(actor.user()),
        facilities: facilities.iter().map(FacilityView::from).collect(),
    }))
}
