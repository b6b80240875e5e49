use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use chrono::Duration;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::session;
use crate::state::AppState;

// POST /auth/login
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub employee_id: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = {
        let db = state.db.lock().unwrap();
        queries::get_user_by_employee_id(&db, &body.employee_id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("unknown employee id: {}", body.employee_id)))?;

    let valid = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))?;
    if !valid {
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    let sid = Uuid::new_v4().to_string();
    state
        .sessions
        .insert(&sid, &user.id, Duration::days(state.config.session_ttl_days))
        .await
        .map_err(|e| AppError::Internal(format!("session store failure: {e}")))?;

    tracing::info!(employee_id = %user.employee_id, "logged in");

    let cookie = session::session_cookie(&sid, state.config.session_ttl_days);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(serde_json::json!({
            "id": user.id,
            "employeeId": user.employee_id,
            "message": "login successful",
        })),
    ))
}

// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(sid) = session::cookie_value(&headers, session::SESSION_COOKIE) {
        state
            .sessions
            .remove(&sid)
            .await
            .map_err(|e| AppError::Internal(format!("session store failure: {e}")))?;
    }

    Ok((
        AppendHeaders([(SET_COOKIE, session::clear_session_cookie())]),
        Json(serde_json::json!({ "message": "logged out" })),
    ))
}
