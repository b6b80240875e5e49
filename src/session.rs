use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use chrono::{Duration, NaiveDateTime, Utc};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, Role};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sid";

/// Key-value session backend: session id → user id, with a TTL. Any
/// persistence (in-memory, relational, key-value) can implement this.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, sid: &str, user_id: &str, ttl: Duration) -> anyhow::Result<()>;
    async fn get(&self, sid: &str) -> anyhow::Result<Option<String>>;
    async fn remove(&self, sid: &str) -> anyhow::Result<()>;
}

struct SessionEntry {
    user_id: String,
    expires_at: NaiveDateTime,
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<HashMap<String, SessionEntry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, sid: &str, user_id: &str, ttl: Duration) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(
            sid.to_string(),
            SessionEntry {
                user_id: user_id.to_string(),
                expires_at: Utc::now().naive_utc() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, sid: &str) -> anyhow::Result<Option<String>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get(sid) {
            Some(entry) if entry.expires_at > Utc::now().naive_utc() => {
                Ok(Some(entry.user_id.clone()))
            }
            Some(_) => {
                inner.remove(sid);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, sid: &str) -> anyhow::Result<()> {
        self.inner.lock().unwrap().remove(sid);
        Ok(())
    }
}

pub fn session_cookie(sid: &str, ttl_days: i64) -> String {
    format!(
        "{SESSION_COOKIE}={sid}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl_days * 24 * 60 * 60
    )
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn cookie_value(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

/// Extractor resolving the session cookie to an [`Actor`] once per request.
/// The variant is derived from the capability records, not just the
/// denormalized role column, so a stale role can never widen authority.
pub struct CurrentActor(pub Actor);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let sid = cookie_value(&parts.headers, SESSION_COOKIE)
            .ok_or_else(|| AppError::Unauthorized("no session".to_string()))?;

        let user_id = state
            .sessions
            .get(&sid)
            .await
            .map_err(|e| {
                tracing::error!("session store failure: {e}");
                AppError::Unauthorized("session unavailable".to_string())
            })?
            .ok_or_else(|| AppError::Unauthorized("session expired".to_string()))?;

        let db = state.db.lock().unwrap();
        let user = queries::get_user_by_id(&db, &user_id)?
            .ok_or_else(|| AppError::Unauthorized("unknown session user".to_string()))?;

        let actor = if user.role == Role::Admin {
            Actor::Admin { user }
        } else if let Some(manager) = queries::get_facility_manager_for_user(&db, &user.id)? {
            Actor::FacilityManager { user, manager }
        } else if let Some(director) = queries::get_group_director_for_user(&db, &user.id)? {
            Actor::GroupDirector { user, director }
        } else {
            Actor::Employee { user }
        };

        tracing::debug!(
            employee_id = %actor.user().employee_id,
            role = actor.user().role.as_str(),
            "session resolved"
        );

        Ok(CurrentActor(actor))
    }
}
