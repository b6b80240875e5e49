use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use rusqlite::Connection;
use tower::ServiceExt;
use uuid::Uuid;

use hallbook::config::AppConfig;
use hallbook::db::{self, queries};
use hallbook::handlers;
use hallbook::models::{Building, Facility, FacilityManager, Group, GroupDirector, Role, User};
use hallbook::session::MemorySessionStore;
use hallbook::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        session_ttl_days: 7,
    }
}

fn test_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        sessions: Box::new(MemorySessionStore::new()),
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/facility/bookings/gd", get(handlers::facility::gd_bookings))
        .route("/facility/bookings/fm", get(handlers::facility::fm_bookings))
        .route(
            "/facility/:slug",
            get(handlers::facility::facility_page).post(handlers::facility::create_booking),
        )
        .route(
            "/employee/approvals/gd",
            get(handlers::approvals::gd_pending).post(handlers::approvals::gd_decide),
        )
        .route(
            "/employee/approvals/fm",
            get(handlers::approvals::fm_pending).post(handlers::approvals::fm_decide),
        )
        .route(
            "/bookings/cancel",
            post(handlers::cancellations::request_cancellation),
        )
        .route(
            "/bookings/cancel/gd",
            get(handlers::cancellations::gd_pending).post(handlers::cancellations::gd_decide),
        )
        .route(
            "/bookings/cancel/fm",
            get(handlers::cancellations::fm_pending).post(handlers::cancellations::fm_decide),
        )
        .route(
            "/bookings/cancel/facility",
            post(handlers::cancellations::facility_cancel),
        )
        .route("/admin/bookings", get(handlers::admin::bookings))
        .route("/admin/approval", post(handlers::admin::approval))
        .route(
            "/admin/facility",
            get(handlers::admin::facilities)
                .post(handlers::admin::retire_facility)
                .put(handlers::admin::update_facility),
        )
        .route("/admin/facility/add", post(handlers::admin::add_facility))
        .with_state(state)
}

struct Fixtures {
    group_id: String,
    building_id: String,
}

fn create_user(
    conn: &Connection,
    employee_id: &str,
    name: &str,
    role: Role,
    group_id: Option<&str>,
    password_hash: &str,
) -> User {
    let user = User {
        id: Uuid::new_v4().to_string(),
        employee_id: employee_id.to_string(),
        name: name.to_string(),
        password_hash: password_hash.to_string(),
        image: None,
        role,
        group_id: group_id.map(String::from),
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_user(conn, &user).unwrap();
    user
}

/// Seeds one group (engineering), one building, and four people:
/// admin, diana (group director), alice (facility manager of hall-a),
/// bob (plain employee), carol (plain employee, promoted in some tests).
/// Everyone's password is "secret".
fn seed(state: &Arc<AppState>) -> Fixtures {
    let db = state.db.lock().unwrap();
    let hash = bcrypt::hash("secret", 4).unwrap();
    let now = Utc::now().naive_utc();

    let group = Group {
        id: Uuid::new_v4().to_string(),
        name: "engineering".to_string(),
        created_at: now,
    };
    queries::insert_group(&db, &group).unwrap();

    let building = Building {
        id: Uuid::new_v4().to_string(),
        name: "north wing".to_string(),
    };
    queries::insert_building(&db, &building).unwrap();

    create_user(&db, "E-ADMIN", "Avery Admin", Role::Admin, None, &hash);
    create_user(&db, "E-CAROL", "Carol Okafor", Role::User, Some(&group.id), &hash);
    create_user(&db, "E-BOB", "Bob Tanaka", Role::User, Some(&group.id), &hash);

    let diana = create_user(
        &db,
        "E-DIANA",
        "Diana Reyes",
        Role::GroupDirector,
        Some(&group.id),
        &hash,
    );
    queries::insert_group_director(
        &db,
        &GroupDirector {
            id: Uuid::new_v4().to_string(),
            user_id: diana.id.clone(),
            group_id: group.id.clone(),
        },
    )
    .unwrap();

    let alice = create_user(
        &db,
        "E-ALICE",
        "Alice Novak",
        Role::FacilityManager,
        Some(&group.id),
        &hash,
    );
    let manager = FacilityManager {
        id: Uuid::new_v4().to_string(),
        user_id: alice.id.clone(),
    };
    queries::insert_facility_manager(&db, &manager).unwrap();

    let facility = Facility {
        id: Uuid::new_v4().to_string(),
        slug: "hall-a".to_string(),
        name: "Hall A".to_string(),
        description: Some("main sports hall".to_string()),
        building_id: building.id.clone(),
        facility_manager_id: Some(manager.id.clone()),
        is_active: true,
        deleted_at: None,
        created_at: now,
    };
    queries::insert_facility(&db, &facility).unwrap();

    Fixtures {
        group_id: group.id,
        building_id: building.id,
    }
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> Response<Body> {
    test_app(state.clone()).oneshot(req).await.unwrap()
}

async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_req(uri: &str, sid: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(sid) = sid {
        builder = builder.header("Cookie", format!("sid={sid}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_req(method: &str, uri: &str, sid: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(sid) = sid {
        builder = builder.header("Cookie", format!("sid={sid}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Logs in and returns the sid cookie value.
async fn login(state: &Arc<AppState>, employee_id: &str) -> String {
    let res = send(
        state,
        json_req(
            "POST",
            "/auth/login",
            None,
            serde_json::json!({"employeeId": employee_id, "password": "secret"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK, "login failed for {employee_id}");

    let cookie = res
        .headers()
        .get("set-cookie")
        .expect("login should set a cookie")
        .to_str()
        .unwrap();
    let sid = cookie
        .split(';')
        .next()
        .and_then(|kv| kv.strip_prefix("sid="))
        .expect("sid cookie");
    sid.to_string()
}

/// Creates a booking on hall-a through the API and returns its slug.
async fn create_booking_as(state: &Arc<AppState>, sid: &str, slug: &str, date: &str) -> String {
    let res = send(
        state,
        json_req(
            "POST",
            "/facility/hall-a",
            Some(sid),
            serde_json::json!({
                "title": "Team offsite",
                "slug": slug,
                "purpose": "quarterly planning",
                "date": date,
                "start": "10:00",
                "end": "11:00",
            }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let json = body_json(res).await;
    json["slug"].as_str().unwrap().to_string()
}

fn booking_status(state: &Arc<AppState>, slug: &str) -> (String, String) {
    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_slug(&db, slug).unwrap().unwrap();
    (
        booking.status.as_str().to_string(),
        booking.cancellation_status.as_str().to_string(),
    )
}

// ── Auth ──

#[tokio::test]
async fn test_login_unknown_employee() {
    let state = test_state();
    seed(&state);

    let res = send(
        &state,
        json_req(
            "POST",
            "/auth/login",
            None,
            serde_json::json!({"employeeId": "E-NOBODY", "password": "secret"}),
        ),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let json = body_json(res).await;
    assert_eq!(json["error"]["status"], 404);
    assert!(json["error"]["message"].is_string());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let state = test_state();
    seed(&state);

    let res = send(
        &state,
        json_req(
            "POST",
            "/auth/login",
            None,
            serde_json::json!({"employeeId": "E-BOB", "password": "nope"}),
        ),
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_requires_session() {
    let state = test_state();
    seed(&state);

    let res = send(&state, get_req("/dashboard", None)).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(res).await;
    assert_eq!(json["error"]["status"], 401);
}

#[tokio::test]
async fn test_login_and_dashboard() {
    let state = test_state();
    seed(&state);

    let sid = login(&state, "E-BOB").await;
    let res = send(&state, get_req("/dashboard", Some(&sid))).await;

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["user"]["employeeId"], "E-BOB");
    assert_eq!(json["user"]["role"], "USER");
    assert_eq!(json["facilities"].as_array().unwrap().len(), 1);
    assert_eq!(json["facilities"][0]["slug"], "hall-a");
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let state = test_state();
    seed(&state);

    let sid = login(&state, "E-BOB").await;
    let res = send(&state, json_req("POST", "/auth/logout", Some(&sid), serde_json::json!({}))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send(&state, get_req("/dashboard", Some(&sid))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ── Booking creation ──

#[tokio::test]
async fn test_create_booking_starts_pending_with_slot() {
    let state = test_state();
    seed(&state);

    let sid = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &sid, "offsite-1", "2024-06-01").await;

    let (status, cancellation) = booking_status(&state, &slug);
    assert_eq!(status, "PENDING");
    assert_eq!(cancellation, "NOT_REQUESTED");

    // Exactly one slot, created atomically with the booking.
    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_slug(&db, &slug).unwrap().unwrap();
    let time = queries::get_booking_time(&db, &booking.id).unwrap().unwrap();
    assert_eq!(time.date.to_string(), "2024-06-01");
    assert_eq!(time.start.format("%H:%M").to_string(), "10:00");
    assert_eq!(time.end.format("%H:%M").to_string(), "11:00");
}

#[tokio::test]
async fn test_create_booking_invalid_slot() {
    let state = test_state();
    seed(&state);
    let sid = login(&state, "E-BOB").await;

    // end before start
    let res = send(
        &state,
        json_req(
            "POST",
            "/facility/hall-a",
            Some(&sid),
            serde_json::json!({
                "title": "Backwards",
                "purpose": "testing",
                "date": "2024-06-01",
                "start": "11:00",
                "end": "10:00",
            }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // malformed date
    let res = send(
        &state,
        json_req(
            "POST",
            "/facility/hall-a",
            Some(&sid),
            serde_json::json!({
                "title": "Bad date",
                "purpose": "testing",
                "date": "June 1st",
                "start": "10:00",
                "end": "11:00",
            }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_booking_unknown_facility() {
    let state = test_state();
    seed(&state);
    let sid = login(&state, "E-BOB").await;

    let res = send(
        &state,
        json_req(
            "POST",
            "/facility/no-such-hall",
            Some(&sid),
            serde_json::json!({
                "title": "Ghost",
                "purpose": "testing",
                "date": "2024-06-01",
                "start": "10:00",
                "end": "11:00",
            }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_slug_conflict() {
    let state = test_state();
    seed(&state);
    let sid = login(&state, "E-BOB").await;

    create_booking_as(&state, &sid, "dup-slug", "2024-06-01").await;

    let res = send(
        &state,
        json_req(
            "POST",
            "/facility/hall-a",
            Some(&sid),
            serde_json::json!({
                "title": "Second",
                "slug": "dup-slug",
                "purpose": "testing",
                "date": "2024-06-02",
                "start": "10:00",
                "end": "11:00",
            }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

// ── Approval chain ──

#[tokio::test]
async fn test_scenario_a_full_approval_chain() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &bob, "offsite-a", "2024-06-01").await;
    assert_eq!(booking_status(&state, &slug).0, "PENDING");

    // Group director sees it pending, then approves.
    let diana = login(&state, "E-DIANA").await;
    let res = send(&state, get_req("/employee/approvals/gd", Some(&diana))).await;
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let res = send(
        &state,
        json_req(
            "POST",
            "/employee/approvals/gd",
            Some(&diana),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "APPROVED_BY_GD");
    assert!(json["statusUpdateAtGd"].is_string());

    // Facility manager approves next.
    let alice = login(&state, "E-ALICE").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/employee/approvals/fm",
            Some(&alice),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "APPROVED_BY_FM");

    // The facility page lists the booking.
    let res = send(&state, get_req("/facility/hall-a", Some(&bob))).await;
    let json = body_json(res).await;
    let slugs: Vec<&str> = json["bookings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["slug"].as_str().unwrap())
        .collect();
    assert!(slugs.contains(&slug.as_str()));
}

#[tokio::test]
async fn test_scenario_b_fm_self_approval() {
    let state = test_state();
    seed(&state);

    let alice = login(&state, "E-ALICE").await;
    let slug = create_booking_as(&state, &alice, "fm-own", "2024-06-03").await;

    // Booking her own facility skips straight past both review stages.
    assert_eq!(booking_status(&state, &slug).0, "APPROVED_BY_FM");
}

#[tokio::test]
async fn test_gd_self_approval() {
    let state = test_state();
    seed(&state);

    let diana = login(&state, "E-DIANA").await;
    let slug = create_booking_as(&state, &diana, "gd-own", "2024-06-03").await;

    assert_eq!(booking_status(&state, &slug).0, "APPROVED_BY_GD");
}

#[tokio::test]
async fn test_scenario_d_stale_approval_rejected() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &bob, "offsite-d", "2024-06-01").await;

    let alice = login(&state, "E-ALICE").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/employee/approvals/fm",
            Some(&alice),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    // The director's approval arrives after the manager already moved it.
    let diana = login(&state, "E-DIANA").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/employee/approvals/gd",
            Some(&diana),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Row unchanged.
    assert_eq!(booking_status(&state, &slug).0, "APPROVED_BY_FM");
}

#[tokio::test]
async fn test_double_approval_is_rejected() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &bob, "offsite-idem", "2024-06-01").await;

    let diana = login(&state, "E-DIANA").await;
    let body = serde_json::json!({"slug": slug, "approved": true});
    let res = send(
        &state,
        json_req("POST", "/employee/approvals/gd", Some(&diana), body.clone()),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    // The identical decision fired twice must fail the second time.
    let res = send(
        &state,
        json_req("POST", "/employee/approvals/gd", Some(&diana), body),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(booking_status(&state, &slug).0, "APPROVED_BY_GD");
}

#[tokio::test]
async fn test_reject_requires_remark() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &bob, "offsite-r", "2024-06-01").await;

    let diana = login(&state, "E-DIANA").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/employee/approvals/gd",
            Some(&diana),
            serde_json::json!({"slug": slug, "approved": false}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(booking_status(&state, &slug).0, "PENDING");
}

#[tokio::test]
async fn test_rejection_is_terminal() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &bob, "offsite-t", "2024-06-01").await;

    let diana = login(&state, "E-DIANA").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/employee/approvals/gd",
            Some(&diana),
            serde_json::json!({"slug": slug, "approved": false, "remark": "room closed that day"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "REJECTED_BY_GD");
    assert_eq!(json["remark"], "room closed that day");

    // No stage can act on a rejected booking.
    let alice = login(&state, "E-ALICE").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/employee/approvals/fm",
            Some(&alice),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_approvals_require_matching_role() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &bob, "offsite-role", "2024-06-01").await;

    // A plain employee cannot submit decisions.
    let res = send(
        &state,
        json_req(
            "POST",
            "/employee/approvals/gd",
            Some(&bob),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(booking_status(&state, &slug).0, "PENDING");
}

#[tokio::test]
async fn test_admin_approves_from_pending() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &bob, "offsite-adm", "2024-06-01").await;

    let admin = login(&state, "E-ADMIN").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/admin/approval",
            Some(&admin),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(booking_status(&state, &slug).0, "APPROVED_BY_ADMIN");
}

// ── Cancellation chain ──

async fn approved_booking(state: &Arc<AppState>, slug: &str) -> String {
    let bob = login(state, "E-BOB").await;
    let slug = create_booking_as(state, &bob, slug, "2024-06-01").await;

    let diana = login(state, "E-DIANA").await;
    let res = send(
        state,
        json_req(
            "POST",
            "/employee/approvals/gd",
            Some(&diana),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let alice = login(state, "E-ALICE").await;
    let res = send(
        state,
        json_req(
            "POST",
            "/employee/approvals/fm",
            Some(&alice),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    slug
}

#[tokio::test]
async fn test_scenario_c_cancellation_chain() {
    let state = test_state();
    seed(&state);
    let slug = approved_booking(&state, "cancel-c").await;

    // The requester asks to cancel.
    let bob = login(&state, "E-BOB").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel",
            Some(&bob),
            serde_json::json!({"slug": slug, "remark": "travel cancelled"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["cancellationStatus"], "PENDING");
    assert_eq!(json["cancellationRemark"], "travel cancelled");

    // Director approves the cancellation.
    let diana = login(&state, "E-DIANA").await;
    let res = send(&state, get_req("/bookings/cancel/gd", Some(&diana))).await;
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel/gd",
            Some(&diana),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["cancellationStatus"], "APPROVED_BY_GD");

    // Manager signs off; the booking itself flips to cancelled.
    let alice = login(&state, "E-ALICE").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel/fm",
            Some(&alice),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["cancellationStatus"], "APPROVED_BY_FM");
    assert_eq!(json["status"], "CANCELLED");
    assert!(json["cancelledAt"].is_string());
}

#[tokio::test]
async fn test_pending_booking_cannot_be_cancelled() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &bob, "cancel-pending", "2024-06-01").await;

    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel",
            Some(&bob),
            serde_json::json!({"slug": slug, "remark": "changed my mind"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(booking_status(&state, &slug).1, "NOT_REQUESTED");
}

#[tokio::test]
async fn test_cancellation_requires_owner() {
    let state = test_state();
    seed(&state);
    let slug = approved_booking(&state, "cancel-owner").await;

    // Carol did not request this booking.
    let carol = login(&state, "E-CAROL").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel",
            Some(&carol),
            serde_json::json!({"slug": slug, "remark": "not mine"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cancellation_fm_cannot_skip_gd() {
    let state = test_state();
    seed(&state);
    let slug = approved_booking(&state, "cancel-skip").await;

    let bob = login(&state, "E-BOB").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel",
            Some(&bob),
            serde_json::json!({"slug": slug, "remark": "travel cancelled"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    // Manager cannot decide before the director has.
    let alice = login(&state, "E-ALICE").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel/fm",
            Some(&alice),
            serde_json::json!({"slug": slug, "approved": true}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(booking_status(&state, &slug).1, "PENDING");
}

#[tokio::test]
async fn test_rejected_cancellation_blocks_second_request() {
    let state = test_state();
    seed(&state);
    let slug = approved_booking(&state, "cancel-rejected").await;

    let bob = login(&state, "E-BOB").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel",
            Some(&bob),
            serde_json::json!({"slug": slug, "remark": "travel cancelled"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let diana = login(&state, "E-DIANA").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel/gd",
            Some(&diana),
            serde_json::json!({"slug": slug, "approved": false}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(booking_status(&state, &slug).1, "REJECTED_BY_GD");

    // The rejected value sticks; a second request is refused.
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel",
            Some(&bob),
            serde_json::json!({"slug": slug, "remark": "asking again"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fm_force_cancel() {
    let state = test_state();
    seed(&state);
    let slug = approved_booking(&state, "force-cancel").await;

    let alice = login(&state, "E-ALICE").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel/facility",
            Some(&alice),
            serde_json::json!({"slug": slug, "remark": "floor maintenance"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "CANCELLED");
    assert_eq!(json["cancellationStatus"], "CANCELLED_BY_FM");
    assert_eq!(json["cancellationRemark"], "floor maintenance");

    // A second force-cancel finds nothing to do.
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel/facility",
            Some(&alice),
            serde_json::json!({"slug": slug, "remark": "again"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_force_cancel_requires_remark() {
    let state = test_state();
    seed(&state);
    let slug = approved_booking(&state, "force-remark").await;

    let alice = login(&state, "E-ALICE").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/bookings/cancel/facility",
            Some(&alice),
            serde_json::json!({"slug": slug, "remark": "  "}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(booking_status(&state, &slug).0, "APPROVED_BY_FM");
}

// ── Listings & filters ──

#[tokio::test]
async fn test_role_scoped_lists() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    create_booking_as(&state, &bob, "list-1", "2024-06-01").await;
    create_booking_as(&state, &bob, "list-2", "2024-07-15").await;

    let diana = login(&state, "E-DIANA").await;
    let res = send(&state, get_req("/facility/bookings/gd", Some(&diana))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let alice = login(&state, "E-ALICE").await;
    let res = send(&state, get_req("/facility/bookings/fm", Some(&alice))).await;
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    // A plain employee holds neither seat.
    let res = send(&state, get_req("/facility/bookings/gd", Some(&bob))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_month_filter_composes() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    create_booking_as(&state, &bob, "june-1", "2024-06-01").await;
    create_booking_as(&state, &bob, "june-2", "2024-06-30").await;
    create_booking_as(&state, &bob, "july-1", "2024-07-01").await;

    let diana = login(&state, "E-DIANA").await;
    let res = send(
        &state,
        get_req("/facility/bookings/gd?month=6&year=2024", Some(&diana)),
    )
    .await;
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let res = send(
        &state,
        get_req("/facility/bookings/gd?year=2024", Some(&diana)),
    )
    .await;
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 3);

    // Unknown requester matches nothing but still answers 200.
    let res = send(
        &state,
        get_req("/facility/bookings/gd?user=E-NOBODY", Some(&diana)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_admin_bookings_view() {
    let state = test_state();
    seed(&state);

    let bob = login(&state, "E-BOB").await;
    create_booking_as(&state, &bob, "adm-june", "2024-06-15").await;
    create_booking_as(&state, &bob, "adm-july", "2024-07-15").await;

    let admin = login(&state, "E-ADMIN").await;
    let res = send(&state, get_req("/admin/bookings", Some(&admin))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["bookings"].as_array().unwrap().len(), 2);
    assert_eq!(json["facilities"].as_array().unwrap().len(), 1);

    let res = send(
        &state,
        get_req(
            "/admin/bookings?month=6&year=2024&facility=hall-a",
            Some(&admin),
        ),
    )
    .await;
    let json = body_json(res).await;
    assert_eq!(json["bookings"].as_array().unwrap().len(), 1);
    assert_eq!(json["bookings"][0]["slug"], "adm-june");

    // Not for regular employees.
    let res = send(&state, get_req("/admin/bookings", Some(&bob))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ── Facility administration ──

#[tokio::test]
async fn test_scenario_e_retiring_last_facility_demotes_manager() {
    let state = test_state();
    let fixtures = seed(&state);

    let admin = login(&state, "E-ADMIN").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/admin/facility/add",
            Some(&admin),
            serde_json::json!({
                "name": "Hall B",
                "slug": "hall-b",
                "buildingId": fixtures.building_id,
                "managerEmployeeId": "E-CAROL",
            }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    {
        let db = state.db.lock().unwrap();
        let carol = queries::get_user_by_employee_id(&db, "E-CAROL").unwrap().unwrap();
        assert_eq!(carol.role, Role::FacilityManager);
        assert!(queries::get_facility_manager_for_user(&db, &carol.id)
            .unwrap()
            .is_some());
    }

    let res = send(
        &state,
        json_req(
            "POST",
            "/admin/facility",
            Some(&admin),
            serde_json::json!({"slug": "hall-b"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    // Her only facility is gone, so the capability and role go with it.
    let db = state.db.lock().unwrap();
    let carol = queries::get_user_by_employee_id(&db, "E-CAROL").unwrap().unwrap();
    assert_eq!(carol.role, Role::User);
    assert!(queries::get_facility_manager_for_user(&db, &carol.id)
        .unwrap()
        .is_none());

    let hall_b = queries::get_facility_by_slug(&db, "hall-b").unwrap().unwrap();
    assert!(!hall_b.is_active);
    assert!(hall_b.deleted_at.is_some());
}

#[tokio::test]
async fn test_scenario_e_manager_with_other_facilities_keeps_role() {
    let state = test_state();
    let fixtures = seed(&state);

    let admin = login(&state, "E-ADMIN").await;
    for slug in ["hall-c", "hall-d"] {
        let res = send(
            &state,
            json_req(
                "POST",
                "/admin/facility/add",
                Some(&admin),
                serde_json::json!({
                    "name": slug,
                    "slug": slug,
                    "buildingId": fixtures.building_id,
                    "managerEmployeeId": "E-CAROL",
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = send(
        &state,
        json_req(
            "POST",
            "/admin/facility",
            Some(&admin),
            serde_json::json!({"slug": "hall-c"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    // hall-d still needs her.
    let db = state.db.lock().unwrap();
    let carol = queries::get_user_by_employee_id(&db, "E-CAROL").unwrap().unwrap();
    assert_eq!(carol.role, Role::FacilityManager);
    assert!(queries::get_facility_manager_for_user(&db, &carol.id)
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_manager_transfer_demotes_old_manager() {
    let state = test_state();
    seed(&state);

    // Alice manages only hall-a; handing it to carol demotes alice.
    let admin = login(&state, "E-ADMIN").await;
    let res = send(
        &state,
        json_req(
            "PUT",
            "/admin/facility",
            Some(&admin),
            serde_json::json!({"slug": "hall-a", "managerEmployeeId": "E-CAROL"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let db = state.db.lock().unwrap();
    let carol = queries::get_user_by_employee_id(&db, "E-CAROL").unwrap().unwrap();
    assert_eq!(carol.role, Role::FacilityManager);
    let alice = queries::get_user_by_employee_id(&db, "E-ALICE").unwrap().unwrap();
    assert_eq!(alice.role, Role::User);
    assert!(queries::get_facility_manager_for_user(&db, &alice.id)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_admin_facility_list() {
    let state = test_state();
    seed(&state);

    let admin = login(&state, "E-ADMIN").await;
    let res = send(&state, get_req("/admin/facility", Some(&admin))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["facilities"].as_array().unwrap().len(), 1);
    assert_eq!(json["facilities"][0]["managerEmployeeId"], "E-ALICE");
    assert_eq!(json["buildings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_retired_facility_refuses_bookings() {
    let state = test_state();
    seed(&state);

    let admin = login(&state, "E-ADMIN").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/admin/facility",
            Some(&admin),
            serde_json::json!({"slug": "hall-a"}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let bob = login(&state, "E-BOB").await;
    let res = send(
        &state,
        json_req(
            "POST",
            "/facility/hall-a",
            Some(&bob),
            serde_json::json!({
                "title": "Too late",
                "purpose": "testing",
                "date": "2024-06-01",
                "start": "10:00",
                "end": "11:00",
            }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // And it no longer shows on the facility page.
    let res = send(&state, get_req("/facility/hall-a", Some(&bob))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_group_id_snapshot_survives_group_changes() {
    let state = test_state();
    let fixtures = seed(&state);

    let bob = login(&state, "E-BOB").await;
    let slug = create_booking_as(&state, &bob, "snapshot", "2024-06-01").await;

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_slug(&db, &slug).unwrap().unwrap();
    assert_eq!(booking.group_id, fixtures.group_id);
}
