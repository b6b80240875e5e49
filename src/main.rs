use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use hallbook::config::AppConfig;
use hallbook::db;
use hallbook::handlers;
use hallbook::session::MemorySessionStore;
use hallbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        sessions: Box::new(MemorySessionStore::new()),
    });

    let app = Router::new()
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
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
