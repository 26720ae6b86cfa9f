pub mod cli;
pub mod config;
pub mod handlers;
pub mod services;
pub mod session;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use sqlx::SqlitePool;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use services::license_service::LicenseService;
use session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub license_service: Arc<LicenseService>,
    pub sessions: SessionStore,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        let cookie_key = session::cookie_key(&config.secret_key);
        Self {
            config: Arc::new(config),
            license_service: Arc::new(LicenseService::new(pool)),
            sessions: SessionStore::new(),
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::pages::index))
        .route("/health", get(handlers::health::health_check))
        // Admin auth
        .route("/login", get(handlers::admin::get_login).post(handlers::admin::login))
        .route("/logout", get(handlers::admin::logout))
        // Admin license management
        .route("/dashboard", get(handlers::admin::dashboard))
        .route("/create", post(handlers::admin::create_license))
        .route("/toggle/{id}", get(handlers::admin::toggle_license))
        .route("/delete/{id}", get(handlers::admin::delete_license))
        // Public validation API
        .route(
            "/api/validate",
            get(handlers::api::validate_license)
                .post(handlers::api::validate_license)
                .options(handlers::api::validate_preflight),
        )
        .fallback(handlers::pages::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET,POST,OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}
