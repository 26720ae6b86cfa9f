use axum::{
    extract::{State, Form, Path},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use askama::Template;
use askama_web::WebTemplate;
use serde::Deserialize;
use tracing::error;

use crate::AppState;
use crate::handlers::pages::NotFoundTemplate;
use crate::services::license_service::{LicenseError, LicenseService};
use crate::session::AdminSession;
use license_db::License;

const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub username: String,
    pub licenses: Vec<License>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateLicenseForm {
    pub owner: Option<String>,
    pub days: Option<String>,
    pub notes: Option<String>,
}

fn admin_error(err: LicenseError) -> Response {
    match err {
        LicenseError::NotFound(id) => {
            let page = NotFoundTemplate {
                message: format!("License #{} does not exist.", id),
            };
            (StatusCode::NOT_FOUND, page).into_response()
        }
        other => {
            error!("License operation failed: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "License operation failed").into_response()
        }
    }
}

/// GET /dashboard - All licenses, newest first
pub async fn dashboard(
    session: AdminSession,
    State(state): State<AppState>,
) -> Response {
    match state.license_service.list().await {
        Ok(licenses) => DashboardTemplate {
            username: session.username,
            licenses,
        }
        .into_response(),
        Err(e) => admin_error(e),
    }
}

/// POST /create - New license from the dashboard form
pub async fn create_license(
    _session: AdminSession,
    State(state): State<AppState>,
    Form(form): Form<CreateLicenseForm>,
) -> Response {
    let days = LicenseService::days_or_never(form.days.as_deref());

    match state
        .license_service
        .create(form.owner.as_deref(), days, form.notes.as_deref())
        .await
    {
        Ok(_) => Redirect::to(DASHBOARD_PATH).into_response(),
        Err(e) => admin_error(e),
    }
}

/// GET /toggle/{id}
pub async fn toggle_license(
    _session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    match state.license_service.toggle_active(id).await {
        Ok(_) => Redirect::to(DASHBOARD_PATH).into_response(),
        Err(e) => admin_error(e),
    }
}

/// GET /delete/{id}
pub async fn delete_license(
    _session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    match state.license_service.delete(id).await {
        Ok(()) => Redirect::to(DASHBOARD_PATH).into_response(),
        Err(e) => admin_error(e),
    }
}
