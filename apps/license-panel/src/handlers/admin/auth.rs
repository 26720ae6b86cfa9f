// Authentication Module
// Handles login, logout, and session management

use axum::{
    extract::{State, Form},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use askama::Template;
use askama_web::WebTemplate;
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;
use crate::session::{removal_cookie, session_cookie, LOGIN_PATH, SESSION_COOKIE};

// ============================================================================
// Templates
// ============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub username: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /login - Show login page
pub async fn get_login() -> impl IntoResponse {
    LoginTemplate {
        error: None,
        username: String::new(),
    }
}

/// POST /login - Check credentials against config and open a session
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if !state.config.credentials_match(&form.username, &form.password) {
        warn!("Failed login attempt for user '{}'", form.username);
        let page = LoginTemplate {
            error: Some("Invalid username or password.".to_string()),
            username: form.username,
        };
        return (StatusCode::UNAUTHORIZED, page).into_response();
    }

    let session = state.sessions.create(&form.username).await;
    info!(
        "Creating session for user: '{}' (token: {}...)",
        session.username,
        session.token.chars().take(6).collect::<String>()
    );

    (jar.add(session_cookie(session.token)), Redirect::to("/dashboard")).into_response()
}

/// GET /logout - Drop the session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.remove(cookie.value()).await {
            info!("Session closed");
        }
    }

    (jar.remove(removal_cookie()), Redirect::to(LOGIN_PATH))
}
