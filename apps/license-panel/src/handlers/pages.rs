use axum::{
    http::StatusCode,
    response::IntoResponse,
};
use askama::Template;
use askama_web::WebTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub version: &'static str,
}

#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub message: String,
}

/// GET / - Public landing page
pub async fn index() -> impl IntoResponse {
    IndexTemplate {
        version: env!("CARGO_PKG_VERSION"),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            message: "The page you requested does not exist.".to_string(),
        },
    )
}
