use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::error;

use crate::AppState;
use crate::services::license_service::Verdict;

/// First `key` in the query string, like a form lookup. Repeated or
/// unrelated parameters never reject the request.
fn key_from_query(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> Option<String> {
    let Query(pairs) = query.ok()?;
    pairs.into_iter().find(|(name, _)| name == "key").map(|(_, value)| value)
}

/// Pull `key` out of a JSON object body. Anything else counts as no key.
fn key_from_body(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("key")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

fn verdict_status(verdict: &Verdict) -> StatusCode {
    match verdict {
        Verdict::Valid(_) => StatusCode::OK,
        Verdict::MissingKey => StatusCode::BAD_REQUEST,
        Verdict::NotFound => StatusCode::NOT_FOUND,
        Verdict::Blocked(_) | Verdict::Expired(_) => StatusCode::FORBIDDEN,
    }
}

pub fn verdict_body(verdict: &Verdict) -> Value {
    match verdict {
        Verdict::Valid(license) => json!({
            "ok": true,
            "license": {
                "key": license.key,
                "status": "active",
                "owner": license.owner,
                "expires": license.expires_at,
            }
        }),
        Verdict::Blocked(license) | Verdict::Expired(license) => json!({
            "ok": false,
            "error": verdict.code(),
            "license": license,
        }),
        Verdict::MissingKey | Verdict::NotFound => json!({
            "ok": false,
            "error": verdict.code(),
        }),
    }
}

/// GET|POST /api/validate - key from JSON body (POST) or `?key=`
pub async fn validate_license(
    State(state): State<AppState>,
    method: Method,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Bytes,
) -> Response {
    let body_key = if method == Method::POST {
        key_from_body(&body)
    } else {
        None
    };
    let key = body_key.or_else(|| key_from_query(query));

    match state.license_service.validate(key.as_deref()).await {
        Ok(verdict) => (verdict_status(&verdict), Json(verdict_body(&verdict))).into_response(),
        Err(e) => {
            error!("License validation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": "internal_error" })),
            )
                .into_response()
        }
    }
}

/// OPTIONS /api/validate - CORS pre-flight
pub async fn validate_preflight() -> impl IntoResponse {
    Json(json!({ "ok": true, "msg": "options" }))
}
