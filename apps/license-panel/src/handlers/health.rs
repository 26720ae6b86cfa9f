use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "ok": true,
        "time": Utc::now().to_rfc3339(),
    }))
}
