use axum::Json;
use serde_json::{json, Value};

/// `GET /healthz` — always `200` once the listener is up; this process holds
/// no external connections worth probing beyond accepting the request.
pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
