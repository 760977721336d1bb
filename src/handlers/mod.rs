pub mod movements;
pub mod products;
pub mod stats;
pub mod users;

use axum::{http::StatusCode, Json};
use serde_json::json;

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "service": "stock-ledger" })))
}
