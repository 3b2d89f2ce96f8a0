//! Liveness endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::AppState;

/// `GET /api/v1/healthcheck`
pub async fn healthcheck_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "available",
        "app": state.config.app_name,
        "version": crate::version(),
    }))
}
