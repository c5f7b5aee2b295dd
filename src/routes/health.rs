use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Health check endpoint
///
/// Reports whether the relational tier answers and which backend serves it.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let connected = state.db.ping().await;
    let db_status = if connected { "connected" } else { "disconnected" };

    Json(json!({
        "status": if connected { "healthy" } else { "unhealthy" },
        "database": db_status,
        "backend": state.db.backend_name(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
