//! Realtime gateway
//!
//! Terminates client connections and marshals protocol messages. All business
//! decisions belong to the rooms; the gateway only validates payload shape,
//! resolves join codes to rooms and pumps messages both ways.

mod ws;

use axum::{Json, Router, routing::get};
use serde_json::json;

use crate::state::AppState;

/// Gateway routes: health probe and the realtime socket
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
}

/// Liveness probe
async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "live_rooms": state.registry().len(),
    }))
}
