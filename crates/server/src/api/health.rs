// Health check route (unauthenticated)

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use alarmrelay_core::Relay;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub events: usize,
    pub subscribers: usize,
    pub listeners: usize,
}

pub fn routes(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(relay)
}

pub async fn health(State(relay): State<Arc<Relay>>) -> Json<HealthResponse> {
    let stats = relay.stats();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        events: stats.events,
        subscribers: stats.subscribers,
        listeners: stats.listeners,
    })
}
