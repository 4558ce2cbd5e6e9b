// Push registration route
// Decision: Registration is an upsert keyed by installation id; the snapshot
//           is written before we answer, so a 200 means the token survives a restart

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use alarmrelay_core::Relay;

use super::common::ApiError;
use crate::expo::is_expo_push_token;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub token: String,
    pub installation_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub native_app_version: Option<String>,
}

pub fn routes(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/register", post(register))
        .with_state(relay)
}

pub async fn register(
    State(relay): State<Arc<Relay>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = payload?;
    if req.installation_id.trim().is_empty() {
        return Err(ApiError::bad_request("installationId is required"));
    }
    if !is_expo_push_token(&req.token) {
        return Err(ApiError::bad_request("token is not an Expo push token"));
    }

    tracing::debug!(
        installation_id = %req.installation_id,
        device_name = ?req.device_name,
        app_version = ?req.native_app_version,
        "Register request"
    );
    relay.register(&req.installation_id, &req.token).await?;

    Ok(Json(serde_json::Value::Null))
}
