// Alarm relay server library
// Decision: Router, transports and readers live here so integration tests can
//           drive the exact stack the binary serves

pub mod api;
pub mod auth;
pub mod config;
pub mod device;
pub mod expo;
pub mod telemetry;

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use alarmrelay_core::Relay;

pub use config::Config;

/// Build the full HTTP surface: open /health plus the authenticated routes.
pub fn build_router(relay: Arc<Relay>, secret: &str) -> Router {
    let auth_state = auth::AuthState::new(secret);

    let protected = Router::new()
        .merge(api::register::routes(relay.clone()))
        .merge(api::alarm::routes(relay.clone()))
        .layer(middleware::from_fn_with_state(auth_state, auth::require_bearer));

    Router::new()
        .merge(api::health::routes(relay))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
}
