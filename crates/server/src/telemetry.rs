// Logging setup
//
// RUST_LOG overrides the default filter, e.g. RUST_LOG=alarmrelay_core=trace

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str =
    "alarmrelay=debug,alarmrelay_server=debug,alarmrelay_core=debug,tower_http=debug";

/// Install the global tracing subscriber (fmt layer + env filter).
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
