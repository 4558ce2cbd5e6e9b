// Process configuration
// Decision: clap derive with env fallbacks, so the relay runs the same from a
//           shell, a systemd unit or a container
// Decision: Site name and shared secret are required; startup fails without them

use std::path::PathBuf;
use std::time::Duration;

use alarmrelay_core::{RelayConfig, RelayError, DEFAULT_READY_MESSAGE};
use clap::Parser;

use crate::expo::DEFAULT_EXPO_PUSH_URL;

#[derive(Debug, Clone, Parser)]
#[command(name = "alarmrelay")]
#[command(about = "Relay alarm panel events to live viewers and push subscribers")]
#[command(version)]
pub struct Config {
    /// Address for the HTTP server to listen on
    #[arg(long, env = "ALARMRELAY_BIND", default_value = "0.0.0.0:8443")]
    pub bind: String,

    /// Use a simulated alarm panel and log pushes instead of sending them
    #[arg(long, env = "ALARMRELAY_MOCK")]
    pub mock: bool,

    /// Line-delimited JSON feed of decoded panel messages ("-" for stdin)
    #[arg(long, env = "ALARMRELAY_DEVICE", default_value = "-")]
    pub device: String,

    /// Name of the site, appended to notification titles
    #[arg(long, env = "ALARMRELAY_NAME", default_value = "")]
    pub name: String,

    /// Shared secret clients must send as a bearer token
    #[arg(long, env = "ALARMRELAY_SECRET", default_value = "", hide_env_values = true)]
    pub secret: String,

    /// File to save state in
    #[arg(long, env = "ALARMRELAY_SAVEFILE", default_value = "alarmrelay.json")]
    pub savefile: PathBuf,

    /// Keypad text of the disarmed resting state
    #[arg(long, env = "ALARMRELAY_READY_MESSAGE", default_value = DEFAULT_READY_MESSAGE)]
    pub ready_message: String,

    /// How long events are retained, in hours
    #[arg(long, env = "ALARMRELAY_MAX_AGE_HOURS", default_value_t = 7 * 24)]
    pub max_age_hours: u32,

    /// Expo push API endpoint
    #[arg(long, env = "ALARMRELAY_PUSH_URL", default_value = DEFAULT_EXPO_PUSH_URL)]
    pub push_url: String,

    /// Upper bound on one push dispatch, in seconds
    #[arg(long, env = "ALARMRELAY_PUSH_TIMEOUT_SECS", default_value_t = 60)]
    pub push_timeout_secs: u64,

    /// Queue size of each live stream listener
    #[arg(long, env = "ALARMRELAY_LISTENER_CAPACITY", default_value_t = 10)]
    pub listener_capacity: usize,
}

impl Config {
    /// Reject configurations the relay cannot start with.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.secret.is_empty() {
            return Err(RelayError::config("a shared secret must be specified (--secret)"));
        }
        if self.name.trim().is_empty() {
            return Err(RelayError::config("name must be specified (--name)"));
        }
        if self.max_age_hours == 0 {
            return Err(RelayError::config("--max-age-hours must be at least 1"));
        }
        self.relay_config().validate()
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            site_name: self.name.clone(),
            ready_message: self.ready_message.clone(),
            max_age: chrono::Duration::hours(i64::from(self.max_age_hours)),
            listener_capacity: self.listener_capacity,
            dispatch_timeout: self.push_timeout(),
        }
    }
}
