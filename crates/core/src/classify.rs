// Notification classifier
//
// Pure function from a device message to a push verdict. Alarm and fire are
// urgent: long time-to-live and their own delivery channel so the phone can
// present them differently from routine keypad beeps.

use serde::{Deserialize, Serialize};

use crate::message::DeviceMessage;

/// Time-to-live for urgent notifications (1 day)
pub const URGENT_TTL_SECONDS: u32 = 24 * 60 * 60;

/// Time-to-live for routine notifications (1 minute)
pub const NORMAL_TTL_SECONDS: u32 = 60;

pub const FIRE_TITLE: &str = "FIRE ALARM";
pub const ALARM_TITLE: &str = "ALARM";
pub const EVENT_TITLE: &str = "Alarm Event";

/// Delivery channel (Android notification channel / iOS category)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Routine keypad events
    Event,
    /// Alarm and fire conditions
    Alarm,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Event => "event",
            Channel::Alarm => "alarm",
        }
    }
}

/// Exactly one tier per message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Silent,
    Normal,
    Urgent,
}

/// Push verdict for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub should_notify: bool,
    pub urgent: bool,
    pub title: String,
    pub ttl_seconds: u32,
    pub channel: Channel,
}

impl Classification {
    pub fn tier(&self) -> Tier {
        match (self.should_notify, self.urgent) {
            (_, true) => Tier::Urgent,
            (true, false) => Tier::Normal,
            (false, false) => Tier::Silent,
        }
    }
}

/// Classify a message. `site_name` is appended to the title when non-empty.
pub fn classify(message: &DeviceMessage, site_name: &str) -> Classification {
    let urgent = message.alarm_sounding || message.fire;
    let should_notify = message.beeps > 0 || urgent;

    let base = if message.fire {
        FIRE_TITLE
    } else if message.alarm_sounding {
        ALARM_TITLE
    } else {
        EVENT_TITLE
    };
    let title = if site_name.is_empty() {
        base.to_string()
    } else {
        format!("{} - {}", base, site_name)
    };

    let (ttl_seconds, channel) = if urgent {
        (URGENT_TTL_SECONDS, Channel::Alarm)
    } else {
        (NORMAL_TTL_SECONDS, Channel::Event)
    };

    Classification {
        should_notify,
        urgent,
        title,
        ttl_seconds,
        channel,
    }
}
