// Device messages and retained events
//
// DeviceMessage is the decoded keypad state handed over by the device reader.
// Field names follow the decoder's PascalCase wire format so that records
// streamed to clients and written to the snapshot file keep the same shape.
// The flag set is open: unknown fields are ignored and missing ones default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One decoded keypad status message from the alarm panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeviceMessage {
    /// Human-readable keypad text, e.g. "****DISARMED****  READY TO ARM"
    pub keypad_message: String,
    /// The siren is sounding
    pub alarm_sounding: bool,
    /// An alarm occurred since the panel was last armed
    pub alarm_has_occured: bool,
    /// Fire zone is active
    pub fire: bool,
    /// Number of keypad beeps requested by the panel
    pub beeps: u32,
    /// System is ready to arm
    pub ready: bool,
    pub armed_away: bool,
    pub armed_home: bool,
    #[serde(rename = "ACPower")]
    pub ac_power: bool,
    pub backlight_on: bool,
    pub battery_low: bool,
    pub chime_enabled: bool,
    pub entry_delay_disabled: bool,
    pub perimeter_only: bool,
    pub programming_mode: bool,
    pub system_issue: bool,
    pub zone: String,
    pub zone_bypassed: bool,
    pub mode: String,
    pub raw_data: String,
    pub unparsed_message: String,
}

impl DeviceMessage {
    /// Create a message carrying only keypad text
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            keypad_message: status.into(),
            ..Default::default()
        }
    }

    /// The status string used for duplicate and idle suppression
    pub fn status(&self) -> &str {
        &self.keypad_message
    }
}

/// A retained, timestamped device status change
///
/// Events are immutable once created. The buffer and every live listener
/// receive their own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// When the relay accepted the message
    #[serde(rename = "Time")]
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub message: DeviceMessage,
}

impl Event {
    /// Create an event stamped with the given time
    pub fn at(time: DateTime<Utc>, message: DeviceMessage) -> Self {
        Self { time, message }
    }

    pub fn status(&self) -> &str {
        self.message.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_flat_with_time() {
        let message = DeviceMessage {
            keypad_message: "ALARM SOUNDING".to_string(),
            alarm_sounding: true,
            ac_power: true,
            beeps: 2,
            ..Default::default()
        };
        let event = Event::at(Utc::now(), message);

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["KeypadMessage"], "ALARM SOUNDING");
        assert_eq!(json["AlarmSounding"], true);
        assert_eq!(json["ACPower"], true);
        assert_eq!(json["Beeps"], 2);
        assert!(json["Time"].is_string());
    }

    #[test]
    fn test_message_tolerates_partial_and_unknown_fields() {
        let message: DeviceMessage = serde_json::from_str(
            r#"{"KeypadMessage": "FAULT 05", "Fire": true, "SomethingNew": 42}"#,
        )
        .unwrap();

        assert_eq!(message.status(), "FAULT 05");
        assert!(message.fire);
        assert!(!message.alarm_sounding);
        assert_eq!(message.beeps, 0);
    }

    #[test]
    fn test_event_json_roundtrip_preserves_time() {
        let event = Event::at(Utc::now(), DeviceMessage::with_status("ARMED ***AWAY***"));

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, event);
    }
}
