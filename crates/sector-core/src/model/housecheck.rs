// ── Housecheck sensors and the panel event log ──

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

/// Which housecheck category a sensor was reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    DoorWindow,
    SmokeDetector,
    LeakageDetector,
}

/// A door/window contact, smoke detector or leakage detector.
///
/// Flags the service did not report stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HousecheckSensor {
    pub serial: String,
    pub label: String,
    pub kind: SensorKind,
    /// Vendor device type, e.g. `"DoorWindow"`.
    pub device_type: Option<String>,
    pub closed: Option<bool>,
    pub alarm: Option<bool>,
    pub leak_detected: Option<bool>,
    pub low_battery: Option<bool>,
}

impl HousecheckSensor {
    pub fn is_open(&self) -> Option<bool> {
        self.closed.map(|closed| !closed)
    }

    /// Smoke alarm or detected leak.
    pub fn is_alarming(&self) -> bool {
        self.alarm == Some(true) || self.leak_detected == Some(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LockEventKind {
    Lock,
    Unlock,
    LockFailed,
    Other,
}

impl LockEventKind {
    pub fn from_event_type(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "lock" => Self::Lock,
            "unlock" => Self::Unlock,
            "lock_failed" => Self::LockFailed,
            _ => Self::Other,
        }
    }
}

/// One entry of the panel event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockEvent {
    pub lock_name: Option<String>,
    pub kind: LockEventKind,
    /// Event type exactly as reported.
    pub event_type: String,
    pub user: Option<String>,
    pub channel: Option<String>,
    pub time: Option<DateTime<Utc>>,
    /// The timestamp as reported, kept for identity when it does not parse.
    pub raw_time: String,
}

impl LockEvent {
    /// Stable identity across polls: lock, event type and reported time.
    pub fn id(&self) -> String {
        format!(
            "{}_{}_{}",
            self.lock_name.as_deref().unwrap_or_default(),
            self.event_type,
            self.raw_time
        )
    }
}
