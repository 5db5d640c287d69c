// ── Locks, sensors and smart plugs ──

use serde::Serialize;
use strum::Display;

/// A sensor value that may be missing.
///
/// The service reports an unknown reading as an empty string; that must
/// never be read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Measurement {
    Known(f64),
    Unknown,
}

impl Measurement {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum LockStatus {
    Locked,
    Unlocked,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lock {
    pub serial: String,
    pub label: String,
    pub status: LockStatus,
    pub autolock: bool,
    pub battery_low: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub serial: String,
    pub label: String,
    pub temperature: Measurement,
    pub humidity: Measurement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum SwitchStatus {
    On,
    Off,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Smartplug {
    pub id: String,
    pub serial: Option<String>,
    pub label: String,
    pub status: SwitchStatus,
}
