// ── Alarm panel status ──

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum ArmedState {
    Disarmed,
    Armed,
    PartiallyArmed,
    Unknown,
}

impl ArmedState {
    /// Vendor codes: 1 disarmed, 2 partially armed, 3 armed. Everything
    /// else, including 0 ("pending"), is unknown.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Self::Disarmed,
            Some(2) => Self::PartiallyArmed,
            Some(3) => Self::Armed,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelStatus {
    pub armed: ArmedState,
    /// Whether the panel is reachable by the cloud service. When `false`
    /// the armed state is the last one the service knew about.
    pub online: bool,
    pub changed_at: Option<DateTime<Utc>>,
}
