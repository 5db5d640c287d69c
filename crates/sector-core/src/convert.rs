// ── API-to-domain type conversions ──
//
// Bridges raw `sector_api::models` responses into `crate::model` types.
// Missing, null, empty or unparsable values become `Unknown` (or `None`),
// never a made-up default such as zero.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

use sector_api::models;

use crate::model::{
    ArmedState, Capabilities, HousecheckSensor, Installation, Lock, LockEvent, LockEventKind,
    LockStatus, Measurement, PanelStatus, SensorKind, Smartplug, SwitchStatus, TemperatureReading,
};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a sensor value. The service sends strings (`""` when unknown,
/// sometimes with a decimal comma), numbers, or null.
pub(crate) fn parse_measurement(raw: Option<&Value>) -> Measurement {
    let value = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() => Measurement::Known(v),
        _ => Measurement::Unknown,
    }
}

/// RFC 3339, or a naive timestamp taken as UTC. The service uses
/// `0001-01-01T00:00:00` for "never", which maps to `None`.
fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
        })
        .ok()?;
    (parsed.timestamp() > 0).then_some(parsed)
}

fn label_or(label: Option<String>, fallback: &str) -> String {
    label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

fn has_capability(raw: &[String], needle: &str) -> bool {
    raw.iter().any(|c| c.to_ascii_lowercase().contains(needle))
}

// ── Installation ───────────────────────────────────────────────────

impl From<models::PanelInfo> for Installation {
    fn from(info: models::PanelInfo) -> Self {
        let raw_caps = info.capabilities.unwrap_or_default();
        let has_any = |list: Option<usize>| list.is_some_and(|n| n > 0);

        let capabilities = Capabilities {
            has_locks: has_any(info.locks.as_ref().map(Vec::len))
                || has_capability(&raw_caps, "lock"),
            has_temperatures: has_any(info.temperatures.as_ref().map(Vec::len))
                || has_capability(&raw_caps, "temperature"),
            has_smartplugs: has_any(info.smartplugs.as_ref().map(Vec::len))
                || has_capability(&raw_caps, "smartplug"),
            supports_partial_arm: info.can_partial_arm.unwrap_or(false),
        };

        Self {
            display_name: label_or(info.display_name, &info.panel_id),
            panel_id: info.panel_id,
            capabilities,
            code_length: info
                .panel_code_length
                .filter(|n| *n > 0)
                .map(usize::from),
            quick_arm: info.quick_arm_enabled.unwrap_or(false),
        }
    }
}

// ── Panel status ───────────────────────────────────────────────────

impl From<models::PanelStatus> for PanelStatus {
    fn from(raw: models::PanelStatus) -> Self {
        Self {
            armed: ArmedState::from_code(raw.status),
            // absent means we cannot vouch for the panel
            online: raw.is_online.unwrap_or(false),
            changed_at: parse_timestamp(raw.status_time.as_deref()),
        }
    }
}

// ── Devices ────────────────────────────────────────────────────────

impl From<models::LockStatus> for Lock {
    fn from(raw: models::LockStatus) -> Self {
        let status = match raw.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("lock" | "locked") => LockStatus::Locked,
            Some("unlock" | "unlocked") => LockStatus::Unlocked,
            _ => LockStatus::Unknown,
        };
        Self {
            label: label_or(raw.label, &raw.serial),
            serial: raw.serial,
            status,
            autolock: raw.auto_lock_enabled.unwrap_or(false),
            battery_low: raw.battery_low.unwrap_or(false),
        }
    }
}

impl From<models::Temperature> for TemperatureReading {
    fn from(raw: models::Temperature) -> Self {
        Self {
            label: label_or(raw.label, &raw.serial_no),
            temperature: parse_measurement(raw.temperature.as_ref()),
            humidity: parse_measurement(raw.humidity.as_ref()),
            serial: raw.serial_no,
        }
    }
}

impl From<models::SmartplugStatus> for Smartplug {
    fn from(raw: models::SmartplugStatus) -> Self {
        let status = match raw.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("on") => SwitchStatus::On,
            Some("off") => SwitchStatus::Off,
            _ => SwitchStatus::Unknown,
        };
        Self {
            label: label_or(raw.label, &raw.id),
            id: raw.id,
            serial: raw.serial_no.filter(|s| !s.is_empty()),
            status,
        }
    }
}

// ── Housecheck and event log ───────────────────────────────────────

/// Flatten a housecheck body into sensors. Components without a serial
/// cannot be addressed and are dropped.
pub(crate) fn housecheck_sensors(raw: models::Housecheck, kind: SensorKind) -> Vec<HousecheckSensor> {
    raw.sections
        .into_iter()
        .flatten()
        .flat_map(|section| section.places.into_iter().flatten())
        .flat_map(|place| place.components.into_iter().flatten())
        .filter_map(|component| {
            let Some(serial) = component.serial_no else {
                debug!(%kind, "housecheck component without serial, skipping");
                return None;
            };
            let label = component.label.filter(|l| !l.trim().is_empty()).or(component.name);
            Some(HousecheckSensor {
                label: label_or(label, &serial),
                serial,
                kind,
                device_type: component.device_type.filter(|t| !t.is_empty()),
                closed: component.closed,
                alarm: component.alarm,
                leak_detected: component.leak_detected,
                low_battery: component.low_battery,
            })
        })
        .collect()
}

impl From<models::LogRecord> for LockEvent {
    fn from(raw: models::LogRecord) -> Self {
        let event_type = raw.event_type.unwrap_or_default();
        let raw_time = raw.time.unwrap_or_default();
        Self {
            lock_name: raw.lock_name.filter(|n| !n.is_empty()),
            kind: LockEventKind::from_event_type(&event_type),
            user: raw.user.filter(|u| !u.is_empty()),
            channel: raw.channel.filter(|c| !c.is_empty()),
            time: parse_timestamp(Some(raw_time.as_str())),
            raw_time,
            event_type,
        }
    }
}
