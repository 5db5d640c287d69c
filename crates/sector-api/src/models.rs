// Wire types for the Sector API
//
// Deserialization targets for raw responses. Field names follow the
// vendor's PascalCase; camelCase aliases cover the newer app endpoints
// that return the same objects. Everything optional is `Option` because
// the service omits or nulls fields freely. Conversion into domain types
// (and the empty-string-means-unknown rules) lives in `sector-core`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Entry of `account/GetPanelList`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PanelSummary {
    #[serde(alias = "panelId", deserialize_with = "string_or_number")]
    pub panel_id: String,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
}

/// `Panel/GetPanel`: installation description.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PanelInfo {
    #[serde(alias = "panelId", deserialize_with = "string_or_number")]
    pub panel_id: String,
    #[serde(default, alias = "PanelDisplayName", alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, alias = "capabilities")]
    pub capabilities: Option<Vec<String>>,
    #[serde(default, alias = "panelCodeLength")]
    pub panel_code_length: Option<u8>,
    #[serde(default, alias = "canPartialArm")]
    pub can_partial_arm: Option<bool>,
    #[serde(default, alias = "quickArmEnabled")]
    pub quick_arm_enabled: Option<bool>,
    #[serde(default, alias = "locks")]
    pub locks: Option<Vec<LockStatus>>,
    #[serde(default, alias = "temperatures")]
    pub temperatures: Option<Vec<Temperature>>,
    #[serde(default, alias = "smartplugs")]
    pub smartplugs: Option<Vec<SmartplugStatus>>,
}

/// `Panel/GetPanelStatus`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PanelStatus {
    /// 1 disarmed, 2 partially armed, 3 armed. Anything else is unknown.
    #[serde(default, alias = "status")]
    pub status: Option<i64>,
    #[serde(default, alias = "isOnline")]
    pub is_online: Option<bool>,
    /// Last state change. Format varies (RFC 3339 or naive local time).
    #[serde(default, alias = "statusTime", alias = "AnnexStatusTime")]
    pub status_time: Option<String>,
}

/// Element of `Panel/GetLockStatus` (also embedded in `PanelInfo`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LockStatus {
    #[serde(alias = "serial", deserialize_with = "string_or_number")]
    pub serial: String,
    #[serde(default, alias = "label")]
    pub label: Option<String>,
    /// `"lock"` or `"unlock"`.
    #[serde(default, alias = "status")]
    pub status: Option<String>,
    #[serde(default, alias = "autoLockEnabled")]
    pub auto_lock_enabled: Option<bool>,
    #[serde(default, alias = "batteryLow")]
    pub battery_low: Option<bool>,
}

/// Element of `Panel/GetTemperatures`.
///
/// Values arrive as strings (`""` when unknown), numbers or null, so they
/// are kept as raw JSON here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Temperature {
    #[serde(alias = "serialNo", deserialize_with = "string_or_number")]
    pub serial_no: String,
    #[serde(default, alias = "label")]
    pub label: Option<String>,
    #[serde(default, alias = "temperature", alias = "Temprature")]
    pub temperature: Option<Value>,
    #[serde(default, alias = "humidity")]
    pub humidity: Option<Value>,
}

/// Element of `Panel/GetSmartplugStatus`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SmartplugStatus {
    #[serde(alias = "id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "label")]
    pub label: Option<String>,
    #[serde(default, alias = "serialNo")]
    pub serial_no: Option<String>,
    /// `"On"` or `"Off"`.
    #[serde(default, alias = "status")]
    pub status: Option<String>,
}

/// Body of the `v2/housecheck/*` category reads.
///
/// Devices sit under sections and places; only `Sections` is read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Housecheck {
    #[serde(default, alias = "sections")]
    pub sections: Option<Vec<HousecheckSection>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HousecheckSection {
    #[serde(default, alias = "places")]
    pub places: Option<Vec<HousecheckPlace>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HousecheckPlace {
    #[serde(default, alias = "components")]
    pub components: Option<Vec<HousecheckComponent>>,
}

/// One sensor in a housecheck category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HousecheckComponent {
    #[serde(
        default,
        alias = "serialNo",
        alias = "Serial",
        deserialize_with = "opt_string_or_number"
    )]
    pub serial_no: Option<String>,
    #[serde(default, alias = "label")]
    pub label: Option<String>,
    #[serde(default, alias = "name")]
    pub name: Option<String>,
    #[serde(default, rename = "Type", alias = "type")]
    pub device_type: Option<String>,
    #[serde(default, alias = "closed")]
    pub closed: Option<bool>,
    #[serde(default, alias = "alarm")]
    pub alarm: Option<bool>,
    #[serde(default, alias = "leakDetected")]
    pub leak_detected: Option<bool>,
    #[serde(default, alias = "BatteryLow", alias = "lowBattery")]
    pub low_battery: Option<bool>,
}

/// `v2/panel/logs`: newest first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogRecords {
    #[serde(default, alias = "records")]
    pub records: Option<Vec<LogRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogRecord {
    #[serde(default, alias = "user")]
    pub user: Option<String>,
    #[serde(default, alias = "channel")]
    pub channel: Option<String>,
    #[serde(default, alias = "time")]
    pub time: Option<String>,
    /// `"lock"`, `"unlock"`, `"lock_failed"`, or an alarm event.
    #[serde(default, alias = "eventType")]
    pub event_type: Option<String>,
    #[serde(default, alias = "lockName")]
    pub lock_name: Option<String>,
}

/// Identifiers are strings on most endpoints but plain numbers on some.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(s)) if !s.is_empty() => Some(s),
        Some(Id::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
