// Shared wiremock fixtures for the sector-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sector_core::{Credentials, HubConfig, RetryPolicy};

pub const PANEL: &str = "01234567";
pub const LOCK: &str = "LOCK0001";
pub const PLUG: &str = "PLUG0001";
pub const DOOR: &str = "DOOR0001";

pub fn credentials() -> Credentials {
    Credentials::new("owner@example.com", SecretString::from("correct"))
}

/// Three attempts, no backoff, so failing mocks resolve quickly.
pub fn instant_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
        factor: 2,
    }
}

pub fn hub_config(server: &MockServer) -> HubConfig {
    HubConfig::new(credentials())
        .with_panel_id(PANEL)
        .with_base_url(format!("{}/api", server.uri()))
        .with_retry(instant_retry())
}

/// Requests the server saw whose path ends with `suffix`.
pub async fn requests_to(server: &MockServer, suffix: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().ends_with(suffix))
        .collect()
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "AuthorizationToken": "tok-1" })),
        )
        .mount(server)
        .await;
}

pub async fn mount_get(server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/Panel/{endpoint}")))
        .and(query_param("panelId", PANEL))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Everything a healthy installation answers with. Tests tweak fields
/// before mounting.
pub struct Installation {
    pub info: Value,
    pub status: Value,
    pub locks: Value,
    pub temperatures: Value,
    pub smartplugs: Value,
    pub doors_and_windows: Value,
    pub smoke_detectors: Value,
    pub leakage_detectors: Value,
    pub events: Value,
}

impl Default for Installation {
    fn default() -> Self {
        Self {
            info: json!({
                "PanelId": PANEL,
                "PanelDisplayName": "Home",
                "PanelCodeLength": 6,
                "CanPartialArm": true,
                "QuickArmEnabled": false,
                "Locks": [{ "Serial": LOCK, "Label": "Front door" }],
                "Temperatures": [{ "SerialNo": "TEMP0001", "Label": "Hall" }],
                "Smartplugs": [{ "Id": PLUG, "Label": "Heater" }]
            }),
            status: status(1, true),
            locks: locks("lock"),
            temperatures: json!([
                { "SerialNo": "TEMP0001", "Label": "Hall", "Temprature": "21,5" }
            ]),
            smartplugs: json!([
                { "Id": PLUG, "Label": "Heater", "SerialNo": "SP-1", "Status": "Off" }
            ]),
            doors_and_windows: housecheck(json!([
                { "SerialNo": DOOR, "Label": "Back door", "Type": "DoorWindow", "Closed": true, "LowBattery": false }
            ])),
            smoke_detectors: housecheck(json!([
                { "SerialNo": "SMOKE001", "Label": "Hallway", "Type": "SmokeDetector", "Alarm": false, "LowBattery": true }
            ])),
            leakage_detectors: housecheck(json!([])),
            events: json!({ "Records": [
                { "User": "Owner", "Channel": "App", "Time": "2024-05-01T08:00:00", "EventType": "lock", "LockName": "Front door" }
            ]}),
        }
    }
}

impl Installation {
    /// Login, the panel list, and every read endpoint.
    pub async fn mount(&self, server: &MockServer) {
        mount_login(server).await;
        Mock::given(method("GET"))
            .and(path("/api/account/GetPanelList"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "PanelId": PANEL, "DisplayName": "Home" }])),
            )
            .mount(server)
            .await;
        self.mount_reads(server).await;
    }

    pub async fn mount_reads(&self, server: &MockServer) {
        mount_get(server, "GetPanel", self.info.clone()).await;
        mount_get(server, "GetPanelStatus", self.status.clone()).await;
        mount_get(server, "GetLockStatus", self.locks.clone()).await;
        mount_get(server, "GetTemperatures", self.temperatures.clone()).await;
        mount_get(server, "GetSmartplugStatus", self.smartplugs.clone()).await;
        mount_housecheck(server, "doorsandwindows", self.doors_and_windows.clone()).await;
        mount_housecheck(server, "smokedetectors", self.smoke_detectors.clone()).await;
        mount_housecheck(server, "leakagedetectors", self.leakage_detectors.clone()).await;
        mount_events(server, self.events.clone()).await;
    }
}

pub async fn mount_housecheck(server: &MockServer, category: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/api/v2/housecheck/{category}")))
        .and(body_json(json!({ "PanelId": PANEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_events(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/v2/panel/logs"))
        .and(query_param("panelid", PANEL))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// A housecheck body with `components` in a single section and place.
pub fn housecheck(components: Value) -> Value {
    json!({ "Sections": [{ "Places": [{ "Components": components }] }] })
}

pub fn status(code: i64, online: bool) -> Value {
    json!({ "Status": code, "IsOnline": online, "StatusTime": "2024-05-01T08:30:00" })
}

pub fn locks(status: &str) -> Value {
    json!([{
        "Serial": LOCK,
        "Label": "Front door",
        "Status": status,
        "AutoLockEnabled": true,
        "BatteryLow": false
    }])
}
