// Panel command endpoints
//
// State-changing POSTs. These are never marked idempotent, so the
// transport sends each exactly once. The only re-send is the 401 path in
// `SectorClient::authorized`, where the command did not reach the panel.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::client::SectorClient;
use crate::error::Error;
use crate::transport::ApiRequest;

/// Platform tag the command endpoints expect in the body.
const COMMAND_PLATFORM: &str = "app";

/// Alarm state change requested from the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmAction {
    Arm,
    Disarm,
    PartialArm,
}

impl ArmAction {
    fn path(self) -> &'static str {
        match self {
            Self::Arm => "Panel/Arm",
            Self::Disarm => "Panel/Disarm",
            Self::PartialArm => "Panel/PartialArm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    Lock,
    Unlock,
}

impl LockAction {
    fn path(self) -> &'static str {
        match self {
            Self::Lock => "Panel/Lock",
            Self::Unlock => "Panel/Unlock",
        }
    }
}

impl SectorClient {
    /// Arm, disarm or partially arm the panel.
    pub async fn set_alarm(
        &self,
        panel_id: &str,
        action: ArmAction,
        code: &SecretString,
    ) -> Result<(), Error> {
        debug!(?action, "sending alarm command");
        let body = json!({
            "PanelId": panel_id,
            "PanelCode": code.expose_secret(),
            "Platform": COMMAND_PLATFORM,
        });
        self.authorized(&ApiRequest::post(action.path(), body))
            .await
            .map(drop)
    }

    /// Lock or unlock the door lock with serial `lock_serial`.
    pub async fn set_lock(
        &self,
        panel_id: &str,
        lock_serial: &str,
        action: LockAction,
        code: &SecretString,
    ) -> Result<(), Error> {
        debug!(?action, lock_serial, "sending lock command");
        let body = json!({
            "PanelId": panel_id,
            "LockSerial": lock_serial,
            "PanelCode": code.expose_secret(),
            "Platform": COMMAND_PLATFORM,
        });
        self.authorized(&ApiRequest::post(action.path(), body))
            .await
            .map(drop)
    }

    /// Switch a smart plug on or off.
    pub async fn set_smartplug(&self, panel_id: &str, device_id: &str, on: bool) -> Result<(), Error> {
        let path = if on {
            "Panel/TurnOnSmartplug"
        } else {
            "Panel/TurnOffSmartplug"
        };
        debug!(device_id, on, "sending smartplug command");
        let body = json!({
            "PanelId": panel_id,
            "DeviceId": device_id,
        });
        self.authorized(&ApiRequest::post(path, body))
            .await
            .map(drop)
    }
}
