// Panel read endpoints
//
// Idempotent reads, retried by the transport on transient failure. The
// housecheck categories are POSTs carrying the panel id, but read-only,
// so they are marked idempotent too.

use crate::client::SectorClient;
use crate::error::Error;
use serde_json::json;

use crate::models::{
    Housecheck, LockStatus, LogRecord, LogRecords, PanelInfo, PanelStatus, PanelSummary,
    SmartplugStatus, Temperature,
};
use crate::transport::ApiRequest;

/// Housecheck device categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HousecheckCategory {
    DoorsAndWindows,
    SmokeDetectors,
    LeakageDetectors,
}

impl HousecheckCategory {
    fn path(self) -> &'static str {
        match self {
            Self::DoorsAndWindows => "v2/housecheck/doorsandwindows",
            Self::SmokeDetectors => "v2/housecheck/smokedetectors",
            Self::LeakageDetectors => "v2/housecheck/leakagedetectors",
        }
    }
}

impl SectorClient {
    /// Panels visible to the account.
    pub async fn panel_list(&self) -> Result<Vec<PanelSummary>, Error> {
        self.fetch_list(&ApiRequest::get("account/GetPanelList"))
            .await
    }

    /// Installation description: name, code length, capabilities, devices.
    pub async fn panel_info(&self, panel_id: &str) -> Result<PanelInfo, Error> {
        self.fetch(&panel_get("Panel/GetPanel", panel_id)).await
    }

    pub async fn panel_status(&self, panel_id: &str) -> Result<PanelStatus, Error> {
        self.fetch(&panel_get("Panel/GetPanelStatus", panel_id))
            .await
    }

    pub async fn lock_status(&self, panel_id: &str) -> Result<Vec<LockStatus>, Error> {
        self.fetch_list(&panel_get("Panel/GetLockStatus", panel_id))
            .await
    }

    pub async fn temperatures(&self, panel_id: &str) -> Result<Vec<Temperature>, Error> {
        self.fetch_list(&panel_get("Panel/GetTemperatures", panel_id))
            .await
    }

    pub async fn smartplug_status(&self, panel_id: &str) -> Result<Vec<SmartplugStatus>, Error> {
        self.fetch_list(&panel_get("Panel/GetSmartplugStatus", panel_id))
            .await
    }

    /// Devices of one housecheck category. A `null` body means none.
    pub async fn housecheck(
        &self,
        panel_id: &str,
        category: HousecheckCategory,
    ) -> Result<Housecheck, Error> {
        let request = ApiRequest::post(category.path(), json!({ "PanelId": panel_id })).idempotent();
        let body: Option<Housecheck> = self.fetch(&request).await?;
        Ok(body.unwrap_or_default())
    }

    /// The newest `page_size` entries of the panel's event log.
    pub async fn event_log(&self, panel_id: &str, page_size: u32) -> Result<Vec<LogRecord>, Error> {
        let request = ApiRequest::get("v2/panel/logs")
            .query("panelid", panel_id)
            .query("pageNumber", "1")
            .query("pageSize", page_size.to_string());
        let body: Option<LogRecords> = self.fetch(&request).await?;
        Ok(body.and_then(|b| b.records).unwrap_or_default())
    }
}

fn panel_get(path: &str, panel_id: &str) -> ApiRequest {
    ApiRequest::get(path).query("panelId", panel_id)
}
