// ── Sub-resource fetchers ──
//
// One typed fetcher per sub-resource behind a common trait, so the
// coordinator can drive them generically. Fetchers are stateless: each
// call is an idempotent read converted straight into domain types.

use std::future::Future;

use sector_api::{HousecheckCategory, SectorClient};

use crate::convert::housecheck_sensors;
use crate::error::FetchError;
use crate::model::{
    HousecheckSensor, Installation, Lock, LockEvent, PanelStatus, Resource, SensorKind, Smartplug,
    TemperatureReading,
};

/// Event log entries requested per poll.
pub const EVENT_LOG_PAGE_SIZE: u32 = 5;

/// Reads one sub-resource of a panel.
pub trait ResourceFetcher: Send + Sync {
    type Output: Clone + Send + Sync;

    const RESOURCE: Resource;

    fn fetch(&self, panel_id: &str) -> impl Future<Output = Result<Self::Output, FetchError>> + Send;
}

/// `Panel/GetPanel` → [`Installation`].
#[derive(Clone)]
pub struct PanelInfoFetcher {
    client: SectorClient,
}

impl ResourceFetcher for PanelInfoFetcher {
    type Output = Installation;
    const RESOURCE: Resource = Resource::PanelInfo;

    async fn fetch(&self, panel_id: &str) -> Result<Installation, FetchError> {
        Ok(self.client.panel_info(panel_id).await?.into())
    }
}

/// `Panel/GetPanelStatus` → [`PanelStatus`].
#[derive(Clone)]
pub struct PanelStatusFetcher {
    client: SectorClient,
}

impl ResourceFetcher for PanelStatusFetcher {
    type Output = PanelStatus;
    const RESOURCE: Resource = Resource::PanelStatus;

    async fn fetch(&self, panel_id: &str) -> Result<PanelStatus, FetchError> {
        Ok(self.client.panel_status(panel_id).await?.into())
    }
}

#[derive(Clone)]
pub struct LockFetcher {
    client: SectorClient,
}

impl ResourceFetcher for LockFetcher {
    type Output = Vec<Lock>;
    const RESOURCE: Resource = Resource::Locks;

    async fn fetch(&self, panel_id: &str) -> Result<Vec<Lock>, FetchError> {
        let raw = self.client.lock_status(panel_id).await?;
        Ok(raw.into_iter().map(Lock::from).collect())
    }
}

#[derive(Clone)]
pub struct TemperatureFetcher {
    client: SectorClient,
}

impl ResourceFetcher for TemperatureFetcher {
    type Output = Vec<TemperatureReading>;
    const RESOURCE: Resource = Resource::Temperatures;

    async fn fetch(&self, panel_id: &str) -> Result<Vec<TemperatureReading>, FetchError> {
        let raw = self.client.temperatures(panel_id).await?;
        Ok(raw.into_iter().map(TemperatureReading::from).collect())
    }
}

#[derive(Clone)]
pub struct SmartplugFetcher {
    client: SectorClient,
}

impl ResourceFetcher for SmartplugFetcher {
    type Output = Vec<Smartplug>;
    const RESOURCE: Resource = Resource::Smartplugs;

    async fn fetch(&self, panel_id: &str) -> Result<Vec<Smartplug>, FetchError> {
        let raw = self.client.smartplug_status(panel_id).await?;
        Ok(raw.into_iter().map(Smartplug::from).collect())
    }
}

async fn fetch_housecheck(
    client: &SectorClient,
    panel_id: &str,
    category: HousecheckCategory,
    kind: SensorKind,
) -> Result<Vec<HousecheckSensor>, FetchError> {
    let raw = client.housecheck(panel_id, category).await?;
    Ok(housecheck_sensors(raw, kind))
}

/// `v2/housecheck/doorsandwindows` → door and window contacts.
#[derive(Clone)]
pub struct DoorsAndWindowsFetcher {
    client: SectorClient,
}

impl ResourceFetcher for DoorsAndWindowsFetcher {
    type Output = Vec<HousecheckSensor>;
    const RESOURCE: Resource = Resource::DoorsAndWindows;

    async fn fetch(&self, panel_id: &str) -> Result<Vec<HousecheckSensor>, FetchError> {
        fetch_housecheck(
            &self.client,
            panel_id,
            HousecheckCategory::DoorsAndWindows,
            SensorKind::DoorWindow,
        )
        .await
    }
}

#[derive(Clone)]
pub struct SmokeDetectorFetcher {
    client: SectorClient,
}

impl ResourceFetcher for SmokeDetectorFetcher {
    type Output = Vec<HousecheckSensor>;
    const RESOURCE: Resource = Resource::SmokeDetectors;

    async fn fetch(&self, panel_id: &str) -> Result<Vec<HousecheckSensor>, FetchError> {
        fetch_housecheck(
            &self.client,
            panel_id,
            HousecheckCategory::SmokeDetectors,
            SensorKind::SmokeDetector,
        )
        .await
    }
}

#[derive(Clone)]
pub struct LeakageDetectorFetcher {
    client: SectorClient,
}

impl ResourceFetcher for LeakageDetectorFetcher {
    type Output = Vec<HousecheckSensor>;
    const RESOURCE: Resource = Resource::LeakageDetectors;

    async fn fetch(&self, panel_id: &str) -> Result<Vec<HousecheckSensor>, FetchError> {
        fetch_housecheck(
            &self.client,
            panel_id,
            HousecheckCategory::LeakageDetectors,
            SensorKind::LeakageDetector,
        )
        .await
    }
}

/// `v2/panel/logs` → the newest [`EVENT_LOG_PAGE_SIZE`] events.
#[derive(Clone)]
pub struct EventLogFetcher {
    client: SectorClient,
}

impl ResourceFetcher for EventLogFetcher {
    type Output = Vec<LockEvent>;
    const RESOURCE: Resource = Resource::EventLog;

    async fn fetch(&self, panel_id: &str) -> Result<Vec<LockEvent>, FetchError> {
        let raw = self.client.event_log(panel_id, EVENT_LOG_PAGE_SIZE).await?;
        Ok(raw.into_iter().map(LockEvent::from).collect())
    }
}

/// The full set of fetchers one coordinator drives.
#[derive(Clone)]
pub struct Fetchers {
    pub info: PanelInfoFetcher,
    pub status: PanelStatusFetcher,
    pub locks: LockFetcher,
    pub temperatures: TemperatureFetcher,
    pub smartplugs: SmartplugFetcher,
    pub doors_and_windows: DoorsAndWindowsFetcher,
    pub smoke_detectors: SmokeDetectorFetcher,
    pub leakage_detectors: LeakageDetectorFetcher,
    pub events: EventLogFetcher,
}

impl Fetchers {
    pub fn new(client: &SectorClient) -> Self {
        Self {
            info: PanelInfoFetcher {
                client: client.clone(),
            },
            status: PanelStatusFetcher {
                client: client.clone(),
            },
            locks: LockFetcher {
                client: client.clone(),
            },
            temperatures: TemperatureFetcher {
                client: client.clone(),
            },
            smartplugs: SmartplugFetcher {
                client: client.clone(),
            },
            doors_and_windows: DoorsAndWindowsFetcher {
                client: client.clone(),
            },
            smoke_detectors: SmokeDetectorFetcher {
                client: client.clone(),
            },
            leakage_detectors: LeakageDetectorFetcher {
                client: client.clone(),
            },
            events: EventLogFetcher {
                client: client.clone(),
            },
        }
    }
}
