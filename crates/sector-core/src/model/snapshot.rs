// ── Installation snapshot ──
//
// One immutable picture of the installation per polling cycle. Each
// sub-resource sits in a `ResourceSlot` that remembers the last good value
// across failed fetches. Snapshots are replaced wholesale, never mutated.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use super::devices::{Lock, Smartplug, TemperatureReading};
use super::housecheck::{HousecheckSensor, LockEvent};
use super::installation::Installation;
use super::status::PanelStatus;

/// Why a whole cycle produced no fresh data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    AuthFailed,
    CycleTimeout,
}

/// One sub-resource inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSlot<T> {
    data: Option<T>,
    fetch_error: bool,
    last_error: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for ResourceSlot<T> {
    fn default() -> Self {
        Self {
            data: None,
            fetch_error: false,
            last_error: None,
            updated_at: None,
        }
    }
}

impl<T: Clone> ResourceSlot<T> {
    /// Freshly fetched value.
    pub fn fetched(data: T) -> Self {
        Self {
            data: Some(data),
            fetch_error: false,
            last_error: None,
            updated_at: Some(Utc::now()),
        }
    }

    /// The fetch failed: keep the previous value and flag the slot.
    pub fn failed(previous: &Self, error: impl Into<String>) -> Self {
        Self {
            data: previous.data.clone(),
            fetch_error: true,
            last_error: Some(error.into()),
            updated_at: previous.updated_at,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// True when the latest attempt to fetch this resource failed.
    pub fn fetch_error(&self) -> bool {
        self.fetch_error
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// When the value was last fetched successfully.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Value present and the latest fetch succeeded.
    pub fn is_clean(&self) -> bool {
        self.data.is_some() && !self.fetch_error
    }
}

/// Immutable aggregate of one installation's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Publication order. Strictly increasing.
    pub version: u64,
    /// Sequence number of the cycle that assembled this snapshot, taken
    /// when the cycle started.
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub assembled_at: DateTime<Utc>,
    pub installation: ResourceSlot<Installation>,
    pub status: ResourceSlot<PanelStatus>,
    pub locks: ResourceSlot<Vec<Lock>>,
    pub temperatures: ResourceSlot<Vec<TemperatureReading>>,
    pub smartplugs: ResourceSlot<Vec<Smartplug>>,
    pub doors_and_windows: ResourceSlot<Vec<HousecheckSensor>>,
    pub smoke_detectors: ResourceSlot<Vec<HousecheckSensor>>,
    pub leakage_detectors: ResourceSlot<Vec<HousecheckSensor>>,
    /// Newest first.
    pub events: ResourceSlot<Vec<LockEvent>>,
    /// Set when the whole cycle failed and every slot is carried over.
    pub stale: Option<StaleReason>,
}

impl Snapshot {
    /// Placeholder published before the first cycle.
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            version: 0,
            cycle: 0,
            started_at: now,
            assembled_at: now,
            installation: ResourceSlot::default(),
            status: ResourceSlot::default(),
            locks: ResourceSlot::default(),
            temperatures: ResourceSlot::default(),
            smartplugs: ResourceSlot::default(),
            doors_and_windows: ResourceSlot::default(),
            smoke_detectors: ResourceSlot::default(),
            leakage_detectors: ResourceSlot::default(),
            events: ResourceSlot::default(),
            stale: None,
        }
    }

    /// Copy of this snapshot's data, marked stale, for a failed cycle.
    pub fn stale_copy(&self, reason: StaleReason, cycle: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            version: self.version,
            cycle,
            started_at,
            assembled_at: Utc::now(),
            stale: Some(reason),
            ..self.clone()
        }
    }

    /// Installation and panel status are both known.
    pub fn is_ready(&self) -> bool {
        self.installation.data().is_some() && self.status.data().is_some()
    }

    /// Partial when any slot's latest fetch failed.
    pub fn is_partial(&self) -> bool {
        self.installation.fetch_error()
            || self.status.fetch_error()
            || self.locks.fetch_error()
            || self.temperatures.fetch_error()
            || self.smartplugs.fetch_error()
            || self.doors_and_windows.fetch_error()
            || self.smoke_detectors.fetch_error()
            || self.leakage_detectors.fetch_error()
            || self.events.fetch_error()
    }

    /// The armed state can be relied on: known, fetched by a cycle that
    /// completed, and the panel is online.
    pub fn panel_trusted(&self) -> bool {
        self.stale.is_none() && self.status.data().is_some_and(|s| s.online)
    }

    pub fn lock(&self, serial: &str) -> Option<&Lock> {
        self.locks.data()?.iter().find(|l| l.serial == serial)
    }

    pub fn smartplug(&self, id: &str) -> Option<&Smartplug> {
        self.smartplugs.data()?.iter().find(|p| p.id == id)
    }

    pub fn temperature(&self, serial: &str) -> Option<&TemperatureReading> {
        self.temperatures.data()?.iter().find(|t| t.serial == serial)
    }

    /// Every housecheck sensor, across categories.
    pub fn sensors(&self) -> impl Iterator<Item = &HousecheckSensor> {
        [
            &self.doors_and_windows,
            &self.smoke_detectors,
            &self.leakage_detectors,
        ]
        .into_iter()
        .filter_map(ResourceSlot::data)
        .flatten()
    }

    pub fn sensor(&self, serial: &str) -> Option<&HousecheckSensor> {
        self.sensors().find(|s| s.serial == serial)
    }

    /// Log entries for the lock with `serial`. The log names locks by
    /// label, so a lock without a match in the log yields nothing.
    pub fn lock_events(&self, serial: &str) -> Vec<&LockEvent> {
        let Some(lock) = self.lock(serial) else {
            return Vec::new();
        };
        self.events
            .data()
            .into_iter()
            .flatten()
            .filter(|e| e.lock_name.as_deref() == Some(lock.label.as_str()))
            .collect()
    }

    /// Log entries not present in `previous`, newest first.
    pub fn new_events_since(&self, previous: &Snapshot) -> Vec<&LockEvent> {
        let seen: HashSet<String> = previous
            .events
            .data()
            .into_iter()
            .flatten()
            .map(LockEvent::id)
            .collect();
        self.events
            .data()
            .into_iter()
            .flatten()
            .filter(|e| !seen.contains(&e.id()))
            .collect()
    }
}
