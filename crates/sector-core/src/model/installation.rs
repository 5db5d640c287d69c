// ── Installation (panel) description ──

use serde::Serialize;
use strum::{Display, EnumIter};

/// The sub-resources one polling cycle assembles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    PanelInfo,
    PanelStatus,
    Locks,
    Temperatures,
    Smartplugs,
    DoorsAndWindows,
    SmokeDetectors,
    LeakageDetectors,
    EventLog,
}

/// What the installation has. Fetches for missing features are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub has_locks: bool,
    pub has_temperatures: bool,
    pub has_smartplugs: bool,
    pub supports_partial_arm: bool,
}

impl Capabilities {
    /// Assume everything until the panel description says otherwise.
    pub fn all() -> Self {
        Self {
            has_locks: true,
            has_temperatures: true,
            has_smartplugs: true,
            supports_partial_arm: true,
        }
    }

    /// Whether a cycle should fetch `resource`. The panel description
    /// does not list housecheck sensors, so those are always read. The
    /// event log only matters with locks.
    pub fn covers(&self, resource: Resource) -> bool {
        match resource {
            Resource::PanelInfo
            | Resource::PanelStatus
            | Resource::DoorsAndWindows
            | Resource::SmokeDetectors
            | Resource::LeakageDetectors => true,
            Resource::Locks | Resource::EventLog => self.has_locks,
            Resource::Temperatures => self.has_temperatures,
            Resource::Smartplugs => self.has_smartplugs,
        }
    }
}

/// One alarm installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installation {
    pub panel_id: String,
    pub display_name: String,
    pub capabilities: Capabilities,
    /// Required PIN length. `None` when the panel did not say; any digit
    /// string is then accepted.
    pub code_length: Option<usize>,
    pub quick_arm: bool,
}
