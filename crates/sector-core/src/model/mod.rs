// ── Domain model ──
//
// Canonical, vendor-neutral shapes for one installation's state. Raw
// `sector_api::models` types are converted into these in `convert.rs`;
// consumers only ever see the types below, wrapped in a `Snapshot`.

pub mod devices;
pub mod housecheck;
pub mod installation;
pub mod snapshot;
pub mod status;

// ── Re-exports ──────────────────────────────────────────────────────

pub use devices::{Lock, LockStatus, Measurement, Smartplug, SwitchStatus, TemperatureReading};
pub use housecheck::{HousecheckSensor, LockEvent, LockEventKind, SensorKind};
pub use installation::{Capabilities, Installation, Resource};
pub use snapshot::{ResourceSlot, Snapshot, StaleReason};
pub use status::{ArmedState, PanelStatus};
