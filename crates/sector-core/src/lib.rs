//! Polling, snapshots and panel commands on top of `sector-api`.
//!
//! This crate owns the business logic and domain model for one Sector Alarm
//! installation:
//!
//! - **[`Hub`]**: Central facade managing the full lifecycle:
//!   [`connect()`](Hub::connect) authenticates, resolves the panel, runs a
//!   first cycle, then spawns the scheduled polling task.
//!   [`shutdown()`](Hub::shutdown) stops it and logs out.
//!
//! - **[`PollingCoordinator`]**: Runs one cycle at a time: panel info when
//!   due, then status, locks, temperatures and smart plugs concurrently,
//!   with housecheck sensors and the event log on a slower schedule.
//!   Each cycle publishes a new immutable [`Snapshot`] on a `watch` channel,
//!   even when some fetches failed.
//!
//! - **[`SnapshotStream`]**: Subscription handle exposing `current()` /
//!   `latest()` / `changed()` and a `Stream` adapter.
//!
//! - **[`CommandDispatcher`]**: Arm, disarm, partial arm, lock, unlock and
//!   smart plug switching. Commands are validated against the latest
//!   snapshot before any network I/O and are never retried.
//!
//! - **[`TransitionTracker`]**: Short-lived "in transition" markers left by
//!   accepted commands until a later snapshot confirms them.

pub mod command;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod hub;
pub mod model;
pub mod stream;
pub mod transition;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandDispatcher};
pub use config::{DEFAULT_MIN_INTERVAL, HubConfig, IntervalClamp, PinPolicy, PollSettings};
pub use coordinator::PollingCoordinator;
pub use error::{CommandError, CoreError, FetchError};
pub use fetch::{Fetchers, ResourceFetcher};
pub use hub::{EntityView, Hub};
pub use stream::{SnapshotStream, SnapshotWatchStream};
pub use transition::{EntityKey, Target, TransitionOutcome, TransitionTracker};

pub use model::{
    ArmedState, Capabilities, HousecheckSensor, Installation, Lock, LockEvent, LockEventKind,
    LockStatus, Measurement, PanelStatus, Resource, ResourceSlot, SensorKind, Smartplug, Snapshot,
    StaleReason, SwitchStatus, TemperatureReading,
};

// Hosts building a `HubConfig` need these without depending on sector-api.
pub use sector_api::{AuthPolicy, Credentials, RetryPolicy, TransportConfig};
