// ── Runtime hub configuration ──
//
// Describes *how* to talk to one Sector installation: credentials, poll
// tuning and the PIN policy. Never touches disk; `sector-config` (or the
// host) builds a `HubConfig` and hands it in.

use std::fmt;
use std::time::Duration;

use secrecy::SecretString;
use sector_api::{AuthPolicy, Credentials, RetryPolicy, TransportConfig};
use tracing::warn;

/// Lowest poll interval that stays clear of the vendor's rate limiting.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Requested poll interval was raised to the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalClamp {
    pub requested: Duration,
    pub effective: Duration,
}

/// Polling cadence and cycle limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Floor applied to `interval` and to nudged cycles.
    pub min_interval: Duration,
    /// Panel info (capabilities, code length) is re-fetched every N cycles.
    pub info_refresh_every: u32,
    /// Housecheck sensors and the event log are fetched every N cycles.
    pub slow_refresh_every: u32,
    /// A cycle running longer than this is abandoned.
    pub cycle_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_MIN_INTERVAL,
            min_interval: DEFAULT_MIN_INTERVAL,
            info_refresh_every: 15,
            slow_refresh_every: 5,
            cycle_timeout: Duration::from_secs(50),
        }
    }
}

impl PollSettings {
    /// The interval actually used, and the clamp if one was applied.
    pub fn effective_interval(&self) -> (Duration, Option<IntervalClamp>) {
        if self.interval < self.min_interval {
            let clamp = IntervalClamp {
                requested: self.interval,
                effective: self.min_interval,
            };
            (self.min_interval, Some(clamp))
        } else {
            (self.interval, None)
        }
    }

    /// Copy with the floor applied. Logs at warn when it had to clamp.
    pub(crate) fn clamped(self) -> (Self, Option<IntervalClamp>) {
        let (interval, clamp) = self.effective_interval();
        if let Some(c) = clamp {
            warn!(
                requested_secs = c.requested.as_secs(),
                effective_secs = c.effective.as_secs(),
                "poll interval below the minimum, clamped"
            );
        }
        (
            Self {
                interval,
                info_refresh_every: self.info_refresh_every.max(1),
                slow_refresh_every: self.slow_refresh_every.max(1),
                ..self
            },
            clamp,
        )
    }
}

/// PIN handling for arm/disarm/lock commands.
#[derive(Clone, Default)]
pub struct PinPolicy {
    /// When `false`, commands without a PIN fall back to `default_code`.
    pub require_pin: bool,
    pub default_code: Option<SecretString>,
}

impl fmt::Debug for PinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinPolicy")
            .field("require_pin", &self.require_pin)
            .field("default_code", &self.default_code.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Configuration for one hub (one account, one panel).
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub credentials: Credentials,
    /// Panel to operate on. `None` picks the account's first panel.
    pub panel_id: Option<String>,
    pub transport: TransportConfig,
    pub auth: AuthPolicy,
    pub poll: PollSettings,
    pub pin: PinPolicy,
    /// How long an in-transition marker lives without confirmation.
    pub transition_ttl: Duration,
}

impl HubConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            panel_id: None,
            transport: TransportConfig::default(),
            auth: AuthPolicy::default(),
            poll: PollSettings::default(),
            pin: PinPolicy::default(),
            transition_ttl: Duration::from_secs(90),
        }
    }

    pub fn with_panel_id(mut self, panel_id: impl Into<String>) -> Self {
        self.panel_id = Some(panel_id.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.transport.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.transport.retry = retry;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    pub fn with_pin_policy(mut self, pin: PinPolicy) -> Self {
        self.pin = pin;
        self
    }
}
