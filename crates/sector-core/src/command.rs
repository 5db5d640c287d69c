// ── Command dispatch ──
//
// State-changing operations (arm, disarm, partial arm, lock, unlock, smart
// plug switching). Every command is checked against the latest snapshot
// before any network I/O, sent exactly once, and on success leaves an
// in-transition marker and nudges the coordinator.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use sector_api::{ArmAction, LockAction, SectorClient};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::PinPolicy;
use crate::coordinator::PollingCoordinator;
use crate::error::CommandError;
use crate::model::{ArmedState, LockStatus, Snapshot, SwitchStatus};
use crate::transition::{EntityKey, Target, TransitionTracker};

/// All write operations against a panel.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Alarm ────────────────────────────────────────────────────────
    Arm { code: Option<SecretString> },
    Disarm { code: Option<SecretString> },
    PartialArm { code: Option<SecretString> },

    // ── Locks ────────────────────────────────────────────────────────
    Lock {
        serial: String,
        code: Option<SecretString>,
    },
    Unlock {
        serial: String,
        code: Option<SecretString>,
    },

    // ── Smart plugs ──────────────────────────────────────────────────
    TurnOnSmartplug { id: String },
    TurnOffSmartplug { id: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Arm { .. } => "arm",
            Self::Disarm { .. } => "disarm",
            Self::PartialArm { .. } => "partial_arm",
            Self::Lock { .. } => "lock",
            Self::Unlock { .. } => "unlock",
            Self::TurnOnSmartplug { .. } => "turn_on_smartplug",
            Self::TurnOffSmartplug { .. } => "turn_off_smartplug",
        }
    }

    /// The entity whose state this command changes.
    pub fn entity(&self) -> EntityKey {
        match self {
            Self::Arm { .. } | Self::Disarm { .. } | Self::PartialArm { .. } => EntityKey::Alarm,
            Self::Lock { serial, .. } | Self::Unlock { serial, .. } => EntityKey::Lock(serial.clone()),
            Self::TurnOnSmartplug { id } | Self::TurnOffSmartplug { id } => {
                EntityKey::Smartplug(id.clone())
            }
        }
    }

    /// The state the entity should end up in.
    pub fn target(&self) -> Target {
        match self {
            Self::Arm { .. } => Target::Alarm(ArmedState::Armed),
            Self::Disarm { .. } => Target::Alarm(ArmedState::Disarmed),
            Self::PartialArm { .. } => Target::Alarm(ArmedState::PartiallyArmed),
            Self::Lock { .. } => Target::Lock(LockStatus::Locked),
            Self::Unlock { .. } => Target::Lock(LockStatus::Unlocked),
            Self::TurnOnSmartplug { .. } => Target::Switch(SwitchStatus::On),
            Self::TurnOffSmartplug { .. } => Target::Switch(SwitchStatus::Off),
        }
    }

    fn code(&self) -> Option<&SecretString> {
        match self {
            Self::Arm { code }
            | Self::Disarm { code }
            | Self::PartialArm { code }
            | Self::Lock { code, .. }
            | Self::Unlock { code, .. } => code.as_ref(),
            Self::TurnOnSmartplug { .. } | Self::TurnOffSmartplug { .. } => None,
        }
    }
}

/// A command that passed every pre-check, ready to send.
enum Request<'a> {
    Alarm(ArmAction, SecretString),
    Lock(&'a str, LockAction, SecretString),
    Smartplug(&'a str, bool),
}

/// Validates and sends panel commands.
///
/// Cheaply cloneable via `Arc<DispatcherInner>`.
#[derive(Clone)]
pub struct CommandDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    client: SectorClient,
    coordinator: PollingCoordinator,
    tracker: Arc<TransitionTracker>,
    pin: PinPolicy,
    /// Read-held by every in-flight command; `close` takes it for write.
    closed: RwLock<bool>,
}

impl CommandDispatcher {
    pub fn new(
        client: SectorClient,
        coordinator: PollingCoordinator,
        tracker: Arc<TransitionTracker>,
        pin: PinPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                client,
                coordinator,
                tracker,
                pin,
                closed: RwLock::new(false),
            }),
        }
    }

    pub async fn arm(&self, code: Option<SecretString>) -> Result<(), CommandError> {
        self.execute(Command::Arm { code }).await
    }

    pub async fn disarm(&self, code: Option<SecretString>) -> Result<(), CommandError> {
        self.execute(Command::Disarm { code }).await
    }

    pub async fn partial_arm(&self, code: Option<SecretString>) -> Result<(), CommandError> {
        self.execute(Command::PartialArm { code }).await
    }

    pub async fn lock(&self, serial: &str, code: Option<SecretString>) -> Result<(), CommandError> {
        self.execute(Command::Lock {
            serial: serial.to_owned(),
            code,
        })
        .await
    }

    pub async fn unlock(&self, serial: &str, code: Option<SecretString>) -> Result<(), CommandError> {
        self.execute(Command::Unlock {
            serial: serial.to_owned(),
            code,
        })
        .await
    }

    pub async fn turn_on_smartplug(&self, id: &str) -> Result<(), CommandError> {
        self.execute(Command::TurnOnSmartplug { id: id.to_owned() })
            .await
    }

    pub async fn turn_off_smartplug(&self, id: &str) -> Result<(), CommandError> {
        self.execute(Command::TurnOffSmartplug { id: id.to_owned() })
            .await
    }

    /// Check `command` against the latest snapshot, send it once, and on
    /// success mark the entity in transition and nudge the coordinator.
    pub async fn execute(&self, command: Command) -> Result<(), CommandError> {
        let closed = self.inner.closed.read().await;
        if *closed {
            return Err(CommandError::ShutDown);
        }

        let snapshot = self.inner.coordinator.current();
        let request = self.prepare(&command, &snapshot)?;

        let panel_id = self.inner.coordinator.panel_id();
        let client = &self.inner.client;
        let sent = match request {
            Request::Alarm(action, ref code) => client.set_alarm(panel_id, action, code).await,
            Request::Lock(serial, action, ref code) => {
                client.set_lock(panel_id, serial, action, code).await
            }
            Request::Smartplug(id, on) => client.set_smartplug(panel_id, id, on).await,
        };

        if let Err(e) = sent {
            let err = CommandError::from(e);
            warn!(command = command.name(), error = %err, "command failed");
            return Err(err);
        }

        let after_cycle = self.inner.coordinator.cycles_started();
        if self
            .inner
            .tracker
            .begin(command.entity(), command.target(), after_cycle)
            .is_some()
        {
            debug!(command = command.name(), "superseded an earlier pending transition");
        }
        self.inner.coordinator.nudge();
        info!(command = command.name(), "command accepted");
        Ok(())
    }

    /// Stop accepting commands. Waits for in-flight ones to finish.
    pub async fn close(&self) {
        *self.inner.closed.write().await = true;
    }

    /// Pre-checks, in order: snapshot loaded, device known, feature
    /// supported, code resolved and well-formed, panel online.
    fn prepare<'a>(&self, command: &'a Command, snapshot: &Snapshot) -> Result<Request<'a>, CommandError> {
        let (Some(installation), Some(status)) = (snapshot.installation.data(), snapshot.status.data())
        else {
            return Err(CommandError::NotReady);
        };

        match command {
            Command::Lock { serial, .. } | Command::Unlock { serial, .. } => {
                if snapshot.lock(serial).is_none() {
                    return Err(CommandError::UnknownDevice(serial.clone()));
                }
            }
            Command::TurnOnSmartplug { id } | Command::TurnOffSmartplug { id } => {
                if snapshot.smartplug(id).is_none() {
                    return Err(CommandError::UnknownDevice(id.clone()));
                }
            }
            Command::PartialArm { .. } if !installation.capabilities.supports_partial_arm => {
                return Err(CommandError::Unsupported("partial arm".into()));
            }
            Command::Arm { .. } | Command::Disarm { .. } | Command::PartialArm { .. } => {}
        }

        let code = match command {
            Command::TurnOnSmartplug { .. } | Command::TurnOffSmartplug { .. } => None,
            _ => Some(self.resolve_code(command.code(), installation.code_length)?),
        };

        if !status.online {
            return Err(CommandError::NotOnline);
        }

        Ok(match (command, code) {
            (Command::TurnOnSmartplug { id }, _) => Request::Smartplug(id, true),
            (Command::TurnOffSmartplug { id }, _) => Request::Smartplug(id, false),
            (_, None) => return Err(CommandError::InvalidCodeFormat("code required".into())),
            (Command::Arm { .. }, Some(code)) => Request::Alarm(ArmAction::Arm, code),
            (Command::Disarm { .. }, Some(code)) => Request::Alarm(ArmAction::Disarm, code),
            (Command::PartialArm { .. }, Some(code)) => Request::Alarm(ArmAction::PartialArm, code),
            (Command::Lock { serial, .. }, Some(code)) => Request::Lock(serial, LockAction::Lock, code),
            (Command::Unlock { serial, .. }, Some(code)) => {
                Request::Lock(serial, LockAction::Unlock, code)
            }
        })
    }

    /// The given code, or the configured default when the PIN is not
    /// required. Must be ASCII digits of the panel's code length.
    fn resolve_code(
        &self,
        given: Option<&SecretString>,
        code_length: Option<usize>,
    ) -> Result<SecretString, CommandError> {
        let pin = &self.inner.pin;
        let code = match given {
            Some(code) => code.clone(),
            None if !pin.require_pin => pin
                .default_code
                .clone()
                .ok_or_else(|| CommandError::InvalidCodeFormat("no code given and no default code configured".into()))?,
            None => return Err(CommandError::InvalidCodeFormat("code required".into())),
        };

        let digits = code.expose_secret();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CommandError::InvalidCodeFormat("code must contain digits only".into()));
        }
        if let Some(expected) = code_length {
            if digits.len() != expected {
                return Err(CommandError::InvalidCodeFormat(format!(
                    "expected exactly {expected} digits"
                )));
            }
        }
        Ok(code)
    }
}
