// ── Hub facade ──
//
// Full lifecycle management for one Sector installation: authentication,
// panel resolution, the scheduled polling task, command routing, and
// snapshot subscriptions.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use sector_api::{AuthSession, SectorClient, Transport};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandDispatcher};
use crate::config::{HubConfig, IntervalClamp};
use crate::coordinator::PollingCoordinator;
use crate::error::{CommandError, CoreError, FetchError};
use crate::fetch::Fetchers;
use crate::model::{ArmedState, Lock, LockStatus, PanelStatus, Resource, Smartplug, Snapshot, SwitchStatus};
use crate::stream::SnapshotStream;
use crate::transition::{EntityKey, Target, TransitionTracker};

/// An entity as the host should display it: its last reported state plus
/// the state a command is moving it to, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView<T, S> {
    pub entity: T,
    pub pending: Option<S>,
}

impl<T, S> EntityView<T, S> {
    pub fn is_in_transition(&self) -> bool {
        self.pending.is_some()
    }
}

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc<HubInner>`. Does nothing until
/// [`connect()`](Self::connect) is called.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: HubConfig,
    auth: Arc<AuthSession>,
    client: SectorClient,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    tracker: Arc<TransitionTracker>,
    connected: ArcSwapOption<Connected>,
    connect_lock: Mutex<()>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

struct Connected {
    coordinator: PollingCoordinator,
    dispatcher: CommandDispatcher,
}

impl Hub {
    /// Build the transport and session. No network I/O.
    pub fn new(config: HubConfig) -> Result<Self, CoreError> {
        let transport = Arc::new(Transport::new(&config.transport)?);
        let auth = Arc::new(AuthSession::new(
            Arc::clone(&transport),
            config.credentials.clone(),
            config.auth,
        ));
        let client = SectorClient::new(transport, Arc::clone(&auth));
        let (snapshot_tx, _) = watch::channel(Arc::new(Snapshot::empty()));
        let tracker = Arc::new(TransitionTracker::new(config.transition_ttl));

        Ok(Self {
            inner: Arc::new(HubInner {
                config,
                auth,
                client,
                snapshot_tx,
                tracker,
                connected: ArcSwapOption::empty(),
                connect_lock: Mutex::new(()),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.inner.auth
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Log in, resolve the panel, run the first cycle and start polling.
    ///
    /// Fails if the first cycle cannot load the installation and its
    /// status. Calling it again once connected is a no-op.
    pub async fn connect(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        let _guard = self.inner.connect_lock.lock().await;
        if self.inner.connected.load().is_some() {
            return Ok(());
        }

        let config = &self.inner.config;
        self.inner.auth.login(config.credentials.clone()).await?;

        let panel_id = self.resolve_panel_id().await?;
        debug!(panel_id, "resolved panel");

        let coordinator = PollingCoordinator::new(
            Arc::clone(&self.inner.auth),
            Fetchers::new(&self.inner.client),
            panel_id.clone(),
            config.poll,
            self.inner.snapshot_tx.clone(),
            Arc::clone(&self.inner.tracker),
        );

        let first = coordinator.refresh_now().await;
        check_initial(&first)?;

        let dispatcher = CommandDispatcher::new(
            self.inner.client.clone(),
            coordinator.clone(),
            Arc::clone(&self.inner.tracker),
            config.pin.clone(),
        );

        let cancel = self.inner.cancel.child_token();
        let poller = coordinator.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(async move { poller.run(cancel).await }));

        self.inner.connected.store(Some(Arc::new(Connected {
            coordinator,
            dispatcher,
        })));
        info!(panel_id, "connected to panel");
        Ok(())
    }

    /// Stop polling, wait for in-flight commands, then log out.
    ///
    /// A cycle in progress is allowed to finish and publish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        if let Some(connected) = self.inner.connected.load_full() {
            connected.dispatcher.close().await;
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        if let Err(e) = self.inner.auth.logout().await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
        debug!("hub shut down");
    }

    /// The configured panel if the account can see it, otherwise the
    /// account's first panel.
    async fn resolve_panel_id(&self) -> Result<String, CoreError> {
        let panels = self.inner.client.panel_list().await?;
        if let Some(ref id) = self.inner.config.panel_id {
            return if panels.iter().any(|p| p.panel_id == *id) {
                Ok(id.clone())
            } else {
                Err(CoreError::PanelNotFound(id.clone()))
            };
        }
        if panels.len() > 1 {
            info!(count = panels.len(), "account has several panels, using the first");
        }
        panels
            .into_iter()
            .next()
            .map(|p| p.panel_id)
            .ok_or(CoreError::NoPanel)
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Subscribe to published snapshots. Works before `connect`, starting
    /// from an empty version-0 snapshot.
    pub fn snapshots(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshot_tx.subscribe())
    }

    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Run one cycle immediately.
    pub async fn refresh_now(&self) -> Result<Arc<Snapshot>, CoreError> {
        let connected = self.connected().ok_or(CoreError::NotConnected)?;
        Ok(connected.coordinator.refresh_now().await)
    }

    /// Reported when the configured poll interval was raised to the floor.
    pub fn interval_clamp(&self) -> Option<IntervalClamp> {
        self.inner.config.poll.effective_interval().1
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// The dispatcher, once connected.
    pub fn commands(&self) -> Option<CommandDispatcher> {
        self.connected().map(|c| c.dispatcher.clone())
    }

    pub async fn execute(&self, command: Command) -> Result<(), CommandError> {
        self.dispatcher()?.execute(command).await
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
        self.dispatcher()?.lock(serial, code).await
    }

    pub async fn unlock(&self, serial: &str, code: Option<SecretString>) -> Result<(), CommandError> {
        self.dispatcher()?.unlock(serial, code).await
    }

    pub async fn turn_on_smartplug(&self, id: &str) -> Result<(), CommandError> {
        self.dispatcher()?.turn_on_smartplug(id).await
    }

    pub async fn turn_off_smartplug(&self, id: &str) -> Result<(), CommandError> {
        self.dispatcher()?.turn_off_smartplug(id).await
    }

    fn dispatcher(&self) -> Result<CommandDispatcher, CommandError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CommandError::ShutDown);
        }
        self.commands().ok_or(CommandError::NotReady)
    }

    fn connected(&self) -> Option<Arc<Connected>> {
        self.inner.connected.load_full()
    }

    // ── Entity views ─────────────────────────────────────────────────

    pub fn alarm_view(&self) -> Option<EntityView<PanelStatus, ArmedState>> {
        let snap = self.current_snapshot();
        let status = snap.status.data()?.clone();
        let pending = match self.inner.tracker.pending(&EntityKey::Alarm) {
            Some(Target::Alarm(target)) => Some(target),
            _ => None,
        };
        Some(EntityView {
            entity: status,
            pending,
        })
    }

    pub fn lock_view(&self, serial: &str) -> Option<EntityView<Lock, LockStatus>> {
        let snap = self.current_snapshot();
        let lock = snap.lock(serial)?.clone();
        let pending = match self.inner.tracker.pending(&EntityKey::Lock(serial.to_owned())) {
            Some(Target::Lock(target)) => Some(target),
            _ => None,
        };
        Some(EntityView {
            entity: lock,
            pending,
        })
    }

    pub fn smartplug_view(&self, id: &str) -> Option<EntityView<Smartplug, SwitchStatus>> {
        let snap = self.current_snapshot();
        let plug = snap.smartplug(id)?.clone();
        let pending = match self.inner.tracker.pending(&EntityKey::Smartplug(id.to_owned())) {
            Some(Target::Switch(target)) => Some(target),
            _ => None,
        };
        Some(EntityView {
            entity: plug,
            pending,
        })
    }
}

/// The first cycle must load the installation and its status.
fn check_initial(snapshot: &Snapshot) -> Result<(), CoreError> {
    if let Some(reason) = snapshot.stale {
        return Err(CoreError::ConnectionFailed(format!("initial cycle failed: {reason}")));
    }
    for (resource, error) in [
        (Resource::PanelInfo, snapshot.installation.last_error()),
        (Resource::PanelStatus, snapshot.status.last_error()),
    ] {
        if let Some(message) = error {
            return Err(CoreError::InitialFetch {
                resource,
                source: FetchError::Transient(message.to_owned()),
            });
        }
    }
    Ok(())
}
