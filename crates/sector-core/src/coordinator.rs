// ── Polling coordinator ──
//
// Drives the polling cycle for one panel: makes sure the session is valid,
// fetches panel info when due, then status, locks, temperatures and smart
// plugs concurrently (plus housecheck sensors and the event log when those
// are due), and publishes the merged result as a new immutable snapshot. Cycles are serialized by the cycle lock, and versions are
// assigned under it, so publication order always equals version order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sector_api::{AuthError, AuthSession};
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::{IntervalClamp, PollSettings};
use crate::fetch::{Fetchers, ResourceFetcher};
use crate::model::{Capabilities, Resource, ResourceSlot, Snapshot, StaleReason};
use crate::stream::SnapshotStream;
use crate::transition::TransitionTracker;

/// Schedules cycles and publishes snapshots.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`.
#[derive(Clone)]
pub struct PollingCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    auth: Arc<AuthSession>,
    fetchers: Fetchers,
    panel_id: String,
    settings: PollSettings,
    clamp: Option<IntervalClamp>,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    tracker: Arc<TransitionTracker>,
    cycle: Mutex<CycleState>,
    cycles_started: AtomicU64,
    last_started: StdMutex<Option<Instant>>,
    nudge: Notify,
}

/// Bookkeeping carried from one cycle to the next.
struct CycleState {
    /// Cycles left before panel info is due again. Zero means due now.
    info_countdown: u32,
    /// Same, for housecheck sensors and the event log.
    slow_countdown: u32,
}

impl PollingCoordinator {
    /// Build a coordinator publishing into `snapshot_tx`.
    ///
    /// The poll interval is clamped to the configured floor here; the clamp
    /// is logged and available from [`interval_clamp`](Self::interval_clamp).
    pub fn new(
        auth: Arc<AuthSession>,
        fetchers: Fetchers,
        panel_id: impl Into<String>,
        settings: PollSettings,
        snapshot_tx: watch::Sender<Arc<Snapshot>>,
        tracker: Arc<TransitionTracker>,
    ) -> Self {
        let (settings, clamp) = settings.clamped();
        Self {
            inner: Arc::new(CoordinatorInner {
                auth,
                fetchers,
                panel_id: panel_id.into(),
                settings,
                clamp,
                snapshot_tx,
                tracker,
                cycle: Mutex::new(CycleState {
                    info_countdown: 0,
                    slow_countdown: 0,
                }),
                cycles_started: AtomicU64::new(0),
                last_started: StdMutex::new(None),
                nudge: Notify::new(),
            }),
        }
    }

    pub fn panel_id(&self) -> &str {
        &self.inner.panel_id
    }

    /// Effective poll interval, after clamping.
    pub fn interval(&self) -> Duration {
        self.inner.settings.interval
    }

    pub fn interval_clamp(&self) -> Option<IntervalClamp> {
        self.inner.clamp
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshot_tx.subscribe())
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Number of cycles started so far. A snapshot whose `cycle` is greater
    /// than a value read here started after the read.
    pub fn cycles_started(&self) -> u64 {
        self.inner.cycles_started.load(Ordering::Acquire)
    }

    /// Bring the next scheduled cycle forward, but never closer than the
    /// floor to the previous cycle start.
    pub fn nudge(&self) {
        self.inner.nudge.notify_one();
    }

    // ── Cycle ────────────────────────────────────────────────────────

    /// Run one cycle now and return the snapshot it published.
    ///
    /// Waits for a cycle already in progress to finish first.
    pub async fn refresh_now(&self) -> Arc<Snapshot> {
        let inner = &*self.inner;
        let mut state = inner.cycle.lock().await;

        let cycle = inner.cycles_started.fetch_add(1, Ordering::AcqRel) + 1;
        *self.last_started_slot() = Some(Instant::now());
        let started_at = Utc::now();
        let previous = self.current();
        debug!(cycle, "cycle started");

        let assembled = tokio::time::timeout(
            inner.settings.cycle_timeout,
            self.assemble(&mut state, &previous, cycle, started_at),
        )
        .await;

        let mut snapshot = match assembled {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!(cycle, error = %e, "authentication failed, publishing stale snapshot");
                previous.stale_copy(StaleReason::AuthFailed, cycle, started_at)
            }
            Err(_) => {
                warn!(
                    cycle,
                    timeout_secs = inner.settings.cycle_timeout.as_secs(),
                    "cycle timed out, publishing stale snapshot"
                );
                previous.stale_copy(StaleReason::CycleTimeout, cycle, started_at)
            }
        };
        snapshot.version = previous.version + 1;

        if snapshot.is_partial() {
            warn!(cycle, version = snapshot.version, "published partial snapshot");
        } else {
            debug!(cycle, version = snapshot.version, "published snapshot");
        }

        let fresh_events = snapshot.new_events_since(&previous).len();
        if fresh_events > 0 {
            debug!(cycle, count = fresh_events, "new panel events");
        }

        let snapshot = Arc::new(snapshot);
        inner.snapshot_tx.send_replace(Arc::clone(&snapshot));
        inner.tracker.reconcile(&snapshot);
        snapshot
    }

    async fn assemble(
        &self,
        state: &mut CycleState,
        previous: &Snapshot,
        cycle: u64,
        started_at: DateTime<Utc>,
    ) -> Result<Snapshot, AuthError> {
        let inner = &*self.inner;
        inner.auth.ensure_valid().await?;

        let panel_id = inner.panel_id.as_str();
        let fetchers = &inner.fetchers;

        let info_due = state.info_countdown == 0 || previous.installation.data().is_none();
        let installation = if info_due {
            let slot = fetch_slot(&fetchers.info, panel_id, true, &previous.installation).await;
            state.info_countdown = if slot.fetch_error() {
                0
            } else {
                inner.settings.info_refresh_every.saturating_sub(1)
            };
            slot
        } else {
            state.info_countdown -= 1;
            previous.installation.clone()
        };

        // Until the panel has described itself, fetch everything.
        let caps = installation
            .data()
            .map_or_else(Capabilities::all, |i| i.capabilities);

        let slow_due = state.slow_countdown == 0;
        let (
            status,
            locks,
            temperatures,
            smartplugs,
            doors_and_windows,
            smoke_detectors,
            leakage_detectors,
            events,
        ) = tokio::join!(
            fetch_slot(&fetchers.status, panel_id, true, &previous.status),
            fetch_slot(
                &fetchers.locks,
                panel_id,
                caps.covers(Resource::Locks),
                &previous.locks
            ),
            fetch_slot(
                &fetchers.temperatures,
                panel_id,
                caps.covers(Resource::Temperatures),
                &previous.temperatures
            ),
            fetch_slot(
                &fetchers.smartplugs,
                panel_id,
                caps.covers(Resource::Smartplugs),
                &previous.smartplugs
            ),
            fetch_slot_when_due(
                &fetchers.doors_and_windows,
                panel_id,
                caps.covers(Resource::DoorsAndWindows),
                slow_due,
                &previous.doors_and_windows
            ),
            fetch_slot_when_due(
                &fetchers.smoke_detectors,
                panel_id,
                caps.covers(Resource::SmokeDetectors),
                slow_due,
                &previous.smoke_detectors
            ),
            fetch_slot_when_due(
                &fetchers.leakage_detectors,
                panel_id,
                caps.covers(Resource::LeakageDetectors),
                slow_due,
                &previous.leakage_detectors
            ),
            fetch_slot_when_due(
                &fetchers.events,
                panel_id,
                caps.covers(Resource::EventLog),
                slow_due,
                &previous.events
            ),
        );

        if slow_due {
            let failed = doors_and_windows.fetch_error()
                || smoke_detectors.fetch_error()
                || leakage_detectors.fetch_error()
                || events.fetch_error();
            state.slow_countdown = if failed {
                0
            } else {
                inner.settings.slow_refresh_every.saturating_sub(1)
            };
        } else {
            state.slow_countdown -= 1;
        }

        Ok(Snapshot {
            version: previous.version,
            cycle,
            started_at,
            assembled_at: Utc::now(),
            installation,
            status,
            locks,
            temperatures,
            smartplugs,
            doors_and_windows,
            smoke_detectors,
            leakage_detectors,
            events,
            stale: None,
        })
    }

    // ── Scheduling ───────────────────────────────────────────────────

    /// Scheduled cycle loop. Returns once `cancel` fires; cancellation is
    /// only observed between cycles, so no snapshot is left half-published.
    pub async fn run(&self, cancel: CancellationToken) {
        let interval = self.inner.settings.interval;
        let mut next = self.after_last_start(interval);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep_until(next) => {}
                () = self.inner.nudge.notified() => {
                    let earliest = self.after_last_start(self.inner.settings.min_interval);
                    if earliest < next {
                        debug!("nudged, next cycle brought forward");
                        next = earliest;
                    }
                    continue;
                }
            }

            self.refresh_now().await;
            next = self.after_last_start(interval);
        }

        debug!("polling loop stopped");
    }

    fn after_last_start(&self, delay: Duration) -> Instant {
        let last = *self.last_started_slot();
        last.map_or_else(Instant::now, |t| t + delay)
    }

    fn last_started_slot(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.inner
            .last_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Like [`fetch_slot`], but carries the previous slot over on cycles where
/// the resource is not due.
async fn fetch_slot_when_due<F: ResourceFetcher>(
    fetcher: &F,
    panel_id: &str,
    wanted: bool,
    due: bool,
    previous: &ResourceSlot<F::Output>,
) -> ResourceSlot<F::Output> {
    if wanted && !due {
        return previous.clone();
    }
    fetch_slot(fetcher, panel_id, wanted, previous).await
}

/// Fetch one sub-resource into a slot. Failures keep the previous value.
async fn fetch_slot<F: ResourceFetcher>(
    fetcher: &F,
    panel_id: &str,
    wanted: bool,
    previous: &ResourceSlot<F::Output>,
) -> ResourceSlot<F::Output> {
    let resource = F::RESOURCE;
    if !wanted {
        trace!(%resource, "not present on this installation, skipping");
        return ResourceSlot::default();
    }
    match fetcher.fetch(panel_id).await {
        Ok(data) => ResourceSlot::fetched(data),
        Err(e) => {
            warn!(%resource, error = %e, "fetch failed, keeping last known value");
            ResourceSlot::failed(previous, e.to_string())
        }
    }
}
