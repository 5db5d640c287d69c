// ── In-transition markers ──
//
// After a command is accepted the entity shows as in transition until a
// snapshot that *started after* the command reports its slot cleanly, or
// until the marker's TTL runs out. Per entity the state machine is
//
//   Idle → Pending(expires_at) → Confirmed | Superseded | Expired
//
// and a new command for the same entity supersedes the pending one.

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::model::{ArmedState, LockStatus, Snapshot, SwitchStatus};

/// The entity a command targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Alarm,
    Lock(String),
    Smartplug(String),
}

/// The state a command asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Target {
    Alarm(ArmedState),
    Lock(LockStatus),
    Switch(SwitchStatus),
}

/// How a pending marker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// A later clean snapshot covered the entity. `reached` says whether it
    /// showed the requested state.
    Confirmed { reached: bool },
    /// A newer command for the same entity replaced it.
    Superseded,
    Expired,
}

#[derive(Debug, Clone)]
struct Pending {
    target: Target,
    /// Cycles numbered at or below this started before the command.
    after_cycle: u64,
    expires_at: Instant,
}

/// Per-entity pending markers.
pub struct TransitionTracker {
    pending: DashMap<EntityKey, Pending>,
    ttl: Duration,
}

impl TransitionTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    /// Mark `key` as moving to `target`. `after_cycle` is the number of
    /// cycles started when the command completed.
    ///
    /// Returns `Superseded` if an earlier marker was replaced.
    pub fn begin(&self, key: EntityKey, target: Target, after_cycle: u64) -> Option<TransitionOutcome> {
        let pending = Pending {
            target,
            after_cycle,
            expires_at: Instant::now() + self.ttl,
        };
        debug!(?key, ?target, after_cycle, "transition pending");
        self.pending
            .insert(key, pending)
            .map(|_| TransitionOutcome::Superseded)
    }

    /// The pending target for `key`, if its marker is still live.
    pub fn pending(&self, key: &EntityKey) -> Option<Target> {
        let now = Instant::now();
        let expired = self
            .pending
            .remove_if(key, |_, p| p.expires_at <= now)
            .is_some();
        if expired {
            debug!(?key, "transition expired");
            return None;
        }
        self.pending.get(key).map(|p| p.target)
    }

    pub fn is_pending(&self, key: &EntityKey) -> bool {
        self.pending(key).is_some()
    }

    /// Clear markers resolved by `snapshot` and drop expired ones.
    pub fn reconcile(&self, snapshot: &Snapshot) -> Vec<(EntityKey, TransitionOutcome)> {
        let now = Instant::now();
        let mut resolved = Vec::new();

        self.pending.retain(|key, pending| {
            if pending.expires_at <= now {
                resolved.push((key.clone(), TransitionOutcome::Expired));
                return false;
            }
            if snapshot.stale.is_some() || snapshot.cycle <= pending.after_cycle {
                return true;
            }
            match observed(snapshot, key) {
                Some(current) => {
                    let reached = current == pending.target;
                    resolved.push((key.clone(), TransitionOutcome::Confirmed { reached }));
                    false
                }
                None => true,
            }
        });

        for (key, outcome) in &resolved {
            debug!(?key, ?outcome, "transition resolved");
        }
        resolved
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// The entity's state in `snapshot`, only if its slot fetched cleanly.
fn observed(snapshot: &Snapshot, key: &EntityKey) -> Option<Target> {
    match key {
        EntityKey::Alarm => snapshot
            .status
            .is_clean()
            .then(|| snapshot.status.data().map(|s| Target::Alarm(s.armed)))
            .flatten(),
        EntityKey::Lock(serial) => snapshot
            .locks
            .is_clean()
            .then(|| snapshot.lock(serial).map(|l| Target::Lock(l.status)))
            .flatten(),
        EntityKey::Smartplug(id) => snapshot
            .smartplugs
            .is_clean()
            .then(|| snapshot.smartplug(id).map(|p| Target::Switch(p.status)))
            .flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Lock, ResourceSlot};

    fn snapshot_with_lock(cycle: u64, status: LockStatus) -> Snapshot {
        let mut snap = Snapshot::empty();
        snap.cycle = cycle;
        snap.locks = ResourceSlot::fetched(vec![Lock {
            serial: "L1".into(),
            label: "Front".into(),
            status,
            autolock: false,
            battery_low: false,
        }]);
        snap
    }

    fn key() -> EntityKey {
        EntityKey::Lock("L1".into())
    }

    #[test]
    fn snapshot_started_before_command_does_not_clear() {
        let tracker = TransitionTracker::new(Duration::from_secs(90));
        tracker.begin(key(), Target::Lock(LockStatus::Unlocked), 4);

        assert!(tracker.reconcile(&snapshot_with_lock(4, LockStatus::Locked)).is_empty());
        assert!(tracker.is_pending(&key()));

        let resolved = tracker.reconcile(&snapshot_with_lock(5, LockStatus::Unlocked));
        assert_eq!(
            resolved,
            vec![(key(), TransitionOutcome::Confirmed { reached: true })]
        );
        assert!(!tracker.is_pending(&key()));
    }

    #[test]
    fn failed_or_stale_slot_does_not_clear() {
        let tracker = TransitionTracker::new(Duration::from_secs(90));
        tracker.begin(key(), Target::Lock(LockStatus::Unlocked), 1);

        let good = snapshot_with_lock(2, LockStatus::Unlocked);
        let mut failed = good.clone();
        failed.locks = ResourceSlot::failed(&good.locks, "HTTP 502");
        assert!(tracker.reconcile(&failed).is_empty());

        let stale = good.stale_copy(crate::model::StaleReason::CycleTimeout, 3, good.started_at);
        assert!(tracker.reconcile(&stale).is_empty());
        assert!(tracker.is_pending(&key()));
    }

    #[test]
    fn later_command_supersedes() {
        let tracker = TransitionTracker::new(Duration::from_secs(90));
        assert_eq!(tracker.begin(key(), Target::Lock(LockStatus::Unlocked), 1), None);
        assert_eq!(
            tracker.begin(key(), Target::Lock(LockStatus::Locked), 1),
            Some(TransitionOutcome::Superseded)
        );
        assert_eq!(tracker.pending(&key()), Some(Target::Lock(LockStatus::Locked)));
    }

    #[tokio::test(start_paused = true)]
    async fn marker_expires_after_ttl() {
        let tracker = TransitionTracker::new(Duration::from_secs(90));
        tracker.begin(EntityKey::Alarm, Target::Alarm(ArmedState::Armed), 1);

        tokio::time::advance(Duration::from_secs(89)).await;
        assert!(tracker.is_pending(&EntityKey::Alarm));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!tracker.is_pending(&EntityKey::Alarm));
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_reports_expiry() {
        let tracker = TransitionTracker::new(Duration::from_secs(1));
        tracker.begin(key(), Target::Lock(LockStatus::Unlocked), 1);
        tokio::time::advance(Duration::from_secs(2)).await;

        let resolved = tracker.reconcile(&snapshot_with_lock(1, LockStatus::Locked));
        assert_eq!(resolved, vec![(key(), TransitionOutcome::Expired)]);
    }
}
