//! Stale-break reconciliation.
//!
//! A break can be left open forever by a crash, a missed end-break or
//! an overnight gap. The reaper walks every session with an active
//! break and force-closes any that started on an earlier calendar date
//! or ran past an absolute ceiling (6 hours by default), releasing the
//! capacity slot. A date-crossing break accumulates elapsed time only
//! up to the midnight after it started; a same-day over-ceiling break
//! accumulates the real elapsed time. The reaper also drops registry
//! members that no longer match any session, so capacity slots can
//! never leak permanently.
//!
//! The reaper never raises: a malformed session is repaired and skipped
//! without affecting reconciliation of the others. It runs on a timer
//! ([`spawn`]) and synchronously before capacity reads, always inside
//! the same exclusion domain as command handling.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, FixedOffset};

use crate::capacity::CapacityRegistry;
use crate::manager::SessionManager;
use crate::session::{fmt_hms, BreakCategory, UserId};
use crate::store::SessionStore;

/// A break the reaper force-closed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReapedBreak {
    pub user_id: UserId,
    pub display_name: String,
    pub category: BreakCategory,
    pub elapsed: Duration,
}

pub(crate) struct ReapOutcome {
    pub reaped: Vec<ReapedBreak>,
    /// Whether anything was mutated (including repairs and orphaned
    /// slot drops that produce no `ReapedBreak`).
    pub changed: bool,
}

/// One reconciliation pass over every session and both occupant sets.
pub(crate) fn reap_sessions(
    store: &mut SessionStore,
    registry: &mut CapacityRegistry,
    now: DateTime<FixedOffset>,
    ceiling: Duration,
) -> ReapOutcome {
    let mut outcome = ReapOutcome {
        reaped: Vec::new(),
        changed: false,
    };

    for user_id in store.user_ids() {
        let Some(session) = store.get_mut(user_id) else {
            continue;
        };

        if session.break_state_corrupt() {
            tracing::error!(user_id, "half-set break state found during reap, clearing");
            session.active_break = None;
            session.break_started_at = None;
            registry.release_all(user_id);
            outcome.changed = true;
            continue;
        }

        let (Some(_), Some(started)) = (session.active_break, session.break_started_at) else {
            continue;
        };
        let crossed_midnight = started.date_naive() != now.date_naive();
        if !crossed_midnight && now - started <= ceiling {
            continue;
        }

        // A break that crossed midnight only counts until the day it
        // started ended; the overnight gap is not rest time.
        let cutoff = if crossed_midnight {
            midnight_after(started).map_or(now, |midnight| midnight.min(now))
        } else {
            now
        };

        if let Some((category, elapsed)) = session.close_break(cutoff) {
            let display_name = session.display_name.clone();
            registry.release(category, user_id);
            tracing::info!(
                user_id,
                category = %category,
                elapsed = %fmt_hms(elapsed),
                "force-closed stale break"
            );
            outcome.reaped.push(ReapedBreak {
                user_id,
                display_name,
                category,
                elapsed,
            });
            outcome.changed = true;
        }
    }

    // Occupant sets can also point at users whose session is gone or no
    // longer on that break. Drop those members so the slot frees up.
    for category in BreakCategory::ALL {
        let orphans: Vec<UserId> = registry
            .members(category)
            .iter()
            .copied()
            .filter(|&uid| {
                store
                    .get(uid)
                    .map_or(true, |s| s.active_break != Some(category))
            })
            .collect();
        for user_id in orphans {
            registry.release(category, user_id);
            tracing::warn!(user_id, category = %category, "dropped orphaned capacity slot");
            outcome.changed = true;
        }
    }

    outcome
}

/// First instant of the calendar day after `t`, in `t`'s offset.
fn midnight_after(t: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    t.date_naive()
        .succ_opt()?
        .and_hms_opt(0, 0, 0)?
        .and_local_timezone(*t.offset())
        .single()
}

/// Periodic reaper task. Locks the shared manager on every tick, the
/// same exclusion domain commands run under.
///
/// ```ignore
/// let manager = Arc::new(Mutex::new(manager));
/// let handle = reaper::spawn(manager.clone(), config.reaper_interval());
/// ```
pub fn spawn(
    manager: Arc<Mutex<SessionManager>>,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let mut manager = manager.lock().unwrap_or_else(PoisonError::into_inner);
            manager.reap_now();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::error::StorageError;
    use crate::session::AttendanceSession;
    use crate::storage::{Config, SnapshotPersistence, StateSnapshot};
    use crate::summary::NullSink;

    struct NoopSnapshot;

    impl SnapshotPersistence for NoopSnapshot {
        fn save(&self, _snapshot: &StateSnapshot) -> Result<(), StorageError> {
            Ok(())
        }
        fn load(&self) -> Result<Option<StateSnapshot>, StorageError> {
            Ok(None)
        }
    }

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn on_break(
        user_id: UserId,
        category: BreakCategory,
        clocked_in: &str,
        started: &str,
    ) -> AttendanceSession {
        let mut s = AttendanceSession::clocked_in(user_id, format!("U{user_id}"), at(clocked_in));
        s.active_break = Some(category);
        s.break_started_at = Some(at(started));
        s
    }

    fn store() -> SessionStore {
        SessionStore::new(Box::new(NoopSnapshot))
    }

    #[test]
    fn fresh_break_is_left_alone() {
        let mut store = store();
        let mut registry = CapacityRegistry::new(4);
        store.insert(on_break(
            1,
            BreakCategory::Restroom,
            "2025-06-02T09:00:00+07:00",
            "2025-06-02T09:10:00+07:00",
        ));
        registry.try_acquire(BreakCategory::Restroom, 1);

        let outcome = reap_sessions(
            &mut store,
            &mut registry,
            at("2025-06-02T09:12:00+07:00"),
            Duration::hours(6),
        );
        assert!(outcome.reaped.is_empty());
        assert!(!outcome.changed);
        assert!(registry.holds(BreakCategory::Restroom, 1));
    }

    #[test]
    fn break_past_midnight_is_closed_at_the_midnight_cutoff() {
        let mut store = store();
        let mut registry = CapacityRegistry::new(4);
        store.insert(on_break(
            1,
            BreakCategory::Restroom,
            "2025-06-02T20:00:00+07:00",
            "2025-06-02T23:58:00+07:00",
        ));
        registry.try_acquire(BreakCategory::Restroom, 1);

        let outcome = reap_sessions(
            &mut store,
            &mut registry,
            at("2025-06-03T00:01:00+07:00"),
            Duration::hours(6),
        );
        assert_eq!(outcome.reaped.len(), 1);
        assert_eq!(outcome.reaped[0].elapsed, Duration::minutes(2));
        assert_eq!(registry.size(BreakCategory::Restroom), 0);

        let session = store.get(1).unwrap();
        assert_eq!(session.break_durations.restroom, Duration::minutes(2));
        assert!(session.active_break.is_none());
        assert!(session.break_started_at.is_none());
    }

    #[test]
    fn overnight_break_accumulates_nothing_past_midnight() {
        let mut store = store();
        let mut registry = CapacityRegistry::new(4);
        store.insert(on_break(
            1,
            BreakCategory::Smoking,
            "2025-06-02T20:00:00+07:00",
            "2025-06-02T23:00:00+07:00",
        ));
        registry.try_acquire(BreakCategory::Smoking, 1);

        // Reaped only the next morning; the overnight gap must not
        // count as rest time.
        let outcome = reap_sessions(
            &mut store,
            &mut registry,
            at("2025-06-03T09:00:00+07:00"),
            Duration::hours(6),
        );
        assert_eq!(outcome.reaped.len(), 1);
        assert_eq!(outcome.reaped[0].elapsed, Duration::hours(1));
        assert_eq!(
            store.get(1).unwrap().break_durations.smoking,
            Duration::hours(1)
        );
    }

    #[test]
    fn break_past_absolute_ceiling_is_closed() {
        let mut store = store();
        let mut registry = CapacityRegistry::new(4);
        store.insert(on_break(
            2,
            BreakCategory::Smoking,
            "2025-06-02T08:00:00+07:00",
            "2025-06-02T08:30:00+07:00",
        ));
        registry.try_acquire(BreakCategory::Smoking, 2);

        let outcome = reap_sessions(
            &mut store,
            &mut registry,
            at("2025-06-02T14:31:00+07:00"),
            Duration::hours(6),
        );
        assert_eq!(outcome.reaped.len(), 1);
        assert_eq!(
            outcome.reaped[0].elapsed,
            Duration::hours(6) + Duration::minutes(1)
        );
        assert_eq!(registry.size(BreakCategory::Smoking), 0);
    }

    #[test]
    fn exactly_at_ceiling_is_not_yet_stale() {
        let mut store = store();
        let mut registry = CapacityRegistry::new(4);
        store.insert(on_break(
            2,
            BreakCategory::Smoking,
            "2025-06-02T08:00:00+07:00",
            "2025-06-02T08:30:00+07:00",
        ));

        let outcome = reap_sessions(
            &mut store,
            &mut registry,
            at("2025-06-02T14:30:00+07:00"),
            Duration::hours(6),
        );
        assert!(outcome.reaped.is_empty());
    }

    #[test]
    fn orphaned_registry_members_are_dropped() {
        let mut store = store();
        let mut registry = CapacityRegistry::new(4);
        // Slot holder without any session at all.
        registry.try_acquire(BreakCategory::Smoking, 9);
        // Slot holder whose session is no longer on that break.
        store.insert(AttendanceSession::clocked_in(
            3,
            "U3",
            at("2025-06-02T09:00:00+07:00"),
        ));
        registry.try_acquire(BreakCategory::Restroom, 3);

        let outcome = reap_sessions(
            &mut store,
            &mut registry,
            at("2025-06-02T09:30:00+07:00"),
            Duration::hours(6),
        );
        assert!(outcome.changed);
        assert!(outcome.reaped.is_empty());
        assert_eq!(registry.size(BreakCategory::Smoking), 0);
        assert_eq!(registry.size(BreakCategory::Restroom), 0);
    }

    #[test]
    fn corrupt_session_is_repaired_without_aborting_the_pass() {
        let mut store = store();
        let mut registry = CapacityRegistry::new(4);

        // Corrupt: active break, no start time.
        let mut corrupt =
            AttendanceSession::clocked_in(1, "U1", at("2025-06-02T09:00:00+07:00"));
        corrupt.active_break = Some(BreakCategory::Restroom);
        store.insert(corrupt);
        registry.try_acquire(BreakCategory::Restroom, 1);

        // Valid stale break that must still be reconciled.
        store.insert(on_break(
            2,
            BreakCategory::Smoking,
            "2025-06-01T20:00:00+07:00",
            "2025-06-01T23:50:00+07:00",
        ));
        registry.try_acquire(BreakCategory::Smoking, 2);

        let outcome = reap_sessions(
            &mut store,
            &mut registry,
            at("2025-06-02T00:05:00+07:00"),
            Duration::hours(6),
        );

        let repaired = store.get(1).unwrap();
        assert!(!repaired.break_state_corrupt());
        assert!(repaired.active_break.is_none());
        assert_eq!(registry.size(BreakCategory::Restroom), 0);

        assert_eq!(outcome.reaped.len(), 1);
        assert_eq!(outcome.reaped[0].user_id, 2);
        // 23:50 up to midnight, not up to the reap moment.
        assert_eq!(outcome.reaped[0].elapsed, Duration::minutes(10));
    }

    #[tokio::test]
    async fn periodic_task_reaps_on_its_own_tick() {
        let clock = ManualClock::new(at("2025-06-02T23:58:00+07:00"));
        let mut manager = SessionManager::new(
            &Config::default(),
            Box::new(NoopSnapshot),
            Arc::new(clock.clone()),
            Box::new(NullSink),
        );
        manager.clock_in(1, "Budi", clock.now());
        manager
            .start_break(1, BreakCategory::Restroom, clock.now())
            .unwrap();

        // Cross midnight before the task starts; its first tick fires
        // immediately and must close the break.
        clock.set(at("2025-06-03T00:01:00+07:00"));
        let shared = Arc::new(Mutex::new(manager));
        let handle = spawn(shared.clone(), std::time::Duration::from_millis(10));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        handle.abort();

        let manager = shared.lock().unwrap_or_else(PoisonError::into_inner);
        let view = manager.session_info(1).unwrap();
        assert!(view.active_break.is_none());
        assert_eq!(view.restroom_seconds, 120);
    }
}
