//! Owned session map with best-effort durability.
//!
//! The store is mutated only through the session manager. After every
//! mutation the manager calls [`SessionStore::persist`]; a failing
//! write is logged and otherwise ignored, because the in-memory state
//! is the source of truth for the lifetime of the process.

use std::collections::HashMap;

use crate::capacity::CapacityRegistry;
use crate::session::{AttendanceSession, BreakCategory, UserId};
use crate::storage::{SnapshotPersistence, StateSnapshot};

pub struct SessionStore {
    sessions: HashMap<UserId, AttendanceSession>,
    persistence: Box<dyn SnapshotPersistence>,
}

impl SessionStore {
    pub fn new(persistence: Box<dyn SnapshotPersistence>) -> Self {
        Self {
            sessions: HashMap::new(),
            persistence,
        }
    }

    /// Load the snapshot into this store and seed the registry's
    /// membership from it. A missing or unreadable snapshot starts the
    /// day empty; the failure is logged, not raised.
    pub fn restore(&mut self, registry: &mut CapacityRegistry) {
        let snapshot = match self.persistence.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "state snapshot unreadable, starting empty");
                return;
            }
        };
        self.sessions = snapshot.sessions();
        for category in BreakCategory::ALL {
            for &user in snapshot.members(category) {
                // Cap still applies; surplus entries are dropped here
                // and the reaper reconciles the rest.
                registry.try_acquire(category, user);
            }
        }
        tracing::info!(sessions = self.sessions.len(), "restored state snapshot");
    }

    pub fn get(&self, user_id: UserId) -> Option<&AttendanceSession> {
        self.sessions.get(&user_id)
    }

    pub fn get_mut(&mut self, user_id: UserId) -> Option<&mut AttendanceSession> {
        self.sessions.get_mut(&user_id)
    }

    pub fn insert(&mut self, session: AttendanceSession) {
        self.sessions.insert(session.user_id, session);
    }

    pub fn remove(&mut self, user_id: UserId) -> Option<AttendanceSession> {
        self.sessions.remove(&user_id)
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.sessions.keys().copied().collect()
    }

    pub fn display_name(&self, user_id: UserId) -> Option<&str> {
        self.sessions.get(&user_id).map(|s| s.display_name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttendanceSession> {
        self.sessions.values()
    }

    /// Write the full state through the persistence port. Best effort:
    /// a failure is logged and the in-memory mutation stands.
    pub fn persist(&self, registry: &CapacityRegistry) {
        let snapshot = StateSnapshot::capture(&self.sessions, registry);
        if let Err(e) = self.persistence.save(&snapshot) {
            tracing::warn!(error = %e, "failed to persist state snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::JsonFileSnapshot;
    use chrono::{DateTime, FixedOffset};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    /// Persistence fake that refuses every write.
    struct FailingSnapshot {
        attempts: Arc<AtomicUsize>,
    }

    impl SnapshotPersistence for FailingSnapshot {
        fn save(&self, _snapshot: &StateSnapshot) -> Result<(), StorageError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Unavailable("disk on fire".into()))
        }

        fn load(&self) -> Result<Option<StateSnapshot>, StorageError> {
            Err(StorageError::Unavailable("disk on fire".into()))
        }
    }

    #[test]
    fn persist_failure_is_swallowed() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut store = SessionStore::new(Box::new(FailingSnapshot {
            attempts: attempts.clone(),
        }));
        store.insert(AttendanceSession::clocked_in(
            1,
            "Budi",
            at("2025-06-02T09:00:00+07:00"),
        ));

        let registry = CapacityRegistry::new(4);
        store.persist(&registry);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        // The in-memory mutation stands.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn restore_failure_starts_empty() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut store = SessionStore::new(Box::new(FailingSnapshot { attempts }));
        let mut registry = CapacityRegistry::new(4);
        store.restore(&mut registry);
        assert!(store.is_empty());
        assert_eq!(registry.size(BreakCategory::Restroom), 0);
    }

    #[test]
    fn persist_then_restore_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let mut store = SessionStore::new(Box::new(JsonFileSnapshot::new(path.clone())));
        let mut session = AttendanceSession::clocked_in(9, "Sari", at("2025-06-02T08:45:00+07:00"));
        session.active_break = Some(BreakCategory::Restroom);
        session.break_started_at = Some(at("2025-06-02T09:10:00+07:00"));
        session.break_counts.restroom = 1;
        store.insert(session.clone());

        let mut registry = CapacityRegistry::new(4);
        registry.try_acquire(BreakCategory::Restroom, 9);
        store.persist(&registry);

        let mut reloaded = SessionStore::new(Box::new(JsonFileSnapshot::new(path)));
        let mut reloaded_registry = CapacityRegistry::new(4);
        reloaded.restore(&mut reloaded_registry);

        assert_eq!(reloaded.get(9), Some(&session));
        assert!(reloaded_registry.holds(BreakCategory::Restroom, 9));
    }

    #[test]
    fn restore_caps_surplus_membership() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        // Snapshot written by a run with a larger cap.
        let mut big = CapacityRegistry::new(8);
        let mut sessions = HashMap::new();
        for user in 1..=6 {
            let mut s =
                AttendanceSession::clocked_in(user, format!("U{user}"), at("2025-06-02T09:00:00+07:00"));
            s.active_break = Some(BreakCategory::Smoking);
            s.break_started_at = Some(at("2025-06-02T09:10:00+07:00"));
            sessions.insert(user, s.clone());
            big.try_acquire(BreakCategory::Smoking, user);
        }
        JsonFileSnapshot::new(path.clone())
            .save(&StateSnapshot::capture(&sessions, &big))
            .unwrap();

        let mut store = SessionStore::new(Box::new(JsonFileSnapshot::new(path)));
        let mut registry = CapacityRegistry::new(4);
        store.restore(&mut registry);
        assert_eq!(registry.size(BreakCategory::Smoking), 4);
        assert_eq!(store.len(), 6);
    }
}
