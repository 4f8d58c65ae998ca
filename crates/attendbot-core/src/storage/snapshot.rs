//! Durable state snapshot.
//!
//! The whole in-memory state (every live session plus the capacity
//! membership lists) is written after each mutation so a restarted
//! process can pick the day back up. Persistence is a crash-recovery
//! aid only: failures are logged by the store and never surface as
//! command failures.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::capacity::CapacityRegistry;
use crate::error::StorageError;
use crate::session::{AttendanceSession, BreakCategory, PerCategory, UserId};

/// One persisted session record. Field names are the stable on-disk
/// schema consumed by external storage adapters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub clock_in: Option<DateTime<FixedOffset>>,
    pub clock_out: Option<DateTime<FixedOffset>>,
    pub active_break: Option<BreakCategory>,
    pub break_start: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub restroom_count: u32,
    #[serde(default)]
    pub restroom_duration_seconds: i64,
    #[serde(default)]
    pub smoking_count: u32,
    #[serde(default)]
    pub smoking_duration_seconds: i64,
    #[serde(default)]
    pub display_name: String,
}

/// Complete persisted state: sessions keyed by stringified user id,
/// plus the two capacity membership lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub sessions: BTreeMap<String, PersistedSession>,
    #[serde(default)]
    pub active_restroom_users: Vec<UserId>,
    #[serde(default)]
    pub active_smoking_users: Vec<UserId>,
}

impl StateSnapshot {
    /// Capture the current in-memory state. Durations are truncated to
    /// whole seconds, matching the on-disk schema.
    pub fn capture(
        sessions: &HashMap<UserId, AttendanceSession>,
        registry: &CapacityRegistry,
    ) -> Self {
        let sessions = sessions
            .iter()
            .map(|(user_id, s)| {
                (
                    user_id.to_string(),
                    PersistedSession {
                        clock_in: s.clock_in_at,
                        clock_out: s.clock_out_at,
                        active_break: s.active_break,
                        break_start: s.break_started_at,
                        restroom_count: s.break_counts.restroom,
                        restroom_duration_seconds: s.break_durations.restroom.num_seconds(),
                        smoking_count: s.break_counts.smoking,
                        smoking_duration_seconds: s.break_durations.smoking.num_seconds(),
                        display_name: s.display_name.clone(),
                    },
                )
            })
            .collect();
        Self {
            sessions,
            active_restroom_users: registry.members(BreakCategory::Restroom).iter().copied().collect(),
            active_smoking_users: registry.members(BreakCategory::Smoking).iter().copied().collect(),
        }
    }

    /// Rebuild the in-memory session map. Records whose key is not a
    /// numeric user id are skipped (the snapshot is external input).
    pub fn sessions(&self) -> HashMap<UserId, AttendanceSession> {
        self.sessions
            .iter()
            .filter_map(|(key, p)| {
                let user_id: UserId = key.parse().ok()?;
                let session = AttendanceSession {
                    user_id,
                    display_name: p.display_name.clone(),
                    clock_in_at: p.clock_in,
                    clock_out_at: p.clock_out,
                    active_break: p.active_break,
                    break_started_at: p.break_start,
                    break_counts: PerCategory {
                        restroom: p.restroom_count,
                        smoking: p.smoking_count,
                    },
                    break_durations: PerCategory {
                        restroom: Duration::seconds(p.restroom_duration_seconds),
                        smoking: Duration::seconds(p.smoking_duration_seconds),
                    },
                };
                Some((user_id, session))
            })
            .collect()
    }

    pub fn members(&self, category: BreakCategory) -> &[UserId] {
        match category {
            BreakCategory::Restroom => &self.active_restroom_users,
            BreakCategory::Smoking => &self.active_smoking_users,
        }
    }
}

/// Port through which the session store persists and restores state.
///
/// Isolated as a trait so storage failures are testable with a fake
/// that always fails.
pub trait SnapshotPersistence: Send {
    fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError>;

    /// `Ok(None)` when no snapshot exists yet.
    fn load(&self) -> Result<Option<StateSnapshot>, StorageError>;
}

/// JSON file adapter, one document holding the whole state.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshot {
    path: PathBuf,
}

impl JsonFileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotPersistence for JsonFileSnapshot {
    fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string(snapshot).map_err(|source| StorageError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|source| StorageError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }

    fn load(&self) -> Result<Option<StateSnapshot>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::ReadFailed {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let snapshot = serde_json::from_str(&content).map_err(|source| StorageError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(snapshot))
    }
}
