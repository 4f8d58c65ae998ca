//! # Attendbot Core Library
//!
//! This library provides the core business logic for Attendbot, a
//! work-attendance and break-time tracker driven by a chat bot. The chat
//! transport itself is out of scope: the core consumes already-parsed
//! command events `(command, user_id, display_name, timestamp)` and
//! returns reply text, plus a finalized [`AttendanceSummary`] on
//! clock-out for an external exporter.
//!
//! ## Architecture
//!
//! - **Session Manager**: the command state machine. Validates and
//!   applies clock-in/out, break start/end and reset commands against
//!   per-user sessions and the shared capacity registry
//! - **Capacity Registry**: per-category sets of users currently on a
//!   break, bounded by a shared concurrency cap
//! - **Quota Policy**: daily rest-time accounting (remaining quota
//!   decays to zero, never below)
//! - **Reaper**: background reconciliation that force-closes breaks
//!   left open past midnight or past an absolute ceiling
//! - **Storage**: TOML configuration and a best-effort JSON state
//!   snapshot (crash-recovery aid, not a transaction boundary)
//!
//! ## Key Components
//!
//! - [`SessionManager`]: command handling and read queries
//! - [`CapacityRegistry`]: shared break-slot accounting
//! - [`SessionStore`]: owned session map with persistence port
//! - [`Config`]: application configuration management

pub mod capacity;
pub mod clock;
pub mod error;
pub mod manager;
pub mod quota;
pub mod reaper;
pub mod session;
pub mod storage;
pub mod store;
pub mod summary;

pub use capacity::CapacityRegistry;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CommandError, ConfigError, CoreError, StorageError};
pub use manager::{CapacityView, Command, CommandEvent, Occupant, SessionManager};
pub use quota::QuotaPolicy;
pub use reaper::ReapedBreak;
pub use session::{AttendanceSession, BreakCategory, SessionView, UserId};
pub use storage::{Config, JsonFileSnapshot, SnapshotPersistence, StateSnapshot};
pub use store::SessionStore;
pub use summary::{AttendanceSummary, JsonlSink, NullSink, SummarySink};
