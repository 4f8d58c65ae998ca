//! The session state machine.
//!
//! Per-user lifecycle:
//!
//! ```text
//! NOT_STARTED -> CLOCKED_IN -> (ON_BREAK <-> CLOCKED_IN)* -> CLOCKED_OUT (removed)
//! ```
//!
//! The manager validates each command against the sender's session, the
//! quota policy and the capacity registry, mutates state, persists the
//! snapshot best-effort and returns reply text. A clock-out emits one
//! [`AttendanceSummary`] through the sink and the in-memory day log.
//!
//! All access is expected to be serialized by the embedder (one
//! `Arc<Mutex<SessionManager>>` shared with the reaper task).

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::capacity::CapacityRegistry;
use crate::clock::Clock;
use crate::error::CommandError;
use crate::quota::QuotaPolicy;
use crate::reaper::{self, ReapedBreak};
use crate::session::{
    fmt_clock, fmt_hms, AttendanceSession, BreakCategory, SessionView, UserId,
};
use crate::storage::{Config, SnapshotPersistence};
use crate::store::SessionStore;
use crate::summary::{AttendanceSummary, SummaryLog, SummarySink};

/// A parsed chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ClockIn,
    StartBreak(BreakCategory),
    EndBreak,
    ClockOut,
    /// Zero the sender's break counters and drop any running break
    /// without counting its elapsed time.
    ResetActivity,
    /// Delete the sender's session entirely.
    ResetSession,
    /// Clear every session and all capacity. Administrative.
    AdminResetAll,
}

/// What the transport hands the core: an already-parsed command plus
/// sender identity and the message timestamp.
#[derive(Debug, Clone)]
pub struct CommandEvent {
    pub command: Command,
    pub user_id: UserId,
    pub display_name: String,
    pub at: DateTime<FixedOffset>,
}

/// One occupant of a break slot, for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occupant {
    pub user_id: UserId,
    pub display_name: String,
}

/// Read-only capacity occupancy per category.
#[derive(Debug, Clone, Serialize)]
pub struct CapacityView {
    pub max_slots: usize,
    pub restroom: Vec<Occupant>,
    pub smoking: Vec<Occupant>,
}

impl CapacityView {
    pub fn occupants(&self, category: BreakCategory) -> &[Occupant] {
        match category {
            BreakCategory::Restroom => &self.restroom,
            BreakCategory::Smoking => &self.smoking,
        }
    }

    pub fn is_full(&self, category: BreakCategory) -> bool {
        self.occupants(category).len() >= self.max_slots
    }

    /// Multi-line occupancy report in the shape of the original
    /// `/capacity` reply.
    pub fn render(&self) -> String {
        let mut out = String::from("Current break capacity:\n");
        for category in BreakCategory::ALL {
            let occupants = self.occupants(category);
            out.push_str(&format!(
                "{category}: {}/{} occupied\n",
                occupants.len(),
                self.max_slots
            ));
            if occupants.is_empty() {
                out.push_str("  (empty)\n");
            } else {
                for occupant in occupants {
                    out.push_str(&format!("  {}\n", occupant.display_name));
                }
            }
        }
        if BreakCategory::ALL.iter().any(|&c| self.is_full(c)) {
            out.push_str("Some categories are full; wait for a slot to free up.");
        } else {
            out.push_str("Slots are available.");
        }
        out
    }
}

/// Core command handler and read-query surface.
pub struct SessionManager {
    store: SessionStore,
    registry: CapacityRegistry,
    quota: QuotaPolicy,
    clock: Arc<dyn Clock>,
    sink: Box<dyn SummarySink>,
    day_log: SummaryLog,
    break_ceiling: Duration,
}

impl SessionManager {
    /// Build the manager, restore the last snapshot and reconcile it,
    /// mirroring the original boot sequence (load then cleanup).
    pub fn new(
        config: &Config,
        persistence: Box<dyn SnapshotPersistence>,
        clock: Arc<dyn Clock>,
        sink: Box<dyn SummarySink>,
    ) -> Self {
        let mut store = SessionStore::new(persistence);
        let mut registry = CapacityRegistry::new(config.max_break_slots);
        store.restore(&mut registry);
        let mut manager = Self {
            store,
            registry,
            quota: QuotaPolicy::new(config.quota()),
            clock,
            sink,
            day_log: SummaryLog::default(),
            break_ceiling: config.break_ceiling(),
        };
        manager.reap_now();
        manager
    }

    /// Current time in the office zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    /// Apply one command event and return the reply text. Typed
    /// failures become user-facing messages here; they never escape as
    /// errors.
    pub fn handle(&mut self, event: CommandEvent) -> String {
        let CommandEvent {
            command,
            user_id,
            display_name,
            at,
        } = event;
        let result = match command {
            Command::ClockIn => Ok(self.clock_in(user_id, &display_name, at)),
            Command::StartBreak(category) => self.start_break(user_id, category, at),
            Command::EndBreak => self.end_break(user_id, at),
            Command::ClockOut => self.clock_out(user_id, at),
            Command::ResetActivity => self.reset_activity(user_id),
            Command::ResetSession => self.reset_session(user_id),
            Command::AdminResetAll => Ok(self.admin_reset_all()),
        };
        result.unwrap_or_else(|e| reply_for(&e))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Always succeeds. An existing non-terminal session for the user
    /// is overwritten, stray capacity slots included.
    pub fn clock_in(&mut self, user_id: UserId, display_name: &str, now: DateTime<FixedOffset>) -> String {
        self.registry.release_all(user_id);
        self.store
            .insert(AttendanceSession::clocked_in(user_id, display_name, now));
        self.store.persist(&self.registry);
        format!("{display_name} clocked in at {}", fmt_clock(now))
    }

    pub fn start_break(
        &mut self,
        user_id: UserId,
        category: BreakCategory,
        now: DateTime<FixedOffset>,
    ) -> Result<String, CommandError> {
        let quota = self.quota;
        let max = self.registry.max_slots();

        let session = self
            .store
            .get_mut(user_id)
            .filter(|s| s.is_clocked_in())
            .ok_or(CommandError::NotClockedIn)?;
        if let Some(active) = session.active_break {
            return Err(CommandError::AlreadyOnBreak(active));
        }
        if !quota.may_start_break(session) {
            return Err(CommandError::QuotaExhausted);
        }
        if !self.registry.try_acquire(category, user_id) {
            return Err(CommandError::CapacityFull {
                category,
                used: self.registry.size(category),
                max,
            });
        }

        session.active_break = Some(category);
        session.break_started_at = Some(now);
        *session.break_counts.get_mut(category) += 1;

        let count = *session.break_counts.get(category);
        let remaining = quota.remaining(session);
        let display_name = session.display_name.clone();
        let used = self.registry.size(category);
        self.store.persist(&self.registry);

        Ok(format!(
            "{display_name} started a {category} break at {} (#{count} today)\n\
             {category}: {used}/{max} occupied\n\
             rest remaining {}",
            fmt_clock(now),
            fmt_hms(remaining)
        ))
    }

    pub fn end_break(
        &mut self,
        user_id: UserId,
        now: DateTime<FixedOffset>,
    ) -> Result<String, CommandError> {
        let quota = self.quota;

        let session = self
            .store
            .get_mut(user_id)
            .filter(|s| s.is_clocked_in())
            .ok_or(CommandError::NotClockedIn)?;
        if session.active_break.is_none() {
            // Mirror-image half-set state cannot accumulate anything;
            // drop it on the way out.
            session.break_started_at = None;
            return Err(CommandError::NotOnBreak);
        }
        if session.break_started_at.is_none() {
            tracing::error!(user_id, "active break without start time, force-clearing");
            session.active_break = None;
            self.registry.release_all(user_id);
            self.store.persist(&self.registry);
            return Err(CommandError::CorruptState);
        }

        let Some((category, elapsed)) = session.close_break(now) else {
            return Err(CommandError::CorruptState);
        };
        let count = *session.break_counts.get(category);
        let total = *session.break_durations.get(category);
        let remaining = quota.remaining(session);
        let display_name = session.display_name.clone();

        self.registry.release(category, user_id);
        self.store.persist(&self.registry);

        Ok(format!(
            "{display_name} ended the {category} break after {}\n\
             {category} today: {count}x ({})\n\
             rest remaining {}",
            fmt_hms(elapsed),
            fmt_hms(total),
            fmt_hms(remaining)
        ))
    }

    /// Clock out, auto-closing any running break first so its elapsed
    /// time counts into the summary. Emits the summary, removes the
    /// session.
    pub fn clock_out(
        &mut self,
        user_id: UserId,
        now: DateTime<FixedOffset>,
    ) -> Result<String, CommandError> {
        if !self
            .store
            .get(user_id)
            .map(AttendanceSession::is_clocked_in)
            .unwrap_or(false)
        {
            return Err(CommandError::NotClockedIn);
        }
        let Some(mut session) = self.store.remove(user_id) else {
            return Err(CommandError::NotClockedIn);
        };

        // Harmless when no break is open; also clears half-set state.
        session.close_break(now);
        self.registry.release_all(user_id);
        session.clock_out_at = Some(now);

        let clock_in_at = session.clock_in_at.unwrap_or(now);
        let rest_used = session.total_rest();
        let worked = ((now - clock_in_at) - rest_used).max(Duration::zero());
        let remaining = self.quota.remaining(&session);

        let summary = AttendanceSummary {
            user_id,
            display_name: session.display_name.clone(),
            date: now.date_naive(),
            clock_in_at,
            clock_out_at: now,
            restroom_count: session.break_counts.restroom,
            restroom_seconds: session.break_durations.restroom.num_seconds(),
            smoking_count: session.break_counts.smoking,
            smoking_seconds: session.break_durations.smoking.num_seconds(),
            worked_seconds: worked.num_seconds(),
            rest_used_seconds: rest_used.num_seconds(),
            rest_remaining_seconds: remaining.num_seconds(),
        };
        if let Err(e) = self.sink.record(&summary) {
            tracing::warn!(error = %e, user_id, "summary sink failed");
        }
        let reply = format!(
            "{} clocked out\n\
             in {} / out {}\n\
             restroom {}x ({})\n\
             smoking {}x ({})\n\
             worked {}\n\
             rest used {}, remaining {}",
            summary.display_name,
            fmt_clock(clock_in_at),
            fmt_clock(now),
            summary.restroom_count,
            fmt_hms(session.break_durations.restroom),
            summary.smoking_count,
            fmt_hms(session.break_durations.smoking),
            fmt_hms(worked),
            fmt_hms(rest_used),
            fmt_hms(remaining)
        );
        self.day_log.push(summary);
        self.store.persist(&self.registry);
        Ok(reply)
    }

    /// Zero the sender's counters and drop any running break without
    /// accumulating its elapsed time. Distinct from end-break.
    pub fn reset_activity(&mut self, user_id: UserId) -> Result<String, CommandError> {
        let session = self
            .store
            .get_mut(user_id)
            .filter(|s| s.is_clocked_in())
            .ok_or(CommandError::NotClockedIn)?;
        session.reset_activity();
        let display_name = session.display_name.clone();
        self.registry.release_all(user_id);
        self.store.persist(&self.registry);
        Ok(format!(
            "Break counters for {display_name} were reset. Start again with a new break when needed."
        ))
    }

    /// Delete the sender's session entirely, releasing any held slots.
    pub fn reset_session(&mut self, user_id: UserId) -> Result<String, CommandError> {
        let session = self.store.remove(user_id).ok_or(CommandError::NoSession)?;
        self.registry.release_all(user_id);
        self.store.persist(&self.registry);
        Ok(format!(
            "Session for {} was deleted. Clock in to start over.",
            session.display_name
        ))
    }

    /// Wipe every session and all capacity. Never fails.
    pub fn admin_reset_all(&mut self) -> String {
        self.store.clear();
        self.registry.clear();
        self.store.persist(&self.registry);
        "All sessions and break capacity were cleared.".to_string()
    }

    /// Force-close every running break and empty both occupant sets.
    /// Administrative unstick for leftover occupancy.
    pub fn clear_capacity(&mut self) -> String {
        let now = self.clock.now();
        for user_id in self.store.user_ids() {
            if let Some(session) = self.store.get_mut(user_id) {
                if session.on_break() || session.break_state_corrupt() {
                    session.close_break(now);
                }
            }
        }
        self.registry.clear();
        self.store.persist(&self.registry);
        "Break capacity was cleared; running breaks were closed.".to_string()
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Occupancy per category. Reaps first so the report never shows
    /// breaks that should already have ended.
    pub fn capacity_snapshot(&mut self) -> CapacityView {
        self.reap_now();
        CapacityView {
            max_slots: self.registry.max_slots(),
            restroom: self.occupants(BreakCategory::Restroom),
            smoking: self.occupants(BreakCategory::Smoking),
        }
    }

    fn occupants(&self, category: BreakCategory) -> Vec<Occupant> {
        self.registry
            .members(category)
            .iter()
            .map(|&user_id| Occupant {
                user_id,
                display_name: self
                    .store
                    .display_name(user_id)
                    .unwrap_or("unknown")
                    .to_string(),
            })
            .collect()
    }

    pub fn session_info(&self, user_id: UserId) -> Option<SessionView> {
        let session = self.store.get(user_id)?;
        Some(SessionView::of(session, self.quota.remaining(session)))
    }

    /// Formatted report of the summaries emitted on the given date.
    /// Called by the external scheduled-report timer.
    pub fn daily_report(&self, date: NaiveDate) -> String {
        self.day_log.render_report(date)
    }

    pub fn today_report(&self) -> String {
        self.daily_report(self.clock.now().date_naive())
    }

    /// Run one reaper pass now, persisting if anything changed.
    pub fn reap_now(&mut self) -> Vec<ReapedBreak> {
        let now = self.clock.now();
        let outcome =
            reaper::reap_sessions(&mut self.store, &mut self.registry, now, self.break_ceiling);
        if outcome.changed {
            self.store.persist(&self.registry);
        }
        outcome.reaped
    }
}

/// User-facing text for a refused command.
fn reply_for(err: &CommandError) -> String {
    match err {
        CommandError::NotClockedIn => "Please clock in first.".to_string(),
        CommandError::AlreadyOnBreak(category) => {
            format!("You are already on a {category} break. End it before starting another.")
        }
        CommandError::NotOnBreak => "You are not on a break.".to_string(),
        CommandError::QuotaExhausted => {
            "Your rest time for today is used up. No more breaks today.".to_string()
        }
        CommandError::CapacityFull {
            category,
            used,
            max,
        } => format!(
            "The {category} break is full ({used}/{max}). Try again when a slot frees up."
        ),
        CommandError::CorruptState => {
            "Your break state was inconsistent and has been cleared. Please retry.".to_string()
        }
        CommandError::NoSession => "You have no session today.".to_string(),
    }
}
