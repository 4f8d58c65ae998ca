//! Attendance session records and break categories.
//!
//! One [`AttendanceSession`] exists per user per workday. It is created
//! on clock-in, mutated by break start/end, and removed on clock-out
//! once the summary has been emitted.
//!
//! Invariant maintained by every public operation: `active_break` is set
//! if and only if `break_started_at` is set.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

/// Numeric sender identity supplied by the chat transport.
pub type UserId = i64;

/// One of the fixed break types. Categories have independent counters
/// and capacity slots but share a single daily rest quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakCategory {
    Restroom,
    Smoking,
}

impl BreakCategory {
    pub const ALL: [BreakCategory; 2] = [BreakCategory::Restroom, BreakCategory::Smoking];

    pub fn label(self) -> &'static str {
        match self {
            BreakCategory::Restroom => "restroom",
            BreakCategory::Smoking => "smoking",
        }
    }
}

impl fmt::Display for BreakCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A value per break category. The category set is closed, so this is a
/// plain struct rather than an open map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerCategory<T> {
    pub restroom: T,
    pub smoking: T,
}

impl<T> PerCategory<T> {
    pub fn get(&self, category: BreakCategory) -> &T {
        match category {
            BreakCategory::Restroom => &self.restroom,
            BreakCategory::Smoking => &self.smoking,
        }
    }

    pub fn get_mut(&mut self, category: BreakCategory) -> &mut T {
        match category {
            BreakCategory::Restroom => &mut self.restroom,
            BreakCategory::Smoking => &mut self.smoking,
        }
    }
}

impl PerCategory<Duration> {
    pub fn zero() -> Self {
        Self {
            restroom: Duration::zero(),
            smoking: Duration::zero(),
        }
    }

    pub fn total(&self) -> Duration {
        self.restroom + self.smoking
    }
}

/// Per-user attendance state for the current workday.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSession {
    pub user_id: UserId,
    pub display_name: String,
    /// Absent means "not clocked in today".
    pub clock_in_at: Option<DateTime<FixedOffset>>,
    /// Set once at clock-out; the session is removed right after.
    pub clock_out_at: Option<DateTime<FixedOffset>>,
    /// Currently running break, if any.
    pub active_break: Option<BreakCategory>,
    /// Present iff `active_break` is present.
    pub break_started_at: Option<DateTime<FixedOffset>>,
    /// Breaks taken today, per category.
    pub break_counts: PerCategory<u32>,
    /// Accumulated elapsed break time today, per category. Monotone
    /// except under an explicit activity reset.
    pub break_durations: PerCategory<Duration>,
}

impl AttendanceSession {
    /// Fresh session for a user who just clocked in.
    pub fn clocked_in(
        user_id: UserId,
        display_name: impl Into<String>,
        at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            clock_in_at: Some(at),
            clock_out_at: None,
            active_break: None,
            break_started_at: None,
            break_counts: PerCategory::default(),
            break_durations: PerCategory::zero(),
        }
    }

    pub fn is_clocked_in(&self) -> bool {
        self.clock_in_at.is_some() && self.clock_out_at.is_none()
    }

    pub fn on_break(&self) -> bool {
        self.active_break.is_some()
    }

    /// The break fields disagree: a break is marked active but has no
    /// start time. Only possible after a bad snapshot or crash.
    pub fn break_state_corrupt(&self) -> bool {
        self.active_break.is_some() != self.break_started_at.is_some()
    }

    /// Total accumulated rest across all categories.
    pub fn total_rest(&self) -> Duration {
        self.break_durations.total()
    }

    /// Close the active break at `now`, accumulating the elapsed time
    /// into the category's duration. Returns the category and elapsed
    /// time, or `None` when no well-formed break was active (a corrupt
    /// half-set state is force-cleared without accumulating anything).
    pub fn close_break(&mut self, now: DateTime<FixedOffset>) -> Option<(BreakCategory, Duration)> {
        let category = match self.active_break.take() {
            Some(c) => c,
            None => {
                self.break_started_at = None;
                return None;
            }
        };
        let started = match self.break_started_at.take() {
            Some(s) => s,
            None => return None,
        };
        let elapsed = (now - started).max(Duration::zero());
        *self.break_durations.get_mut(category) += elapsed;
        Some((category, elapsed))
    }

    /// Zero all break counters and drop any active break without
    /// accumulating its elapsed time. Used by the activity reset.
    pub fn reset_activity(&mut self) {
        self.active_break = None;
        self.break_started_at = None;
        self.break_counts = PerCategory::default();
        self.break_durations = PerCategory::zero();
    }
}

/// Read-only projection of a session for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub user_id: UserId,
    pub display_name: String,
    pub clock_in_at: Option<DateTime<FixedOffset>>,
    pub clock_out_at: Option<DateTime<FixedOffset>>,
    pub active_break: Option<BreakCategory>,
    pub restroom_count: u32,
    pub restroom_seconds: i64,
    pub smoking_count: u32,
    pub smoking_seconds: i64,
    pub rest_remaining_seconds: i64,
}

impl SessionView {
    pub fn of(session: &AttendanceSession, rest_remaining: Duration) -> Self {
        Self {
            user_id: session.user_id,
            display_name: session.display_name.clone(),
            clock_in_at: session.clock_in_at,
            clock_out_at: session.clock_out_at,
            active_break: session.active_break,
            restroom_count: session.break_counts.restroom,
            restroom_seconds: session.break_durations.restroom.num_seconds(),
            smoking_count: session.break_counts.smoking,
            smoking_seconds: session.break_durations.smoking.num_seconds(),
            rest_remaining_seconds: rest_remaining.num_seconds(),
        }
    }
}

/// `HH:MM:SS`, hours not wrapped at 24. Negative durations clamp to
/// zero; the state machine never produces them.
pub fn fmt_hms(d: Duration) -> String {
    let total = d.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Local wall-clock time of day.
pub fn fmt_clock(t: DateTime<FixedOffset>) -> String {
    t.format("%H:%M:%S").to_string()
}
