//! Daily rest-quota policy.
//!
//! Pure computation over a session's accumulated break durations. The
//! quota gates break *starts* only: any positive remainder admits a
//! break, and a running break is never cut off when the quota runs out
//! mid-break. That overdraw is deliberate (simplicity over strictness).

use chrono::Duration;

use crate::session::AttendanceSession;

/// Shared daily ceiling on accumulated break time across all categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    quota: Duration,
}

impl QuotaPolicy {
    pub fn new(quota: Duration) -> Self {
        Self { quota }
    }

    pub fn quota(&self) -> Duration {
        self.quota
    }

    /// `max(0, quota - accumulated rest)`. Never negative.
    pub fn remaining(&self, session: &AttendanceSession) -> Duration {
        (self.quota - session.total_rest()).max(Duration::zero())
    }

    /// A break may start while any rest time remains.
    pub fn may_start_break(&self, session: &AttendanceSession) -> bool {
        self.remaining(session) > Duration::zero()
    }
}

impl Default for QuotaPolicy {
    /// One hour per workday.
    fn default() -> Self {
        Self {
            quota: Duration::hours(1),
        }
    }
}
