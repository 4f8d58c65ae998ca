//! Shared break-capacity accounting.
//!
//! Tracks, per break category, which users currently hold a slot. Both
//! categories share one configured maximum. There is no waiting list:
//! a rejected requester simply retries later.
//!
//! Membership here mirrors `active_break` on the sessions. A crash can
//! desync the two; the reaper reconciles them, so agreement is eventual
//! rather than guaranteed at every instant.

use std::collections::BTreeSet;

use crate::session::{BreakCategory, PerCategory, UserId};

/// Per-category occupant sets bounded by a shared slot cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityRegistry {
    max_slots: usize,
    occupants: PerCategory<BTreeSet<UserId>>,
}

impl CapacityRegistry {
    pub fn new(max_slots: usize) -> Self {
        Self {
            max_slots,
            occupants: PerCategory::default(),
        }
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Take a slot for `user`. Idempotent: a user already holding a
    /// slot in this category succeeds without consuming another one.
    /// Returns `false`, leaving state unchanged, when the category is
    /// at capacity.
    pub fn try_acquire(&mut self, category: BreakCategory, user: UserId) -> bool {
        let set = self.occupants.get_mut(category);
        if set.contains(&user) {
            return true;
        }
        if set.len() >= self.max_slots {
            return false;
        }
        set.insert(user);
        true
    }

    /// Idempotent removal. Returns whether the user held a slot.
    pub fn release(&mut self, category: BreakCategory, user: UserId) -> bool {
        self.occupants.get_mut(category).remove(&user)
    }

    /// Drop the user from every category. Used by the reset paths.
    pub fn release_all(&mut self, user: UserId) {
        for category in BreakCategory::ALL {
            self.occupants.get_mut(category).remove(&user);
        }
    }

    pub fn holds(&self, category: BreakCategory, user: UserId) -> bool {
        self.occupants.get(category).contains(&user)
    }

    pub fn size(&self, category: BreakCategory) -> usize {
        self.occupants.get(category).len()
    }

    pub fn members(&self, category: BreakCategory) -> &BTreeSet<UserId> {
        self.occupants.get(category)
    }

    pub fn clear(&mut self) {
        self.occupants = PerCategory::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn acquire_until_full_then_reject() {
        let mut reg = CapacityRegistry::new(4);
        for user in 1..=4 {
            assert!(reg.try_acquire(BreakCategory::Smoking, user));
        }
        assert_eq!(reg.size(BreakCategory::Smoking), 4);
        assert!(!reg.try_acquire(BreakCategory::Smoking, 5));
        assert_eq!(reg.size(BreakCategory::Smoking), 4);
        assert!(!reg.holds(BreakCategory::Smoking, 5));
    }

    #[test]
    fn acquire_is_idempotent_for_holder() {
        let mut reg = CapacityRegistry::new(1);
        assert!(reg.try_acquire(BreakCategory::Restroom, 9));
        assert!(reg.try_acquire(BreakCategory::Restroom, 9));
        assert_eq!(reg.size(BreakCategory::Restroom), 1);
    }

    #[test]
    fn categories_do_not_share_slots() {
        let mut reg = CapacityRegistry::new(1);
        assert!(reg.try_acquire(BreakCategory::Restroom, 1));
        assert!(reg.try_acquire(BreakCategory::Smoking, 2));
    }

    #[test]
    fn release_is_idempotent() {
        let mut reg = CapacityRegistry::new(2);
        reg.try_acquire(BreakCategory::Smoking, 1);
        assert!(reg.release(BreakCategory::Smoking, 1));
        assert!(!reg.release(BreakCategory::Smoking, 1));
        assert_eq!(reg.size(BreakCategory::Smoking), 0);
    }

    #[test]
    fn release_all_clears_both_categories() {
        let mut reg = CapacityRegistry::new(2);
        reg.try_acquire(BreakCategory::Smoking, 1);
        reg.try_acquire(BreakCategory::Restroom, 1);
        reg.release_all(1);
        assert_eq!(reg.size(BreakCategory::Smoking), 0);
        assert_eq!(reg.size(BreakCategory::Restroom), 0);
    }

    proptest! {
        /// No sequence of acquires/releases pushes a category past the cap.
        #[test]
        fn size_never_exceeds_max(ops in prop::collection::vec((0u8..2, 0i64..16, prop::bool::ANY), 0..200)) {
            let mut reg = CapacityRegistry::new(4);
            for (cat, user, acquire) in ops {
                let category = if cat == 0 { BreakCategory::Restroom } else { BreakCategory::Smoking };
                if acquire {
                    reg.try_acquire(category, user);
                } else {
                    reg.release(category, user);
                }
                prop_assert!(reg.size(BreakCategory::Restroom) <= 4);
                prop_assert!(reg.size(BreakCategory::Smoking) <= 4);
            }
        }
    }
}
