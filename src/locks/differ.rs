//! Per-lock transition detection

use super::{LockKey, LockStates};
use crate::overlay::IconKey;

/// Remembers the last observed state of each lock and reports transitions.
#[derive(Debug, Clone)]
pub struct LockDiffer {
    previous: LockStates,
}

impl LockDiffer {
    /// Start from `initial`, so whatever is on at startup is not announced.
    pub fn new(initial: LockStates) -> Self {
        Self { previous: initial }
    }

    pub fn previous(&self) -> LockStates {
        self.previous
    }

    /// Compare `current` against the last sample.
    ///
    /// Returns one icon per lock that changed, in caps, num, scroll order.
    pub fn observe(&mut self, current: LockStates) -> Vec<IconKey> {
        let mut changed = Vec::new();
        for lock in LockKey::ALL {
            let now = current.get(lock);
            if now != self.previous.get(lock) {
                changed.push(lock.icon(now));
                self.previous.set(lock, now);
            }
        }
        changed
    }
}
