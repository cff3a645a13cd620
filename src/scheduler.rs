//! Cancellable timers on a manual clock.
//!
//! The registry never sleeps. It schedules keyed timers here and someone
//! (a test, or [`crate::driver`]) advances the clock. Scheduling a key that
//! is already pending replaces it, which is how debouncing works.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;

const LOG_TARGET: &str = "project_service::timers";

#[derive(Debug)]
struct Entry<K, T> {
    key: K,
    task: T,
}

#[derive(Debug)]
pub struct TimerQueue<K, T> {
    now: Duration,
    next_seq: u64,
    /// Ordered by deadline, then by scheduling order.
    entries: BTreeMap<(Duration, u64), Entry<K, T>>,
    by_key: HashMap<K, (Duration, u64)>,
}

impl<K, T> Default for TimerQueue<K, T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            entries: BTreeMap::new(),
            by_key: HashMap::new(),
        }
    }
}

impl<K, T> TimerQueue<K, T>
where
    K: Clone + Eq + Hash + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `task` under `key`, replacing any pending timer for it.
    pub fn schedule(&mut self, key: K, delay: Duration, task: T) {
        self.cancel(&key);
        let slot = (self.now + delay, self.next_seq);
        self.next_seq += 1;
        log::trace!(target: LOG_TARGET, "{:?} due at {:?}", key, slot.0);
        self.by_key.insert(key.clone(), slot);
        self.entries.insert(slot, Entry { key, task });
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        match self.by_key.remove(key) {
            Some(slot) => {
                self.entries.remove(&slot);
                log::trace!(target: LOG_TARGET, "{:?} cancelled", key);
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its deadline.
    pub fn pop_due(&mut self, until: Duration) -> Option<(K, T)> {
        let (&slot, _) = self.entries.iter().next()?;
        if slot.0 > until {
            return None;
        }
        let entry = self.entries.remove(&slot)?;
        self.by_key.remove(&entry.key);
        self.now = self.now.max(slot.0);
        Some((entry.key, entry.task))
    }

    /// Move the clock forward without firing anything.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Advance by `by`, returning every timer that came due, earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<(K, T)> {
        let until = self.now + by;
        let mut fired = Vec::new();
        while let Some(due) = self.pop_due(until) {
            fired.push(due);
        }
        self.set_now(until);
        fired
    }
}
