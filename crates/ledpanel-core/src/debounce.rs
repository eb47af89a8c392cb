//! Per-key write debouncing.
//!
//! Every key has its own deadline. Scheduling a key again replaces its pending
//! value and pushes the deadline back, so a burst of edits to one field turns
//! into a single write carrying the last value, while edits to different
//! fields never displace each other.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Delay between the last edit of a field and its write.
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
struct Pending<V> {
    value: V,
    deadline: Instant,
}

/// Deadline map keyed by field.
#[derive(Debug, Clone)]
pub struct Debouncer<K, V> {
    delay: Duration,
    pending: HashMap<K, Pending<V>>,
}

impl<K: Eq + Hash + Clone, V> Debouncer<K, V> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value for `key` and restart its timer.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) {
        self.pending.insert(
            key,
            Pending {
                value,
                deadline: now + self.delay,
            },
        );
    }

    /// Drop a pending write.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|p| p.value)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest deadline among pending keys.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every entry whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, V)> {
        let due_keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut due: Vec<(Instant, K, V)> = due_keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (p.deadline, k, p.value)))
            .collect();
        due.sort_by_key(|(deadline, _, _)| *deadline);

        due.into_iter().map(|(_, k, v)| (k, v)).collect()
    }
}

impl<K: Eq + Hash + Clone, V> Default for Debouncer<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_collapses_to_last_value() {
        let start = Instant::now();
        let mut deb = Debouncer::default();

        for (i, value) in [10, 20, 30, 40, 50].into_iter().enumerate() {
            deb.schedule("brightness", value, start + ms(50 * i as u64));
        }

        // Last edit at 200ms, so nothing is due before 500ms
        assert!(deb.take_due(start + ms(499)).is_empty());
        assert_eq!(deb.take_due(start + ms(500)), vec![("brightness", 50)]);
        assert!(deb.take_due(start + ms(10_000)).is_empty());
    }

    #[test]
    fn test_distinct_fields_do_not_clobber() {
        let start = Instant::now();
        let mut deb = Debouncer::new(ms(300));

        deb.schedule("brightness", 1, start);
        deb.schedule("speed", 2, start + ms(100));

        assert_eq!(deb.next_deadline(), Some(start + ms(300)));
        assert_eq!(deb.take_due(start + ms(300)), vec![("brightness", 1)]);
        assert_eq!(deb.next_deadline(), Some(start + ms(400)));
        assert_eq!(deb.take_due(start + ms(400)), vec![("speed", 2)]);
        assert!(deb.is_empty());
    }

    #[test]
    fn test_due_entries_come_out_in_deadline_order() {
        let start = Instant::now();
        let mut deb = Debouncer::new(ms(300));

        deb.schedule("c", 3, start + ms(20));
        deb.schedule("a", 1, start);
        deb.schedule("b", 2, start + ms(10));

        assert_eq!(
            deb.take_due(start + ms(1000)),
            vec![("a", 1), ("b", 2), ("c", 3)]
        );
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut deb = Debouncer::new(ms(300));

        deb.schedule("power", true, start);
        assert!(deb.is_pending(&"power"));
        assert_eq!(deb.cancel(&"power"), Some(true));
        assert_eq!(deb.next_deadline(), None);
        assert!(deb.take_due(start + ms(300)).is_empty());
    }
}
