//! Capped FIFO history buffers.
//!
//! Every history the engine keeps (model accuracy, scored decisions,
//! collective swarm outcomes, per-category triage outcomes) is one of these,
//! owned by the component that writes it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Ring buffer that evicts its oldest entry once `capacity` is reached.
///
/// Deserialized buffers get the same capacity floor as [`BoundedHistory::new`]
/// and are trimmed to it, so a snapshot can never hold a zero capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "RawHistory<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

#[derive(Deserialize)]
struct RawHistory<T> {
    #[serde(default = "VecDeque::new")]
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> From<RawHistory<T>> for BoundedHistory<T> {
    fn from(raw: RawHistory<T>) -> Self {
        let mut history = Self {
            entries: raw.entries,
            capacity: raw.capacity,
        };
        history.recap(raw.capacity);
        history
    }
}

impl<T> BoundedHistory<T> {
    /// Create an empty history holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append an entry, evicting from the front while over capacity.
    pub fn push(&mut self, entry: T) {
        while self.entries.len() >= self.capacity && self.entries.pop_front().is_some() {}
        self.entries.push_back(entry);
    }

    /// Change the capacity (at least 1), dropping the oldest entries that
    /// no longer fit.
    pub fn recap(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        let excess = self.entries.len().saturating_sub(self.capacity);
        self.entries.drain(..excess);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Newest first, at most `n` entries.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        self.entries.iter().rev().take(n)
    }

    /// Mutable access to the newest entry matching `pred`.
    pub fn find_recent_mut<F>(&mut self, mut pred: F) -> Option<&mut T>
    where
        F: FnMut(&T) -> bool,
    {
        self.entries.iter_mut().rev().find(|e| pred(e))
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }
}

impl BoundedHistory<f64> {
    /// Arithmetic mean, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.iter().sum::<f64>() / self.entries.len() as f64)
    }
}

impl<T> Extend<T> for BoundedHistory<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for entry in iter {
            self.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_first() {
        let mut history = BoundedHistory::new(3);
        history.extend([1, 2, 3, 4, 5]);

        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(history.recent(2).copied().collect::<Vec<_>>(), vec![5, 4]);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut history = BoundedHistory::new(0);
        history.push("a");
        history.push("b");
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.last(), Some(&"b"));
    }

    #[test]
    fn test_mean() {
        let mut history = BoundedHistory::new(10);
        assert_eq!(history.mean(), None);
        history.extend([0.5, 1.0]);
        assert!((history.mean().unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_oversized_snapshot_is_trimmed_on_load() {
        let mut history: BoundedHistory<u32> =
            serde_json::from_str(r#"{"entries":[1,2,3,4],"capacity":2}"#).unwrap();
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
        history.push(5);
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![4, 5]);
    }

    #[test]
    fn test_zero_capacity_snapshot_loads_with_capacity_one() {
        let mut history: BoundedHistory<u32> =
            serde_json::from_str(r#"{"entries":[],"capacity":0}"#).unwrap();
        assert_eq!(history.capacity(), 1);

        history.push(7);
        history.push(8);
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![8]);
    }

    #[test]
    fn test_recap_keeps_newest() {
        let mut history = BoundedHistory::new(usize::MAX);
        history.extend([1, 2, 3, 4]);
        history.recap(2);
        assert_eq!(history.capacity(), 2);
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_serialized_form_round_trips_capacity() {
        let mut history = BoundedHistory::new(3);
        history.extend([1u8, 2]);
        let json = serde_json::to_string(&history).unwrap();
        let back: BoundedHistory<u8> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn test_find_recent_mut_prefers_newest() {
        let mut history = BoundedHistory::new(5);
        history.extend([(1, 'a'), (2, 'b'), (1, 'c')]);
        if let Some(entry) = history.find_recent_mut(|(k, _)| *k == 1) {
            entry.1 = 'z';
        }
        assert_eq!(history.iter().map(|e| e.1).collect::<String>(), "abz");
    }
}
