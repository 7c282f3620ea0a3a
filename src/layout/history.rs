//! Bounded undo log of previous transforms
//!
//! Appended right before every transform mutation and popped to roll back a
//! degenerate relayout. Oldest entries are evicted first.

use std::collections::VecDeque;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Default number of transforms kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// A transform captured before it was replaced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSnapshot {
    pub scale: f64,
    pub offset: DVec2,
    /// Capture time (milliseconds, host clock)
    pub captured_at: f64,
}

#[derive(Debug, Clone)]
pub struct TransformHistory {
    entries: VecDeque<TransformSnapshot>,
    capacity: usize,
}

impl Default for TransformHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl TransformHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: TransformSnapshot) {
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Remove and return the most recent snapshot
    pub fn pop_last(&mut self) -> Option<TransformSnapshot> {
        self.entries.pop_back()
    }

    pub fn last(&self) -> Option<&TransformSnapshot> {
        self.entries.back()
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

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &TransformSnapshot> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snap(i: usize) -> TransformSnapshot {
        TransformSnapshot {
            scale: 0.1 * (i + 1) as f64,
            offset: DVec2::new(i as f64, 0.0),
            captured_at: i as f64 * 16.0,
        }
    }

    #[test]
    fn test_bound_keeps_most_recent() {
        let mut history = TransformHistory::new(10);
        for i in 0..15 {
            history.push(snap(i));
        }
        assert_eq!(history.len(), 10);
        let kept: Vec<f64> = history.iter().map(|s| s.offset.x).collect();
        let expected: Vec<f64> = (5..15).map(|i| i as f64).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_push_then_pop_returns_same() {
        let mut history = TransformHistory::default();
        history.push(snap(0));
        history.push(snap(1));
        assert_eq!(history.pop_last(), Some(snap(1)));
        assert_eq!(history.pop_last(), Some(snap(0)));
        assert_eq!(history.pop_last(), None);
        assert!(history.is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut history = TransformHistory::new(0);
        history.push(snap(0));
        history.push(snap(1));
        assert_eq!(history.len(), 1);
        assert_eq!(history.last(), Some(&snap(1)));
    }

    proptest! {
        #[test]
        fn prop_length_never_exceeds_capacity(cap in 1usize..20, pushes in 0usize..60) {
            let mut history = TransformHistory::new(cap);
            for i in 0..pushes {
                history.push(snap(i));
                prop_assert!(history.len() <= cap);
            }
            prop_assert_eq!(history.len(), pushes.min(cap));
            if pushes > 0 {
                prop_assert_eq!(history.last().copied(), Some(snap(pushes - 1)));
            }
        }
    }
}
