//! Stability tracking for per-frame pose classifications.
//!
//! Keeps a bounded window of the most recent poses and reports how many of
//! them agree with the newest observation.

use crate::classifier::PoseLabel;
use std::collections::VecDeque;

/// Bounded history of recent pose classifications
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    capacity: usize,
    threshold: usize,
    window: VecDeque<PoseLabel>,
}

impl StabilityTracker {
    /// Create a tracker; `capacity` is clamped to at least one entry
    #[must_use]
    pub fn new(capacity: usize, threshold: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            threshold,
            window: VecDeque::with_capacity(capacity),
        }
    }

    /// Record one observation and return the current stable count.
    ///
    /// `None` (no usable face) clears the window.
    pub fn observe(&mut self, pose: Option<PoseLabel>) -> usize {
        let Some(pose) = pose else {
            self.window.clear();
            return 0;
        };

        if self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(pose);

        self.stable_count()
    }

    /// Number of window entries equal to the most recent observation
    #[must_use]
    pub fn stable_count(&self) -> usize {
        self.window
            .back()
            .map_or(0, |latest| self.window.iter().filter(|p| *p == latest).count())
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.threshold > 0 && self.stable_count() >= self.threshold
    }

    /// Most recent observation, if any
    #[must_use]
    pub fn latest(&self) -> Option<PoseLabel> {
        self.window.back().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Reset all stability
    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_latest_not_majority() {
        let mut tracker = StabilityTracker::new(10, 8);

        for _ in 0..6 {
            tracker.observe(Some(PoseLabel::Front));
        }
        let count = tracker.observe(Some(PoseLabel::Right));

        // Front still holds the majority but the newest pose is what counts
        assert_eq!(count, 1);
        assert_eq!(tracker.latest(), Some(PoseLabel::Right));
        assert!(!tracker.is_stable());
    }

    #[test]
    fn test_window_bounded() {
        let mut tracker = StabilityTracker::new(4, 3);
        for _ in 0..20 {
            tracker.observe(Some(PoseLabel::Left));
            assert!(tracker.len() <= 4);
        }
        assert_eq!(tracker.stable_count(), 4);
        assert!(tracker.is_stable());
    }

    #[test]
    fn test_none_clears() {
        let mut tracker = StabilityTracker::new(5, 3);
        for _ in 0..5 {
            tracker.observe(Some(PoseLabel::Front));
        }
        assert_eq!(tracker.observe(None), 0);
        assert!(tracker.is_empty());
        assert_eq!(tracker.observe(Some(PoseLabel::Front)), 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut tracker = StabilityTracker::new(0, 1);
        assert_eq!(tracker.capacity(), 1);
        assert_eq!(tracker.observe(Some(PoseLabel::Front)), 1);
        assert!(tracker.is_stable());
    }
}
