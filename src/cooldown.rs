//! Minimum time interval between automatic captures.

use std::time::{Duration, Instant};

/// Time-based gate between successive captures
#[derive(Debug, Clone)]
pub struct CooldownGate {
    duration: Duration,
    last_capture: Option<Instant>,
}

impl CooldownGate {
    /// Create a gate that has never seen a capture and therefore permits
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last_capture: None,
        }
    }

    /// Whether a capture is allowed at `now`; permits exactly at the boundary
    #[must_use]
    pub fn permits(&self, now: Instant) -> bool {
        self.last_capture
            .map_or(true, |last| now.saturating_duration_since(last) >= self.duration)
    }

    /// Time left until the gate opens
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.last_capture.map_or(Duration::ZERO, |last| {
            self.duration.saturating_sub(now.saturating_duration_since(last))
        })
    }

    /// Restart the cooldown at `now`
    pub fn record(&mut self, now: Instant) {
        self.last_capture = Some(now);
    }

    #[must_use]
    pub fn last_capture(&self) -> Option<Instant> {
        self.last_capture
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}
