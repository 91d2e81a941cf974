//! Tick scheduling and cancellation for the frame loop.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

/// Source of frame loop ticks
#[async_trait]
pub trait Scheduler: Send {
    /// Wait until the next tick is due
    async fn next_tick(&mut self);
}

/// Fixed-interval scheduler; late ticks are delayed rather than bursted
pub struct IntervalScheduler {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalScheduler {
    /// Create a scheduler with the given tick period (minimum 1 ms)
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            interval: None,
        }
    }

    /// Create a scheduler ticking at a target frame rate
    #[must_use]
    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / f64::from(fps.max(1))))
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn next_tick(&mut self) {
        let period = self.period;
        // Created lazily so the scheduler can be built outside a runtime
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
    }
}

/// Scheduler that only yields to the runtime between ticks
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldScheduler;

#[async_trait]
impl Scheduler for YieldScheduler {
    async fn next_tick(&mut self) {
        tokio::task::yield_now().await;
    }
}

/// Cloneable cancellation signal shared between a frame loop and its owner
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Signal cancellation to every clone of this token
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once the token is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                // Every sender is gone, so cancellation can no longer happen
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_scheduler_period() {
        let mut scheduler = IntervalScheduler::new(Duration::from_millis(50));
        let start = tokio::time::Instant::now();
        scheduler.next_tick().await;
        scheduler.next_tick().await;
        scheduler.next_tick().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(150));
    }

    #[test]
    fn test_from_fps() {
        assert_eq!(IntervalScheduler::from_fps(0).period(), Duration::from_secs(1));
        assert_eq!(IntervalScheduler::new(Duration::ZERO).period(), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        let waiter = tokio::spawn(async move { clone.cancelled().await });
        token.cancel();
        waiter.await.unwrap();
        assert!(token.is_cancelled());

        // Already-cancelled tokens resolve immediately
        token.cancelled().await;
    }
}
