//! Frame loop driving an enrollment session.
//!
//! Each tick pulls the current frame, runs one landmark detection, feeds the
//! result through the session's gating decision and, when every gate passes,
//! waits a short settling delay and captures a fresh frame. Ticks never
//! overlap; the loop stops on completion, cancellation or detector failure.

use crate::{
    classifier::{ClassificationResult, PoseLabel},
    constants::{DEFAULT_SETTLE_DELAY_MS, DEFAULT_TARGET_FPS, ENROLLMENT_IMAGE_COUNT},
    encoder::ImageEncoder,
    landmarks::Detection,
    scheduler::{CancelToken, IntervalScheduler, Scheduler},
    sequencer::{Advance, CaptureStep, CapturedImage},
    session::CaptureSession,
    Error, Result,
};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};

/// Hands out the current video frame
pub trait FrameSource: Send {
    /// Opaque frame handle passed to the detector and encoder
    type Frame: Send + Sync;

    /// Latest frame, or `None` if no frame is available yet
    fn current_frame(&mut self) -> Option<Self::Frame>;
}

/// External face landmark detector
#[async_trait]
pub trait LandmarkDetector<F: Sync>: Send {
    /// Detect faces in a frame.
    ///
    /// Errors are treated as an unavailable backend and end the session.
    async fn detect(&mut self, frame: &F) -> Result<Detection>;
}

/// Progress information for presentation layers
#[derive(Debug, Clone, Copy)]
pub struct StatusReport<'a> {
    pub step: CaptureStep,
    pub classification: Option<&'a ClassificationResult>,
    pub stable_count: usize,
    /// Images captured so far in this session
    pub captured: usize,
    pub error: Option<&'a Error>,
}

impl StatusReport<'_> {
    #[must_use]
    pub fn pose(&self) -> Option<PoseLabel> {
        self.classification.map(|c| c.pose)
    }
}

/// Receives progress and the final images of a session
pub trait SessionObserver: Send {
    /// Called after every processed tick and capture attempt
    fn on_status(&mut self, _status: &StatusReport<'_>) {}

    /// Called exactly once, when all three images are captured
    fn on_session_complete(&mut self, images: [CapturedImage; ENROLLMENT_IMAGE_COUNT]);
}

/// Whether the loop should keep ticking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// How a session run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// All images captured and handed to the observer
    Completed,
    /// The cancel token fired first
    Cancelled,
}

/// Cooperative, cancelable frame loop for one enrollment session
pub struct FrameLoop<S, D, E, O>
where
    S: FrameSource,
{
    session: CaptureSession,
    source: S,
    detector: D,
    encoder: E,
    observer: O,
    scheduler: Box<dyn Scheduler>,
    settle_delay: Duration,
    cancel: CancelToken,
    captured: usize,
}

impl<S, D, E, O> FrameLoop<S, D, E, O>
where
    S: FrameSource,
    D: LandmarkDetector<S::Frame>,
    E: ImageEncoder<S::Frame>,
    O: SessionObserver,
{
    /// Create a frame loop with the default scheduler and settling delay
    pub fn new(session: CaptureSession, source: S, detector: D, encoder: E, observer: O) -> Self {
        Self {
            session,
            source,
            detector,
            encoder,
            observer,
            scheduler: Box::new(IntervalScheduler::from_fps(DEFAULT_TARGET_FPS)),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            cancel: CancelToken::new(),
            captured: 0,
        }
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Box<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Delay between the capture decision and the frame grab
    #[must_use]
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Share a cancel token with the owner of the loop
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops this loop when cancelled
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Consume the loop and return its observer
    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Run ticks until the session completes, is cancelled or fails
    ///
    /// # Errors
    ///
    /// Returns an error if the landmark detector fails
    pub async fn run(&mut self) -> Result<SessionOutcome> {
        info!("Starting enrollment frame loop at step {}", self.session.step());
        let cancel = self.cancel.clone();

        loop {
            if self.session.is_complete() {
                return Ok(SessionOutcome::Completed);
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("Enrollment cancelled at step {}", self.session.step());
                    return Ok(SessionOutcome::Cancelled);
                }
                () = self.scheduler.next_tick() => {}
            }

            let control = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("Enrollment cancelled mid-tick at step {}", self.session.step());
                    if self.session.release_in_flight() {
                        debug!("Released detection or capture interrupted by cancellation");
                    }
                    return Ok(SessionOutcome::Cancelled);
                }
                control = self.tick() => control?,
            };

            if control == TickControl::Stop {
                info!("Enrollment complete");
                return Ok(SessionOutcome::Completed);
            }
        }
    }

    /// Process a single tick
    ///
    /// Guards left behind by a previously dropped tick are released first.
    ///
    /// # Errors
    ///
    /// Returns an error if the landmark detector fails or a capture ticket
    /// no longer matches the session step
    pub async fn tick(&mut self) -> Result<TickControl> {
        if self.session.is_complete() {
            return Ok(TickControl::Stop);
        }
        // Ticks hold `&mut self`, so work still marked in flight here belongs
        // to a tick future that was dropped before it finished
        if self.session.release_in_flight() {
            warn!("Released detection or capture left by an interrupted tick");
        }

        let detection = match self.source.current_frame() {
            Some(frame) => self.detect(&frame).await?,
            None => Detection::None,
        };

        let outcome = self.session.observe(detection, now());
        if let Some(issue) = &outcome.issue {
            match issue {
                Error::MultipleFacesDetected(count) => warn!("{count} faces in frame, waiting for one"),
                other => debug!("Unusable frame: {other}"),
            }
        }
        self.report(outcome.classification.as_ref(), outcome.stable_count, outcome.issue.as_ref());

        if outcome.capture {
            self.capture().await?;
        }

        Ok(if self.session.is_complete() {
            TickControl::Stop
        } else {
            TickControl::Continue
        })
    }

    async fn detect(&mut self, frame: &S::Frame) -> Result<Detection> {
        if !self.session.begin_detection() {
            return Ok(Detection::None);
        }
        let result = self.detector.detect(frame).await;
        self.session.end_detection();

        result.map_err(|e| {
            let failure = if e.is_fatal() {
                e
            } else {
                Error::DetectorFailure(e.to_string())
            };
            error!("Landmark detector failed, stopping session: {failure}");
            self.report(None, 0, Some(&failure));
            failure
        })
    }

    async fn capture(&mut self) -> Result<()> {
        let Some(ticket) = self.session.begin_capture() else {
            debug!("Capture already in flight");
            return Ok(());
        };
        info!("Pose held for step {}, capturing", ticket.step());

        tokio::time::sleep(self.settle_delay).await;

        let encoded = match self.source.current_frame() {
            Some(frame) => self.encoder.encode(&frame).await,
            None => Err(Error::CaptureFailure("No frame available at capture time".to_string())),
        };

        match encoded {
            Ok(image_data) => match self.session.commit_capture(ticket, image_data, now())? {
                Advance::Next(_) => {
                    self.captured += 1;
                    self.report(None, 0, None);
                }
                Advance::Complete(images) => {
                    self.captured += 1;
                    self.report(None, 0, None);
                    self.observer.on_session_complete(images);
                }
            },
            Err(e) => {
                self.session.abort_capture(ticket);
                let failure = match e {
                    Error::CaptureFailure(_) => e,
                    other if other.is_fatal() => {
                        error!("Encoder reported a fatal error, stopping session: {other}");
                        self.report(None, self.session.stable_count(), Some(&other));
                        return Err(other);
                    }
                    other => Error::CaptureFailure(other.to_string()),
                };
                warn!("{failure}, retrying on a later tick");
                self.report(None, self.session.stable_count(), Some(&failure));
            }
        }
        Ok(())
    }

    fn report(&mut self, classification: Option<&ClassificationResult>, stable_count: usize, error: Option<&Error>) {
        let status = StatusReport {
            step: self.session.step(),
            classification,
            stable_count,
            captured: self.captured,
            error,
        };
        self.observer.on_status(&status);
    }
}

/// Wall-clock instant that follows tokio's clock, including paused test time
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
