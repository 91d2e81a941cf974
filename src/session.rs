//! Enrollment session state and the per-tick gating decision.
//!
//! Everything that survives from one tick to the next lives here: the
//! stability window, the cooldown timestamp, the sequencer and the in-flight
//! flags. The frame loop owns one session and is the only thing that mutates it.

use crate::{
    classifier::{ClassificationResult, DirectionClassifier, PoseLabel},
    cooldown::CooldownGate,
    landmarks::Detection,
    sequencer::{Advance, CaptureSequencer, CaptureStep, CaptureTicket, CapturedImage},
    stability::StabilityTracker,
    Error, Result,
};
use log::{debug, info};
use std::time::Instant;

/// What happened to one detection inside the session
#[derive(Debug)]
pub struct TickOutcome {
    /// Classification, if the frame was usable
    pub classification: Option<ClassificationResult>,
    /// Stable count after this observation
    pub stable_count: usize,
    /// Transient condition that made the frame unusable
    pub issue: Option<Error>,
    /// All capture gates passed
    pub capture: bool,
}

impl TickOutcome {
    #[must_use]
    pub fn pose(&self) -> Option<PoseLabel> {
        self.classification.map(|c| c.pose)
    }
}

/// Aggregate state of one enrollment session
#[derive(Debug)]
pub struct CaptureSession {
    classifier: DirectionClassifier,
    tracker: StabilityTracker,
    cooldown: CooldownGate,
    sequencer: CaptureSequencer,
    min_face_score: f32,
    detecting: bool,
}

impl CaptureSession {
    /// Create a session starting at the center step
    #[must_use]
    pub fn new(classifier: DirectionClassifier, tracker: StabilityTracker, cooldown: CooldownGate) -> Self {
        Self {
            classifier,
            tracker,
            cooldown,
            sequencer: CaptureSequencer::new(),
            min_face_score: 0.0,
            detecting: false,
        }
    }

    /// Detections scoring below this are treated as no face
    #[must_use]
    pub fn with_min_face_score(mut self, min_face_score: f32) -> Self {
        self.min_face_score = min_face_score;
        self
    }

    #[must_use]
    pub fn step(&self) -> CaptureStep {
        self.sequencer.step()
    }

    #[must_use]
    pub fn target(&self) -> Option<PoseLabel> {
        self.sequencer.target()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sequencer.is_complete()
    }

    /// A detection or capture is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.detecting || self.sequencer.is_capturing()
    }

    #[must_use]
    pub fn stable_count(&self) -> usize {
        self.tracker.stable_count()
    }

    /// Images captured and not yet handed out
    #[must_use]
    pub fn captured(&self) -> &[CapturedImage] {
        self.sequencer.images()
    }

    #[must_use]
    pub fn classifier(&self) -> &DirectionClassifier {
        &self.classifier
    }

    #[must_use]
    pub fn tracker(&self) -> &StabilityTracker {
        &self.tracker
    }

    #[must_use]
    pub fn cooldown(&self) -> &CooldownGate {
        &self.cooldown
    }

    /// Mark a detection as outstanding; false if one already is
    pub fn begin_detection(&mut self) -> bool {
        if self.detecting {
            return false;
        }
        self.detecting = true;
        true
    }

    pub fn end_detection(&mut self) {
        self.detecting = false;
    }

    /// Clear the guards of a detection or capture that was interrupted
    /// before it could finish. Returns whether anything was in flight.
    pub fn release_in_flight(&mut self) -> bool {
        let detecting = std::mem::replace(&mut self.detecting, false);
        let capturing = self.sequencer.release();
        detecting || capturing
    }

    /// Classify a detection, update stability and decide whether to capture
    pub fn observe(&mut self, detection: Detection, now: Instant) -> TickOutcome {
        let (classification, issue) = match detection {
            Detection::None => (None, Some(Error::NoFaceDetected)),
            Detection::Multiple(count) => (None, Some(Error::MultipleFacesDetected(count))),
            Detection::Single(frame) if frame.score() < self.min_face_score => {
                debug!("Face score {:.2} below minimum {:.2}", frame.score(), self.min_face_score);
                (None, Some(Error::NoFaceDetected))
            }
            Detection::Single(frame) => match self.classifier.classify(&frame) {
                Ok(result) => (Some(result), None),
                Err(e) if e.is_transient() => (None, Some(e)),
                Err(e) => (None, Some(Error::DegenerateGeometry(e.to_string()))),
            },
        };

        let pose = classification.map(|c| c.pose);
        let stable_count = self.tracker.observe(pose);
        let capture = self.gates_open(pose, now);

        debug!(
            "step={} pose={:?} stable={}/{} capture={}",
            self.step(),
            pose,
            stable_count,
            self.tracker.threshold(),
            capture
        );

        TickOutcome {
            classification,
            stable_count,
            issue,
            capture,
        }
    }

    fn gates_open(&self, pose: Option<PoseLabel>, now: Instant) -> bool {
        let Some(target) = self.sequencer.target() else {
            return false;
        };
        !self.sequencer.is_capturing()
            && pose == Some(target)
            && self.tracker.is_stable()
            && self.cooldown.permits(now)
    }

    /// Start a capture; `None` if one is in flight or the session is complete
    pub fn begin_capture(&mut self) -> Option<CaptureTicket> {
        self.sequencer.begin_capture()
    }

    /// Store a successful capture, restart the cooldown and reset stability
    ///
    /// # Errors
    ///
    /// Returns an error if the ticket does not belong to the current step
    pub fn commit_capture(&mut self, ticket: CaptureTicket, image_data: Vec<u8>, now: Instant) -> Result<Advance> {
        let captured = ticket.step();
        let advance = self.sequencer.commit_capture(ticket, image_data)?;
        self.cooldown.record(now);
        self.tracker.clear();
        info!("Captured {} image, next step: {}", captured, self.step());
        Ok(advance)
    }

    /// Give up on a capture without advancing
    pub fn abort_capture(&mut self, ticket: CaptureTicket) {
        self.sequencer.abort_capture(ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{LandmarkFrame, LandmarkLayout};
    use crate::replay::synthetic_face;
    use std::time::Duration;

    fn session(cooldown_ms: u64) -> CaptureSession {
        CaptureSession::new(
            DirectionClassifier::new(LandmarkLayout::Ibug68),
            StabilityTracker::new(12, 9),
            CooldownGate::new(Duration::from_millis(cooldown_ms)),
        )
    }

    fn face(yaw: f64) -> Detection {
        Detection::Single(synthetic_face(LandmarkLayout::Ibug68, yaw, 1.0, 1.0))
    }

    #[test]
    fn test_capture_fires_at_threshold() {
        let mut session = session(0);
        let now = Instant::now();
        for i in 1..9 {
            let outcome = session.observe(face(0.0), now);
            assert_eq!(outcome.stable_count, i);
            assert!(!outcome.capture);
        }
        let outcome = session.observe(face(0.0), now);
        assert_eq!(outcome.pose(), Some(PoseLabel::Front));
        assert!(outcome.capture);
    }

    #[test]
    fn test_wrong_pose_never_fires() {
        let mut session = session(0);
        let now = Instant::now();
        for _ in 0..20 {
            assert!(!session.observe(face(-0.3), now).capture);
        }
        assert_eq!(session.stable_count(), 12);
    }

    #[test]
    fn test_unusable_frames_reset_stability() {
        let mut session = session(0);
        let now = Instant::now();
        for _ in 0..8 {
            session.observe(face(0.0), now);
        }

        let outcome = session.observe(Detection::Multiple(2), now);
        assert!(matches!(outcome.issue, Some(Error::MultipleFacesDetected(2))));
        assert_eq!(outcome.stable_count, 0);

        let short = LandmarkFrame::from_points(Vec::new(), 1.0);
        let outcome = session.observe(Detection::Single(short), now);
        assert!(matches!(outcome.issue, Some(Error::DegenerateGeometry(_))));
        assert_eq!(outcome.stable_count, 0);
    }

    #[test]
    fn test_low_score_is_no_face() {
        let mut session = session(0).with_min_face_score(0.5);
        let frame = synthetic_face(LandmarkLayout::Ibug68, 0.0, 1.0, 1.0);
        let weak = LandmarkFrame::new(frame.points().to_vec(), 0.2, frame.bbox());
        let outcome = session.observe(Detection::Single(weak), Instant::now());
        assert!(matches!(outcome.issue, Some(Error::NoFaceDetected)));
        assert!(outcome.classification.is_none());
    }

    #[test]
    fn test_commit_resets_stability_and_cooldown() {
        let mut session = session(1000);
        let start = Instant::now();
        for _ in 0..9 {
            session.observe(face(0.0), start);
        }
        let ticket = session.begin_capture().unwrap();
        let advance = session.commit_capture(ticket, vec![1, 2, 3], start).unwrap();
        assert_eq!(advance, Advance::Next(CaptureStep::Right));
        assert_eq!(session.stable_count(), 0);
        assert_eq!(session.target(), Some(PoseLabel::Right));

        // Stable right pose is held back by the cooldown
        for _ in 0..12 {
            assert!(!session.observe(face(-0.3), start + Duration::from_millis(500)).capture);
        }
        assert!(session.observe(face(-0.3), start + Duration::from_millis(1000)).capture);
    }

    #[test]
    fn test_overlapping_triggers_capture_once() {
        let mut session = session(0);
        let now = Instant::now();
        for _ in 0..9 {
            session.observe(face(0.0), now);
        }

        let ticket = session.begin_capture().unwrap();
        assert!(session.is_busy());

        // A second trigger inside the same in-flight window is rejected
        assert!(!session.observe(face(0.0), now).capture);
        assert!(session.begin_capture().is_none());

        session.commit_capture(ticket, vec![0], now).unwrap();
        assert_eq!(session.captured().len(), 1);
    }

    #[test]
    fn test_release_in_flight() {
        let mut session = session(0);
        let now = Instant::now();
        for _ in 0..9 {
            session.observe(face(0.0), now);
        }
        assert!(!session.release_in_flight());

        // Ticket lost without commit or abort
        drop(session.begin_capture().unwrap());
        assert!(session.begin_detection());
        assert!(session.is_busy());

        assert!(session.release_in_flight());
        assert!(!session.is_busy());
        assert_eq!(session.step(), CaptureStep::Center);
        assert!(session.begin_capture().is_some());
    }

    #[test]
    fn test_detection_guard() {
        let mut session = session(0);
        assert!(session.begin_detection());
        assert!(session.is_busy());
        assert!(!session.begin_detection());
        session.end_detection();
        assert!(!session.is_busy());
    }
}
