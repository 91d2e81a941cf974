//! Helper functions and utilities for tests
#![allow(dead_code)]

use pose_enrollment::{
    classifier::DirectionClassifier,
    cooldown::CooldownGate,
    encoder::{ImageEncoder, ImageFrameEncoder, OutputFormat},
    frame_loop::FrameLoop,
    landmarks::{Detection, LandmarkFrame, LandmarkLayout},
    replay::{synthetic_face, RecordingObserver, ScriptedDetector, StaticFrameSource},
    scheduler::IntervalScheduler,
    session::CaptureSession,
    stability::StabilityTracker,
    Error, Result,
};
use async_trait::async_trait;
use image::RgbImage;
use std::time::Duration;

/// Layout used by the integration tests
pub const LAYOUT: LandmarkLayout = LandmarkLayout::Ibug68;

/// Offset that classifies as a strong right turn
pub const RIGHT_YAW: f64 = -0.3;

/// Offset that classifies as a strong left turn
pub const LEFT_YAW: f64 = 0.3;

/// Frontal face at the default scale
pub fn front() -> LandmarkFrame {
    synthetic_face(LAYOUT, 0.0, 1.0, 1.0)
}

/// Face turned to the subject's right
pub fn right() -> LandmarkFrame {
    synthetic_face(LAYOUT, RIGHT_YAW, 1.0, 1.0)
}

/// Face turned to the subject's left
pub fn left() -> LandmarkFrame {
    synthetic_face(LAYOUT, LEFT_YAW, 1.0, 1.0)
}

/// `count` copies of a single-face detection
pub fn repeat(frame: &LandmarkFrame, count: usize) -> Vec<Detection> {
    vec![Detection::Single(frame.clone()); count]
}

/// Session with the default classifier and stability window
pub fn session(cooldown: Duration) -> CaptureSession {
    CaptureSession::new(
        DirectionClassifier::new(LAYOUT),
        StabilityTracker::new(12, 9),
        CooldownGate::new(cooldown),
    )
}

/// Frame loop replaying `detections` at 30 fps with PNG output
pub fn scripted_loop<E>(
    detections: Vec<Detection>,
    cooldown: Duration,
    encoder: E,
) -> FrameLoop<StaticFrameSource, ScriptedDetector, E, RecordingObserver>
where
    E: ImageEncoder<RgbImage>,
{
    FrameLoop::new(
        session(cooldown),
        StaticFrameSource::blank(16, 12),
        ScriptedDetector::new(detections),
        encoder,
        RecordingObserver::new(),
    )
    .with_scheduler(Box::new(IntervalScheduler::from_fps(30)))
    .with_settle_delay(Duration::from_millis(10))
}

/// Default PNG encoder for loop tests
pub fn png_encoder() -> ImageFrameEncoder {
    ImageFrameEncoder::new(OutputFormat::Png)
}

/// Encoder that fails a fixed number of times before succeeding
pub struct FlakyEncoder {
    pub failures_left: usize,
    pub attempts: usize,
}

impl FlakyEncoder {
    pub fn new(failures: usize) -> Self {
        Self {
            failures_left: failures,
            attempts: 0,
        }
    }
}

#[async_trait]
impl ImageEncoder<RgbImage> for FlakyEncoder {
    async fn encode(&mut self, _frame: &RgbImage) -> Result<Vec<u8>> {
        self.attempts += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(Error::CaptureFailure("Camera busy".to_string()));
        }
        Ok(vec![self.attempts as u8])
    }
}

/// Encoder whose shared camera backend has gone away
pub struct DeadBackendEncoder;

#[async_trait]
impl ImageEncoder<RgbImage> for DeadBackendEncoder {
    async fn encode(&mut self, _frame: &RgbImage) -> Result<Vec<u8>> {
        Err(Error::DetectorFailure("Camera backend shut down".to_string()))
    }
}

/// Detector that fails on every call
pub struct BrokenDetector;

#[async_trait]
impl<F: Sync> pose_enrollment::frame_loop::LandmarkDetector<F> for BrokenDetector {
    async fn detect(&mut self, _frame: &F) -> Result<Detection> {
        Err(Error::IoError("Model backend unreachable".to_string()))
    }
}
