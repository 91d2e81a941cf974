//! Offline replay of recorded landmark streams.
//!
//! A [`LandmarkScript`] lists per-frame detections in YAML. The scripted
//! detector and static frame source let a full session run without a camera
//! or a landmark model, which is how the CLI and the integration tests drive
//! the frame loop.

use crate::{
    classifier::PoseLabel,
    constants::{ENROLLMENT_IMAGE_COUNT, MAX_SCRIPT_FRAMES},
    frame_loop::{FrameSource, LandmarkDetector, SessionObserver, StatusReport},
    landmarks::{Detection, LandmarkFrame, LandmarkLayout, Point},
    sequencer::{CaptureStep, CapturedImage},
    Error, Result,
};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

fn default_repeat() -> usize {
    1
}

/// One scripted detector result, optionally repeated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Landmarks of a single detected face
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f64; 2]>>,

    /// Detection score of the face
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Number of faces when more than one was detected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<usize>,

    /// How many consecutive frames this entry covers
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

impl ScriptEntry {
    /// Detection this entry stands for
    ///
    /// # Errors
    ///
    /// Returns an error if the entry has both points and a face count, or
    /// claims a single face without its landmarks
    pub fn detection(&self) -> Result<Detection> {
        match (&self.points, self.faces) {
            (Some(_), Some(faces)) => Err(Error::InvalidInput(format!(
                "Script entry has landmarks and a face count of {faces}"
            ))),
            (None, Some(1)) => Err(Error::InvalidInput(
                "Script entry has one face but no landmarks".to_string(),
            )),
            (Some(points), None) => {
                let points = points.iter().copied().map(Point::from).collect();
                Ok(Detection::Single(LandmarkFrame::from_points(points, self.score.unwrap_or(1.0))))
            }
            (None, Some(faces)) if faces >= 2 => Ok(Detection::Multiple(faces)),
            (None, _) => Ok(Detection::None),
        }
    }
}

/// Recorded sequence of detector results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkScript {
    /// Layout of the recorded landmarks
    #[serde(default)]
    pub layout: LandmarkLayout,

    /// Entries in playback order
    #[serde(default)]
    pub frames: Vec<ScriptEntry>,
}

impl LandmarkScript {
    #[must_use]
    pub fn new(layout: LandmarkLayout) -> Self {
        Self {
            layout,
            frames: Vec::new(),
        }
    }

    /// Load a script from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;
        Self::from_yaml_str(&content)
    }

    /// Parse a script from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::InvalidInput(format!("Failed to parse landmark script: {e}")))
    }

    /// Serialize the script to YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::InvalidInput(format!("Failed to serialize landmark script: {e}")))
    }

    /// Append a single-face entry
    pub fn push_face(&mut self, frame: &LandmarkFrame, repeat: usize) -> &mut Self {
        self.frames.push(ScriptEntry {
            points: Some(frame.points().iter().map(|p| [p.x, p.y]).collect()),
            score: Some(frame.score()),
            faces: None,
            repeat,
        });
        self
    }

    /// Append a no-face entry
    pub fn push_none(&mut self, repeat: usize) -> &mut Self {
        self.frames.push(ScriptEntry {
            points: None,
            score: None,
            faces: None,
            repeat,
        });
        self
    }

    /// Append a multiple-face entry
    pub fn push_multiple(&mut self, faces: usize, repeat: usize) -> &mut Self {
        self.frames.push(ScriptEntry {
            points: None,
            score: None,
            faces: Some(faces),
            repeat,
        });
        self
    }

    /// Total number of frames after expanding repeats
    ///
    /// # Errors
    ///
    /// Returns an error if the total exceeds [`MAX_SCRIPT_FRAMES`]
    pub fn frame_count(&self) -> Result<usize> {
        let total = self
            .frames
            .iter()
            .try_fold(0usize, |total, entry| total.checked_add(entry.repeat))
            .filter(|total| *total <= MAX_SCRIPT_FRAMES);
        total.ok_or_else(|| {
            Error::InvalidInput(format!("Landmark script expands to more than {MAX_SCRIPT_FRAMES} frames"))
        })
    }

    /// Expand the script into one detection per frame
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is contradictory or the script is too long
    pub fn detections(&self) -> Result<Vec<Detection>> {
        let mut detections = Vec::with_capacity(self.frame_count()?);
        for entry in &self.frames {
            let detection = entry.detection()?;
            detections.extend(std::iter::repeat(detection).take(entry.repeat));
        }
        Ok(detections)
    }
}

/// Detector that plays back a fixed list of detections
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    queue: VecDeque<Detection>,
    calls: usize,
}

impl ScriptedDetector {
    pub fn new<I: IntoIterator<Item = Detection>>(detections: I) -> Self {
        Self {
            queue: detections.into_iter().collect(),
            calls: 0,
        }
    }

    /// Build a detector from a script
    ///
    /// # Errors
    ///
    /// Returns an error if any script entry is contradictory
    pub fn from_script(script: &LandmarkScript) -> Result<Self> {
        Ok(Self::new(script.detections()?))
    }

    /// Detections not yet played back
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Number of detect calls so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }
}

#[async_trait]
impl<F: Sync> LandmarkDetector<F> for ScriptedDetector {
    async fn detect(&mut self, _frame: &F) -> Result<Detection> {
        self.calls += 1;
        Ok(self.queue.pop_front().unwrap_or(Detection::None))
    }
}

/// Frame source returning the same image on every tick
#[derive(Debug, Clone)]
pub struct StaticFrameSource {
    frame: RgbImage,
}

impl StaticFrameSource {
    #[must_use]
    pub fn new(frame: RgbImage) -> Self {
        Self { frame }
    }

    /// Uniform gray placeholder frame
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
    }
}

impl FrameSource for StaticFrameSource {
    type Frame = RgbImage;

    fn current_frame(&mut self) -> Option<RgbImage> {
        Some(self.frame.clone())
    }
}

/// Build a landmark frame with the given head geometry.
///
/// `yaw_offset` is the nose and mouth offset in eye distances (negative is a
/// turn to the subject's right), `eye_ratio` the left/right eye width ratio
/// and `scale` multiplies every coordinate.
#[must_use]
pub fn synthetic_face(layout: LandmarkLayout, yaw_offset: f64, eye_ratio: f64, scale: f64) -> LandmarkFrame {
    let eye_distance = 100.0 * scale;
    let cx = 320.0 * scale;
    let cy = 240.0 * scale;

    let total_width = 0.6 * eye_distance;
    let right_width = total_width / (1.0 + eye_ratio);
    let left_width = total_width - right_width;

    let eye_y = cy - 0.3 * eye_distance;
    let right_outer_x = cx - eye_distance / 2.0;
    let left_outer_x = cx + eye_distance / 2.0;
    let shift = yaw_offset * eye_distance;

    let idx = layout.indices();
    let mut points = vec![Point::new(cx, cy); layout.point_count()];
    points[idx.right_eye_outer] = Point::new(right_outer_x, eye_y);
    points[idx.right_eye_inner] = Point::new(right_outer_x + right_width, eye_y);
    points[idx.left_eye_outer] = Point::new(left_outer_x, eye_y);
    points[idx.left_eye_inner] = Point::new(left_outer_x - left_width, eye_y);
    points[idx.nose_tip] = Point::new(cx + shift, cy);
    points[idx.nose_base] = Point::new(cx + shift, cy + 0.1 * eye_distance);
    points[idx.mouth_right] = Point::new(cx + shift - 0.25 * eye_distance, cy + 0.35 * eye_distance);
    points[idx.mouth_left] = Point::new(cx + shift + 0.25 * eye_distance, cy + 0.35 * eye_distance);
    points[idx.chin] = Point::new(cx + 0.5 * shift, cy + 0.8 * eye_distance);

    LandmarkFrame::from_points(points, 1.0)
}

/// Owned copy of a status report
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub step: CaptureStep,
    pub pose: Option<PoseLabel>,
    pub stable_count: usize,
    pub captured: usize,
    pub error: Option<String>,
}

impl From<&StatusReport<'_>> for StatusSnapshot {
    fn from(status: &StatusReport<'_>) -> Self {
        Self {
            step: status.step,
            pose: status.pose(),
            stable_count: status.stable_count,
            captured: status.captured,
            error: status.error.map(ToString::to_string),
        }
    }
}

/// Observer that keeps every status and completion it receives
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub statuses: Vec<StatusSnapshot>,
    pub completions: Vec<[CapturedImage; ENROLLMENT_IMAGE_COUNT]>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses that carried an error
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.statuses.iter().filter_map(|s| s.error.as_deref())
    }
}

impl SessionObserver for RecordingObserver {
    fn on_status(&mut self, status: &StatusReport<'_>) {
        self.statuses.push(status.into());
    }

    fn on_session_complete(&mut self, images: [CapturedImage; ENROLLMENT_IMAGE_COUNT]) {
        self.completions.push(images);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DirectionClassifier;

    #[test]
    fn test_synthetic_face_metrics() {
        let classifier = DirectionClassifier::new(LandmarkLayout::Ibug68);
        let metrics = classifier
            .metrics(&synthetic_face(LandmarkLayout::Ibug68, -0.1, 1.3, 2.0))
            .unwrap();
        assert!((metrics.combined_offset + 0.1).abs() < 1e-9);
        assert!((metrics.eye_ratio - 1.3).abs() < 1e-9);
        assert!((metrics.face_skew - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_script_yaml() {
        let yaml = r#"
layout: ibug68
frames:
  - repeat: 2
  - faces: 3
  - points: [[1.0, 2.0], [3.0, 4.0]]
    score: 0.8
    repeat: 3
"#;
        let script = LandmarkScript::from_yaml_str(yaml).unwrap();
        assert_eq!(script.layout, LandmarkLayout::Ibug68);
        assert_eq!(script.frame_count().unwrap(), 6);

        let detections = script.detections().unwrap();
        assert_eq!(detections[0], Detection::None);
        assert_eq!(detections[2], Detection::Multiple(3));
        match &detections[5] {
            Detection::Single(frame) => {
                assert_eq!(frame.points().len(), 2);
                assert_eq!(frame.score(), 0.8);
            }
            other => panic!("Expected a face, got {other:?}"),
        }
    }

    #[test]
    fn test_contradictory_entry() {
        let entry = ScriptEntry {
            points: Some(vec![[0.0, 0.0]]),
            score: None,
            faces: Some(2),
            repeat: 1,
        };
        assert!(entry.detection().is_err());
    }

    #[test]
    fn test_oversized_repeat_is_rejected() {
        let overflow = format!("frames:\n  - repeat: {}\n  - repeat: 1\n", usize::MAX);
        let script = LandmarkScript::from_yaml_str(&overflow).unwrap();
        assert!(matches!(script.frame_count(), Err(Error::InvalidInput(_))));
        assert!(matches!(script.detections(), Err(Error::InvalidInput(_))));

        let huge = LandmarkScript::from_yaml_str("frames:\n  - repeat: 4611686018427387904\n").unwrap();
        assert!(matches!(huge.detections(), Err(Error::InvalidInput(_))));

        let mut at_limit = LandmarkScript::default();
        at_limit.push_none(MAX_SCRIPT_FRAMES);
        assert_eq!(at_limit.frame_count().unwrap(), MAX_SCRIPT_FRAMES);
        at_limit.push_none(1);
        assert!(at_limit.frame_count().is_err());
    }

    #[test]
    fn test_single_face_needs_landmarks() {
        let entry = ScriptEntry {
            points: None,
            score: None,
            faces: Some(1),
            repeat: 1,
        };
        assert!(matches!(entry.detection(), Err(Error::InvalidInput(_))));

        let empty = ScriptEntry { faces: Some(0), ..entry };
        assert_eq!(empty.detection().unwrap(), Detection::None);
    }

    #[test]
    fn test_script_roundtrip_through_builder() {
        let mut script = LandmarkScript::new(LandmarkLayout::Ibug68);
        script
            .push_face(&synthetic_face(LandmarkLayout::Ibug68, 0.0, 1.0, 1.0), 4)
            .push_none(1)
            .push_multiple(2, 1);
        let yaml = script.to_yaml_string().unwrap();
        let parsed = LandmarkScript::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, script);
        assert_eq!(parsed.frame_count().unwrap(), 6);
    }

    #[tokio::test]
    async fn test_scripted_detector_exhausts_to_none() {
        let mut detector = ScriptedDetector::new(vec![Detection::Multiple(2)]);
        let frame = ();
        assert_eq!(detector.detect(&frame).await.unwrap(), Detection::Multiple(2));
        assert_eq!(detector.detect(&frame).await.unwrap(), Detection::None);
        assert_eq!(detector.calls(), 2);
        assert_eq!(detector.remaining(), 0);
    }
}
