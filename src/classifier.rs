//! Head direction classification from 2D facial landmarks.
//!
//! Two independent geometric cues are combined:
//! - horizontal offset of the nose tip and mouth center from the midpoint of
//!   the outer eye corners, normalized by the outer eye distance
//! - the width ratio of the two eyes, since the eye on the far side of a
//!   turned head is foreshortened
//!
//! A single cue past the strong threshold is enough to report a profile pose.
//! At the mild threshold the offset must be corroborated by the eye ratio or by
//! the nose/chin skew, which keeps incidental head tilt from reading as a turn.
//!
//! All metrics are ratios of horizontal distances, so the result is invariant
//! to uniform scaling of the landmark coordinates.

use crate::{
    constants::{
        DEFAULT_MIN_EYE_DISTANCE, EPSILON, EYE_RATIO_HIGH, EYE_RATIO_LOW, MILD_PROFILE_THRESHOLD,
        STRONG_PROFILE_THRESHOLD,
    },
    landmarks::{LandmarkFrame, LandmarkLayout},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete head orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseLabel {
    /// Facing the camera
    Front,
    /// Turned to the subject's right
    Right,
    /// Turned to the subject's left
    Left,
}

impl PoseLabel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Right => "right",
            Self::Left => "left",
        }
    }
}

impl fmt::Display for PoseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic metrics computed for every classified frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseMetrics {
    /// Nose tip offset from the eye midpoint, in eye distances
    pub nose_offset: f64,
    /// Mouth center offset from the eye midpoint, in eye distances
    pub mouth_offset: f64,
    /// Subject-left eye width over subject-right eye width
    pub eye_ratio: f64,
    /// Summed absolute nose and chin offsets, in eye distances
    pub face_skew: f64,
    /// Mean of the nose and mouth offsets
    pub combined_offset: f64,
}

/// Result of classifying one landmark frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationResult {
    pub pose: PoseLabel,
    /// How far past the deciding threshold the frame is, in [0, 1]
    pub confidence: f64,
    pub metrics: PoseMetrics,
}

/// Decision thresholds for the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    /// Offset that alone decides a profile pose
    pub strong: f64,
    /// Offset that decides a profile pose when corroborated
    pub mild: f64,
    /// Eye ratio below which the head is turned left
    pub eye_ratio_low: f64,
    /// Eye ratio above which the head is turned right
    pub eye_ratio_high: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            strong: STRONG_PROFILE_THRESHOLD,
            mild: MILD_PROFILE_THRESHOLD,
            eye_ratio_low: EYE_RATIO_LOW,
            eye_ratio_high: EYE_RATIO_HIGH,
        }
    }
}

impl ClassifierThresholds {
    /// Eye ratio that corroborates a mild right turn
    #[must_use]
    pub fn moderate_high(&self) -> f64 {
        (1.0 + self.eye_ratio_high) / 2.0
    }

    /// Eye ratio that corroborates a mild left turn
    #[must_use]
    pub fn moderate_low(&self) -> f64 {
        (1.0 + self.eye_ratio_low) / 2.0
    }

    /// Face skew that corroborates a mild turn
    #[must_use]
    pub fn skew_limit(&self) -> f64 {
        2.0 * self.mild
    }

    /// Validate threshold ordering
    ///
    /// # Errors
    ///
    /// Returns an error if any threshold is non-positive or out of order
    pub fn validate(&self) -> Result<()> {
        let values = [self.strong, self.mild, self.eye_ratio_low, self.eye_ratio_high];
        if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(Error::ConfigError(
                "Classifier thresholds must be finite and positive".to_string(),
            ));
        }
        if self.mild >= self.strong {
            return Err(Error::ConfigError(format!(
                "Mild threshold ({}) must be below strong threshold ({})",
                self.mild, self.strong
            )));
        }
        if self.eye_ratio_low >= 1.0 || self.eye_ratio_high <= 1.0 {
            return Err(Error::ConfigError(format!(
                "Eye ratio thresholds must bracket 1.0, got [{}, {}]",
                self.eye_ratio_low, self.eye_ratio_high
            )));
        }
        Ok(())
    }
}

/// Classifies head direction from a single landmark frame
#[derive(Debug, Clone)]
pub struct DirectionClassifier {
    thresholds: ClassifierThresholds,
    layout: LandmarkLayout,
    min_eye_distance: f64,
    mirrored: bool,
}

impl Default for DirectionClassifier {
    fn default() -> Self {
        Self::new(LandmarkLayout::default())
    }
}

impl DirectionClassifier {
    /// Create a classifier with default thresholds for a landmark layout
    #[must_use]
    pub fn new(layout: LandmarkLayout) -> Self {
        Self {
            thresholds: ClassifierThresholds::default(),
            layout,
            min_eye_distance: DEFAULT_MIN_EYE_DISTANCE,
            mirrored: false,
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ClassifierThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Minimum outer eye distance below which a frame is unusable.
    ///
    /// Expressed in the landmark coordinate unit: pixels by default, so
    /// normalized landmarks need a value well below 1.0.
    #[must_use]
    pub fn with_min_eye_distance(mut self, min_eye_distance: f64) -> Self {
        self.min_eye_distance = min_eye_distance;
        self
    }

    /// Treat incoming coordinates as horizontally mirrored
    #[must_use]
    pub fn with_mirrored_landmarks(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    #[must_use]
    pub fn thresholds(&self) -> &ClassifierThresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn layout(&self) -> LandmarkLayout {
        self.layout
    }

    /// Compute the pose metrics for a frame
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The frame lacks the canonical landmarks for the layout
    /// - The outer eye distance is below the minimum
    /// - Both eye widths collapse to zero
    pub fn metrics(&self, frame: &LandmarkFrame) -> Result<PoseMetrics> {
        let marks = frame.canonical(self.layout)?;

        let eye_distance = (marks.left_eye_outer.x - marks.right_eye_outer.x).abs();
        if !(eye_distance >= self.min_eye_distance) {
            return Err(Error::DegenerateGeometry(format!(
                "Eye distance {eye_distance:.3} below minimum {:.3}",
                self.min_eye_distance
            )));
        }

        let face_center_x = (marks.left_eye_outer.x + marks.right_eye_outer.x) / 2.0;
        let mouth_center_x = (marks.mouth_left.x + marks.mouth_right.x) / 2.0;

        // Mirrored input swaps which eye the detector calls "left"
        let sign = if self.mirrored { -1.0 } else { 1.0 };
        let nose_offset = sign * (marks.nose_tip.x - face_center_x) / eye_distance;
        let mouth_offset = sign * (mouth_center_x - face_center_x) / eye_distance;

        let mut left_width = (marks.left_eye_outer.x - marks.left_eye_inner.x).abs() / eye_distance;
        let mut right_width = (marks.right_eye_outer.x - marks.right_eye_inner.x).abs() / eye_distance;
        if self.mirrored {
            std::mem::swap(&mut left_width, &mut right_width);
        }
        if left_width < EPSILON && right_width < EPSILON {
            return Err(Error::DegenerateGeometry("Both eye widths are zero".to_string()));
        }
        let eye_ratio = left_width / right_width.max(EPSILON);

        let face_skew = ((marks.nose_tip.x - face_center_x).abs() + (marks.chin.x - face_center_x).abs())
            / eye_distance;

        Ok(PoseMetrics {
            nose_offset,
            mouth_offset,
            eye_ratio,
            face_skew,
            combined_offset: (nose_offset + mouth_offset) / 2.0,
        })
    }

    /// Classify the head direction of a frame
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`DirectionClassifier::metrics`]
    pub fn classify(&self, frame: &LandmarkFrame) -> Result<ClassificationResult> {
        let metrics = self.metrics(frame)?;
        Ok(self.decide(metrics))
    }

    /// Apply the threshold rules to precomputed metrics
    #[must_use]
    pub fn decide(&self, metrics: PoseMetrics) -> ClassificationResult {
        let t = &self.thresholds;
        let offset = metrics.combined_offset;
        let magnitude = offset.abs();
        let ratio = metrics.eye_ratio;

        let profile = |pose: PoseLabel, factor: f64| ClassificationResult {
            pose,
            confidence: past_threshold(factor),
            metrics,
        };

        if magnitude > t.strong {
            return profile(side_of(offset), magnitude / t.strong);
        }
        if ratio > t.eye_ratio_high {
            return profile(PoseLabel::Right, ratio / t.eye_ratio_high);
        }
        if ratio < t.eye_ratio_low {
            return profile(PoseLabel::Left, t.eye_ratio_low / ratio.max(EPSILON));
        }
        if magnitude > t.mild {
            let pose = side_of(offset);
            let ratio_agrees = match pose {
                PoseLabel::Right => ratio >= t.moderate_high(),
                _ => ratio <= t.moderate_low(),
            };
            if ratio_agrees || metrics.face_skew > t.skew_limit() {
                return profile(pose, magnitude / t.mild);
            }
        }

        ClassificationResult {
            pose: PoseLabel::Front,
            confidence: (1.0 - magnitude / t.mild).clamp(0.0, 1.0),
            metrics,
        }
    }
}

/// Negative offsets are turns to the subject's right in camera coordinates
fn side_of(offset: f64) -> PoseLabel {
    if offset < 0.0 {
        PoseLabel::Right
    } else {
        PoseLabel::Left
    }
}

/// Map an observed/threshold factor to [0, 1]; 0.5 at the threshold
fn past_threshold(factor: f64) -> f64 {
    (factor / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(combined: f64, eye_ratio: f64, face_skew: f64) -> PoseMetrics {
        PoseMetrics {
            nose_offset: combined,
            mouth_offset: combined,
            eye_ratio,
            face_skew,
            combined_offset: combined,
        }
    }

    #[test]
    fn test_strong_offset_decides_alone() {
        let classifier = DirectionClassifier::default();
        assert_eq!(classifier.decide(metrics(-0.2, 1.0, 0.0)).pose, PoseLabel::Right);
        assert_eq!(classifier.decide(metrics(0.2, 1.0, 0.0)).pose, PoseLabel::Left);
    }

    #[test]
    fn test_extreme_eye_ratio_decides_alone() {
        let classifier = DirectionClassifier::default();
        assert_eq!(classifier.decide(metrics(0.0, 1.6, 0.0)).pose, PoseLabel::Right);
        assert_eq!(classifier.decide(metrics(0.0, 0.5, 0.0)).pose, PoseLabel::Left);
    }

    #[test]
    fn test_mild_offset_needs_corroboration() {
        let classifier = DirectionClassifier::default();

        // Mild offset alone reads as front
        assert_eq!(classifier.decide(metrics(-0.1, 1.0, 0.1)).pose, PoseLabel::Front);

        // Corroborated by the eye ratio
        assert_eq!(classifier.decide(metrics(-0.1, 1.25, 0.1)).pose, PoseLabel::Right);
        assert_eq!(classifier.decide(metrics(0.1, 0.8, 0.1)).pose, PoseLabel::Left);

        // Eye ratio pointing the other way does not corroborate
        assert_eq!(classifier.decide(metrics(0.1, 1.25, 0.1)).pose, PoseLabel::Front);

        // Corroborated by face skew
        assert_eq!(classifier.decide(metrics(0.1, 1.0, 0.2)).pose, PoseLabel::Left);
    }

    #[test]
    fn test_confidence_bounds() {
        let classifier = DirectionClassifier::default();

        let at_center = classifier.decide(metrics(0.0, 1.0, 0.0));
        assert_eq!(at_center.pose, PoseLabel::Front);
        assert!((at_center.confidence - 1.0).abs() < 1e-12);

        let far = classifier.decide(metrics(-5.0, 1.0, 0.0));
        assert_eq!(far.confidence, 1.0);

        let just_past = classifier.decide(metrics(-0.151, 1.0, 0.0));
        assert!(just_past.confidence > 0.49 && just_past.confidence < 0.52);

        let collapsed_eye = classifier.decide(metrics(0.0, 0.0, 0.0));
        assert_eq!(collapsed_eye.pose, PoseLabel::Left);
        assert_eq!(collapsed_eye.confidence, 1.0);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(ClassifierThresholds::default().validate().is_ok());

        let mut inverted = ClassifierThresholds::default();
        inverted.mild = 0.2;
        assert!(inverted.validate().is_err());

        let mut bad_ratio = ClassifierThresholds::default();
        bad_ratio.eye_ratio_high = 0.9;
        assert!(bad_ratio.validate().is_err());

        let mut negative = ClassifierThresholds::default();
        negative.strong = -1.0;
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_derived_thresholds() {
        let t = ClassifierThresholds::default();
        assert!((t.moderate_high() - 1.2).abs() < 1e-12);
        assert!((t.moderate_low() - 0.85).abs() < 1e-12);
        assert!((t.skew_limit() - 0.16).abs() < 1e-12);
    }
}
