//! Landmark frame types produced by the external face landmark detector.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// 2D point in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal pixel coordinate
    pub x: f64,
    /// Vertical pixel coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned face bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Smallest box enclosing all points, or an empty box for no points
    #[must_use]
    pub fn enclosing(points: &[Point]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

/// Landmark indexing scheme emitted by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkLayout {
    /// 468-point face mesh (MediaPipe FaceMesh / face-landmarks-detection)
    #[default]
    #[serde(alias = "mediapipe")]
    MediaPipe468,
    /// 68-point iBUG 300-W annotation
    #[serde(alias = "ibug")]
    Ibug68,
}

/// Indices of the landmarks the direction classifier reads.
///
/// Eye and mouth sides are the subject's own: the subject's right eye appears
/// on the image left in an unmirrored camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalIndices {
    pub nose_tip: usize,
    pub nose_base: usize,
    pub right_eye_outer: usize,
    pub right_eye_inner: usize,
    pub left_eye_inner: usize,
    pub left_eye_outer: usize,
    pub mouth_right: usize,
    pub mouth_left: usize,
    pub chin: usize,
}

impl CanonicalIndices {
    fn max_index(&self) -> usize {
        [
            self.nose_tip,
            self.nose_base,
            self.right_eye_outer,
            self.right_eye_inner,
            self.left_eye_inner,
            self.left_eye_outer,
            self.mouth_right,
            self.mouth_left,
            self.chin,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

impl LandmarkLayout {
    /// Number of points a full frame carries in this layout
    #[must_use]
    pub const fn point_count(self) -> usize {
        match self {
            Self::MediaPipe468 => 468,
            Self::Ibug68 => 68,
        }
    }

    /// Canonical landmark indices for this layout
    #[must_use]
    pub const fn indices(self) -> CanonicalIndices {
        match self {
            Self::MediaPipe468 => CanonicalIndices {
                nose_tip: 1,
                nose_base: 2,
                right_eye_outer: 33,
                right_eye_inner: 133,
                left_eye_inner: 362,
                left_eye_outer: 263,
                mouth_right: 61,
                mouth_left: 291,
                chin: 152,
            },
            Self::Ibug68 => CanonicalIndices {
                nose_tip: 30,
                nose_base: 33,
                right_eye_outer: 36,
                right_eye_inner: 39,
                left_eye_inner: 42,
                left_eye_outer: 45,
                mouth_right: 48,
                mouth_left: 54,
                chin: 8,
            },
        }
    }
}

/// The subset of a frame the classifier works on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalLandmarks {
    pub nose_tip: Point,
    pub nose_base: Point,
    pub right_eye_outer: Point,
    pub right_eye_inner: Point,
    pub left_eye_inner: Point,
    pub left_eye_outer: Point,
    pub mouth_right: Point,
    pub mouth_left: Point,
    pub chin: Point,
}

/// Landmarks detected for a single face in a single video frame.
///
/// Coordinates are image pixels. Detectors that emit normalized `[0, 1]`
/// coordinates either scale them by the frame size or run with a classifier
/// whose minimum eye distance is lowered to match
/// ([`DirectionClassifier::with_min_eye_distance`]).
///
/// [`DirectionClassifier::with_min_eye_distance`]: crate::classifier::DirectionClassifier::with_min_eye_distance
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<Point>,
    score: f32,
    bbox: BoundingBox,
}

impl LandmarkFrame {
    /// Create a frame with an explicit score and bounding box
    #[must_use]
    pub fn new(points: Vec<Point>, score: f32, bbox: BoundingBox) -> Self {
        Self { points, score, bbox }
    }

    /// Create a frame whose bounding box encloses its points
    #[must_use]
    pub fn from_points(points: Vec<Point>, score: f32) -> Self {
        let bbox = BoundingBox::enclosing(&points);
        Self { points, score, bbox }
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Detection confidence reported by the detector
    #[must_use]
    pub fn score(&self) -> f32 {
        self.score
    }

    #[must_use]
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Extract the canonical landmarks for a layout
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The frame has too few points for the layout
    /// - Any canonical landmark has a non-finite coordinate
    pub fn canonical(&self, layout: LandmarkLayout) -> Result<CanonicalLandmarks> {
        let idx = layout.indices();
        if self.points.len() <= idx.max_index() {
            return Err(Error::InvalidInput(format!(
                "Expected at least {} landmarks for {:?}, got {}",
                idx.max_index() + 1,
                layout,
                self.points.len()
            )));
        }

        let marks = CanonicalLandmarks {
            nose_tip: self.points[idx.nose_tip],
            nose_base: self.points[idx.nose_base],
            right_eye_outer: self.points[idx.right_eye_outer],
            right_eye_inner: self.points[idx.right_eye_inner],
            left_eye_inner: self.points[idx.left_eye_inner],
            left_eye_outer: self.points[idx.left_eye_outer],
            mouth_right: self.points[idx.mouth_right],
            mouth_left: self.points[idx.mouth_left],
            chin: self.points[idx.chin],
        };

        let all_finite = [
            marks.nose_tip,
            marks.nose_base,
            marks.right_eye_outer,
            marks.right_eye_inner,
            marks.left_eye_inner,
            marks.left_eye_outer,
            marks.mouth_right,
            marks.mouth_left,
            marks.chin,
        ]
        .into_iter()
        .all(Point::is_finite);
        if !all_finite {
            return Err(Error::DegenerateGeometry(
                "Non-finite canonical landmark coordinate".to_string(),
            ));
        }

        Ok(marks)
    }
}

/// Outcome of one detector call
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// No face in the frame
    None,
    /// Exactly one face
    Single(LandmarkFrame),
    /// More than one candidate face; carries the count
    Multiple(usize),
}

impl Detection {
    /// Build a detection from all faces the detector returned
    #[must_use]
    pub fn from_faces(mut faces: Vec<LandmarkFrame>) -> Self {
        match faces.len() {
            0 => Self::None,
            1 => faces.pop().map_or(Self::None, Self::Single),
            n => Self::Multiple(n),
        }
    }
}
