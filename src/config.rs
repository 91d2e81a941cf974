//! Configuration management for the enrollment engine

use crate::{
    classifier::{ClassifierThresholds, DirectionClassifier},
    constants::{
        DEFAULT_COOLDOWN_MS, DEFAULT_JPEG_QUALITY, DEFAULT_MIN_EYE_DISTANCE, DEFAULT_SETTLE_DELAY_MS,
        DEFAULT_STABILITY_CAPACITY, DEFAULT_STABILITY_THRESHOLD, DEFAULT_TARGET_FPS, EYE_RATIO_HIGH, EYE_RATIO_LOW,
        MILD_PROFILE_THRESHOLD, STRONG_PROFILE_THRESHOLD,
    },
    cooldown::CooldownGate,
    encoder::{ImageFrameEncoder, OutputFormat},
    landmarks::LandmarkLayout,
    scheduler::IntervalScheduler,
    session::CaptureSession,
    stability::StabilityTracker,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Direction classifier configuration
    pub classifier: ClassifierConfig,

    /// Stability window configuration
    pub stability: StabilityConfig,

    /// Capture timing and encoding
    pub capture: CaptureConfig,

    /// Frame loop configuration
    pub frame_loop: FrameLoopConfig,
}

/// Direction classifier parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Offset that alone decides a profile pose
    pub strong_threshold: f64,

    /// Offset that decides a profile pose when corroborated
    pub mild_threshold: f64,

    /// Eye ratio below which the head is turned left
    pub eye_ratio_low: f64,

    /// Eye ratio above which the head is turned right
    pub eye_ratio_high: f64,

    /// Smallest usable outer eye corner distance, in landmark units (pixels
    /// unless the detector emits normalized coordinates)
    pub min_eye_distance: f64,

    /// Landmarks arrive in mirrored (selfie) coordinates
    pub mirrored_landmarks: bool,

    /// Landmark index layout of the detector
    pub layout: LandmarkLayout,
}

/// Stability window parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Number of recent classifications kept
    pub capacity: usize,

    /// Matching classifications required to call a pose stable
    pub threshold: usize,
}

/// Capture timing and encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Minimum time between captures in milliseconds
    pub cooldown_ms: u64,

    /// Delay between the capture decision and the frame grab in milliseconds
    pub settle_delay_ms: u64,

    /// Output image format
    pub format: OutputFormat,

    /// JPEG quality (1-100)
    pub jpeg_quality: u8,

    /// Flip captured frames horizontally before encoding
    pub mirror_output: bool,
}

/// Frame loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameLoopConfig {
    /// Target tick rate
    pub target_fps: u32,

    /// Detections scoring below this count as no face
    pub min_face_score: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strong_threshold: STRONG_PROFILE_THRESHOLD,
            mild_threshold: MILD_PROFILE_THRESHOLD,
            eye_ratio_low: EYE_RATIO_LOW,
            eye_ratio_high: EYE_RATIO_HIGH,
            min_eye_distance: DEFAULT_MIN_EYE_DISTANCE,
            mirrored_landmarks: false,
            layout: LandmarkLayout::default(),
        }
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_STABILITY_CAPACITY,
            threshold: DEFAULT_STABILITY_THRESHOLD,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            format: OutputFormat::Jpeg,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            mirror_output: false,
        }
    }
}

impl Default for FrameLoopConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            min_face_score: 0.0,
        }
    }
}

impl ClassifierConfig {
    #[must_use]
    pub fn thresholds(&self) -> ClassifierThresholds {
        ClassifierThresholds {
            strong: self.strong_threshold,
            mild: self.mild_threshold,
            eye_ratio_low: self.eye_ratio_low,
            eye_ratio_high: self.eye_ratio_high,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        // Validate classifier thresholds
        self.classifier.thresholds().validate()?;
        if !self.classifier.min_eye_distance.is_finite() || self.classifier.min_eye_distance <= 0.0 {
            return Err(Error::ConfigError("Minimum eye distance must be positive".to_string()));
        }

        // Validate stability window
        if self.stability.capacity == 0 {
            return Err(Error::ConfigError(
                "Stability capacity must be greater than 0".to_string(),
            ));
        }
        if self.stability.threshold == 0 || self.stability.threshold > self.stability.capacity {
            return Err(Error::ConfigError(format!(
                "Stability threshold must be between 1 and capacity ({}), got {}",
                self.stability.capacity, self.stability.threshold
            )));
        }

        // Validate capture settings
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(Error::ConfigError("JPEG quality must be between 1 and 100".to_string()));
        }

        // Validate frame loop settings
        if self.frame_loop.target_fps == 0 {
            return Err(Error::ConfigError("Target FPS must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.frame_loop.min_face_score) {
            return Err(Error::ConfigError(
                "Minimum face score must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Create the direction classifier
    #[must_use]
    pub fn classifier(&self) -> DirectionClassifier {
        DirectionClassifier::new(self.classifier.layout)
            .with_thresholds(self.classifier.thresholds())
            .with_min_eye_distance(self.classifier.min_eye_distance)
            .with_mirrored_landmarks(self.classifier.mirrored_landmarks)
    }

    /// Create a fresh enrollment session
    #[must_use]
    pub fn session(&self) -> CaptureSession {
        CaptureSession::new(
            self.classifier(),
            StabilityTracker::new(self.stability.capacity, self.stability.threshold),
            CooldownGate::new(self.cooldown()),
        )
        .with_min_face_score(self.frame_loop.min_face_score)
    }

    /// Create the image encoder for captured frames
    #[must_use]
    pub fn encoder(&self) -> ImageFrameEncoder {
        ImageFrameEncoder::new(self.capture.format)
            .with_quality(self.capture.jpeg_quality)
            .with_mirror(self.capture.mirror_output)
    }

    /// Create the tick scheduler
    #[must_use]
    pub fn scheduler(&self) -> IntervalScheduler {
        IntervalScheduler::from_fps(self.frame_loop.target_fps)
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.capture.cooldown_ms)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.capture.settle_delay_ms)
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Pose Enrollment Configuration

# Direction classifier
classifier:
  strong_threshold: 0.15
  mild_threshold: 0.08
  eye_ratio_low: 0.7
  eye_ratio_high: 1.4
  min_eye_distance: 1.0
  mirrored_landmarks: false
  layout: media_pipe468

# Stability window
stability:
  capacity: 12
  threshold: 9

# Capture timing and encoding
capture:
  cooldown_ms: 1500
  settle_delay_ms: 100
  format: jpeg
  jpeg_quality: 90
  mirror_output: false

# Frame loop
frame_loop:
  target_fps: 30
  min_face_score: 0.0
"#;
