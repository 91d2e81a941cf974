//! Constants used throughout the library

/// Offset beyond which a single cue is enough to declare a profile pose
pub const STRONG_PROFILE_THRESHOLD: f64 = 0.15;

/// Offset beyond which a profile pose needs a corroborating cue
pub const MILD_PROFILE_THRESHOLD: f64 = 0.08;

/// Eye width ratio below which the head is turned to the subject's left
pub const EYE_RATIO_LOW: f64 = 0.7;

/// Eye width ratio above which the head is turned to the subject's right
pub const EYE_RATIO_HIGH: f64 = 1.4;

/// Minimum horizontal outer-eye distance (pixels) for a usable frame; normalized landmarks need a smaller value
pub const DEFAULT_MIN_EYE_DISTANCE: f64 = 1.0;

/// Stability window defaults
pub const DEFAULT_STABILITY_CAPACITY: usize = 12;
pub const DEFAULT_STABILITY_THRESHOLD: usize = 9;

/// Capture timing defaults (milliseconds)
pub const DEFAULT_COOLDOWN_MS: u64 = 1500;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

/// Default frames per second for the tick scheduler
pub const DEFAULT_TARGET_FPS: u32 = 30;

/// Default JPEG quality for captured images
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Number of images in a completed enrollment
pub const ENROLLMENT_IMAGE_COUNT: usize = 3;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;

/// Upper bound on the expanded length of a landmark script (about nine hours at 30 fps)
pub const MAX_SCRIPT_FRAMES: usize = 1_000_000;
