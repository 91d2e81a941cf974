//! Guided three-pose face enrollment.
//!
//! This library decides, frame by frame, when a subject is holding the head
//! pose an enrollment step asks for, and captures one image per pose:
//! - Direction classification from 2D facial landmarks (front, right, left)
//! - A rolling stability window so only a held pose triggers a capture
//! - A cooldown between captures
//! - A fixed center, right, left capture sequence
//!
//! The pipeline for every tick is:
//! 1. Grab the current frame and run the external landmark detector on it
//! 2. Classify the head direction from the landmarks
//! 3. Update the stability window and check the capture gates
//! 4. When every gate passes, wait for the subject to settle and capture
//!
//! # Examples
//!
//! ## Classifying a single frame
//!
//! ```no_run
//! use pose_enrollment::{classifier::DirectionClassifier, landmarks::LandmarkLayout, replay::synthetic_face};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let classifier = DirectionClassifier::new(LandmarkLayout::Ibug68);
//!
//! // Head turned to the subject's right
//! let frame = synthetic_face(LandmarkLayout::Ibug68, -0.2, 1.0, 1.0);
//! let result = classifier.classify(&frame)?;
//! println!("{} ({:.2})", result.pose, result.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! ## Running a session from a recorded script
//!
//! ```no_run
//! use pose_enrollment::{
//!     config::Config,
//!     frame_loop::{FrameLoop, SessionOutcome},
//!     replay::{LandmarkScript, RecordingObserver, ScriptedDetector, StaticFrameSource},
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let script = LandmarkScript::from_file("session.yaml")?;
//!
//! let mut frame_loop = FrameLoop::new(
//!     config.session(),
//!     StaticFrameSource::blank(640, 480),
//!     ScriptedDetector::from_script(&script)?,
//!     config.encoder(),
//!     RecordingObserver::new(),
//! )
//! .with_scheduler(Box::new(config.scheduler()))
//! .with_settle_delay(config.settle_delay());
//!
//! if frame_loop.run().await? == SessionOutcome::Completed {
//!     for image in &frame_loop.observer().completions[0] {
//!         println!("{}: {} bytes", image.position(), image.image_data().len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Head direction classification from facial landmarks
pub mod classifier;

/// Configuration management
pub mod config;

/// Constants used throughout the library
pub mod constants;

/// Minimum interval between captures
pub mod cooldown;

/// Encoding of captured frames
pub mod encoder;

/// Error types and result handling
pub mod error;

/// Async frame loop driving a session
pub mod frame_loop;

/// Landmark frames and detector output
pub mod landmarks;

/// Scripted landmark playback for offline runs and tests
pub mod replay;

/// Tick scheduling and cancellation
pub mod scheduler;

/// Center, right, left capture ordering
pub mod sequencer;

/// Per-session state and capture gating
pub mod session;

/// Rolling pose stability window
pub mod stability;

pub use error::{Error, Result};
