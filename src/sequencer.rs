//! Capture sequencing over the fixed enrollment order `center → right → left`.

use crate::{classifier::PoseLabel, constants::ENROLLMENT_IMAGE_COUNT, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current state of the enrollment flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStep {
    Center,
    Right,
    Left,
    Complete,
}

impl CaptureStep {
    /// Pose the subject must hold for this step
    #[must_use]
    pub const fn target(self) -> Option<PoseLabel> {
        match self {
            Self::Center => Some(PoseLabel::Front),
            Self::Right => Some(PoseLabel::Right),
            Self::Left => Some(PoseLabel::Left),
            Self::Complete => None,
        }
    }

    /// Position stored with an image captured in this step
    #[must_use]
    pub const fn position(self) -> Option<CapturePosition> {
        match self {
            Self::Center => Some(CapturePosition::Center),
            Self::Right => Some(CapturePosition::Right),
            Self::Left => Some(CapturePosition::Left),
            Self::Complete => None,
        }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Center => Self::Right,
            Self::Right => Self::Left,
            Self::Left | Self::Complete => Self::Complete,
        }
    }

    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for CaptureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Center => "center",
            Self::Right => "right",
            Self::Left => "left",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Position tag of a captured image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePosition {
    Center,
    Right,
    Left,
}

impl CapturePosition {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Right => "right",
            Self::Left => "left",
        }
    }
}

impl fmt::Display for CapturePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encoded image captured for one enrollment position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    image_data: Vec<u8>,
    position: CapturePosition,
}

impl CapturedImage {
    #[must_use]
    pub fn image_data(&self) -> &[u8] {
        &self.image_data
    }

    #[must_use]
    pub fn position(&self) -> CapturePosition {
        self.position
    }

    /// Take ownership of the encoded bytes
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.image_data
    }
}

/// Proof that a capture is in flight for a specific step.
///
/// Only one ticket exists at a time; it is consumed by commit or abort.
#[derive(Debug)]
#[must_use = "a capture ticket must be committed or aborted"]
pub struct CaptureTicket {
    step: CaptureStep,
}

impl CaptureTicket {
    #[must_use]
    pub fn step(&self) -> CaptureStep {
        self.step
    }
}

/// Result of committing a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the given step
    Next(CaptureStep),
    /// All three images are captured
    Complete([CapturedImage; ENROLLMENT_IMAGE_COUNT]),
}

/// Linear state machine owning the captured images
#[derive(Debug)]
pub struct CaptureSequencer {
    step: CaptureStep,
    images: Vec<CapturedImage>,
    capturing: bool,
}

impl Default for CaptureSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: CaptureStep::Center,
            images: Vec::with_capacity(ENROLLMENT_IMAGE_COUNT),
            capturing: false,
        }
    }

    #[must_use]
    pub fn step(&self) -> CaptureStep {
        self.step
    }

    #[must_use]
    pub fn target(&self) -> Option<PoseLabel> {
        self.step().target()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.step().is_complete()
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Images captured so far, in capture order
    #[must_use]
    pub fn images(&self) -> &[CapturedImage] {
        &self.images
    }

    /// Start a capture for the current step.
    ///
    /// Returns `None` when a capture is already in flight or the flow is complete.
    pub fn begin_capture(&mut self) -> Option<CaptureTicket> {
        if self.capturing || self.is_complete() {
            return None;
        }
        self.capturing = true;
        Some(CaptureTicket { step: self.step() })
    }

    /// Store the encoded image for the ticket's step and advance
    ///
    /// # Errors
    ///
    /// Returns an error if the ticket was issued for a different step
    pub fn commit_capture(&mut self, ticket: CaptureTicket, image_data: Vec<u8>) -> Result<Advance> {
        self.capturing = false;
        let step = self.step();
        let position = match step.position() {
            Some(position) if ticket.step == step => position,
            _ => {
                return Err(Error::InvalidInput(format!(
                    "Capture ticket for step {} does not match current step {}",
                    ticket.step, step
                )))
            }
        };

        self.images.push(CapturedImage { image_data, position });
        let next = step.next();
        self.step = next;

        if !next.is_complete() {
            return Ok(Advance::Next(next));
        }

        let images: [CapturedImage; ENROLLMENT_IMAGE_COUNT] = std::mem::take(&mut self.images)
            .try_into()
            .map_err(|images: Vec<CapturedImage>| {
                Error::InvalidInput(format!(
                    "Expected {ENROLLMENT_IMAGE_COUNT} captured images, got {}",
                    images.len()
                ))
            })?;
        Ok(Advance::Complete(images))
    }

    /// Release the in-flight guard without advancing
    pub fn abort_capture(&mut self, ticket: CaptureTicket) {
        log::debug!("Capture for step {} aborted", ticket.step);
        self.capturing = false;
    }

    /// Clear the in-flight guard of a capture whose ticket was lost.
    ///
    /// Returns whether a capture was in flight.
    pub fn release(&mut self) -> bool {
        std::mem::replace(&mut self.capturing, false)
    }
}
