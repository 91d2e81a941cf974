//! Error types for the pose enrollment library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Detector returned no face for this frame
    #[error("No face detected")]
    NoFaceDetected,

    /// Detector returned more than one candidate face
    #[error("Multiple faces detected ({0})")]
    MultipleFacesDetected(usize),

    /// Landmarks do not allow a meaningful direction estimate
    #[error("Degenerate face geometry: {0}")]
    DegenerateGeometry(String),

    /// Encoding the captured frame failed
    #[error("Capture failed: {0}")]
    CaptureFailure(String),

    /// Landmark detector backend is unavailable
    #[error("Detector failure: {0}")]
    DetectorFailure(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding operation failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

impl Error {
    /// Whether this error must terminate the enrollment session
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DetectorFailure(_))
    }

    /// Per-frame conditions that only affect stability and gating
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NoFaceDetected
                | Self::MultipleFacesDetected(_)
                | Self::DegenerateGeometry(_)
                | Self::CaptureFailure(_)
        )
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::DetectorFailure("backend gone".to_string()).is_fatal());
        assert!(!Error::NoFaceDetected.is_fatal());
        assert!(!Error::CaptureFailure("encode".to_string()).is_fatal());
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::NoFaceDetected.is_transient());
        assert!(Error::MultipleFacesDetected(2).is_transient());
        assert!(Error::DegenerateGeometry("eyes".to_string()).is_transient());
        assert!(!Error::DetectorFailure("x".to_string()).is_transient());
        assert!(!Error::ConfigError("x".to_string()).is_transient());
    }
}
