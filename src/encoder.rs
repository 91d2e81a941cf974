//! Encoding of captured frames into image blobs.
//!
//! Orientation convention: captured images are stored in the camera's native
//! (unmirrored) orientation. Hosts whose frame source hands out frames already
//! mirrored for display set `mirror_output` so the encoder flips them back.

use crate::{constants::DEFAULT_JPEG_QUALITY, Error, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Turns the frame at capture time into an encoded image
#[async_trait]
pub trait ImageEncoder<F: Sync>: Send {
    /// Encode one frame
    async fn encode(&mut self, frame: &F) -> Result<Vec<u8>>;
}

/// Container format of captured images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Encoder for in-memory `image` frames
#[derive(Debug, Clone)]
pub struct ImageFrameEncoder {
    format: OutputFormat,
    jpeg_quality: u8,
    mirror: bool,
}

impl Default for ImageFrameEncoder {
    fn default() -> Self {
        Self::new(OutputFormat::Jpeg)
    }
}

impl ImageFrameEncoder {
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            mirror: false,
        }
    }

    /// JPEG quality, clamped to 1..=100
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Flip frames horizontally before encoding
    #[must_use]
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Encode a frame synchronously
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The frame has no pixels
    /// - The underlying codec fails
    pub fn encode_image(&self, frame: &DynamicImage) -> Result<Vec<u8>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::CaptureFailure("Frame has no pixels".to_string()));
        }

        let oriented = if self.mirror { frame.fliph() } else { frame.clone() };

        let mut buffer = Cursor::new(Vec::new());
        match self.format {
            // JPEG has no alpha channel
            OutputFormat::Jpeg => DynamicImage::ImageRgb8(oriented.to_rgb8())
                .write_to(&mut buffer, ImageOutputFormat::Jpeg(self.jpeg_quality))?,
            OutputFormat::Png => oriented.write_to(&mut buffer, ImageOutputFormat::Png)?,
        }
        Ok(buffer.into_inner())
    }
}

#[async_trait]
impl ImageEncoder<DynamicImage> for ImageFrameEncoder {
    async fn encode(&mut self, frame: &DynamicImage) -> Result<Vec<u8>> {
        self.encode_image(frame)
    }
}

#[async_trait]
impl ImageEncoder<RgbImage> for ImageFrameEncoder {
    async fn encode(&mut self, frame: &RgbImage) -> Result<Vec<u8>> {
        self.encode_image(&DynamicImage::ImageRgb8(frame.clone()))
    }
}
