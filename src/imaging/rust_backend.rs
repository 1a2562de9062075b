//! Pure Rust transcoder built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::load_from_memory_with_format` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{TranscodeError, Transcoder};
use super::params::{Quality, SourceFormat};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError};
use std::io::Write;

/// Transcoder using the `image` crate's pure Rust codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustTranscoder {
    quality: Quality,
}

impl RustTranscoder {
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }
}

impl Transcoder for RustTranscoder {
    fn decode(&self, bytes: &[u8], format: SourceFormat) -> Result<DynamicImage, TranscodeError> {
        image::load_from_memory_with_format(bytes, format.image_format())
            .map_err(|e| TranscodeError::Decode(format!("{format:?}: {e}")))
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        if image.width() == width && image.height() == height {
            return image.clone();
        }
        image.resize_exact(width, height, FilterType::Lanczos3)
    }

    fn encode_jpeg(
        &self,
        image: &DynamicImage,
        sink: &mut dyn Write,
    ) -> Result<(), TranscodeError> {
        // JPEG has no alpha channel; flatten everything to 8-bit RGB first.
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let encoder = JpegEncoder::new_with_quality(sink, self.quality.value());
        rgb.write_with_encoder(encoder).map_err(|e| match e {
            ImageError::IoError(io) => TranscodeError::Io(io),
            other => TranscodeError::Encode(other.to_string()),
        })
    }
}
