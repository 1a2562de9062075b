//! Parameter types for image operations.
//!
//! These types describe *what* to produce, not *how*. They sit between the
//! request resolver (which parses client input) and the
//! [`Transcoder`](super::backend::Transcoder) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 85). Clamped on construction.
//! - [`Bounds`]: Requested thumbnail box; either side may be unspecified.
//! - [`SourceFormat`]: Decoder selected from the source file's extension.

use super::backend::TranscodeError;
use image::ImageFormat;
use std::fmt;
use std::path::Path;

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Requested thumbnail bounds in pixels.
///
/// `None` on a side means "unspecified": that side is derived from the other
/// one so the source aspect ratio is kept. A request of `0` is parsed as
/// `None` by the resolver, so `Some(0)` never reaches the transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bounds {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Bounds {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width: width.filter(|&w| w > 0),
            height: height.filter(|&h| h > 0),
        }
    }

    /// True when neither side was requested (serve the original instead).
    pub fn is_unbounded(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: Option<u32>| v.map_or_else(|| "auto".to_string(), |n| n.to_string());
        write!(f, "{}x{}", side(self.width), side(self.height))
    }
}

/// Source encodings the transcoder can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
}

impl SourceFormat {
    /// Pick a decoder from the file extension (case-insensitive).
    ///
    /// `.jpg`/`.jpeg` → JPEG, `.png` → PNG, anything else is
    /// [`TranscodeError::UnsupportedFormat`].
    pub fn from_path(path: &Path) -> Result<Self, TranscodeError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") {
            Ok(Self::Jpeg)
        } else if ext.eq_ignore_ascii_case("png") {
            Ok(Self::Png)
        } else {
            Err(TranscodeError::UnsupportedFormat(ext.to_string()))
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }
}
