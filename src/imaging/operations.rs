//! High-level image operations.
//!
//! Thumbnailing is split in two so callers can learn whether a source is
//! usable before committing to any output: [`scale_to_fit`] decodes and
//! resizes, [`write_jpeg`] encodes.

use super::backend::{TranscodeError, Transcoder};
use super::calculations::fit_within;
use super::params::{Bounds, SourceFormat};
use image::{DynamicImage, GenericImageView};
use std::io::Write;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, TranscodeError>;

/// Decode `bytes` and resize the result to fit inside `bounds`.
///
/// Fails with an unsupported-media error for undecodable input; nothing has
/// been written anywhere at that point.
pub fn scale_to_fit(
    transcoder: &dyn Transcoder,
    bytes: &[u8],
    format: SourceFormat,
    bounds: Bounds,
) -> Result<DynamicImage> {
    let source = transcoder.decode(bytes, format)?;
    let (width, height) = fit_within(source.dimensions(), bounds);
    Ok(transcoder.resize(&source, width, height))
}

/// Encode `image` as JPEG into `sink` and flush it.
///
/// `sink` may fan out to several destinations; this function does not know
/// or care.
pub fn write_jpeg(
    transcoder: &dyn Transcoder,
    image: &DynamicImage,
    sink: &mut dyn Write,
) -> Result<()> {
    transcoder.encode_jpeg(image, sink)?;
    sink.flush()?;
    Ok(())
}
