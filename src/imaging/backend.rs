//! Transcoder trait and shared error type.
//!
//! The [`Transcoder`] trait defines the three steps every thumbnail goes
//! through: decode, resize, encode. Splitting them lets tests wrap the real
//! implementation and count invocations, and keeps the encode step unaware
//! of where its bytes end up (it only sees a `Write`).
//!
//! The production implementation is
//! [`RustTranscoder`](super::rust_backend::RustTranscoder).

use super::params::SourceFormat;
use image::DynamicImage;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("unsupported image format: {0:?}")]
    UnsupportedFormat(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("IO error while encoding: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Whether the source itself could not be thumbnailed.
    ///
    /// Such failures degrade to verbatim serving; everything else is an
    /// internal failure of the request.
    pub fn is_unsupported_media(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_) | Self::Decode(_))
    }
}

/// Decode → resize → encode pipeline for thumbnails.
pub trait Transcoder: Send + Sync {
    /// Decode `bytes` with the decoder chosen for `format`.
    fn decode(&self, bytes: &[u8], format: SourceFormat) -> Result<DynamicImage, TranscodeError>;

    /// Resample to exactly `width`x`height`.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Encode as JPEG into `sink`.
    fn encode_jpeg(&self, image: &DynamicImage, sink: &mut dyn Write)
    -> Result<(), TranscodeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::RustTranscoder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps [`RustTranscoder`] and records how often each step ran.
    /// Atomics keep it `Sync` so it can sit behind the resolver's `Arc`.
    #[derive(Default)]
    pub struct CountingTranscoder {
        inner: RustTranscoder,
        pub decodes: AtomicUsize,
        pub resizes: AtomicUsize,
        pub encodes: AtomicUsize,
    }

    impl CountingTranscoder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn decode_count(&self) -> usize {
            self.decodes.load(Ordering::SeqCst)
        }

        pub fn encode_count(&self) -> usize {
            self.encodes.load(Ordering::SeqCst)
        }
    }

    impl Transcoder for CountingTranscoder {
        fn decode(
            &self,
            bytes: &[u8],
            format: SourceFormat,
        ) -> Result<DynamicImage, TranscodeError> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            self.inner.decode(bytes, format)
        }

        fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
            self.resizes.fetch_add(1, Ordering::SeqCst);
            self.inner.resize(image, width, height)
        }

        fn encode_jpeg(
            &self,
            image: &DynamicImage,
            sink: &mut dyn Write,
        ) -> Result<(), TranscodeError> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            self.inner.encode_jpeg(image, sink)
        }
    }

    #[test]
    fn counting_transcoder_records_steps() {
        let t = CountingTranscoder::new();
        let img = DynamicImage::new_rgb8(40, 30);
        let small = t.resize(&img, 20, 15);
        let mut out = Vec::new();
        t.encode_jpeg(&small, &mut out).unwrap();

        assert_eq!(t.decode_count(), 0);
        assert_eq!(t.resizes.load(Ordering::SeqCst), 1);
        assert_eq!(t.encode_count(), 1);
        assert!(!out.is_empty());
    }

    #[test]
    fn unsupported_media_classification() {
        assert!(TranscodeError::UnsupportedFormat("gif".into()).is_unsupported_media());
        assert!(TranscodeError::Decode("bad".into()).is_unsupported_media());
        assert!(!TranscodeError::Encode("bad".into()).is_unsupported_media());
        assert!(!TranscodeError::Io(std::io::Error::other("x")).is_unsupported_media());
    }
}
