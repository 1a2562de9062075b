//! Shared test utilities for the galleryd test suite.
//!
//! Builds throwaway gallery and cache directories populated with small
//! images generated in-process, so no test depends on checked-in binaries.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let fx = GalleryFixture::new();
//! let store = SourceStore::new(&fx.gallery);
//! let asset = store.read("photos/cat.png").unwrap();
//! assert_eq!(asset.bytes, fx.read("photos/cat.png"));
//! ```

use crate::imaging::SourceFormat;
use image::{DynamicImage, ImageBuffer, Rgb};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =========================================================================
// Image generation
// =========================================================================

/// Encode a `width`x`height` gradient in the given format.
pub fn encoded_image(width: u32, height: u32, format: SourceFormat) -> Vec<u8> {
    let buffer = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut out, format.image_format())
        .unwrap();
    out.into_inner()
}

/// Write an encoded gradient image to `path`, creating parent directories.
pub fn write_image(path: &Path, width: u32, height: u32, format: SourceFormat) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, encoded_image(width, height, format)).unwrap();
}

// =========================================================================
// Gallery fixture
// =========================================================================

/// A gallery root and a cache root inside one temp directory.
///
/// Layout:
///
/// ```text
/// gallery/
/// ├── photos/
/// │   ├── cat.png        800x600
/// │   ├── dog.JPG        300x200
/// │   ├── anim.gif       (opaque bytes, unsupported format)
/// │   └── broken.png     (not a PNG)
/// ├── notes/
/// │   └── readme.txt
/// └── cover.jpeg         64x64
/// cache/                 (created lazily)
/// secret.txt             (outside the gallery root)
/// ```
pub struct GalleryFixture {
    pub tmp: TempDir,
    pub gallery: PathBuf,
    pub cache: PathBuf,
}

impl GalleryFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let gallery = tmp.path().join("gallery");
        let cache = tmp.path().join("cache");

        write_image(&gallery.join("photos/cat.png"), 800, 600, SourceFormat::Png);
        write_image(&gallery.join("photos/dog.JPG"), 300, 200, SourceFormat::Jpeg);
        write_image(&gallery.join("cover.jpeg"), 64, 64, SourceFormat::Jpeg);
        std::fs::write(gallery.join("photos/anim.gif"), b"GIF89a not really").unwrap();
        std::fs::write(gallery.join("photos/broken.png"), b"this is not a png").unwrap();
        std::fs::create_dir_all(gallery.join("notes")).unwrap();
        std::fs::write(gallery.join("notes/readme.txt"), "hello").unwrap();
        std::fs::write(tmp.path().join("secret.txt"), "top secret").unwrap();

        Self {
            tmp,
            gallery,
            cache,
        }
    }

    /// Raw bytes of a gallery file.
    pub fn read(&self, logical: &str) -> Vec<u8> {
        std::fs::read(self.gallery.join(logical)).unwrap()
    }

    /// A cache root that can never be created: its parent is a regular file.
    ///
    /// Permission bits are useless for this when tests run as root.
    pub fn unwritable_cache(&self) -> PathBuf {
        let blocker = self.tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        blocker.join("cache")
    }
}
