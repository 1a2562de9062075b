//! On-disk thumbnail cache.
//!
//! Thumbnail encoding is the expensive part of serving a gallery: decoding a
//! large photo and resampling it with Lanczos3 takes far longer than
//! streaming a few kilobytes of JPEG. This module stores every generated
//! thumbnail so repeat requests are served straight from disk.
//!
//! # Design
//!
//! ## Cache keys
//!
//! A [`ThumbnailKey`] is the triple (logical source path, width, height).
//! Width and height are the *parsed* request values, so `?width=0200` and
//! `?width=200` share one entry. An unspecified side is a distinct value,
//! never confused with any number.
//!
//! ## Layout
//!
//! The key maps to a path with no lookup table in between:
//!
//! ```text
//! <cache_root>/<logical path>/<width|auto>/<height|auto>.jpg
//!
//! .cache/photos/cat.png/200/auto.jpg      ?width=200
//! .cache/photos/cat.png/auto/150.jpg      ?height=150
//! .cache/photos/cat.png/200/200.jpg       ?width=200&height=200
//! ```
//!
//! Distinct keys always land on distinct files: the logical path is a
//! normalized path inside the gallery, and the two dimension segments are
//! either decimal numbers or the literal `auto`.
//!
//! ## Writes
//!
//! Entries are written to a temp file in the destination directory and
//! renamed into place once complete. A reader either sees no file or a
//! whole one. Two requests racing on the same key both write their own temp
//! file and the last rename wins; both outputs are identical anyway.
//!
//! ## Lifetime
//!
//! Entries are never invalidated or evicted. A thumbnail made from a source
//! that is later edited stays stale until someone deletes the cache
//! directory.

use crate::imaging::Bounds;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Directory / file name used for an unspecified dimension.
const AUTO: &str = "auto";

/// File extension of every cache entry. The cache only ever holds JPEG.
const ENTRY_EXTENSION: &str = "jpg";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("cannot move cache entry into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Identifies one derived thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailKey {
    /// Normalized logical path of the source image.
    pub source: String,
    pub bounds: Bounds,
}

impl ThumbnailKey {
    pub fn new(source: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            source: source.into(),
            bounds,
        }
    }

    /// Path of this key's entry relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        let side = |v: Option<u32>| v.map_or_else(|| AUTO.to_string(), |n| n.to_string());

        let mut path = PathBuf::new();
        path.extend(self.source.split('/').filter(|s| !s.is_empty()));
        path.push(side(self.bounds.width));
        path.push(format!("{}.{}", side(self.bounds.height), ENTRY_EXTENSION));
        path
    }
}

impl fmt::Display for ThumbnailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.source, self.bounds)
    }
}

/// A cache hit, opened and ready to stream.
#[derive(Debug)]
pub struct CachedThumbnail {
    pub path: PathBuf,
    pub file: File,
    pub len: u64,
}

/// Maps [`ThumbnailKey`]s to JPEG files under a cache root.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    root: PathBuf,
}

impl ThumbnailCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a key's entry.
    pub fn entry_path(&self, key: &ThumbnailKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Open the cached entry for `key`.
    ///
    /// Returns `None` if there is no entry or it cannot be opened; the cache
    /// is best-effort and a failed open simply means "regenerate".
    pub fn lookup(&self, key: &ThumbnailKey) -> Option<CachedThumbnail> {
        let path = self.entry_path(key);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("cannot open cache entry {}: {e}", path.display());
                }
                return None;
            }
        };
        match file.metadata() {
            Ok(meta) if meta.is_file() => Some(CachedThumbnail {
                path,
                len: meta.len(),
                file,
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("cannot stat cache entry {}: {e}", path.display());
                None
            }
        }
    }

    /// Start writing the entry for `key`.
    ///
    /// Creates missing directories and a temp file next to the final
    /// location. Nothing is visible to readers until
    /// [`CacheWriter::commit`] succeeds; dropping the writer discards it.
    pub fn begin(&self, key: &ThumbnailKey) -> Result<CacheWriter, CacheError> {
        let target = self.entry_path(key);
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        std::fs::create_dir_all(&dir)?;
        let temp = tempfile::Builder::new()
            .prefix(".partial-")
            .suffix(".tmp")
            .tempfile_in(&dir)?;
        Ok(CacheWriter { temp, target })
    }

    /// Store a complete artifact for `key` in one call.
    pub fn store(&self, key: &ThumbnailKey, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let mut writer = self.begin(key)?;
        writer.write_all(bytes)?;
        writer.commit()
    }
}

/// An in-progress cache entry. Implements [`Write`].
pub struct CacheWriter {
    temp: NamedTempFile,
    target: PathBuf,
}

impl CacheWriter {
    /// Flush and atomically rename the entry into place.
    pub fn commit(mut self) -> Result<PathBuf, CacheError> {
        self.temp.flush()?;
        self.temp.persist(&self.target)?;
        Ok(self.target)
    }
}

impl Write for CacheWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.temp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.temp.flush()
    }
}

/// Request outcome counters for the lifetime of the server.
///
/// Observability only: nothing reads these to make cache decisions.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    fallbacks: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub fallbacks: u64,
    pub write_failures: u64,
}

impl CacheStats {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

impl CacheSnapshot {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    /// Prometheus text exposition of the counters.
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();
        for (name, help, value) in [
            ("galleryd_thumbnail_cache_hits_total", "Thumbnails served from the disk cache.", self.hits),
            ("galleryd_thumbnail_encodes_total", "Thumbnails generated on a cache miss.", self.misses),
            ("galleryd_thumbnail_fallbacks_total", "Thumbnail requests served as the original file.", self.fallbacks),
            ("galleryd_cache_write_failures_total", "Generated thumbnails that could not be persisted.", self.write_failures),
        ] {
            out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"));
        }
        out
    }
}

impl fmt::Display for CacheSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )?;
        } else {
            write!(f, "{} encoded", self.misses)?;
        }
        if self.fallbacks > 0 {
            write!(f, ", {} served as original", self.fallbacks)?;
        }
        if self.write_failures > 0 {
            write!(f, ", {} not persisted", self.write_failures)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn key(source: &str, w: Option<u32>, h: Option<u32>) -> ThumbnailKey {
        ThumbnailKey::new(source, Bounds::new(w, h))
    }

    // =========================================================================
    // Key → path derivation
    // =========================================================================

    #[test]
    fn relative_path_nests_source_width_height() {
        assert_eq!(
            key("photos/cat.png", Some(200), Some(150)).relative_path(),
            PathBuf::from("photos/cat.png/200/150.jpg")
        );
    }

    #[test]
    fn relative_path_marks_unspecified_sides() {
        assert_eq!(
            key("cat.png", Some(200), None).relative_path(),
            PathBuf::from("cat.png/200/auto.jpg")
        );
        assert_eq!(
            key("cat.png", None, Some(150)).relative_path(),
            PathBuf::from("cat.png/auto/150.jpg")
        );
    }

    #[test]
    fn relative_path_is_deterministic() {
        let a = key("a/b.jpg", Some(10), None);
        assert_eq!(a.relative_path(), a.clone().relative_path());
    }

    #[test]
    fn distinct_keys_get_distinct_paths() {
        let sources = ["a.png", "b.png", "dir/a.png"];
        let sides = [None, Some(1), Some(10), Some(100)];
        let mut seen = HashSet::new();
        let mut count = 0;
        for s in sources {
            for w in sides {
                for h in sides {
                    if w.is_none() && h.is_none() {
                        continue;
                    }
                    count += 1;
                    seen.insert(key(s, w, h).relative_path());
                }
            }
        }
        assert_eq!(seen.len(), count);
    }

    #[test]
    fn swapped_dimensions_are_distinct() {
        assert_ne!(
            key("x.png", Some(100), None).relative_path(),
            key("x.png", None, Some(100)).relative_path()
        );
        assert_ne!(
            key("x.png", Some(1), Some(10)).relative_path(),
            key("x.png", Some(10), Some(1)).relative_path()
        );
    }

    #[test]
    fn key_display() {
        assert_eq!(key("a.png", Some(5), None).to_string(), "a.png@5xauto");
    }

    // =========================================================================
    // lookup / store
    // =========================================================================

    #[test]
    fn lookup_miss_when_empty() {
        let tmp = TempDir::new().unwrap();
        let cache = ThumbnailCache::new(tmp.path());
        assert!(cache.lookup(&key("a.png", Some(1), None)).is_none());
    }

    #[test]
    fn store_then_lookup_hit() {
        let tmp = TempDir::new().unwrap();
        let cache = ThumbnailCache::new(tmp.path().join("nested/cache"));
        let k = key("photos/cat.png", Some(200), None);

        let path = cache.store(&k, b"jpeg bytes").unwrap();
        assert_eq!(path, cache.entry_path(&k));

        let mut hit = cache.lookup(&k).unwrap();
        assert_eq!(hit.len, 10);
        let mut content = Vec::new();
        hit.file.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"jpeg bytes");
    }

    #[test]
    fn lookup_ignores_directory_at_entry_path() {
        let tmp = TempDir::new().unwrap();
        let cache = ThumbnailCache::new(tmp.path());
        let k = key("a.png", Some(1), Some(2));
        fs::create_dir_all(cache.entry_path(&k)).unwrap();
        assert!(cache.lookup(&k).is_none());
    }

    #[test]
    fn uncommitted_writer_leaves_no_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = ThumbnailCache::new(tmp.path());
        let k = key("a.png", Some(8), None);

        let mut writer = cache.begin(&k).unwrap();
        writer.write_all(b"half a jp").unwrap();
        assert!(cache.lookup(&k).is_none());
        drop(writer);

        assert!(cache.lookup(&k).is_none());
        let dir = cache.entry_path(&k).parent().unwrap().to_path_buf();
        assert_eq!(fs::read_dir(dir).unwrap().count(), 0);
    }

    #[test]
    fn partial_write_invisible_until_commit() {
        let tmp = TempDir::new().unwrap();
        let cache = ThumbnailCache::new(tmp.path());
        let k = key("a.png", Some(8), None);

        let mut writer = cache.begin(&k).unwrap();
        writer.write_all(b"first half ").unwrap();
        assert!(!cache.entry_path(&k).exists());
        writer.write_all(b"second half").unwrap();
        writer.commit().unwrap();

        assert_eq!(
            fs::read(cache.entry_path(&k)).unwrap(),
            b"first half second half"
        );
    }

    #[test]
    fn concurrent_writers_last_commit_wins() {
        let tmp = TempDir::new().unwrap();
        let cache = ThumbnailCache::new(tmp.path());
        let k = key("a.png", Some(8), None);

        let mut first = cache.begin(&k).unwrap();
        let mut second = cache.begin(&k).unwrap();
        first.write_all(b"AAAA").unwrap();
        second.write_all(b"BBBB").unwrap();
        first.commit().unwrap();
        assert_eq!(fs::read(cache.entry_path(&k)).unwrap(), b"AAAA");
        second.commit().unwrap();
        assert_eq!(fs::read(cache.entry_path(&k)).unwrap(), b"BBBB");
    }

    #[test]
    fn begin_fails_when_root_cannot_be_created() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let cache = ThumbnailCache::new(blocker.join("cache"));
        assert!(matches!(
            cache.begin(&key("a.png", Some(1), None)),
            Err(CacheError::Io(_))
        ));
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let s = CacheStats::default();
        for _ in 0..5 {
            s.hit();
        }
        s.miss();
        s.miss();
        assert_eq!(s.snapshot().to_string(), "5 cached, 2 encoded (7 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let s = CacheStats::default();
        s.miss();
        s.miss();
        s.miss();
        assert_eq!(s.snapshot().to_string(), "3 encoded");
    }

    #[test]
    fn cache_stats_display_with_fallbacks_and_failures() {
        let s = CacheStats::default();
        s.miss();
        s.fallback();
        s.write_failure();
        assert_eq!(
            s.snapshot().to_string(),
            "1 encoded, 1 served as original, 1 not persisted"
        );
    }

    #[test]
    fn prometheus_output_lists_every_counter() {
        let s = CacheStats::default();
        s.hit();
        let text = s.snapshot().to_prometheus();
        assert!(text.contains("galleryd_thumbnail_cache_hits_total 1\n"));
        assert!(text.contains("galleryd_thumbnail_encodes_total 0\n"));
        assert!(text.contains("# TYPE galleryd_cache_write_failures_total counter"));
    }
}
