//! Request resolution: from a logical path plus query to something servable.
//!
//! The resolver owns the [`SourceStore`], the [`ThumbnailCache`] and a
//! [`Transcoder`], and walks each request through the same steps:
//!
//! ```text
//! resolve path ──dir──▶ Listing
//!      │
//!     file
//!      ▼
//! parse width/height ──invalid──▶ InvalidDimension (400)
//!      │
//!      ├─ neither given ─────────────────────────▶ Original
//!      ▼
//! cache lookup ──hit──▶ Cached
//!      │
//!     miss
//!      ▼
//! format + decode ──unsupported/corrupt──▶ Original (fallback)
//!      ▼
//! resize → encode ─┬─▶ response buffer ──▶ Generated
//!                  └─▶ cache temp file ──▶ commit (failure only logged)
//! ```
//!
//! It is transport-agnostic: results are [`Resolution`] values and failures
//! are [`ResolveError`] kinds. Mapping those to HTTP lives in
//! [`server`](crate::server).

use crate::cache::{CacheSnapshot, CacheStats, CachedThumbnail, ThumbnailCache, ThumbnailKey};
use crate::config::ServerConfig;
use crate::imaging::{
    Bounds, Quality, RustTranscoder, SourceFormat, TranscodeError, Transcoder, scale_to_fit,
    write_jpeg,
};
use crate::source::{DirEntry, EntryKind, ImageAsset, Resolved, SourceError, SourceStore};
use crate::tee::TeeWriter;
use image::GenericImageView;
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid {name} parameter: {value:?}")]
    InvalidDimension { name: &'static str, value: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl From<SourceError> for ResolveError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(path) => Self::NotFound(path),
            unreadable @ SourceError::Unreadable { .. } => Self::Internal(unreadable.to_string()),
        }
    }
}

/// Raw `width` / `height` query parameters, as the client sent them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DimensionQuery {
    pub width: Option<String>,
    pub height: Option<String>,
}

impl DimensionQuery {
    pub fn new(width: Option<&str>, height: Option<&str>) -> Self {
        Self {
            width: width.map(str::to_string),
            height: height.map(str::to_string),
        }
    }
}

/// Parse the requested bounds. Absent, empty and `0` all mean "unspecified".
pub fn parse_dimensions(query: &DimensionQuery) -> Result<Bounds, ResolveError> {
    let width = parse_side("width", query.width.as_deref())?;
    let height = parse_side("height", query.height.as_deref())?;
    Ok(Bounds::new(width, height))
}

fn parse_side(name: &'static str, raw: Option<&str>) -> Result<Option<u32>, ResolveError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ResolveError::InvalidDimension {
                name,
                value: value.to_string(),
            }),
    }
}

/// A source file served byte-for-byte.
#[derive(Debug)]
pub struct Original {
    pub path: PathBuf,
    pub file: File,
    pub len: u64,
}

/// What to send back for a request.
#[derive(Debug)]
pub enum Resolution {
    /// The logical path is a directory.
    Listing {
        logical: String,
        entries: Vec<DirEntry>,
    },
    /// Verbatim file: no bounds requested, or thumbnailing was impossible.
    Original(Original),
    /// Previously generated thumbnail, read from the cache.
    Cached(CachedThumbnail),
    /// Thumbnail generated for this request. `persisted` says whether the
    /// cache write went through.
    Generated { bytes: Vec<u8>, persisted: bool },
}

/// Orchestrates source store, thumbnail cache and transcoder.
pub struct RequestResolver {
    store: SourceStore,
    cache: ThumbnailCache,
    transcoder: Arc<dyn Transcoder>,
    stats: CacheStats,
}

impl RequestResolver {
    /// Build a resolver with the production transcoder.
    pub fn new(config: &ServerConfig) -> Self {
        let transcoder = RustTranscoder::new(Quality::new(config.thumbnails.quality));
        Self::with_transcoder(
            SourceStore::new(&config.folders.gallery),
            ThumbnailCache::new(&config.folders.cache),
            Arc::new(transcoder),
        )
    }

    pub fn with_transcoder(
        store: SourceStore,
        cache: ThumbnailCache,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            store,
            cache,
            transcoder,
            stats: CacheStats::default(),
        }
    }

    pub fn store(&self) -> &SourceStore {
        &self.store
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    pub fn stats(&self) -> CacheSnapshot {
        self.stats.snapshot()
    }

    /// Resolve one request. Blocking: runs file I/O and image work inline.
    pub fn resolve(
        &self,
        logical: &str,
        query: &DimensionQuery,
    ) -> Result<Resolution, ResolveError> {
        let resolved = self.store.resolve(logical)?;
        debug!("resolved {logical:?} to {}", resolved.path.display());

        if resolved.kind == EntryKind::Directory {
            let entries = self.store.list(&resolved.logical)?;
            return Ok(Resolution::Listing {
                logical: resolved.logical,
                entries,
            });
        }

        let bounds = parse_dimensions(query)?;
        if bounds.is_unbounded() {
            return self.original(&resolved);
        }

        let key = ThumbnailKey::new(resolved.logical.as_str(), bounds);
        if let Some(hit) = self.cache.lookup(&key) {
            debug!("cache hit {key} ({} bytes)", hit.len);
            self.stats.hit();
            return Ok(Resolution::Cached(hit));
        }
        debug!("cache miss {key}");

        let format = match SourceFormat::from_path(&resolved.path) {
            Ok(format) => format,
            Err(reason) => return self.fallback(&resolved, reason),
        };
        let asset = self.store.read(&resolved.logical)?;
        self.generate(&key, &asset, format)
            .or_else(|reason| {
                if reason.is_unsupported_media() {
                    self.fallback(&resolved, reason)
                } else {
                    Err(ResolveError::Internal(format!(
                        "cannot generate thumbnail {key}: {reason}"
                    )))
                }
            })
    }

    /// Encode once into the response buffer and the cache entry.
    ///
    /// The cache entry is only opened once the source has decoded, so
    /// unusable sources leave nothing behind in the cache.
    fn generate(
        &self,
        key: &ThumbnailKey,
        asset: &ImageAsset,
        format: SourceFormat,
    ) -> Result<Resolution, TranscodeError> {
        let image = scale_to_fit(self.transcoder.as_ref(), &asset.bytes, format, key.bounds)?;

        let entry = match self.cache.begin(key) {
            Ok(writer) => Some(writer),
            Err(e) => {
                warn!("cannot open cache entry for {key}: {e}");
                self.stats.write_failure();
                None
            }
        };

        let mut tee = TeeWriter::new(Vec::new(), entry);
        write_jpeg(self.transcoder.as_ref(), &image, &mut tee)?;
        self.stats.miss();

        let (body, entry) = tee.into_parts();
        let persisted = match entry {
            Ok(Some(writer)) => match writer.commit() {
                Ok(path) => {
                    debug!("cached {key} at {}", path.display());
                    true
                }
                Err(e) => {
                    warn!("cannot persist cache entry for {key}: {e}");
                    self.stats.write_failure();
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                warn!("cache write for {key} failed mid-stream: {e}");
                self.stats.write_failure();
                false
            }
        };

        let (width, height) = image.dimensions();
        debug!(
            "generated {key} from {}: {width}x{height}, {} bytes",
            asset.path.display(),
            body.len()
        );
        Ok(Resolution::Generated {
            bytes: body,
            persisted,
        })
    }

    fn fallback(
        &self,
        resolved: &Resolved,
        reason: TranscodeError,
    ) -> Result<Resolution, ResolveError> {
        warn!(
            "cannot thumbnail {}: {reason}; serving original",
            resolved.logical
        );
        self.stats.fallback();
        self.original(resolved)
    }

    fn original(&self, resolved: &Resolved) -> Result<Resolution, ResolveError> {
        let (file, meta) = self.store.open(&resolved.logical)?;
        Ok(Resolution::Original(Original {
            path: resolved.path.clone(),
            file,
            len: meta.len(),
        }))
    }
}
