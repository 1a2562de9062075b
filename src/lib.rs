//! # galleryd
//!
//! Serves a directory tree of photos over HTTP. Directories render as plain
//! link listings; image files are served as-is or, when the client asks for
//! `?width=` and/or `?height=`, as a JPEG thumbnail that is generated once
//! and kept on disk.
//!
//! # Request Flow
//!
//! ```text
//! GET /gallery/photos/cat.png?width=200
//!   → SourceStore     resolve the logical path inside the gallery root
//!   → ThumbnailCache  .cache/photos/cat.png/200/auto.jpg exists? stream it
//!   → Transcoder      decode PNG → Lanczos3 resize → encode JPEG
//!   → TeeWriter       response buffer + cache temp file, renamed on success
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | Read-only access to the gallery root, traversal rejection, directory listing data |
//! | [`cache`] | Key → path derivation, lookups, atomic writes, counters |
//! | [`imaging`] | Format dispatch, decode, fit-inside resize, JPEG encode |
//! | [`tee`] | Fan-out writer feeding the response and the cache from one encode |
//! | [`resolver`] | Per-request orchestration; transport-agnostic results and errors |
//! | [`listing`] | HTML for directory pages, rendered with Maud |
//! | [`server`] | Axum routes, status mapping, streaming, graceful shutdown |
//! | [`config`] | `galleryd.toml` loading, validation, CLI overrides |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## The Filesystem Is the Cache Index
//!
//! There is no in-memory map of what has been cached. A thumbnail's location
//! is a pure function of its key, so "is it cached?" is a single `open`. This
//! keeps restarts free and lets operators inspect or prune the cache with
//! ordinary shell tools.
//!
//! ## JPEG Only
//!
//! Every thumbnail is JPEG regardless of the source format. One output
//! encoding means one cache file per key and one content type to serve.
//!
//! ## Degrade, Don't Fail
//!
//! A thumbnail that cannot be made (unknown extension, corrupt file) is
//! replaced by the original file; a thumbnail that cannot be cached is still
//! returned. Clients only see errors for bad input, missing files, or
//! genuine server faults.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod listing;
pub mod logging;
pub mod resolver;
pub mod server;
pub mod source;
pub mod tee;

#[cfg(test)]
pub(crate) mod test_helpers;
