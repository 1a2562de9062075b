//! Image processing: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Format dispatch** | file extension → [`SourceFormat`] |
//! | **Decode** | `image` JPEG / PNG decoders |
//! | **Resize** | Lanczos3, fit inside the requested box, never upscale |
//! | **Encode** | `image` JPEG encoder, configurable [`Quality`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`Transcoder`] trait + [`RustTranscoder`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{TranscodeError, Transcoder};
pub use calculations::fit_within;
pub use operations::{scale_to_fit, write_jpeg};
pub use params::{Bounds, Quality, SourceFormat};
pub use rust_backend::RustTranscoder;
