//! Image decode backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the narrow seam between the crop/export core
//! and everything that touches file formats: reading dimensions, decoding
//! pixels, and rasterizing logo assets.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): the `image` crate for
//! raster formats, ImageMagick/Ghostscript subprocesses for layered and
//! vector sources when the [capability probe](super::capabilities) finds them.

use image::{DynamicImage, RgbaImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Unsupported input: {0}")]
    Unsupported(String),
    #[error("External tool failed: {0}")]
    Tool(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image decode backends.
///
/// `Sync` because one backend instance is shared by every export worker.
pub trait ImageBackend: Sync {
    /// Get image dimensions, without a full decode where the format allows.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the full image. Layered sources are composited and vector
    /// sources rasterized; the result's size matches [`identify`](Self::identify).
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Rasterize a logo asset to `target_width` pixels wide, preserving its
    /// aspect ratio.
    fn load_logo(&self, path: &Path, target_width: u32) -> Result<RgbaImage, BackendError>;

    /// Whether files with this path's extension can be opened.
    fn supports(&self, path: &Path) -> bool;
}
