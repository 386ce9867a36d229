//! Image decoding, pixel operations, and encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify / decode** | `image::ImageReader` (rasters), ImageMagick (PSD, AI) |
//! | **Crop** | `imageops::crop_imm` |
//! | **Resize** | `imageops::resize` with Lanczos3 |
//! | **Logo overlay** | `imageops::overlay` (alpha blend) |
//! | **Encode → PNG** | `image::codecs::png::PngEncoder` |
//! | **Encode → JPEG** | `jpeg-encoder` (chroma subsampling control) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for logo and density math (unit testable)
//! - **Parameters**: Export and logo settings carried by each job
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Capabilities**: One-shot probe for ImageMagick and Ghostscript
//! - **Operations**: Crop, resize, composite and encode

pub mod backend;
mod calculations;
pub mod capabilities;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    logo_margin, logo_origin, logo_target_width, scaled_height, svg_exact_density, vector_density,
};
pub use capabilities::{Capabilities, MagickVersion};
pub use operations::{EncodeError, get_dimensions};
pub use params::{
    ChromaSubsampling, ExportSettings, LogoBasis, LogoMargin, LogoPosition, LogoSettings,
    OutputFormat, PngCompression, Quality,
};
pub use rust_backend::RustBackend;
