//! Production backend: `image` crate for rasters, ImageMagick for the rest.
//!
//! ## Format mapping
//!
//! | Input | Identify | Decode |
//! |---|---|---|
//! | PNG, JPEG, BMP, TIFF, WebP | `ImageReader::into_dimensions` | `ImageReader::decode` (no size limits) |
//! | PSD | header fields (no decode) | ImageMagick flattened composite |
//! | AI | ImageMagick `identify` at the raster density | ImageMagick + Ghostscript, white background |
//! | Logo PNG/raster | - | decode + Lanczos3 resize to the target width |
//! | Logo SVG | - | ImageMagick at the exact density for the target width |
//!
//! PSD and AI support depends on the [`Capabilities`] probed at startup.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{SVG_FALLBACK_DENSITY, scaled_height, svg_exact_density, vector_density};
use super::capabilities::Capabilities;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PSD file signature.
const PSD_SIGNATURE: &[u8; 4] = b"8BPS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Raster,
    Psd,
    Ai,
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn source_kind(path: &Path) -> SourceKind {
    match extension(path).as_str() {
        "psd" => SourceKind::Psd,
        "ai" => SourceKind::Ai,
        _ => SourceKind::Raster,
    }
}

/// Backend for real files on disk.
///
/// See the [module docs](self) for the format-to-tool mapping.
#[derive(Debug, Clone, Default)]
pub struct RustBackend {
    capabilities: Capabilities,
}

impl RustBackend {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Run ImageMagick and return its stdout.
    fn magick(&self, args: &[&str]) -> Result<Vec<u8>, BackendError> {
        let mut cmd = self
            .capabilities
            .magick_command(args)
            .ok_or_else(|| BackendError::Unsupported("ImageMagick is not installed".into()))?;
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(BackendError::Tool(format!(
                "ImageMagick failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    /// `identify -format "%w %h"` on the first frame.
    fn magick_size(&self, path: &Path, density: u32) -> Result<(u32, u32), BackendError> {
        let density = density.to_string();
        let frame = format!("{}[0]", path.display());
        let out = self.magick(&[
            "identify",
            "-density",
            density.as_str(),
            "-format",
            "%w %h",
            frame.as_str(),
        ])?;
        parse_size(&String::from_utf8_lossy(&out)).ok_or_else(|| {
            BackendError::Tool(format!("unexpected identify output for {}", path.display()))
        })
    }

    fn require_ai(&self, path: &Path) -> Result<u32, BackendError> {
        if !self.capabilities.can_rasterize_ai() {
            return Err(BackendError::Unsupported(format!(
                "{}: AI files need ImageMagick and Ghostscript",
                path.display()
            )));
        }
        let (w72, h72) = self.magick_size(path, 72)?;
        Ok(vector_density(w72, h72))
    }

    fn decode_png_stdout(bytes: &[u8], path: &Path) -> Result<DynamicImage, BackendError> {
        image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(|e| {
            BackendError::Decode(format!("Failed to decode {}: {}", path.display(), e))
        })
    }

    fn load_svg_logo(&self, path: &Path, target_width: u32) -> Result<RgbaImage, BackendError> {
        if !self.capabilities.has_magick() {
            return Err(BackendError::Unsupported(
                "ImageMagick is required for SVG logos; use a PNG logo instead".into(),
            ));
        }
        let source = path.display().to_string();
        let probe = self
            .magick(&[
                "-density",
                "72",
                "-background",
                "none",
                source.as_str(),
                "-format",
                "%w",
                "info:",
            ])
            .ok()
            .and_then(|out| String::from_utf8_lossy(&out).trim().parse::<u32>().ok())
            .filter(|&w| w > 0);

        let png = match probe {
            Some(svg_w72) => {
                let density = svg_exact_density(target_width, svg_w72).to_string();
                self.magick(&[
                    "-density",
                    density.as_str(),
                    "-background",
                    "none",
                    source.as_str(),
                    "PNG:-",
                ])?
            }
            None => {
                let density = SVG_FALLBACK_DENSITY.to_string();
                let resize = format!("{target_width}x");
                self.magick(&[
                    "-density",
                    density.as_str(),
                    "-background",
                    "none",
                    source.as_str(),
                    "-resize",
                    resize.as_str(),
                    "PNG:-",
                ])?
            }
        };
        Ok(Self::decode_png_stdout(&png, path)?.to_rgba8())
    }
}

/// Parse `"<w> <h>"`.
fn parse_size(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split_whitespace();
    let w = parts.next()?.parse().ok()?;
    let h = parts.next()?.parse().ok()?;
    Some((w, h))
}

/// Read width and height from a PSD header without touching layer data.
///
/// Layout: signature (4), version (2), reserved (6), channels (2),
/// height (4, BE), width (4, BE).
fn psd_dimensions(path: &Path) -> Result<Dimensions, BackendError> {
    let mut header = [0u8; 26];
    File::open(path)?.read_exact(&mut header)?;
    if &header[..4] != PSD_SIGNATURE {
        return Err(BackendError::Decode(format!(
            "{} is not a PSD file",
            path.display()
        )));
    }
    let height = u32::from_be_bytes([header[14], header[15], header[16], header[17]]);
    let width = u32::from_be_bytes([header[18], header[19], header[20], header[21]]);
    Ok(Dimensions { width, height })
}

/// Load and decode a raster image from disk, detecting the format from
/// content and lifting the decoder's size limits.
fn load_raster(path: &Path) -> Result<DynamicImage, BackendError> {
    let mut reader = ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?;
    reader.no_limits();
    reader.decode().map_err(|e| {
        BackendError::Decode(format!("Failed to decode {}: {}", path.display(), e))
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        match source_kind(path) {
            SourceKind::Psd => psd_dimensions(path),
            SourceKind::Ai => {
                let density = self.require_ai(path)?;
                let (width, height) = self.magick_size(path, density)?;
                Ok(Dimensions { width, height })
            }
            SourceKind::Raster => {
                let (width, height) = ImageReader::open(path)
                    .map_err(BackendError::Io)?
                    .with_guessed_format()
                    .map_err(BackendError::Io)?
                    .into_dimensions()
                    .map_err(|e| {
                        BackendError::Decode(format!("Failed to read dimensions: {}", e))
                    })?;
                Ok(Dimensions { width, height })
            }
        }
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        match source_kind(path) {
            SourceKind::Raster => load_raster(path),
            SourceKind::Psd => {
                let frame = format!("{}[0]", path.display());
                let png = self.magick(&[frame.as_str(), "PNG:-"])?;
                Self::decode_png_stdout(&png, path)
            }
            SourceKind::Ai => {
                let density = self.require_ai(path)?.to_string();
                let frame = format!("{}[0]", path.display());
                let png = self.magick(&[
                    "-density",
                    density.as_str(),
                    "-background",
                    "white",
                    frame.as_str(),
                    "-flatten",
                    "PNG:-",
                ])?;
                Self::decode_png_stdout(&png, path)
            }
        }
    }

    fn load_logo(&self, path: &Path, target_width: u32) -> Result<RgbaImage, BackendError> {
        if extension(path) == "svg" {
            return self.load_svg_logo(path, target_width);
        }
        let logo = load_raster(path)?.to_rgba8();
        if logo.width() == 0 {
            return Ok(logo);
        }
        let height = scaled_height(logo.dimensions(), target_width);
        Ok(image::imageops::resize(
            &logo,
            target_width.max(1),
            height,
            FilterType::Lanczos3,
        ))
    }

    fn supports(&self, path: &Path) -> bool {
        let ext = extension(path);
        self.capabilities
            .supported_extensions()
            .iter()
            .any(|supported| *supported == ext)
    }
}
