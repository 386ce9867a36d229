//! Parameter types for export encoding and logo placement.
//!
//! These structs describe *what* to produce, not *how*. They travel inside
//! each serialized export job, so every type here is plain data with serde
//! support and no references into live state.
//!
//! ## Types
//!
//! - [`OutputFormat`]: PNG (lossless) or JPEG (lossy).
//! - [`Quality`]: JPEG quality (1–100, default 95). Clamped on construction.
//! - [`PngCompression`]: PNG compression level (0–9, default 9). Clamped on construction.
//! - [`ChromaSubsampling`]: JPEG chroma subsampling (`4:4:4` default).
//! - [`ExportSettings`]: The above bundled, plus Huffman optimization.
//! - [`LogoSettings`]: Optional logo overlay: asset, anchor, size and margin.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    /// File extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(format!("unknown output format '{other}' (expected png or jpeg)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
        })
    }
}

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

impl From<u8> for Quality {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// PNG compression level (0 = fastest, 9 = smallest).
///
/// The PNG encoder only offers three effort presets, so levels are bucketed:
/// 0–3 encode fast, 4–6 use the default effort, 7–9 use the best. Output is
/// lossless at every level; only file size and encode time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct PngCompression(u8);

impl PngCompression {
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for PngCompression {
    fn default() -> Self {
        Self(9)
    }
}

impl From<u8> for PngCompression {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl From<PngCompression> for u8 {
    fn from(level: PngCompression) -> Self {
        level.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChromaSubsampling {
    #[default]
    #[serde(rename = "4:4:4")]
    Full,
    #[serde(rename = "4:2:2")]
    Half,
    #[serde(rename = "4:2:0")]
    Quarter,
}

impl ChromaSubsampling {
    pub const ALL: [ChromaSubsampling; 3] = [
        ChromaSubsampling::Full,
        ChromaSubsampling::Half,
        ChromaSubsampling::Quarter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChromaSubsampling::Full => "4:4:4",
            ChromaSubsampling::Half => "4:2:2",
            ChromaSubsampling::Quarter => "4:2:0",
        }
    }
}

impl FromStr for ChromaSubsampling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.label() == s.trim())
            .ok_or_else(|| format!("unknown subsampling '{s}' (expected 4:4:4, 4:2:2 or 4:2:0)"))
    }
}

impl fmt::Display for ChromaSubsampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Encoder settings shared by every file in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: OutputFormat,
    pub png_compression: PngCompression,
    pub jpeg_quality: Quality,
    pub jpeg_subsampling: ChromaSubsampling,
    /// Optimized Huffman tables for JPEG.
    pub jpeg_optimize: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            png_compression: PngCompression::default(),
            jpeg_quality: Quality::default(),
            jpeg_subsampling: ChromaSubsampling::default(),
            jpeg_optimize: true,
        }
    }
}

// ============================================================================
// Logo overlay
// ============================================================================

/// Anchor for the logo on the exported image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl FromStr for LogoPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top-left" => Ok(LogoPosition::TopLeft),
            "top-right" => Ok(LogoPosition::TopRight),
            "bottom-left" => Ok(LogoPosition::BottomLeft),
            "bottom-right" => Ok(LogoPosition::BottomRight),
            "center" => Ok(LogoPosition::Center),
            other => Err(format!("unknown logo position '{other}'")),
        }
    }
}

/// Which dimension of the exported image the logo size percentage refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoBasis {
    #[default]
    Width,
    Height,
    ShorterSide,
}

impl FromStr for LogoBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "width" => Ok(LogoBasis::Width),
            "height" => Ok(LogoBasis::Height),
            "shorter-side" | "shorter" => Ok(LogoBasis::ShorterSide),
            other => Err(format!("unknown logo basis '{other}'")),
        }
    }
}

/// Distance between the logo and the image edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoMargin {
    /// Fixed margin in output pixels.
    Pixels(u32),
    /// Margin as a fraction of the rendered logo height (at least 1px).
    LogoHeightRatio(f64),
}

impl Default for LogoMargin {
    fn default() -> Self {
        LogoMargin::Pixels(40)
    }
}

impl LogoMargin {
    pub const DEFAULT_RATIO: f64 = 0.75;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoSettings {
    /// PNG/raster or SVG logo asset.
    pub path: PathBuf,
    pub position: LogoPosition,
    /// Logo width as a percentage of the basis dimension.
    pub size_percent: f64,
    pub basis: LogoBasis,
    pub margin: LogoMargin,
}
