//! Shared test utilities for the wallcrop test suite.
//!
//! Writes small synthetic images to disk and builds ratio configurations
//! that are cheap to export.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_png(&tmp.path().join("a.png"), 320, 240);
//! let groups = sample_groups();
//! ```

use crate::ratios::{RatioGroup, Target};
use image::{Rgb, RgbImage};
use std::path::Path;

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Write a gradient PNG, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient(width, height).save(path).unwrap();
}

/// Write a gradient JPEG, creating parent directories.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

// =========================================================================
// Ratio configurations
// =========================================================================

/// Two groups with three small targets in total:
///
/// - `16:9` → `64x36` in `Ratio 16x9`, `32x18` in `Ratio 16x9 small`
/// - `1:1` → `50x50` in `Square`
pub fn sample_groups() -> Vec<RatioGroup> {
    vec![
        RatioGroup {
            name: "16:9".into(),
            ratio_w: 16,
            ratio_h: 9,
            targets: vec![
                Target::new(64, 36, "Ratio 16x9"),
                Target::new(32, 18, "Ratio 16x9 small"),
            ],
        },
        RatioGroup {
            name: "Square".into(),
            ratio_w: 1,
            ratio_h: 1,
            targets: vec![Target::new(50, 50, "Square")],
        },
    ]
}
