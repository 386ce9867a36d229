//! Pixel operations used by the export worker.
//!
//! These functions combine calculations with backend execution: cropping,
//! Lanczos resizing, logo compositing, and the two output encoders.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{logo_margin, logo_origin, logo_target_width};
use super::params::{ChromaSubsampling, ExportSettings, LogoSettings, OutputFormat, PngCompression};
use crate::geometry::CropRect;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use jpeg_encoder::{ColorType as JpegColorType, Encoder as JpegEncoder, SamplingFactor};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("PNG encode failed: {0}")]
    Png(#[from] image::ImageError),
    #[error("JPEG encode failed: {0}")]
    Jpeg(#[from] jpeg_encoder::EncodingError),
    #[error("{width}x{height} exceeds the JPEG size limit of 65535px per side")]
    TooLarge { width: u32, height: u32 },
}

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &std::path::Path) -> Result<(u32, u32), BackendError> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Copy out the crop region. The rectangle must already be clamped to the
/// image.
pub fn crop(img: &RgbImage, rect: CropRect) -> RgbImage {
    imageops::crop_imm(img, rect.x, rect.y, rect.w, rect.h).to_image()
}

/// Resize to exactly `width × height` with Lanczos3.
pub fn resize_exact(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Lanczos3)
}

/// Alpha-composite a logo onto `base`.
///
/// The logo is rasterized by the backend at its final width (a percentage
/// of the chosen basis dimension), then placed at the configured anchor with
/// its margin and clamped inside the image.
pub fn composite_logo(
    backend: &impl ImageBackend,
    base: RgbImage,
    settings: &LogoSettings,
) -> Result<RgbImage, BackendError> {
    let (bw, bh) = base.dimensions();
    let target_width = logo_target_width((bw, bh), settings.basis, settings.size_percent);
    let logo = backend.load_logo(&settings.path, target_width)?;
    let margin = logo_margin(settings.margin, logo.height());
    let (x, y) = logo_origin(settings.position, (bw, bh), logo.dimensions(), margin);

    let mut canvas = DynamicImage::ImageRgb8(base).to_rgba8();
    imageops::overlay(&mut canvas, &logo, x as i64, y as i64);
    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Bucket a 0–9 level onto the encoder's presets.
fn png_compression(level: PngCompression) -> CompressionType {
    match level.level() {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn jpeg_sampling(mode: ChromaSubsampling) -> SamplingFactor {
    match mode {
        ChromaSubsampling::Full => SamplingFactor::F_1_1,
        ChromaSubsampling::Half => SamplingFactor::F_2_1,
        ChromaSubsampling::Quarter => SamplingFactor::F_2_2,
    }
}

/// Lossless PNG.
pub fn encode_png<W: Write>(img: &RgbImage, writer: W, level: PngCompression) -> Result<(), EncodeError> {
    let encoder = PngEncoder::new_with_quality(writer, png_compression(level), PngFilter::Adaptive);
    encoder.write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)?;
    Ok(())
}

/// Baseline JPEG with explicit chroma subsampling.
pub fn encode_jpeg<W: Write>(
    img: &RgbImage,
    writer: W,
    settings: &ExportSettings,
) -> Result<(), EncodeError> {
    let (width, height) = img.dimensions();
    let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
        return Err(EncodeError::TooLarge { width, height });
    };
    let mut encoder = JpegEncoder::new(writer, settings.jpeg_quality.value());
    encoder.set_sampling_factor(jpeg_sampling(settings.jpeg_subsampling));
    encoder.set_optimized_huffman_tables(settings.jpeg_optimize);
    encoder.encode(img.as_raw(), w, h, JpegColorType::Rgb)?;
    Ok(())
}

/// Encode with the configured format, flushing the writer.
pub fn encode<W: Write>(
    img: &RgbImage,
    mut writer: W,
    settings: &ExportSettings,
) -> Result<(), EncodeError> {
    match settings.format {
        OutputFormat::Png => encode_png(img, &mut writer, settings.png_compression)?,
        OutputFormat::Jpeg => encode_jpeg(img, &mut writer, settings)?,
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::params::{LogoBasis, LogoMargin, LogoPosition, Quality};
    use image::{Rgb, Rgba};
    use std::path::Path;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 100]))
    }

    #[test]
    fn get_dimensions_via_backend() {
        let backend = MockBackend::new().with_image("/a.png", 640, 480);
        assert_eq!(get_dimensions(&backend, Path::new("/a.png")).unwrap(), (640, 480));
    }

    #[test]
    fn crop_copies_region() {
        let img = gradient(100, 80);
        let out = crop(&img, CropRect::new(10, 20, 30, 40));
        assert_eq!(out.dimensions(), (30, 40));
        assert_eq!(out.get_pixel(0, 0), &Rgb([10, 20, 100]));
        assert_eq!(out.get_pixel(29, 39), &Rgb([39, 59, 100]));
    }

    #[test]
    fn resize_exact_dimensions() {
        let img = gradient(160, 90);
        assert_eq!(resize_exact(&img, 64, 36).dimensions(), (64, 36));
        assert_eq!(resize_exact(&img, 160, 90), img);
    }

    // =========================================================================
    // Logo compositing
    // =========================================================================

    fn logo_settings(position: LogoPosition, margin: LogoMargin) -> LogoSettings {
        LogoSettings {
            path: "/logo.png".into(),
            position,
            size_percent: 10.0,
            basis: LogoBasis::Width,
            margin,
        }
    }

    #[test]
    fn logo_is_placed_at_anchor() {
        let backend = MockBackend::new();
        let base = RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]));
        let out = composite_logo(
            &backend,
            base,
            &logo_settings(LogoPosition::BottomRight, LogoMargin::Pixels(5)),
        )
        .unwrap();

        // 10% of 200 → 20x10 red logo, 5px from the bottom-right corner
        assert_eq!(out.dimensions(), (200, 100));
        assert_eq!(out.get_pixel(175, 85), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(194, 94), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(195, 95), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(174, 84), &Rgb([0, 0, 0]));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::LoadLogo {
                path: "/logo.png".into(),
                target_width: 20
            }]
        );
    }

    #[test]
    fn logo_ratio_margin_uses_logo_height() {
        let backend = MockBackend::new();
        let base = RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]));
        // logo 20x10, margin 0.5 * 10 = 5
        let out = composite_logo(
            &backend,
            base,
            &logo_settings(LogoPosition::TopLeft, LogoMargin::LogoHeightRatio(0.5)),
        )
        .unwrap();
        assert_eq!(out.get_pixel(5, 5), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(4, 4), &Rgb([0, 0, 0]));
    }

    #[test]
    fn overlay_respects_alpha() {
        let mut canvas = image::RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let logo = image::RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 0]));
        imageops::overlay(&mut canvas, &logo, 1, 1);
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    }

    // =========================================================================
    // Encoders
    // =========================================================================

    #[test]
    fn png_roundtrips_losslessly() {
        let img = gradient(40, 30);
        let mut buf = Vec::new();
        encode(&img, &mut buf, &ExportSettings::default()).unwrap();
        let decoded = image::load_from_memory(&buf).unwrap().to_rgb8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn jpeg_encodes_each_subsampling() {
        let img = gradient(48, 32);
        for mode in ChromaSubsampling::ALL {
            let settings = ExportSettings {
                format: OutputFormat::Jpeg,
                jpeg_quality: Quality::new(90),
                jpeg_subsampling: mode,
                ..Default::default()
            };
            let mut buf = Vec::new();
            encode(&img, &mut buf, &settings).unwrap();
            assert_eq!(&buf[..2], &[0xFF, 0xD8], "{mode} should write a JPEG SOI marker");
            let decoded = image::load_from_memory(&buf).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (48, 32));
        }
    }

    #[test]
    fn compression_level_mapping() {
        assert!(matches!(png_compression(PngCompression::new(0)), CompressionType::Fast));
        assert!(matches!(png_compression(PngCompression::new(5)), CompressionType::Default));
        assert!(matches!(png_compression(PngCompression::new(9)), CompressionType::Best));
    }

    #[test]
    fn compression_bucket_edges() {
        for (level, fast, best) in [(3, true, false), (4, false, false), (6, false, false), (7, false, true)] {
            let kind = png_compression(PngCompression::new(level));
            assert_eq!(matches!(kind, CompressionType::Fast), fast, "level {level}");
            assert_eq!(matches!(kind, CompressionType::Best), best, "level {level}");
        }
    }
}
