//! Pure calculation functions for logo placement and vector rasterization.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{LogoBasis, LogoMargin, LogoPosition};

/// Longest side targeted when rasterizing vector sources. Identify and
/// decode both use it, so stored crops stay in one coordinate space.
pub const VECTOR_RASTER_LONGEST: u32 = 3840;

/// Upper bound for the ImageMagick `-density` used on vector sources.
pub const VECTOR_MAX_DENSITY: u32 = 4800;

/// Density used for SVG logos whose intrinsic size can't be probed.
pub const SVG_FALLBACK_DENSITY: u32 = 300;

/// Logo width in pixels for a base image.
///
/// # Examples
/// ```
/// # use wallcrop::imaging::{LogoBasis, logo_target_width};
/// // 10% of a 3840px-wide image
/// assert_eq!(logo_target_width((3840, 2160), LogoBasis::Width, 10.0), 384);
/// // 10% of the shorter side
/// assert_eq!(logo_target_width((3840, 2160), LogoBasis::ShorterSide, 10.0), 216);
/// ```
pub fn logo_target_width(base: (u32, u32), basis: LogoBasis, size_percent: f64) -> u32 {
    let (bw, bh) = base;
    let reference = match basis {
        LogoBasis::Width => bw,
        LogoBasis::Height => bh,
        LogoBasis::ShorterSide => bw.min(bh),
    };
    let width = (reference as f64 * size_percent / 100.0).round();
    (width.max(1.0)) as u32
}

/// Height that keeps a source's aspect at a new width (at least 1px).
pub fn scaled_height(source: (u32, u32), target_width: u32) -> u32 {
    let (sw, sh) = source;
    if sw == 0 {
        return sh.max(1);
    }
    let h = (target_width as f64 * sh as f64 / sw as f64).round();
    (h.max(1.0)) as u32
}

/// Margin in pixels for a rendered logo of height `logo_h`.
pub fn logo_margin(margin: LogoMargin, logo_h: u32) -> u32 {
    match margin {
        LogoMargin::Pixels(px) => px,
        LogoMargin::LogoHeightRatio(ratio) => {
            let m = (logo_h as f64 * ratio).round();
            (m.max(1.0)) as u32
        }
    }
}

/// Top-left corner of the logo on the base image.
///
/// The result is clamped so the logo stays inside the base; a logo larger
/// than the base is pinned to the origin.
///
/// # Examples
/// ```
/// # use wallcrop::imaging::{LogoPosition, logo_origin};
/// assert_eq!(logo_origin(LogoPosition::BottomRight, (1000, 500), (100, 50), 20), (880, 430));
/// assert_eq!(logo_origin(LogoPosition::Center, (1000, 500), (100, 50), 20), (450, 225));
/// ```
pub fn logo_origin(
    position: LogoPosition,
    base: (u32, u32),
    logo: (u32, u32),
    margin: u32,
) -> (u32, u32) {
    let (bw, bh) = (base.0 as i64, base.1 as i64);
    let (lw, lh) = (logo.0 as i64, logo.1 as i64);
    let m = margin as i64;

    let (x, y) = match position {
        LogoPosition::TopLeft => (m, m),
        LogoPosition::TopRight => (bw - lw - m, m),
        LogoPosition::BottomLeft => (m, bh - lh - m),
        LogoPosition::BottomRight => (bw - lw - m, bh - lh - m),
        LogoPosition::Center => ((bw - lw).div_euclid(2), (bh - lh).div_euclid(2)),
    };

    let x = x.min(bw - lw).max(0);
    let y = y.min(bh - lh).max(0);
    (x as u32, y as u32)
}

/// ImageMagick density for rasterizing a vector source whose size at 72 dpi
/// is `(w72, h72)`, targeting [`VECTOR_RASTER_LONGEST`] on the longest side.
///
/// Never below 72 (native size) and never above [`VECTOR_MAX_DENSITY`].
pub fn vector_density(w72: u32, h72: u32) -> u32 {
    let longest = w72.max(h72);
    if longest == 0 {
        return 72;
    }
    let density = (72.0 * VECTOR_RASTER_LONGEST as f64 / longest as f64).round() as u32;
    density.max(72).min(VECTOR_MAX_DENSITY)
}

/// Density that renders an SVG `svg_w72` pixels wide (at 72 dpi) at exactly
/// `target_width`, so no bitmap resampling follows.
pub fn svg_exact_density(target_width: u32, svg_w72: u32) -> u32 {
    let density = (72.0 * target_width as f64 / svg_w72.max(1) as f64).round() as u32;
    density.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // logo_target_width / scaled_height
    // =========================================================================

    #[test]
    fn logo_width_by_basis() {
        assert_eq!(logo_target_width((3840, 1600), LogoBasis::Height, 10.0), 160);
        assert_eq!(logo_target_width((1600, 3840), LogoBasis::ShorterSide, 25.0), 400);
        assert_eq!(logo_target_width((3840, 2160), LogoBasis::Width, 12.5), 480);
    }

    #[test]
    fn logo_width_at_least_one() {
        assert_eq!(logo_target_width((10, 10), LogoBasis::Width, 0.1), 1);
        assert_eq!(logo_target_width((10, 10), LogoBasis::Width, 0.0), 1);
    }

    #[test]
    fn scaled_height_keeps_aspect() {
        assert_eq!(scaled_height((400, 200), 100), 50);
        assert_eq!(scaled_height((300, 100), 100), 33);
        assert_eq!(scaled_height((1000, 1), 10), 1);
    }

    // =========================================================================
    // logo_margin / logo_origin
    // =========================================================================

    #[test]
    fn margin_fixed_or_ratio() {
        assert_eq!(logo_margin(LogoMargin::Pixels(40), 500), 40);
        assert_eq!(logo_margin(LogoMargin::LogoHeightRatio(0.75), 100), 75);
        assert_eq!(logo_margin(LogoMargin::LogoHeightRatio(0.75), 1), 1);
        assert_eq!(logo_margin(LogoMargin::LogoHeightRatio(0.0), 100), 1);
    }

    #[test]
    fn origin_for_each_corner() {
        let base = (1000, 500);
        let logo = (100, 50);
        assert_eq!(logo_origin(LogoPosition::TopLeft, base, logo, 20), (20, 20));
        assert_eq!(logo_origin(LogoPosition::TopRight, base, logo, 20), (880, 20));
        assert_eq!(logo_origin(LogoPosition::BottomLeft, base, logo, 20), (20, 430));
        assert_eq!(logo_origin(LogoPosition::BottomRight, base, logo, 20), (880, 430));
    }

    #[test]
    fn origin_clamped_inside_base() {
        // margin larger than the free space
        assert_eq!(logo_origin(LogoPosition::TopLeft, (120, 60), (100, 50), 40), (20, 10));
        // logo larger than the base
        assert_eq!(logo_origin(LogoPosition::BottomRight, (50, 50), (100, 80), 5), (0, 0));
        assert_eq!(logo_origin(LogoPosition::Center, (50, 50), (100, 80), 0), (0, 0));
    }

    // =========================================================================
    // densities
    // =========================================================================

    #[test]
    fn vector_density_targets_longest_side() {
        // A4 at 72dpi is 595x842 → 72 * 3840 / 842 = 328.4
        assert_eq!(vector_density(595, 842), 328);
    }

    #[test]
    fn vector_density_bounds() {
        assert_eq!(vector_density(0, 0), 72);
        assert_eq!(vector_density(10000, 5000), 72);
        assert_eq!(vector_density(10, 10), VECTOR_MAX_DENSITY);
    }

    #[test]
    fn svg_density_is_exact() {
        assert_eq!(svg_exact_density(400, 200), 144);
        assert_eq!(svg_exact_density(1, 10000), 1);
        assert_eq!(svg_exact_density(100, 0), 7200);
    }
}
