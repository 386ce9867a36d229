//! Crop geometry: aspect-ratio math, bounds clamping, and locked-aspect
//! corner resizing.
//!
//! Every function here is pure. Coordinates are integer pixels in the
//! source image; pointer positions may be fractional and may lie outside
//! the image (a drag that overshoots the edge).
//!
//! ## The crop invariant
//!
//! A [`CropRect`] produced by this module always satisfies
//!
//! ```text
//! 0 <= x,  0 <= y,  x + w <= img_w,  y + h <= img_h,
//! w >= MIN_CROP_SIZE,  h >= MIN_CROP_SIZE
//! ```
//!
//! For images smaller than [`MIN_CROP_SIZE`] along an axis the minimum on
//! that axis drops to the image dimension, otherwise the invariant would be
//! unsatisfiable.
//!
//! ## Caller contract
//!
//! Ratios must be positive and images must have non-zero area. These are
//! programming errors, not data errors: the functions panic rather than
//! quietly returning an empty rectangle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest crop edge, in source pixels.
pub const MIN_CROP_SIZE: u32 = 50;

/// Nudge distance for a plain arrow key.
pub const NUDGE_SMALL: u32 = 1;

/// Nudge distance with the modifier held.
pub const NUDGE_LARGE: u32 = 10;

/// Crop rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl CropRect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// `[x, y, w, h]`, the form stored in the crop cache and export jobs.
    pub const fn to_array(self) -> [u32; 4] {
        [self.x, self.y, self.w, self.h]
    }

    pub const fn from_array([x, y, w, h]: [u32; 4]) -> Self {
        Self { x, y, w, h }
    }

    /// Whether the rectangle satisfies the crop invariant for this image.
    pub fn fits(&self, img_w: u32, img_h: u32) -> bool {
        let (min_w, min_h) = (min_edge(img_w), min_edge(img_h));
        self.w >= min_w
            && self.h >= min_h
            && self.x as u64 + self.w as u64 <= img_w as u64
            && self.y as u64 + self.h as u64 <= img_h as u64
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.w, self.h, self.x, self.y)
    }
}

// ============================================================================
// Aspect keys
// ============================================================================

/// Reduce a ratio to lowest terms. `(21, 9)` → `(7, 3)`.
///
/// # Panics
/// If both components are zero.
pub fn normalize_ratio(w: u32, h: u32) -> (u32, u32) {
    let g = gcd(w, h);
    assert!(g > 0, "ratio {w}:{h} has no normalized form");
    (w / g, h / g)
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Normalized `"w:h"` key joining an image's crops to a ratio group.
///
/// `16:9`, `32:18` and `3840:2160` all map to the key `"16:9"`.
/// Serialized as the `"w:h"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AspectKey {
    w: u32,
    h: u32,
}

impl AspectKey {
    /// Key for a positive ratio.
    ///
    /// # Panics
    /// If either component is zero.
    pub fn new(ratio_w: u32, ratio_h: u32) -> Self {
        assert!(
            ratio_w > 0 && ratio_h > 0,
            "aspect ratio {ratio_w}:{ratio_h} must be positive"
        );
        let (w, h) = normalize_ratio(ratio_w, ratio_h);
        Self { w, h }
    }

    /// Parse a `"w:h"` string, normalizing it. Returns `None` for anything
    /// that isn't two positive integers separated by a colon.
    pub fn parse(s: &str) -> Option<Self> {
        let (w, h) = s.split_once(':')?;
        let w: u32 = w.trim().parse().ok()?;
        let h: u32 = h.trim().parse().ok()?;
        (w > 0 && h > 0).then(|| Self::new(w, h))
    }

    /// The normalized `(w, h)` pair.
    pub const fn ratio(self) -> (u32, u32) {
        (self.w, self.h)
    }

    /// `w / h` as a float, for locked-aspect dragging.
    pub fn as_f64(self) -> f64 {
        self.w as f64 / self.h as f64
    }
}

impl fmt::Display for AspectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.w, self.h)
    }
}

impl From<AspectKey> for String {
    fn from(key: AspectKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for AspectKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("invalid aspect key {s:?}"))
    }
}

// ============================================================================
// Maximum crop and centering
// ============================================================================

fn assert_image(img_w: u32, img_h: u32) {
    assert!(
        img_w > 0 && img_h > 0,
        "image {img_w}x{img_h} has zero area"
    );
}

fn assert_aspect(aspect: (u32, u32)) {
    assert!(
        aspect.0 > 0 && aspect.1 > 0,
        "aspect ratio {}:{} must be positive",
        aspect.0,
        aspect.1
    );
}

/// Largest `(w, h)` with the given aspect that fits inside the image.
///
/// Tries the full image width first and derives the height; if that
/// overflows, uses the full height and derives the width instead.
/// Rounding is round-half-to-even.
///
/// ```
/// # use wallcrop::geometry::max_crop;
/// assert_eq!(max_crop(6000, 4000, (16, 9)), (6000, 3375));
/// assert_eq!(max_crop(4000, 4000, (16, 9)), (4000, 2250));
/// assert_eq!(max_crop(3000, 4000, (4, 5)), (3000, 3750));
/// ```
pub fn max_crop(img_w: u32, img_h: u32, aspect: (u32, u32)) -> (u32, u32) {
    assert_image(img_w, img_h);
    assert_aspect(aspect);
    let ratio = aspect.0 as f64 / aspect.1 as f64;

    let crop_h = (img_w as f64 / ratio).round_ties_even() as u32;
    if crop_h <= img_h {
        return (img_w, crop_h.max(1));
    }

    let crop_w = (img_h as f64 * ratio).round_ties_even() as u32;
    (crop_w.clamp(1, img_w), img_h)
}

/// Center a `w × h` crop in the image (floor division for the offset).
pub fn center_crop(img_w: u32, img_h: u32, w: u32, h: u32) -> CropRect {
    let w = w.min(img_w);
    let h = h.min(img_h);
    CropRect::new((img_w - w) / 2, (img_h - h) / 2, w, h)
}

/// The default crop: the largest rectangle of `aspect`, centered.
pub fn auto_center_max(img_w: u32, img_h: u32, aspect: (u32, u32)) -> CropRect {
    let (w, h) = max_crop(img_w, img_h, aspect);
    center_crop(img_w, img_h, w, h)
}

// ============================================================================
// Clamping
// ============================================================================

/// Minimum crop edge for an image axis of the given length.
fn min_edge(img_len: u32) -> u32 {
    MIN_CROP_SIZE.min(img_len)
}

/// Enforce the crop invariant.
///
/// Size is clamped first (to `[MIN_CROP_SIZE, image dimension]`), then the
/// position, so the position range `[0, img - size]` is never empty.
/// Idempotent.
pub fn clamp(rect: CropRect, img_w: u32, img_h: u32) -> CropRect {
    assert_image(img_w, img_h);
    let w = rect.w.clamp(min_edge(img_w), img_w);
    let h = rect.h.clamp(min_edge(img_h), img_h);
    CropRect {
        x: rect.x.min(img_w - w),
        y: rect.y.min(img_h - h),
        w,
        h,
    }
}

// ============================================================================
// Corner resize
// ============================================================================

/// Corner handle being dragged. The opposite corner stays fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Which way a dragged handle grows the rectangle along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Growth {
    /// Handle on the far edge: anchor at the start, grows toward +axis.
    Forward,
    /// Handle on the near edge: anchor at the end, grows toward 0.
    Backward,
}

impl Growth {
    /// Fixed coordinate on this axis.
    fn anchor(self, start: u32, len: u32) -> i64 {
        match self {
            Growth::Forward => start as i64,
            Growth::Backward => start as i64 + len as i64,
        }
    }

    /// Signed extent from the anchor to the pointer.
    fn delta(self, anchor: i64, pointer: f64) -> f64 {
        match self {
            Growth::Forward => pointer - anchor as f64,
            Growth::Backward => anchor as f64 - pointer,
        }
    }

    /// Space available between the anchor and the image edge.
    fn room(self, anchor: i64, img_len: u32) -> i64 {
        match self {
            Growth::Forward => img_len as i64 - anchor,
            Growth::Backward => anchor,
        }
    }

    /// Rectangle origin on this axis for a given length.
    fn origin(self, anchor: i64, len: i64) -> i64 {
        match self {
            Growth::Forward => anchor,
            Growth::Backward => anchor - len,
        }
    }
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Per-axis growth rule `(horizontal, vertical)`.
    const fn growth(self) -> (Growth, Growth) {
        match self {
            Corner::TopLeft => (Growth::Backward, Growth::Backward),
            Corner::TopRight => (Growth::Forward, Growth::Backward),
            Corner::BottomLeft => (Growth::Backward, Growth::Forward),
            Corner::BottomRight => (Growth::Forward, Growth::Forward),
        }
    }

    /// The fixed corner for a drag starting from `rect`.
    pub fn anchor_of(self, rect: CropRect) -> (i64, i64) {
        let (gx, gy) = self.growth();
        (gx.anchor(rect.x, rect.w), gy.anchor(rect.y, rect.h))
    }
}

/// Smallest aspect-locked size: the shorter side sits at the minimum.
fn min_locked_size(aspect: f64, img_w: u32, img_h: u32) -> (i64, i64) {
    let (min_w, min_h) = (min_edge(img_w) as f64, min_edge(img_h) as f64);
    if aspect >= 1.0 {
        ((min_h * aspect).round() as i64, min_h as i64)
    } else {
        (min_w as i64, (min_w / aspect).round() as i64)
    }
}

/// Resize from a corner handle with the aspect ratio locked.
///
/// `start` is the rectangle when the drag began, `aspect` is `w / h`, and
/// `pointer` is the current pointer position in image coordinates.
///
/// 1. The pointer is clamped into the image and measured from the anchor
///    (sign depends on the corner).
/// 2. The limiting dimension drives the size: a drag wider than the aspect
///    is height-driven, otherwise width-driven.
/// 3. The size is floored at the aspect-locked minimum.
/// 4. The size is capped by the room between the anchor and the image
///    edges, re-deriving the locked dimension after each cap.
/// 5. The origin is placed from the anchor, and the result goes through
///    [`clamp`].
pub fn resize_from_anchor(
    corner: Corner,
    start: CropRect,
    aspect: f64,
    pointer: (f64, f64),
    img_w: u32,
    img_h: u32,
) -> CropRect {
    assert_image(img_w, img_h);
    assert!(
        aspect.is_finite() && aspect > 0.0,
        "locked aspect {aspect} must be positive"
    );

    let (gx, gy) = corner.growth();
    let (anchor_x, anchor_y) = corner.anchor_of(start);
    let px = pointer.0.clamp(0.0, img_w as f64);
    let py = pointer.1.clamp(0.0, img_h as f64);

    let floor = MIN_CROP_SIZE as f64;
    let dw = gx.delta(anchor_x, px).max(floor);
    let dh = gy.delta(anchor_y, py).max(floor);

    let (mut w, mut h) = if dw / dh > aspect {
        ((dh * aspect) as i64, dh as i64)
    } else {
        (dw as i64, (dw / aspect) as i64)
    };

    let (min_w, min_h) = min_locked_size(aspect, img_w, img_h);
    if w < min_w || h < min_h {
        (w, h) = (min_w, min_h);
    }

    let max_w = gx.room(anchor_x, img_w);
    let max_h = gy.room(anchor_y, img_h);
    if w > max_w {
        w = max_w;
        h = (w as f64 / aspect) as i64;
    }
    if h > max_h {
        h = max_h;
        w = (h as f64 * aspect) as i64;
    }

    let x = gx.origin(anchor_x, w).max(0);
    let y = gy.origin(anchor_y, h).max(0);
    clamp(
        CropRect::new(x as u32, y as u32, w.max(0) as u32, h.max(0) as u32),
        img_w,
        img_h,
    )
}

/// Translate the drag-start rectangle by the pointer delta, staying inside
/// the image. Fractional deltas are truncated toward zero.
pub fn translate(start: CropRect, delta: (f64, f64), img_w: u32, img_h: u32) -> CropRect {
    let start = clamp(start, img_w, img_h);
    let max_x = (img_w - start.w) as i64;
    let max_y = (img_h - start.h) as i64;
    let x = (start.x as i64 + delta.0.trunc() as i64).clamp(0, max_x);
    let y = (start.y as i64 + delta.1.trunc() as i64).clamp(0, max_y);
    CropRect::new(x as u32, y as u32, start.w, start.h)
}

/// What a pointer drag does to the crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    Resize(Corner),
}

/// Apply a drag from `press` to `pointer` (both in image coordinates).
pub fn drag(
    mode: DragMode,
    start: CropRect,
    aspect: f64,
    press: (f64, f64),
    pointer: (f64, f64),
    img_w: u32,
    img_h: u32,
) -> CropRect {
    match mode {
        DragMode::Move => translate(
            start,
            (pointer.0 - press.0, pointer.1 - press.1),
            img_w,
            img_h,
        ),
        DragMode::Resize(corner) => {
            resize_from_anchor(corner, start, aspect, pointer, img_w, img_h)
        }
    }
}

// ============================================================================
// Nudge
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NudgeStep {
    #[default]
    Small,
    Large,
}

impl NudgeStep {
    pub const fn pixels(self) -> u32 {
        match self {
            NudgeStep::Small => NUDGE_SMALL,
            NudgeStep::Large => NUDGE_LARGE,
        }
    }
}

/// Shift the crop by a fixed step, stopping at the image edges.
pub fn nudge(rect: CropRect, direction: Direction, step: NudgeStep, img_w: u32, img_h: u32) -> CropRect {
    let rect = clamp(rect, img_w, img_h);
    let amount = step.pixels();
    let mut out = rect;
    match direction {
        Direction::Left => out.x = rect.x.saturating_sub(amount),
        Direction::Right => out.x = (rect.x + amount).min(img_w - rect.w),
        Direction::Up => out.y = rect.y.saturating_sub(amount),
        Direction::Down => out.y = (rect.y + amount).min(img_h - rect.h),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Locked dimension may be off by the truncation of one side.
    fn assert_aspect_locked(rect: CropRect, aspect: f64) {
        let diff = (rect.w as f64 - rect.h as f64 * aspect).abs();
        assert!(
            diff <= aspect.max(1.0),
            "{rect} drifted from aspect {aspect} (diff {diff})"
        );
    }

    // =========================================================================
    // normalize / aspect keys
    // =========================================================================

    #[test]
    fn normalize_reduces_by_gcd() {
        assert_eq!(normalize_ratio(21, 9), (7, 3));
        assert_eq!(normalize_ratio(16, 9), (16, 9));
        assert_eq!(normalize_ratio(3840, 2160), (16, 9));
    }

    #[test]
    fn normalize_is_scale_invariant() {
        for (w, h) in [(4, 3), (16, 10), (12, 5), (1, 1), (7, 13)] {
            for k in 1..20 {
                assert_eq!(normalize_ratio(w, h), normalize_ratio(k * w, k * h));
            }
        }
    }

    #[test]
    fn aspect_key_formats_normalized() {
        assert_eq!(AspectKey::new(16, 10).to_string(), "8:5");
        assert_eq!(AspectKey::new(8, 6), AspectKey::new(4, 3));
    }

    #[test]
    fn aspect_key_serializes_as_string() {
        let json = serde_json::to_string(&AspectKey::new(32, 18)).unwrap();
        assert_eq!(json, "\"16:9\"");
        let back: AspectKey = serde_json::from_str("\"8:5\"").unwrap();
        assert_eq!(back, AspectKey::new(16, 10));
        assert!(serde_json::from_str::<AspectKey>("\"nope\"").is_err());
    }

    #[test]
    fn aspect_key_parse() {
        assert_eq!(AspectKey::parse("32:18"), Some(AspectKey::new(16, 9)));
        assert_eq!(AspectKey::parse("16:0"), None);
        assert_eq!(AspectKey::parse("sixteen:9"), None);
        assert_eq!(AspectKey::parse("16x9"), None);
    }

    #[test]
    fn aspect_key_ratio_roundtrip() {
        assert_eq!(AspectKey::new(21, 9).ratio(), (7, 3));
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn aspect_key_rejects_zero() {
        AspectKey::new(0, 9);
    }

    // =========================================================================
    // max_crop / auto_center_max
    // =========================================================================

    #[test]
    fn max_crop_landscape_full_width() {
        assert_eq!(max_crop(6000, 4000, (16, 9)), (6000, 3375));
    }

    #[test]
    fn max_crop_portrait_source_full_height() {
        // 1000x2000 into 16:9: full width gives 562.5 tall, fits
        assert_eq!(max_crop(1000, 2000, (16, 9)), (1000, 562));
        // 2000x500 into 16:9: full width would be 1125 tall, use full height
        assert_eq!(max_crop(2000, 500, (16, 9)), (889, 500));
    }

    #[test]
    fn max_crop_rounds_half_to_even() {
        // 5 / 2 = 2.5 → 2
        assert_eq!(max_crop(5, 10, (2, 1)), (5, 2));
        // 7 / 2 = 3.5 → 4
        assert_eq!(max_crop(7, 10, (2, 1)), (7, 4));
    }

    #[test]
    fn max_crop_fits_and_keeps_aspect() {
        let sizes = [(6000, 4000), (1920, 1080), (800, 3000), (50, 50), (5120, 1440)];
        let ratios = [(16, 9), (16, 10), (12, 5), (4, 5), (1, 1), (9, 16)];
        for &(iw, ih) in &sizes {
            for &(rw, rh) in &ratios {
                let (w, h) = max_crop(iw, ih, (rw, rh));
                assert!(w <= iw && h <= ih, "{w}x{h} exceeds {iw}x{ih}");
                assert!(w == iw || h == ih, "{w}x{h} is not maximal in {iw}x{ih}");
                let ratio = rw as f64 / rh as f64;
                let diff = (w as f64 - h as f64 * ratio).abs();
                assert!(diff <= ratio.max(1.0), "{w}x{h} vs {rw}:{rh}");
            }
        }
    }

    #[test]
    fn auto_center_max_scenario() {
        let rect = auto_center_max(6000, 4000, (16, 9));
        assert_eq!(rect, CropRect::new(0, 312, 6000, 3375));
    }

    #[test]
    fn center_crop_uses_floor() {
        assert_eq!(center_crop(101, 101, 50, 50), CropRect::new(25, 25, 50, 50));
    }

    #[test]
    #[should_panic(expected = "zero area")]
    fn max_crop_rejects_empty_image() {
        max_crop(0, 100, (16, 9));
    }

    // =========================================================================
    // clamp
    // =========================================================================

    #[test]
    fn clamp_pulls_rect_inside() {
        let r = clamp(CropRect::new(900, 700, 300, 200), 1000, 800);
        assert_eq!(r, CropRect::new(700, 600, 300, 200));
    }

    #[test]
    fn clamp_shrinks_oversized_then_positions() {
        let r = clamp(CropRect::new(10, 10, 5000, 5000), 1000, 800);
        assert_eq!(r, CropRect::new(0, 0, 1000, 800));
    }

    #[test]
    fn clamp_grows_to_minimum() {
        let r = clamp(CropRect::new(990, 0, 3, 3), 1000, 800);
        assert_eq!(r, CropRect::new(950, 0, MIN_CROP_SIZE, MIN_CROP_SIZE));
    }

    #[test]
    fn clamp_tiny_image_keeps_bounds() {
        let r = clamp(CropRect::new(0, 0, 10, 10), 30, 20);
        assert_eq!(r, CropRect::new(0, 0, 30, 20));
        assert!(r.fits(30, 20));
    }

    #[test]
    fn clamp_is_idempotent() {
        let rects = [
            CropRect::new(0, 0, 0, 0),
            CropRect::new(5000, 5000, 10, 10),
            CropRect::new(100, 100, 2000, 100),
            CropRect::new(3, 4, 60, 70),
        ];
        for r in rects {
            for (iw, ih) in [(1000, 800), (60, 60), (20, 400)] {
                let once = clamp(r, iw, ih);
                assert_eq!(clamp(once, iw, ih), once);
                assert!(once.fits(iw, ih));
            }
        }
    }

    // =========================================================================
    // resize_from_anchor
    // =========================================================================

    #[test]
    fn drag_bottom_right_past_right_edge() {
        let aspect = 16.0 / 9.0;
        let start = CropRect::new(100, 100, 320, 180);
        let r = resize_from_anchor(Corner::BottomRight, start, aspect, (1500.0, 700.0), 1000, 800);
        assert_eq!(r.x, 100);
        assert_eq!(r.y, 100);
        assert_eq!(r.w, 1000 - 100);
        assert_eq!(r.h, (900.0 / aspect) as u32);
        assert!(r.fits(1000, 800));
    }

    #[test]
    fn drag_bottom_right_height_limited() {
        let aspect = 16.0 / 9.0;
        let start = CropRect::new(0, 600, 160, 90);
        // plenty of room to the right, only 200px below the anchor
        let r = resize_from_anchor(Corner::BottomRight, start, aspect, (2000.0, 5000.0), 2000, 800);
        assert_eq!(r.h, 200);
        assert_eq!(r.w, (200.0 * aspect) as u32);
        assert_eq!((r.x, r.y), (0, 600));
    }

    #[test]
    fn drag_top_left_measures_from_far_corner() {
        let start = CropRect::new(400, 400, 200, 200);
        let r = resize_from_anchor(Corner::TopLeft, start, 1.0, (300.0, 350.0), 1000, 1000);
        // anchor (600, 600): dw = 300, dh = 250 → wider than 1:1, height drives
        assert_eq!(r, CropRect::new(350, 350, 250, 250));
    }

    #[test]
    fn drag_top_right_and_bottom_left_anchor_opposite() {
        let start = CropRect::new(400, 400, 200, 200);
        let tr = resize_from_anchor(Corner::TopRight, start, 1.0, (700.0, 300.0), 1000, 1000);
        // anchor (400, 600)
        assert_eq!(tr, CropRect::new(400, 300, 300, 300));
        let bl = resize_from_anchor(Corner::BottomLeft, start, 1.0, (300.0, 700.0), 1000, 1000);
        // anchor (600, 400)
        assert_eq!(bl, CropRect::new(300, 400, 300, 300));
    }

    #[test]
    fn drag_past_anchor_floors_at_minimum() {
        let start = CropRect::new(400, 400, 200, 200);
        let r = resize_from_anchor(Corner::BottomRight, start, 1.0, (0.0, 0.0), 1000, 1000);
        assert_eq!(r, CropRect::new(400, 400, MIN_CROP_SIZE, MIN_CROP_SIZE));
    }

    #[test]
    fn minimum_size_keeps_wide_aspect() {
        let aspect = 16.0 / 9.0;
        let start = CropRect::new(100, 100, 320, 180);
        let r = resize_from_anchor(Corner::BottomRight, start, aspect, (100.0, 100.0), 1000, 800);
        assert_eq!(r.h, MIN_CROP_SIZE);
        assert_aspect_locked(r, aspect);
    }

    #[test]
    fn resize_holds_invariant_for_any_pointer() {
        let (iw, ih) = (1200u32, 900u32);
        let aspects = [16.0 / 9.0, 16.0 / 10.0, 12.0 / 5.0, 1.0, 4.0 / 5.0, 9.0 / 16.0];
        for aspect in aspects {
            let (w, h) = max_crop(iw, ih, ((aspect * 1000.0) as u32, 1000));
            let start = center_crop(iw, ih, w / 2, h / 2);
            for corner in Corner::ALL {
                let mut py = -300.0;
                while py <= ih as f64 + 300.0 {
                    let mut px = -300.0;
                    while px <= iw as f64 + 300.0 {
                        let r = resize_from_anchor(corner, start, aspect, (px, py), iw, ih);
                        assert!(r.fits(iw, ih), "{corner:?} to ({px},{py}) gave {r}");
                        assert_aspect_locked(r, aspect);
                        px += 37.5;
                    }
                    py += 41.0;
                }
            }
        }
    }

    // =========================================================================
    // translate / drag / nudge
    // =========================================================================

    #[test]
    fn move_drag_stays_inside() {
        let start = CropRect::new(100, 100, 400, 300);
        let r = drag(DragMode::Move, start, 4.0 / 3.0, (200.0, 200.0), (2000.0, -50.0), 1000, 800);
        assert_eq!(r, CropRect::new(600, 0, 400, 300));
    }

    #[test]
    fn move_drag_truncates_fractional_delta() {
        let start = CropRect::new(100, 100, 400, 300);
        let r = drag(DragMode::Move, start, 4.0 / 3.0, (0.0, 0.0), (10.9, -10.9), 1000, 800);
        assert_eq!(r, CropRect::new(110, 90, 400, 300));
    }

    #[test]
    fn resize_drag_delegates() {
        let start = CropRect::new(400, 400, 200, 200);
        let via_drag = drag(
            DragMode::Resize(Corner::TopRight),
            start,
            1.0,
            (600.0, 400.0),
            (700.0, 300.0),
            1000,
            1000,
        );
        let direct = resize_from_anchor(Corner::TopRight, start, 1.0, (700.0, 300.0), 1000, 1000);
        assert_eq!(via_drag, direct);
    }

    #[test]
    fn nudge_small_and_large() {
        let r = CropRect::new(100, 100, 400, 300);
        assert_eq!(nudge(r, Direction::Left, NudgeStep::Small, 1000, 800).x, 99);
        assert_eq!(nudge(r, Direction::Down, NudgeStep::Large, 1000, 800).y, 110);
    }

    #[test]
    fn nudge_stops_at_edges() {
        let r = CropRect::new(5, 495, 400, 300);
        assert_eq!(nudge(r, Direction::Left, NudgeStep::Large, 1000, 800).x, 0);
        assert_eq!(nudge(r, Direction::Down, NudgeStep::Large, 1000, 800).y, 500);
        let r = CropRect::new(598, 0, 400, 300);
        assert_eq!(nudge(r, Direction::Right, NudgeStep::Large, 1000, 800).x, 600);
        assert_eq!(nudge(r, Direction::Up, NudgeStep::Small, 1000, 800).y, 0);
    }
}
