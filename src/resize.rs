//! Source image dimension normalization
//!
//! The generation service only accepts sizes where both sides are multiples of
//! [`DIMENSION_STEP`] and the area stays within [`MAX_OUTPUT_AREA`]. Anything
//! else is mapped to the closest size with the same aspect ratio.

use crate::constants::{DIMENSION_STEP, MAX_OUTPUT_AREA};

const SHORT_SIDE: u32 = 512;
const LONG_SIDE: u32 = 1024;

/// Width and height of an image, in pixels.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Size {
    /// Horizontal pixel count.
    pub width: u32,
    /// Vertical pixel count.
    pub height: u32,
}

impl Size {
    /// Smallest size the normalizer ever produces.
    pub const MIN: Size = Size {
        width: DIMENSION_STEP,
        height: DIMENSION_STEP,
    };

    /// Creates a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel area, widened so it cannot overflow.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    fn is_valid_output(&self) -> bool {
        self.width % DIMENSION_STEP == 0
            && self.height % DIMENSION_STEP == 0
            && self.area() <= MAX_OUTPUT_AREA
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rounds `num` to the closest multiple of `mult`.
///
/// When `num` sits exactly between two multiples the upper one wins. NaN maps
/// to 0 and any non-positive result is bumped up to `mult`.
pub fn closest_multiple(num: f64, mult: u32) -> u32 {
    let step = f64::from(mult);
    let floor = (num / step).floor() * step;
    let ceil = (num / step).ceil() * step;
    let closest = if num - floor < ceil - num { floor } else { ceil };
    if closest.is_nan() {
        return 0;
    }
    if closest <= 0.0 {
        return mult;
    }
    // saturating: only reachable for ratios the area check rejects anyway
    closest as u32
}

/// Computes the size to request from the generation service for a source
/// image of `size`.
///
/// Sizes that are already acceptable pass through. Otherwise the short side
/// is pinned to 512 and the long side follows the aspect ratio; if that is
/// still too large the long side is pinned to 1024 instead. That last branch
/// does not re-check the area.
///
/// A source with one zero side lands on that fallback as if its aspect ratio
/// were infinite; an empty source yields [`Size::MIN`].
pub fn normalize(size: Size) -> Size {
    match (size.width, size.height) {
        (0, 0) => return Size::MIN,
        (0, _) => return Size::new(DIMENSION_STEP, LONG_SIDE),
        (_, 0) => return Size::new(LONG_SIDE, DIMENSION_STEP),
        _ => {}
    }
    if size.is_valid_output() {
        return size;
    }

    let aspect_ratio = f64::from(size.width) / f64::from(size.height);
    let candidate = if aspect_ratio > 1.0 {
        Size::new(
            closest_multiple(f64::from(SHORT_SIDE) * aspect_ratio, DIMENSION_STEP),
            SHORT_SIDE,
        )
    } else {
        Size::new(
            SHORT_SIDE,
            closest_multiple(f64::from(SHORT_SIDE) / aspect_ratio, DIMENSION_STEP),
        )
    };
    if candidate.area() <= MAX_OUTPUT_AREA {
        return candidate;
    }

    if aspect_ratio > 1.0 {
        Size::new(
            LONG_SIDE,
            closest_multiple(f64::from(LONG_SIDE) / aspect_ratio, DIMENSION_STEP),
        )
    } else {
        Size::new(
            closest_multiple(f64::from(LONG_SIDE) * aspect_ratio, DIMENSION_STEP),
            LONG_SIDE,
        )
    }
}
