//! Scroll progress of a section through the viewport, and the clip it maps to.
//!
//! Progress is 0 when the section's top edge first touches the bottom of the
//! viewport and 1 once its bottom edge has left through the top. In between it
//! ramps linearly over `viewport_height + section_height` pixels of travel, so
//! the rate depends on the section's own height rather than on page offsets.

use std::fmt;

/// Bounding box of a section relative to the viewport's top edge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SectionRect {
    /// Distance from the viewport top to the section top (negative once above)
    pub top: f64,
    /// `top + height`
    pub bottom: f64,
    /// Section height in CSS pixels
    pub height: f64,
}

impl SectionRect {
    /// Build a rect from its top edge and height.
    #[must_use]
    pub fn new(top: f64, height: f64) -> Self {
        Self {
            top,
            bottom: top + height,
            height,
        }
    }
}

/// Current viewport dimensions in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Normalized traversal of `rect` through a viewport of `viewport_height`.
///
/// Always within `[0.0, 1.0]`; non-finite geometry yields `0.0`.
#[must_use]
pub fn scroll_progress(rect: SectionRect, viewport_height: f64) -> f64 {
    if rect.top >= viewport_height {
        // Not entered yet
        return 0.0;
    }
    if rect.bottom <= 0.0 {
        // Fully scrolled past
        return 1.0;
    }

    // Intersecting: top < H and bottom > 0 imply a positive range
    let scroll_range = viewport_height + rect.height;
    let scrolled = viewport_height - rect.top;
    let progress = scrolled / scroll_range;
    if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `clip-path: inset(top right bottom left)` with only the top edge varying.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInset {
    top_percent: f64,
}

impl ClipInset {
    /// Clip revealing `progress` of the layer from its bottom edge upward.
    ///
    /// Progress 0 hides the layer entirely (`inset(100% 0 0 0)`), progress 1
    /// shows all of it (`inset(0% 0 0 0)`).
    #[must_use]
    pub fn reveal(progress: f64) -> Self {
        let progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            top_percent: (1.0 - progress) * 100.0,
        }
    }

    /// Percentage clipped away from the top edge.
    #[must_use]
    pub fn top_percent(&self) -> f64 {
        self.top_percent
    }

    /// CSS value for the `clip-path` property.
    #[must_use]
    pub fn css_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ClipInset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inset({}% 0 0 0)", self.top_percent)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    // Section height 400 in an 800px viewport: range is 1200px
    #[test_case(800.0, 0.0, "inset(100% 0 0 0)" ; "top touching viewport bottom")]
    #[test_case(200.0, 0.5, "inset(50% 0 0 0)" ; "halfway through")]
    #[test_case(-400.0, 1.0, "inset(0% 0 0 0)" ; "bottom at viewport top")]
    #[test_case(1500.0, 0.0, "inset(100% 0 0 0)" ; "far below")]
    #[test_case(-5000.0, 1.0, "inset(0% 0 0 0)" ; "far above")]
    fn test_reference_section(top: f64, expected: f64, clip: &str) {
        let progress = scroll_progress(SectionRect::new(top, 400.0), 800.0);
        assert_eq!(progress, expected);
        assert_eq!(ClipInset::reveal(progress).css_value(), clip);
    }

    #[test]
    fn test_zero_height_section_stays_in_range() {
        for top in [-10.0, 0.0, 0.5, 400.0, 799.0, 800.0, 900.0] {
            let p = scroll_progress(SectionRect::new(top, 0.0), 800.0);
            assert!((0.0..=1.0).contains(&p), "top {top} gave {p}");
        }
    }

    #[test]
    fn test_zero_height_viewport() {
        assert_eq!(scroll_progress(SectionRect::new(0.0, 100.0), 0.0), 0.0);
        assert_eq!(scroll_progress(SectionRect::new(-100.0, 100.0), 0.0), 1.0);
        let p = scroll_progress(SectionRect::new(-50.0, 100.0), 0.0);
        assert_eq!(p, 0.5);
    }

    #[test]
    fn test_non_finite_geometry() {
        let rect = SectionRect {
            top: f64::NAN,
            bottom: f64::NAN,
            height: f64::NAN,
        };
        assert_eq!(scroll_progress(rect, 800.0), 0.0);
    }

    #[test]
    fn test_reveal_clamps_input() {
        assert_eq!(ClipInset::reveal(-3.0).top_percent(), 100.0);
        assert_eq!(ClipInset::reveal(7.0).top_percent(), 0.0);
        assert_eq!(ClipInset::reveal(f64::INFINITY).top_percent(), 100.0);
    }
}
