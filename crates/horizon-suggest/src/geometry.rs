//! Popup geometry engine.
//!
//! Given the anchor's on-screen rectangle, the visible display frame, the
//! stable system insets, margins and the measured content size, the engine
//! decides whether the popup goes above or below the anchor and computes the
//! popup's final bounding rectangle.
//!
//! All coordinates are integer screen pixels. The free functions in this
//! module are pure; [`GeometryState`] adds the measurement cache and the
//! bookkeeping the popup keeps between recomputes.
//!
//! # Example
//!
//! ```
//! use horizon_suggest::geometry::{
//!     available_space, clamp_to_available, place_window, resolve_placement, Gravity, Insets,
//!     Margins, PreferredPosition, Rect, Size, VerticalPlacement,
//! };
//!
//! let frame = Rect::new(0, 0, 1080, 1920);
//! let anchor = Rect::new(100, 400, 980, 520);
//! let margins = Margins::default();
//!
//! let placement = resolve_placement(PreferredPosition::BestFit, anchor, frame, margins.top);
//! assert_eq!(placement, VerticalPlacement::Below);
//!
//! let space = available_space(placement, anchor, frame, Insets::default(), margins, true);
//! let size = clamp_to_available(Size::new(600, 500), space);
//! let rect = place_window(size, placement, anchor, frame, margins, Gravity::Center, true);
//! assert_eq!(rect, Rect::new(240, 520, 840, 1020));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result, SuggestError};
use crate::host::{AnchorView, ContentView};

/// Target used for geometry log records.
const TARGET: &str = horizon_suggest_core::logging::targets::GEOMETRY;

// ============================================================================
// Basic types
// ============================================================================

/// An integer rectangle in screen pixels, stored as its four edges.
///
/// `right` and `bottom` are exclusive, so `width() == right - left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Create a rectangle from its edges.
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size.
    #[inline]
    pub const fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    #[inline]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Horizontal midpoint, rounded toward negative infinity.
    #[inline]
    pub const fn center_x(&self) -> i32 {
        (self.left + self.right) >> 1
    }

    /// Returns true if the rectangle has no area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// The rectangle's size.
    #[inline]
    pub const fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Translate the rectangle.
    #[inline]
    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }
}

/// A width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// Zero size.
    pub const ZERO: Self = Self::new(0, 0);

    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Check if the size has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Screen-edge insets reserved by the system (status bar, navigation bar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Insets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Insets {
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Popup margins in pixels.
///
/// `vertical_safe` is deducted from both the top and the bottom of the
/// available height when capping the content height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub vertical_safe: i32,
}

impl Margins {
    /// Create margins with no vertical safe margin.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            vertical_safe: 0,
        }
    }

    /// Same margin on every edge.
    pub const fn uniform(margin: i32) -> Self {
        Self::new(margin, margin, margin, margin)
    }

    /// Set the vertical safe margin using builder pattern.
    pub const fn with_vertical_safe(mut self, vertical_safe: i32) -> Self {
        self.vertical_safe = vertical_safe;
        self
    }

    /// Reject negative margins.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let edges = [
            ("left", self.left),
            ("top", self.top),
            ("right", self.right),
            ("bottom", self.bottom),
            ("vertical_safe", self.vertical_safe),
        ];
        match edges.into_iter().find(|(_, value)| *value < 0) {
            Some((name, value)) => Err(ConfigError::Invalid(format!(
                "{name} margin must be >= 0, got {value}"
            ))),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Placement enums
// ============================================================================

/// Preferred vertical position of the popup relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredPosition {
    /// Always show the popup above the anchor.
    Above,
    /// Always show the popup below the anchor.
    Below,
    /// Show the popup above or below based on available space.
    #[default]
    BestFit,
}

/// The resolved vertical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalPlacement {
    #[default]
    Above,
    Below,
}

/// Horizontal alignment of the popup with its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gravity {
    /// Align to the leading edge.
    Start,
    /// Align to the anchor's trailing edge.
    End,
    /// Center on the anchor.
    #[default]
    Center,
}

/// How a content dimension is sized against the space the popup offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentSizing {
    /// Use the content's own measured size.
    #[default]
    Natural,
    /// Take all of the available space.
    FillAvailable,
}

/// Space the popup may occupy for the current placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AvailableSpace {
    /// Width after horizontal margins.
    pub width: i32,
    /// Height after vertical margins; used for measuring.
    pub height: i32,
    /// `height` minus twice the vertical safe margin; caps the content height.
    pub safe_height: i32,
}

// ============================================================================
// Pure geometry
// ============================================================================

/// Resolve the preferred position into a concrete placement.
///
/// `BestFit` goes above when the anchor's top (plus the top margin) lies in
/// the lower half of the visible frame; ties go below.
pub fn resolve_placement(
    preferred: PreferredPosition,
    anchor: Rect,
    visible_frame: Rect,
    margin_top: i32,
) -> VerticalPlacement {
    match preferred {
        PreferredPosition::Above => VerticalPlacement::Above,
        PreferredPosition::Below => VerticalPlacement::Below,
        PreferredPosition::BestFit => {
            if anchor.top + margin_top > visible_frame.height() / 2 {
                VerticalPlacement::Above
            } else {
                VerticalPlacement::Below
            }
        }
    }
}

/// Compute the space available to the popup.
pub fn available_space(
    placement: VerticalPlacement,
    anchor: Rect,
    visible_frame: Rect,
    stable_insets: Insets,
    margins: Margins,
    constrain_to_anchor_bounds: bool,
) -> AvailableSpace {
    let base_width = if constrain_to_anchor_bounds {
        anchor.width()
    } else {
        visible_frame.width()
    };
    let width = base_width - margins.left - margins.right;

    let base_height = match placement {
        VerticalPlacement::Above => anchor.top - stable_insets.top,
        VerticalPlacement::Below => visible_frame.height() - anchor.top - stable_insets.bottom,
    };
    let height = base_height - margins.top - margins.bottom;

    AvailableSpace {
        width,
        height,
        safe_height: height - margins.vertical_safe * 2,
    }
}

/// Apply the content's sizing policies to its measured size.
pub fn apply_sizing(
    measured: Size,
    width_sizing: ContentSizing,
    height_sizing: ContentSizing,
    available_width: i32,
    available_height: i32,
) -> Size {
    let width = match width_sizing {
        ContentSizing::FillAvailable => available_width,
        ContentSizing::Natural => measured.width,
    };
    let height = match height_sizing {
        ContentSizing::FillAvailable => available_height,
        ContentSizing::Natural => measured.height,
    };
    Size::new(width, height)
}

/// Clamp a content size into the available space.
///
/// The width is capped by the available width, the height by the safe height.
/// Neither dimension goes below zero.
pub fn clamp_to_available(content: Size, space: AvailableSpace) -> Size {
    Size::new(
        content.width.min(space.width).max(0),
        content.height.min(space.safe_height).max(0),
    )
}

/// Horizontal edges for a popup of `width` aligned inside `bounds`.
fn align_horizontally(gravity: Gravity, width: i32, bounds: Rect, start_edge: i32) -> (i32, i32) {
    match gravity {
        Gravity::Start => (start_edge, start_edge + width),
        Gravity::End => (bounds.right - width, bounds.right),
        Gravity::Center => {
            let center = bounds.center_x();
            (center - width / 2, center + width / 2)
        }
    }
}

/// Place a popup of the given (already clamped) size next to the anchor.
///
/// The vertical offset from the anchor's top is `-height` above and the
/// anchor's height below; the bottom margin is subtracted in both cases.
///
/// With `constrain_to_anchor_bounds`, a popup at least as wide as the anchor
/// spans it exactly; equal widths count as wider so odd widths never shift
/// under center gravity.
pub fn place_window(
    size: Size,
    placement: VerticalPlacement,
    anchor: Rect,
    visible_frame: Rect,
    margins: Margins,
    gravity: Gravity,
    constrain_to_anchor_bounds: bool,
) -> Rect {
    let (mut left, mut right) = if constrain_to_anchor_bounds {
        if size.width >= anchor.width() {
            (anchor.left, anchor.right)
        } else {
            align_horizontally(gravity, size.width, anchor, anchor.left)
        }
    } else {
        align_horizontally(gravity, size.width, anchor, visible_frame.left)
    };

    left += margins.left;
    right -= margins.right;
    if right < left {
        right = left;
    }

    let offset_y = match placement {
        VerticalPlacement::Above => -size.height,
        VerticalPlacement::Below => anchor.height(),
    };
    let top = anchor.top + offset_y - margins.bottom;

    Rect::new(left, top, right, top + size.height)
}

// ============================================================================
// Stateful engine
// ============================================================================

/// Layout parameters of a popup that can change while it is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryConfig {
    pub preferred_position: PreferredPosition,
    pub gravity: Gravity,
    pub constrain_to_anchor_bounds: bool,
    pub margins: Margins,
}

/// The geometry state owned by one popup.
///
/// Every recompute refreshes the anchor rectangle and the visible frame.
/// The content measurement is cached until a layout is requested or the
/// cached size is empty; margin changes alone never trigger a re-measure.
#[derive(Debug, Clone, Default)]
pub struct GeometryState {
    config: GeometryConfig,
    stable_insets: Insets,
    window_visible_frame: Rect,
    anchor_rect: Rect,
    view_dimensions: Size,
    window_rect: Rect,
    determined_position: VerticalPlacement,
    layout_requested: bool,
}

impl GeometryState {
    /// Create geometry state for the given configuration.
    pub fn new(config: GeometryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GeometryConfig {
        &mut self.config
    }

    /// Record the stable insets delivered for the current show cycle.
    pub fn set_stable_insets(&mut self, insets: Insets) {
        self.stable_insets = insets;
    }

    pub fn stable_insets(&self) -> Insets {
        self.stable_insets
    }

    /// Force the next recompute to re-measure the content.
    pub fn request_layout(&mut self) {
        self.layout_requested = true;
    }

    pub fn is_layout_requested(&self) -> bool {
        self.layout_requested
    }

    /// The last computed popup rectangle.
    pub fn window_rect(&self) -> Rect {
        self.window_rect
    }

    /// The anchor rectangle seen by the last recompute.
    pub fn anchor_rect(&self) -> Rect {
        self.anchor_rect
    }

    /// The visible frame seen by the last recompute.
    pub fn visible_frame(&self) -> Rect {
        self.window_visible_frame
    }

    /// The cached content measurement.
    pub fn view_dimensions(&self) -> Size {
        self.view_dimensions
    }

    /// The placement chosen by the last recompute.
    pub fn determined_position(&self) -> VerticalPlacement {
        self.determined_position
    }

    /// Measure the content unless a usable cached measurement exists.
    fn measure_content(
        &mut self,
        content: &dyn ContentView,
        available_width: i32,
        available_height: i32,
    ) -> Size {
        if !self.view_dimensions.is_empty() && !self.layout_requested {
            return self.view_dimensions;
        }
        self.layout_requested = false;

        let measured = content.measure(available_width.max(0), available_height.max(0));
        self.view_dimensions = apply_sizing(
            measured,
            content.width_sizing(),
            content.height_sizing(),
            available_width,
            available_height,
        );
        tracing::trace!(target: TARGET, ?measured, dimensions = ?self.view_dimensions, "content measured");
        self.view_dimensions
    }

    /// Recompute the popup rectangle from fresh measurements.
    ///
    /// Fails with [`SuggestError::AnchorDetached`] when the anchor is not
    /// attached to a root surface.
    pub fn recompute(&mut self, anchor: &dyn AnchorView, content: &dyn ContentView) -> Result<Rect> {
        let root = anchor.root().ok_or(SuggestError::AnchorDetached)?;
        self.window_visible_frame = root.visible_display_rect();
        self.anchor_rect = anchor.screen_rect();

        let config = self.config;
        self.determined_position = resolve_placement(
            config.preferred_position,
            self.anchor_rect,
            self.window_visible_frame,
            config.margins.top,
        );

        let space = available_space(
            self.determined_position,
            self.anchor_rect,
            self.window_visible_frame,
            self.stable_insets,
            config.margins,
            config.constrain_to_anchor_bounds,
        );
        let dimensions = self.measure_content(content, space.width, space.height);
        let size = clamp_to_available(dimensions, space);

        self.window_rect = place_window(
            size,
            self.determined_position,
            self.anchor_rect,
            self.window_visible_frame,
            config.margins,
            config.gravity,
            config.constrain_to_anchor_bounds,
        );
        tracing::trace!(
            target: TARGET,
            anchor = ?self.anchor_rect,
            placement = ?self.determined_position,
            rect = ?self.window_rect,
            "window rect recomputed"
        );
        Ok(self.window_rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Rect = Rect::new(0, 0, 1080, 1920);
    const ANCHOR: Rect = Rect::new(100, 400, 980, 520);

    #[test]
    fn test_rect_basics() {
        let rect = Rect::from_origin_size(10, 20, 30, 40);
        assert_eq!(rect, Rect::new(10, 20, 40, 60));
        assert_eq!(rect.width(), 30);
        assert_eq!(rect.height(), 40);
        assert_eq!(rect.center_x(), 25);
        assert!(!rect.is_empty());
        assert!(Rect::new(5, 5, 5, 10).is_empty());
        assert_eq!(rect.offset(1, -1), Rect::new(11, 19, 41, 59));
    }

    #[test]
    fn test_best_fit_resolution() {
        let below = resolve_placement(PreferredPosition::BestFit, ANCHOR, FRAME, 0);
        assert_eq!(below, VerticalPlacement::Below);

        let low_anchor = ANCHOR.offset(0, 800);
        let above = resolve_placement(PreferredPosition::BestFit, low_anchor, FRAME, 0);
        assert_eq!(above, VerticalPlacement::Above);
    }

    #[test]
    fn test_best_fit_tie_goes_below() {
        let anchor = Rect::new(0, 960, 100, 1000);
        assert_eq!(
            resolve_placement(PreferredPosition::BestFit, anchor, FRAME, 0),
            VerticalPlacement::Below
        );
        // One pixel of top margin tips it over.
        assert_eq!(
            resolve_placement(PreferredPosition::BestFit, anchor, FRAME, 1),
            VerticalPlacement::Above
        );
    }

    #[test]
    fn test_fixed_preferences_ignore_space() {
        let low_anchor = ANCHOR.offset(0, 1200);
        assert_eq!(
            resolve_placement(PreferredPosition::Below, low_anchor, FRAME, 0),
            VerticalPlacement::Below
        );
        assert_eq!(
            resolve_placement(PreferredPosition::Above, ANCHOR, FRAME, 0),
            VerticalPlacement::Above
        );
    }

    #[test]
    fn test_available_space_below_and_above() {
        let insets = Insets::new(0, 63, 0, 126);
        let margins = Margins::new(10, 5, 20, 7).with_vertical_safe(16);

        let below = available_space(VerticalPlacement::Below, ANCHOR, FRAME, insets, margins, true);
        assert_eq!(below.width, 880 - 30);
        assert_eq!(below.height, 1920 - 400 - 126 - 12);
        assert_eq!(below.safe_height, below.height - 32);

        let above = available_space(VerticalPlacement::Above, ANCHOR, FRAME, insets, margins, false);
        assert_eq!(above.width, 1080 - 30);
        assert_eq!(above.height, 400 - 63 - 12);
    }

    #[test]
    fn test_margins_validate() {
        assert!(Margins::default().validate().is_ok());
        assert!(Margins::uniform(12).with_vertical_safe(4).validate().is_ok());
        assert!(matches!(
            Margins::new(-1, 0, 0, 0).validate(),
            Err(ConfigError::Invalid(msg)) if msg.contains("left")
        ));
        assert!(matches!(
            Margins::default().with_vertical_safe(-100).validate(),
            Err(ConfigError::Invalid(msg)) if msg.contains("vertical_safe")
        ));
    }

    #[test]
    fn test_equal_width_spans_anchor() {
        let anchor = Rect::new(101, 400, 982, 520);
        let size = Size::new(anchor.width(), 200);
        let rect = place_window(
            size,
            VerticalPlacement::Below,
            anchor,
            FRAME,
            Margins::default(),
            Gravity::Center,
            true,
        );
        assert_eq!((rect.left, rect.right), (anchor.left, anchor.right));
    }

    #[test]
    fn test_apply_sizing() {
        let measured = Size::new(300, 200);
        assert_eq!(
            apply_sizing(measured, ContentSizing::Natural, ContentSizing::Natural, 800, 900),
            measured
        );
        assert_eq!(
            apply_sizing(
                measured,
                ContentSizing::FillAvailable,
                ContentSizing::Natural,
                800,
                900
            ),
            Size::new(800, 200)
        );
        assert_eq!(
            apply_sizing(
                measured,
                ContentSizing::Natural,
                ContentSizing::FillAvailable,
                800,
                900
            ),
            Size::new(300, 900)
        );
    }

    #[test]
    fn test_clamp_never_negative() {
        let space = AvailableSpace {
            width: -10,
            height: 20,
            safe_height: -4,
        };
        assert_eq!(clamp_to_available(Size::new(100, 100), space), Size::ZERO);

        let space = AvailableSpace {
            width: 50,
            height: 80,
            safe_height: 60,
        };
        assert_eq!(clamp_to_available(Size::new(100, 100), space), Size::new(50, 60));
        assert_eq!(clamp_to_available(Size::new(10, 10), space), Size::new(10, 10));
    }

    #[test]
    fn test_place_below_centered() {
        let rect = place_window(
            Size::new(600, 500),
            VerticalPlacement::Below,
            ANCHOR,
            FRAME,
            Margins::default(),
            Gravity::Center,
            true,
        );
        assert_eq!(rect, Rect::new(240, 520, 840, 1020));
    }

    #[test]
    fn test_place_above_sits_on_anchor_top() {
        let rect = place_window(
            Size::new(600, 300),
            VerticalPlacement::Above,
            ANCHOR,
            FRAME,
            Margins::default(),
            Gravity::Center,
            true,
        );
        assert_eq!(rect.bottom, ANCHOR.top);
        assert_eq!(rect.height(), 300);
    }

    #[test]
    fn test_place_gravity_unconstrained() {
        let size = Size::new(200, 100);
        let margins = Margins::default();

        let start = place_window(size, VerticalPlacement::Below, ANCHOR, FRAME, margins, Gravity::Start, false);
        assert_eq!((start.left, start.right), (FRAME.left, FRAME.left + 200));

        let end = place_window(size, VerticalPlacement::Below, ANCHOR, FRAME, margins, Gravity::End, false);
        assert_eq!((end.left, end.right), (ANCHOR.right - 200, ANCHOR.right));

        let center = place_window(size, VerticalPlacement::Below, ANCHOR, FRAME, margins, Gravity::Center, false);
        assert_eq!((center.left, center.right), (440, 640));
    }

    #[test]
    fn test_place_gravity_constrained_uses_anchor_edges() {
        let size = Size::new(200, 100);
        let margins = Margins::default();

        let start = place_window(size, VerticalPlacement::Below, ANCHOR, FRAME, margins, Gravity::Start, true);
        assert_eq!((start.left, start.right), (ANCHOR.left, ANCHOR.left + 200));

        let end = place_window(size, VerticalPlacement::Below, ANCHOR, FRAME, margins, Gravity::End, true);
        assert_eq!((end.left, end.right), (ANCHOR.right - 200, ANCHOR.right));
    }

    #[test]
    fn test_constrained_full_width_spans_anchor_for_every_gravity() {
        // Odd anchor width: centering would lose a pixel.
        let anchor = Rect::new(100, 400, 981, 520);
        for gravity in [Gravity::Start, Gravity::End, Gravity::Center] {
            let rect = place_window(
                Size::new(anchor.width(), 100),
                VerticalPlacement::Below,
                anchor,
                FRAME,
                Margins::default(),
                gravity,
                true,
            );
            assert_eq!((rect.left, rect.right), (anchor.left, anchor.right), "{gravity:?}");
        }
    }

    #[test]
    fn test_place_applies_margins_with_bottom_margin_offset() {
        let margins = Margins::new(10, 5, 20, 7);
        let rect = place_window(
            Size::new(600, 500),
            VerticalPlacement::Below,
            ANCHOR,
            FRAME,
            margins,
            Gravity::Center,
            true,
        );
        assert_eq!(rect, Rect::new(250, 513, 820, 1013));

        let above = place_window(
            Size::new(600, 300),
            VerticalPlacement::Above,
            ANCHOR,
            FRAME,
            margins,
            Gravity::Center,
            true,
        );
        // The bottom margin, not the top margin, shifts the popup.
        assert_eq!(above.top, ANCHOR.top - 300 - 7);
    }

    #[test]
    fn test_place_large_margins_collapse_width() {
        let rect = place_window(
            Size::new(10, 10),
            VerticalPlacement::Below,
            ANCHOR,
            FRAME,
            Margins::new(40, 0, 40, 0),
            Gravity::Start,
            true,
        );
        assert_eq!(rect.width(), 0);
        assert!(rect.height() >= 0);
    }
}
