//! Capabilities the popup needs from the host toolkit.
//!
//! The popup never talks to a concrete toolkit. It reads the anchor through
//! [`AnchorView`], the window through [`RootSurface`], measures through
//! [`ContentView`] and positions a [`FloatingSurface`]. Back navigation is
//! injected as a [`BackNavigationRegistry`].
//!
//! Implementations use interior mutability; every method takes `&self`.
//! See [`crate::headless`] for in-memory implementations.

use std::sync::Arc;

use horizon_suggest_core::Signal;
use slotmap::new_key_type;

use crate::appearance::Background;
use crate::geometry::{ContentSizing, Insets, Rect, Size};

/// A text edit reported by the anchor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextChange {
    /// The full text after the edit.
    pub text: String,
    /// Start of the edited range.
    pub start: usize,
    /// Length of the inserted range.
    pub count: usize,
}

impl TextChange {
    pub fn new(text: impl Into<String>, start: usize, count: usize) -> Self {
        Self {
            text: text.into(),
            start,
            count,
        }
    }
}

/// Called once when the root surface's insets become available.
pub type InsetsCallback = Box<dyn FnOnce(Insets) + Send>;

/// Called when the floating surface is dismissed from outside the popup.
pub type DismissCallback = Arc<dyn Fn() + Send + Sync>;

/// Called when a back navigation is intercepted.
pub type BackHandler = Arc<dyn Fn() + Send + Sync>;

new_key_type! {
    /// Identifies a registered back-navigation handler.
    pub struct BackHandlerId;
}

/// The view the popup is attached to, usually a text field.
pub trait AnchorView: Send + Sync {
    /// The anchor's bounding box in screen coordinates.
    fn screen_rect(&self) -> Rect;

    /// The root surface the anchor is attached to, if any.
    fn root(&self) -> Option<Arc<dyn RootSurface>>;

    /// The anchor's current text. `None` for anchors that hold no text.
    fn text(&self) -> Option<String> {
        None
    }

    /// Emitted on every text edit.
    fn text_changed(&self) -> Option<&Signal<TextChange>> {
        None
    }

    /// Emitted with the new focus state whenever focus changes.
    fn focus_changed(&self) -> Option<&Signal<bool>> {
        None
    }
}

/// The top-level window hosting the anchor.
pub trait RootSurface: Send + Sync {
    /// The region of the display not covered by system decorations.
    fn visible_display_rect(&self) -> Rect;

    /// Deliver the stable insets to `callback` once they are known.
    ///
    /// The callback may run synchronously from inside this call.
    fn request_apply_insets(&self, callback: InsetsCallback);
}

/// The view shown inside the popup.
pub trait ContentView: Send + Sync {
    /// Measure with at-most constraints.
    fn measure(&self, max_width: i32, max_height: i32) -> Size;

    fn width_sizing(&self) -> ContentSizing {
        ContentSizing::Natural
    }

    fn height_sizing(&self) -> ContentSizing {
        ContentSizing::Natural
    }
}

/// Layout of the container the content is placed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentContainer {
    pub width: ContentSizing,
    pub height: ContentSizing,
}

impl Default for ContentContainer {
    /// Fills the popup width and wraps the content height.
    fn default() -> Self {
        Self {
            width: ContentSizing::FillAvailable,
            height: ContentSizing::Natural,
        }
    }
}

/// A floating window primitive.
pub trait FloatingSurface: Send + Sync {
    fn set_background(&self, background: &Background);

    fn set_elevation(&self, elevation: f32);

    /// Whether touches outside the surface dismiss it.
    fn set_outside_touchable(&self, touchable: bool);

    fn set_content(&self, content: Arc<dyn ContentView>, container: ContentContainer);

    /// Show the surface at `rect`.
    fn show_at(&self, rect: Rect);

    /// Move and resize a showing surface.
    fn update(&self, rect: Rect);

    /// Hide the surface. Calling this on a hidden surface does nothing.
    fn dismiss(&self);

    fn is_showing(&self) -> bool;

    /// Install the hook invoked when the surface is dismissed by the host
    /// (outside touch, window teardown), or remove it with `None`.
    fn set_on_dismiss(&self, callback: Option<DismissCallback>);
}

/// Registry for back-navigation interceptors.
pub trait BackNavigationRegistry: Send + Sync {
    fn register(&self, enabled: bool, handler: BackHandler) -> BackHandlerId;

    fn unregister(&self, id: BackHandlerId);
}
