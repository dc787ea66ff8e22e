//! Factory shortcuts for common popup shapes.

use std::sync::Arc;

use horizon_suggest_core::SharedTaskScheduler;

use crate::bridge::ListChangeNotifier;
use crate::host::{AnchorView, ContentView, FloatingSurface};
use crate::window::{SuggestionWindow, SuggestionWindowBuilder};

/// Entry points for attaching suggestions to an anchor.
///
/// Both return a builder preloaded with the stock defaults: centered,
/// best-fit placement, hidden on blur, constrained to the anchor, no
/// minimum length, no throttle, dismissed on back navigation, rounded white
/// background.
pub struct Suggestive;

impl Suggestive {
    /// Suggestions shown in an arbitrary content view.
    pub fn view(
        anchor: Arc<dyn AnchorView>,
        content: Arc<dyn ContentView>,
        surface: Arc<dyn FloatingSurface>,
        scheduler: Arc<SharedTaskScheduler>,
    ) -> SuggestionWindowBuilder {
        SuggestionWindow::builder(anchor, content, surface, scheduler)
    }

    /// Suggestions shown in a list view.
    ///
    /// The popup re-measures itself whenever `notifier` reports a change.
    pub fn list(
        anchor: Arc<dyn AnchorView>,
        content: Arc<dyn ContentView>,
        surface: Arc<dyn FloatingSurface>,
        scheduler: Arc<SharedTaskScheduler>,
        notifier: Arc<ListChangeNotifier>,
    ) -> SuggestionWindowBuilder {
        SuggestionWindow::builder(anchor, content, surface, scheduler).list_source(notifier)
    }
}
