//! The suggestion window.
//!
//! [`SuggestionWindow`] binds a [`PopupLifecycle`] and a
//! [`ThrottledQueryTrigger`] to an anchor/content pair. It listens to the
//! anchor's text and focus, shows and hides the popup, and calls the query
//! callback with the text the user typed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use horizon_suggest::headless::HeadlessHost;
//! use horizon_suggest::SuggestionWindow;
//!
//! let host = HeadlessHost::new();
//! let window = SuggestionWindow::builder(
//!     host.anchor.clone(),
//!     host.content.clone(),
//!     host.surface.clone(),
//!     host.scheduler.clone(),
//! )
//! .on_query(|text| println!("search for {text}"))
//! .query_throttle(Duration::from_millis(200))
//! .build()
//! .unwrap();
//!
//! host.anchor.set_text("rust");
//! assert!(window.is_showing());
//! ```

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use horizon_suggest_core::{ConnectionId, SharedTaskScheduler, Signal};
use parking_lot::Mutex;

use crate::appearance::Background;
use crate::bridge::{ListChangeBridge, ListChangeNotifier};
use crate::config::PopupSettings;
use crate::error::Result;
use crate::geometry::{GeometryConfig, Gravity, Margins, PreferredPosition, Rect, VerticalPlacement};
use crate::host::{AnchorView, BackNavigationRegistry, ContentView, FloatingSurface};
use crate::lifecycle::{LifecycleOptions, PopupLifecycle, PopupState};
use crate::trigger::{MinCharactersRule, QueryDispatch, ThrottledQueryTrigger, VisibilityRequest};

const TARGET: &str = horizon_suggest_core::logging::targets::WINDOW;

/// Receives the text to search for.
pub type QueryCallback = Arc<dyn Fn(&str) + Send + Sync>;

struct WindowInner {
    anchor: Arc<dyn AnchorView>,
    lifecycle: PopupLifecycle,
    trigger: Mutex<ThrottledQueryTrigger>,
    on_query: QueryCallback,
    hide_on_blur: bool,
    text_connection: Mutex<Option<ConnectionId>>,
    focus_connection: Mutex<Option<ConnectionId>>,
}

/// An autocomplete popup attached to a text anchor.
///
/// Dropping the window cancels its pending tasks, disconnects its anchor
/// listeners and hides the surface.
pub struct SuggestionWindow {
    inner: Arc<WindowInner>,
    bridge: Option<ListChangeBridge>,
}

impl SuggestionWindow {
    /// Create a window from a settings record.
    pub fn new(
        anchor: Arc<dyn AnchorView>,
        content: Arc<dyn ContentView>,
        surface: Arc<dyn FloatingSurface>,
        scheduler: Arc<SharedTaskScheduler>,
        on_query: impl Fn(&str) + Send + Sync + 'static,
        settings: PopupSettings,
    ) -> Result<Self> {
        Self::builder(anchor, content, surface, scheduler)
            .on_query(on_query)
            .settings(settings)
            .build()
    }

    /// Start building a window with default settings.
    pub fn builder(
        anchor: Arc<dyn AnchorView>,
        content: Arc<dyn ContentView>,
        surface: Arc<dyn FloatingSurface>,
        scheduler: Arc<SharedTaskScheduler>,
    ) -> SuggestionWindowBuilder {
        SuggestionWindowBuilder {
            anchor,
            content,
            surface,
            scheduler,
            on_query: None,
            settings: PopupSettings::default(),
            back_registry: None,
            list_source: None,
        }
    }

    // =========================================================================
    // Show/Hide Operations
    // =========================================================================

    /// Show the popup. See [`PopupLifecycle::show`].
    pub fn show(&self) -> Result<()> {
        self.inner.lifecycle.show()
    }

    pub fn hide(&self) {
        self.inner.lifecycle.hide();
    }

    pub fn dismiss(&self) {
        self.inner.lifecycle.dismiss();
    }

    /// Re-measure the content on the next turn of the queue.
    pub fn request_layout(&self) {
        self.inner.lifecycle.request_layout();
    }

    /// Feed a text edit by hand.
    ///
    /// Used when the text change listener is not attached.
    pub fn handle_text_changed(&self, text: &str) {
        self.inner.handle_text_changed(text);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> PopupState {
        self.inner.lifecycle.state()
    }

    pub fn is_showing(&self) -> bool {
        self.inner.lifecycle.is_showing()
    }

    /// The popup rectangle, only while showing.
    pub fn window_rect(&self) -> Option<Rect> {
        self.inner.lifecycle.window_rect()
    }

    pub fn determined_position(&self) -> VerticalPlacement {
        self.inner.lifecycle.determined_position()
    }

    /// Emitted with the popup rectangle when the popup becomes visible.
    pub fn shown(&self) -> &Signal<Rect> {
        self.inner.lifecycle.shown()
    }

    /// Emitted when a visible popup is dismissed.
    pub fn dismissed(&self) -> &Signal<()> {
        self.inner.lifecycle.dismissed()
    }

    /// The lifecycle driving this window.
    pub fn lifecycle(&self) -> &PopupLifecycle {
        &self.inner.lifecycle
    }

    /// Returns true if a throttled query is waiting to fire.
    pub fn has_pending_query(&self) -> bool {
        self.inner.trigger.lock().has_pending()
    }

    // =========================================================================
    // Live settings
    // =========================================================================

    pub fn margins(&self) -> Margins {
        self.inner.lifecycle.margins()
    }

    /// Replace the margins; negative values are rejected.
    pub fn set_margins(&self, margins: Margins) -> Result<()> {
        self.inner.lifecycle.set_margins(margins)
    }

    pub fn set_vertical_safe_margin(&self, vertical_safe: i32) -> Result<()> {
        self.inner.lifecycle.set_vertical_safe_margin(vertical_safe)
    }

    pub fn gravity(&self) -> Gravity {
        self.inner.lifecycle.gravity()
    }

    pub fn set_gravity(&self, gravity: Gravity) {
        self.inner.lifecycle.set_gravity(gravity);
    }

    pub fn min_characters(&self) -> usize {
        self.inner.trigger.lock().min_characters()
    }

    pub fn set_min_characters(&self, min_characters: usize) {
        self.inner.trigger.lock().set_min_characters(min_characters);
    }

    pub fn set_min_characters_rule(&self, rule: MinCharactersRule) {
        self.inner.trigger.lock().set_rule(rule);
    }

    /// Replace the background; `None` selects the solid white fallback.
    pub fn set_background(&self, background: Option<Background>) {
        self.inner
            .lifecycle
            .set_background(Background::resolve(background));
    }
}

impl WindowInner {
    fn handle_text_changed(self: &Arc<Self>, text: &str) {
        let weak = Arc::downgrade(self);
        let outcome = self.trigger.lock().handle_text(text, move || {
            if let Some(inner) = weak.upgrade() {
                inner.fire_query();
            }
        });

        match outcome.visibility {
            Some(VisibilityRequest::Show) => {
                if let Err(err) = self.lifecycle.show() {
                    tracing::warn!(target: TARGET, %err, "cannot show suggestions");
                }
            }
            Some(VisibilityRequest::Hide) => self.lifecycle.hide(),
            None => {}
        }

        if let QueryDispatch::Immediate(text) = outcome.dispatch {
            tracing::debug!(target: TARGET, %text, "query");
            (self.on_query)(&text);
        }
    }

    /// Run a throttled query with the anchor's current text.
    fn fire_query(&self) {
        let text = self.anchor.text().unwrap_or_default();
        tracing::debug!(target: TARGET, %text, "throttled query");
        (self.on_query)(&text);
    }

    fn handle_focus_changed(&self, focused: bool) {
        if !focused && self.hide_on_blur && self.lifecycle.is_showing() {
            tracing::debug!(target: TARGET, "anchor lost focus, hiding");
            self.lifecycle.hide();
        }
    }

    fn connect_anchor(inner: &Arc<Self>, attach_text_listener: bool) {
        if attach_text_listener {
            if let Some(signal) = inner.anchor.text_changed() {
                let weak: Weak<Self> = Arc::downgrade(inner);
                let id = signal.connect(move |change| {
                    if let Some(inner) = weak.upgrade() {
                        inner.handle_text_changed(&change.text);
                    }
                });
                *inner.text_connection.lock() = Some(id);
            } else {
                tracing::debug!(target: TARGET, "anchor reports no text changes");
            }
        }

        if inner.hide_on_blur {
            if let Some(signal) = inner.anchor.focus_changed() {
                let weak: Weak<Self> = Arc::downgrade(inner);
                let id = signal.connect(move |&focused| {
                    if let Some(inner) = weak.upgrade() {
                        inner.handle_focus_changed(focused);
                    }
                });
                *inner.focus_connection.lock() = Some(id);
            }
        }
    }
}

impl Drop for WindowInner {
    fn drop(&mut self) {
        let text_connection = self.text_connection.get_mut().take();
        let focus_connection = self.focus_connection.get_mut().take();
        if let (Some(id), Some(signal)) = (text_connection, self.anchor.text_changed()) {
            signal.disconnect(id);
        }
        if let (Some(id), Some(signal)) = (focus_connection, self.anchor.focus_changed()) {
            signal.disconnect(id);
        }
    }
}

impl fmt::Debug for SuggestionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuggestionWindow")
            .field("state", &self.state())
            .field("window_rect", &self.window_rect())
            .field("trigger", &*self.inner.trigger.lock())
            .field("hide_on_blur", &self.inner.hide_on_blur)
            .field("bridged", &self.bridge.is_some())
            .finish()
    }
}

static_assertions::assert_impl_all!(SuggestionWindow: Send, Sync);

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`SuggestionWindow`].
#[must_use]
pub struct SuggestionWindowBuilder {
    anchor: Arc<dyn AnchorView>,
    content: Arc<dyn ContentView>,
    surface: Arc<dyn FloatingSurface>,
    scheduler: Arc<SharedTaskScheduler>,
    on_query: Option<QueryCallback>,
    settings: PopupSettings,
    back_registry: Option<Arc<dyn BackNavigationRegistry>>,
    list_source: Option<Arc<ListChangeNotifier>>,
}

impl SuggestionWindowBuilder {
    /// Set the query callback.
    pub fn on_query<F>(mut self, on_query: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_query = Some(Arc::new(on_query));
        self
    }

    /// Replace every setting at once.
    pub fn settings(mut self, settings: PopupSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the background; `None` selects the solid white fallback.
    pub fn background(mut self, background: Option<Background>) -> Self {
        self.settings.background = background;
        self
    }

    pub fn preferred_position(mut self, position: PreferredPosition) -> Self {
        self.settings.preferred_position = position;
        self
    }

    pub fn gravity(mut self, gravity: Gravity) -> Self {
        self.settings.gravity = gravity;
        self
    }

    pub fn hide_on_blur(mut self, hide_on_blur: bool) -> Self {
        self.settings.hide_on_blur = hide_on_blur;
        self
    }

    pub fn constrain_to_anchor_bounds(mut self, constrain: bool) -> Self {
        self.settings.constrain_to_anchor_bounds = constrain;
        self
    }

    pub fn min_characters(mut self, min_characters: usize) -> Self {
        self.settings.min_characters = min_characters;
        self
    }

    pub fn min_characters_rule(mut self, rule: MinCharactersRule) -> Self {
        self.settings.min_characters_rule = rule;
        self
    }

    pub fn attach_text_change_listener(mut self, attach: bool) -> Self {
        self.settings.attach_text_change_listener = attach;
        self
    }

    pub fn query_throttle(mut self, throttle: Duration) -> Self {
        self.settings.query_throttle_ms = u64::try_from(throttle.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn dismiss_on_back_press(mut self, dismiss: bool) -> Self {
        self.settings.dismiss_on_back_press = dismiss;
        self
    }

    pub fn elevation(mut self, elevation: f32) -> Self {
        self.settings.elevation = elevation;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.settings.margins = margins;
        self
    }

    /// Registry used to dismiss the popup on back navigation.
    pub fn back_registry(mut self, registry: Arc<dyn BackNavigationRegistry>) -> Self {
        self.back_registry = Some(registry);
        self
    }

    /// Re-measure the popup whenever this list changes.
    pub fn list_source(mut self, notifier: Arc<ListChangeNotifier>) -> Self {
        self.list_source = Some(notifier);
        self
    }

    /// Validate the settings and create the window.
    pub fn build(self) -> Result<SuggestionWindow> {
        let settings = self.settings;
        settings.validate()?;

        if settings.background.is_none() {
            tracing::debug!(target: TARGET, "no background supplied, using solid white");
        }
        if settings.dismiss_on_back_press && self.back_registry.is_none() {
            tracing::debug!(target: TARGET, "no back registry, back navigation will not dismiss");
        }

        let lifecycle = PopupLifecycle::new(
            self.anchor.clone(),
            self.content,
            self.surface,
            self.scheduler.clone(),
            LifecycleOptions {
                geometry: GeometryConfig {
                    preferred_position: settings.preferred_position,
                    gravity: settings.gravity,
                    constrain_to_anchor_bounds: settings.constrain_to_anchor_bounds,
                    margins: settings.margins,
                },
                background: Background::resolve(settings.background),
                elevation: settings.elevation,
                dismiss_on_back_press: settings.dismiss_on_back_press,
                back_registry: self.back_registry,
            },
        );

        let trigger = ThrottledQueryTrigger::new(self.scheduler, settings.query_throttle())
            .with_min_characters(settings.min_characters)
            .with_rule(settings.min_characters_rule);

        let inner = Arc::new(WindowInner {
            anchor: self.anchor,
            lifecycle,
            trigger: Mutex::new(trigger),
            on_query: self.on_query.unwrap_or_else(|| Arc::new(|_: &str| {})),
            hide_on_blur: settings.hide_on_blur,
            text_connection: Mutex::new(None),
            focus_connection: Mutex::new(None),
        });
        WindowInner::connect_anchor(&inner, settings.attach_text_change_listener);

        let bridge = self
            .list_source
            .map(|source| ListChangeBridge::attach(source, inner.lifecycle.downgrade()));

        tracing::debug!(
            target: TARGET,
            gravity = ?settings.gravity,
            position = ?settings.preferred_position,
            throttle_ms = settings.query_throttle_ms,
            min_characters = settings.min_characters,
            "suggestion window created"
        );
        Ok(SuggestionWindow { inner, bridge })
    }
}
