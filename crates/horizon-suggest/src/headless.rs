//! In-memory host for headless use and testing.
//!
//! Every host capability has an implementation here that keeps its state in
//! memory and records what the popup did to it. [`HeadlessHost`] bundles one
//! of each with a [`ManualClock`]-driven scheduler, so time only moves when
//! [`HeadlessHost::advance`] is called.
//!
//! # Example
//!
//! ```
//! use horizon_suggest::headless::HeadlessHost;
//! use horizon_suggest::lifecycle::REPOSITION_INTERVAL;
//! use horizon_suggest::SuggestionWindow;
//!
//! let host = HeadlessHost::new();
//! let window = SuggestionWindow::builder(
//!     host.anchor.clone(),
//!     host.content.clone(),
//!     host.surface.clone(),
//!     host.scheduler.clone(),
//! )
//! .build()
//! .unwrap();
//!
//! window.show().unwrap();
//! host.anchor.move_by(0, -30);
//! host.advance(REPOSITION_INTERVAL);
//! assert_eq!(host.surface.record().rect, window.window_rect().unwrap());
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use horizon_suggest_core::{ManualClock, SharedTaskScheduler, Signal};
use parking_lot::Mutex;
use slotmap::SlotMap;

use crate::appearance::Background;
use crate::geometry::{ContentSizing, Insets, Rect, Size};
use crate::host::{
    AnchorView, BackHandler, BackHandlerId, BackNavigationRegistry, ContentContainer, ContentView,
    DismissCallback, FloatingSurface, InsetsCallback, RootSurface, TextChange,
};

// ============================================================================
// Root surface
// ============================================================================

/// A root surface with a configurable visible frame and insets.
pub struct HeadlessRoot {
    frame: Mutex<Rect>,
    insets: Mutex<Insets>,
    deferred: AtomicBool,
    pending: Mutex<Vec<InsetsCallback>>,
}

impl HeadlessRoot {
    pub fn new(frame: Rect, insets: Insets) -> Self {
        Self {
            frame: Mutex::new(frame),
            insets: Mutex::new(insets),
            deferred: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn set_visible_frame(&self, frame: Rect) {
        *self.frame.lock() = frame;
    }

    pub fn set_stable_insets(&self, insets: Insets) {
        *self.insets.lock() = insets;
    }

    /// Hold insets requests until [`deliver_pending_insets`](Self::deliver_pending_insets).
    ///
    /// By default requests are answered synchronously.
    pub fn set_deferred_insets(&self, deferred: bool) {
        self.deferred.store(deferred, Ordering::SeqCst);
    }

    /// Answer every held insets request. Returns how many were answered.
    pub fn deliver_pending_insets(&self) -> usize {
        let callbacks = std::mem::take(&mut *self.pending.lock());
        let insets = *self.insets.lock();
        let count = callbacks.len();
        for callback in callbacks {
            callback(insets);
        }
        count
    }
}

impl RootSurface for HeadlessRoot {
    fn visible_display_rect(&self) -> Rect {
        *self.frame.lock()
    }

    fn request_apply_insets(&self, callback: InsetsCallback) {
        if self.deferred.load(Ordering::SeqCst) {
            self.pending.lock().push(callback);
        } else {
            let insets = *self.insets.lock();
            callback(insets);
        }
    }
}

// ============================================================================
// Anchor
// ============================================================================

/// A text field anchor.
pub struct HeadlessAnchor {
    rect: Mutex<Rect>,
    root: Mutex<Option<Arc<dyn RootSurface>>>,
    text: Mutex<String>,
    focused: AtomicBool,
    text_changed: Signal<TextChange>,
    focus_changed: Signal<bool>,
}

impl HeadlessAnchor {
    /// Create a focused, empty anchor attached to `root`.
    pub fn new(rect: Rect, root: Arc<dyn RootSurface>) -> Self {
        Self {
            rect: Mutex::new(rect),
            root: Mutex::new(Some(root)),
            text: Mutex::new(String::new()),
            focused: AtomicBool::new(true),
            text_changed: Signal::new(),
            focus_changed: Signal::new(),
        }
    }

    pub fn set_rect(&self, rect: Rect) {
        *self.rect.lock() = rect;
    }

    /// Move the anchor, as a keyboard or scroll would.
    pub fn move_by(&self, dx: i32, dy: i32) {
        let mut rect = self.rect.lock();
        *rect = rect.offset(dx, dy);
    }

    /// Remove the anchor from its root surface.
    pub fn detach(&self) {
        *self.root.lock() = None;
    }

    pub fn attach(&self, root: Arc<dyn RootSurface>) {
        *self.root.lock() = Some(root);
    }

    /// Replace the text and emit a text change.
    pub fn set_text(&self, text: &str) {
        *self.text.lock() = text.to_owned();
        self.text_changed
            .emit(TextChange::new(text, 0, text.chars().count()));
    }

    /// Replace the text without notifying listeners.
    pub fn set_text_silently(&self, text: &str) {
        *self.text.lock() = text.to_owned();
    }

    pub fn set_focused(&self, focused: bool) {
        if self.focused.swap(focused, Ordering::SeqCst) != focused {
            self.focus_changed.emit(focused);
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    pub fn text_changed_signal(&self) -> &Signal<TextChange> {
        &self.text_changed
    }

    pub fn focus_changed_signal(&self) -> &Signal<bool> {
        &self.focus_changed
    }
}

impl AnchorView for HeadlessAnchor {
    fn screen_rect(&self) -> Rect {
        *self.rect.lock()
    }

    fn root(&self) -> Option<Arc<dyn RootSurface>> {
        self.root.lock().clone()
    }

    fn text(&self) -> Option<String> {
        Some(self.text.lock().clone())
    }

    fn text_changed(&self) -> Option<&Signal<TextChange>> {
        Some(&self.text_changed)
    }

    fn focus_changed(&self) -> Option<&Signal<bool>> {
        Some(&self.focus_changed)
    }
}

// ============================================================================
// Content
// ============================================================================

/// Content with a fixed natural size.
pub struct HeadlessContent {
    natural: Mutex<Size>,
    sizing: Mutex<(ContentSizing, ContentSizing)>,
    measure_count: AtomicUsize,
    last_constraints: Mutex<Option<(i32, i32)>>,
}

impl HeadlessContent {
    pub fn new(natural: Size) -> Self {
        Self {
            natural: Mutex::new(natural),
            sizing: Mutex::new((ContentSizing::Natural, ContentSizing::Natural)),
            measure_count: AtomicUsize::new(0),
            last_constraints: Mutex::new(None),
        }
    }

    pub fn set_natural_size(&self, size: Size) {
        *self.natural.lock() = size;
    }

    pub fn set_sizing(&self, width: ContentSizing, height: ContentSizing) {
        *self.sizing.lock() = (width, height);
    }

    /// How many times the content was measured.
    pub fn measure_count(&self) -> usize {
        self.measure_count.load(Ordering::SeqCst)
    }

    /// The `(max_width, max_height)` of the last measurement.
    pub fn last_constraints(&self) -> Option<(i32, i32)> {
        *self.last_constraints.lock()
    }
}

impl ContentView for HeadlessContent {
    fn measure(&self, max_width: i32, max_height: i32) -> Size {
        self.measure_count.fetch_add(1, Ordering::SeqCst);
        *self.last_constraints.lock() = Some((max_width, max_height));
        let natural = *self.natural.lock();
        Size::new(natural.width.min(max_width), natural.height.min(max_height))
    }

    fn width_sizing(&self) -> ContentSizing {
        self.sizing.lock().0
    }

    fn height_sizing(&self) -> ContentSizing {
        self.sizing.lock().1
    }
}

// ============================================================================
// Floating surface
// ============================================================================

/// What a [`HeadlessSurface`] has been told.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceRecord {
    pub showing: bool,
    pub rect: Rect,
    pub background: Option<Background>,
    pub elevation: f32,
    pub outside_touchable: bool,
    pub container: Option<ContentContainer>,
    pub show_count: usize,
    pub update_count: usize,
    pub dismiss_count: usize,
}

/// A floating surface that records positions instead of drawing.
#[derive(Default)]
pub struct HeadlessSurface {
    record: Mutex<SurfaceRecord>,
    on_dismiss: Mutex<Option<DismissCallback>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the recorded state.
    pub fn record(&self) -> SurfaceRecord {
        self.record.lock().clone()
    }

    /// Dismiss as an outside touch would.
    pub fn dismiss_externally(&self) {
        self.dismiss();
    }

    pub fn has_dismiss_hook(&self) -> bool {
        self.on_dismiss.lock().is_some()
    }
}

impl FloatingSurface for HeadlessSurface {
    fn set_background(&self, background: &Background) {
        self.record.lock().background = Some(*background);
    }

    fn set_elevation(&self, elevation: f32) {
        self.record.lock().elevation = elevation;
    }

    fn set_outside_touchable(&self, touchable: bool) {
        self.record.lock().outside_touchable = touchable;
    }

    fn set_content(&self, _content: Arc<dyn ContentView>, container: ContentContainer) {
        self.record.lock().container = Some(container);
    }

    fn show_at(&self, rect: Rect) {
        let mut record = self.record.lock();
        record.showing = true;
        record.rect = rect;
        record.show_count += 1;
    }

    fn update(&self, rect: Rect) {
        let mut record = self.record.lock();
        if record.showing {
            record.rect = rect;
            record.update_count += 1;
        }
    }

    fn dismiss(&self) {
        {
            let mut record = self.record.lock();
            if !record.showing {
                return;
            }
            record.showing = false;
            record.dismiss_count += 1;
        }
        let hook = self.on_dismiss.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn is_showing(&self) -> bool {
        self.record.lock().showing
    }

    fn set_on_dismiss(&self, callback: Option<DismissCallback>) {
        *self.on_dismiss.lock() = callback;
    }
}

// ============================================================================
// Back navigation
// ============================================================================

struct BackEntry {
    id: BackHandlerId,
    enabled: bool,
    handler: BackHandler,
}

#[derive(Default)]
struct BackEntries {
    ids: SlotMap<BackHandlerId, ()>,
    stack: Vec<BackEntry>,
}

/// A back-navigation registry; the latest enabled handler wins.
#[derive(Default)]
pub struct HeadlessBackRegistry {
    entries: Mutex<BackEntries>,
}

impl HeadlessBackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a back press.
    ///
    /// Returns true if a handler consumed it.
    pub fn press_back(&self) -> bool {
        let handler = {
            let entries = self.entries.lock();
            entries
                .stack
                .iter()
                .rev()
                .find(|entry| entry.enabled)
                .map(|entry| entry.handler.clone())
        };
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    pub fn set_enabled(&self, id: BackHandlerId, enabled: bool) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.stack.iter_mut().find(|entry| entry.id == id) {
            entry.enabled = enabled;
        }
    }

    pub fn handler_count(&self) -> usize {
        self.entries.lock().stack.len()
    }
}

impl BackNavigationRegistry for HeadlessBackRegistry {
    fn register(&self, enabled: bool, handler: BackHandler) -> BackHandlerId {
        let mut entries = self.entries.lock();
        let id = entries.ids.insert(());
        entries.stack.push(BackEntry {
            id,
            enabled,
            handler,
        });
        id
    }

    fn unregister(&self, id: BackHandlerId) {
        let removed = {
            let mut entries = self.entries.lock();
            entries.ids.remove(id);
            let position = entries.stack.iter().position(|entry| entry.id == id);
            position.map(|index| entries.stack.remove(index))
        };
        // The handler may own the last reference to its popup.
        drop(removed);
    }
}

// ============================================================================
// Host bundle
// ============================================================================

/// Initial geometry of a [`HeadlessHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessConfig {
    pub visible_frame: Rect,
    pub stable_insets: Insets,
    pub anchor_rect: Rect,
    pub content_size: Size,
}

impl Default for HeadlessConfig {
    /// A 1080x1920 portrait display with a text field in its upper half.
    fn default() -> Self {
        Self {
            visible_frame: Rect::new(0, 0, 1080, 1920),
            stable_insets: Insets::new(0, 63, 0, 126),
            anchor_rect: Rect::new(100, 400, 980, 520),
            content_size: Size::new(600, 500),
        }
    }
}

/// One of every headless capability, sharing a manual clock.
pub struct HeadlessHost {
    pub clock: ManualClock,
    pub scheduler: Arc<SharedTaskScheduler>,
    pub root: Arc<HeadlessRoot>,
    pub anchor: Arc<HeadlessAnchor>,
    pub content: Arc<HeadlessContent>,
    pub surface: Arc<HeadlessSurface>,
    pub back: Arc<HeadlessBackRegistry>,
}

impl HeadlessHost {
    /// Create a host with [`HeadlessConfig::default`].
    pub fn new() -> Self {
        Self::with_config(HeadlessConfig::default())
    }

    pub fn with_config(config: HeadlessConfig) -> Self {
        let clock = ManualClock::new();
        let scheduler = Arc::new(SharedTaskScheduler::with_clock(Arc::new(clock.clone())));
        let root = Arc::new(HeadlessRoot::new(config.visible_frame, config.stable_insets));
        let anchor = Arc::new(HeadlessAnchor::new(config.anchor_rect, root.clone()));
        Self {
            clock,
            scheduler,
            root,
            anchor,
            content: Arc::new(HeadlessContent::new(config.content_size)),
            surface: Arc::new(HeadlessSurface::new()),
            back: Arc::new(HeadlessBackRegistry::new()),
        }
    }

    /// Move time forward and run every task that became due.
    pub fn advance(&self, duration: Duration) -> usize {
        self.clock.advance(duration);
        self.scheduler.process_ready()
    }

    /// Run due tasks without moving time.
    pub fn run_pending(&self) -> usize {
        self.scheduler.process_ready()
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(HeadlessAnchor: Send, Sync);
static_assertions::assert_impl_all!(HeadlessSurface: Send, Sync);
static_assertions::assert_impl_all!(HeadlessBackRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_defers_insets() {
        let root = HeadlessRoot::new(Rect::new(0, 0, 100, 100), Insets::new(0, 5, 0, 5));
        let received = Arc::new(Mutex::new(None));

        root.set_deferred_insets(true);
        let received_clone = received.clone();
        root.request_apply_insets(Box::new(move |insets| {
            *received_clone.lock() = Some(insets);
        }));
        assert!(received.lock().is_none());

        assert_eq!(root.deliver_pending_insets(), 1);
        assert_eq!(*received.lock(), Some(Insets::new(0, 5, 0, 5)));
        assert_eq!(root.deliver_pending_insets(), 0);
    }

    #[test]
    fn test_content_measures_at_most() {
        let content = HeadlessContent::new(Size::new(300, 400));
        assert_eq!(content.measure(200, 1000), Size::new(200, 400));
        assert_eq!(content.last_constraints(), Some((200, 1000)));
        assert_eq!(content.measure_count(), 1);
    }

    #[test]
    fn test_surface_dismiss_hook_fires_once() {
        let surface = HeadlessSurface::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        surface.set_on_dismiss(Some(Arc::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })));

        surface.dismiss();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        surface.show_at(Rect::new(0, 0, 10, 10));
        surface.dismiss_externally();
        surface.dismiss();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(surface.record().dismiss_count, 1);
    }

    #[test]
    fn test_back_registry_latest_enabled_wins() {
        let registry = HeadlessBackRegistry::new();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let hits_first = hits.clone();
        registry.register(true, Arc::new(move || hits_first.lock().push(1)));
        let hits_second = hits.clone();
        let second = registry.register(true, Arc::new(move || hits_second.lock().push(2)));

        assert!(registry.press_back());
        registry.set_enabled(second, false);
        assert!(registry.press_back());
        registry.unregister(second);

        assert_eq!(*hits.lock(), vec![2, 1]);
        assert_eq!(registry.handler_count(), 1);
    }

    #[test]
    fn test_anchor_focus_only_emits_changes() {
        let host = HeadlessHost::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        host.anchor
            .focus_changed_signal()
            .connect(move |&focused| events_clone.lock().push(focused));

        host.anchor.set_focused(true);
        host.anchor.set_focused(false);
        host.anchor.set_focused(false);
        assert_eq!(*events.lock(), vec![false]);
    }
}
