//! Popup lifecycle.
//!
//! [`PopupLifecycle`] owns the geometry state of one popup and drives the
//! floating surface through its states:
//!
//! ```text
//!            show()                 insets delivered
//!  Hidden ───────────▶ (awaiting) ───────────────────▶ Showing
//!    ▲                     │                              │
//!    └─────────────────────┴──── dismiss() / hide() ──────┘
//!                              external dismissal
//!                              back navigation
//! ```
//!
//! While showing, a repeating task on the UI queue recomputes the geometry
//! sixty times per second and moves the surface, so the popup follows its
//! anchor when the keyboard or a scroll shifts it. The tick is cancelled on
//! every path back to `Hidden`.
//!
//! Every closure handed to the scheduler, the root surface, the floating
//! surface or the back registry holds a weak reference and does nothing once
//! the lifecycle is dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use horizon_suggest_core::{PerfSpan, ScheduledTaskId, SharedTaskScheduler, Signal};
use parking_lot::Mutex;

use crate::appearance::Background;
use crate::error::{Result, SuggestError};
use crate::geometry::{
    Gravity, GeometryConfig, GeometryState, Insets, Margins, Rect, VerticalPlacement,
};
use crate::host::{
    AnchorView, BackHandlerId, BackNavigationRegistry, ContentContainer, ContentView,
    FloatingSurface,
};

const TARGET: &str = horizon_suggest_core::logging::targets::LIFECYCLE;

/// Interval of the repositioning tick (60 per second).
pub const REPOSITION_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Elevation applied to the surface on show.
pub const DEFAULT_ELEVATION: f32 = 8.0;

/// Observable popup state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PopupState {
    #[default]
    Hidden,
    Showing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Hidden,
    /// `show()` was called and the root surface has not delivered insets yet.
    AwaitingInsets,
    Showing,
}

/// Construction options of a [`PopupLifecycle`].
#[derive(Clone)]
pub struct LifecycleOptions {
    pub geometry: GeometryConfig,
    pub background: Background,
    pub elevation: f32,
    pub dismiss_on_back_press: bool,
    pub back_registry: Option<Arc<dyn BackNavigationRegistry>>,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            geometry: GeometryConfig {
                constrain_to_anchor_bounds: true,
                ..GeometryConfig::default()
            },
            background: Background::default(),
            elevation: DEFAULT_ELEVATION,
            dismiss_on_back_press: true,
            back_registry: None,
        }
    }
}

struct LifecycleState {
    phase: Phase,
    /// Bumped by every `show()`; stale insets callbacks compare against it.
    show_cycle: u64,
    geometry: GeometryState,
    background: Background,
    tick: Option<ScheduledTaskId>,
    relayout: Option<ScheduledTaskId>,
    back_handler: Option<BackHandlerId>,
}

struct LifecycleInner {
    anchor: Arc<dyn AnchorView>,
    content: Arc<dyn ContentView>,
    surface: Arc<dyn FloatingSurface>,
    scheduler: Arc<SharedTaskScheduler>,
    back_registry: Option<Arc<dyn BackNavigationRegistry>>,
    dismiss_on_back_press: bool,
    elevation: f32,
    state: Mutex<LifecycleState>,
    shown: Signal<Rect>,
    dismissed: Signal<()>,
}

/// The show/hide state machine of one popup.
///
/// Cloning yields another handle to the same popup.
#[derive(Clone)]
pub struct PopupLifecycle {
    inner: Arc<LifecycleInner>,
}

/// A weak handle to a [`PopupLifecycle`].
#[derive(Clone, Default)]
pub struct WeakPopupLifecycle {
    inner: Weak<LifecycleInner>,
}

impl PopupLifecycle {
    /// Create a hidden popup over the given host capabilities.
    pub fn new(
        anchor: Arc<dyn AnchorView>,
        content: Arc<dyn ContentView>,
        surface: Arc<dyn FloatingSurface>,
        scheduler: Arc<SharedTaskScheduler>,
        options: LifecycleOptions,
    ) -> Self {
        let inner = Arc::new(LifecycleInner {
            anchor,
            content,
            surface,
            scheduler,
            back_registry: options.back_registry,
            dismiss_on_back_press: options.dismiss_on_back_press,
            elevation: options.elevation,
            state: Mutex::new(LifecycleState {
                phase: Phase::Hidden,
                show_cycle: 0,
                geometry: GeometryState::new(options.geometry),
                background: options.background,
                tick: None,
                relayout: None,
                back_handler: None,
            }),
            shown: Signal::new(),
            dismissed: Signal::new(),
        });

        let weak = Arc::downgrade(&inner);
        inner.surface.set_on_dismiss(Some(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!(target: TARGET, "surface dismissed externally");
                inner.dismiss(false);
            }
        })));

        Self { inner }
    }

    /// Create a weak handle.
    pub fn downgrade(&self) -> WeakPopupLifecycle {
        WeakPopupLifecycle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Show the popup.
    ///
    /// Applies the chrome, attaches the content and waits for the root
    /// surface to deliver its insets; the surface is positioned and the
    /// repositioning tick started from that callback. Does nothing if the
    /// popup is already showing or waiting for insets.
    ///
    /// # Errors
    ///
    /// [`SuggestError::AnchorDetached`] if the anchor has no root surface.
    pub fn show(&self) -> Result<()> {
        self.inner.show()
    }

    /// Hide the popup. Same as [`dismiss`](Self::dismiss).
    pub fn hide(&self) {
        self.dismiss();
    }

    /// Dismiss the popup and stop repositioning.
    pub fn dismiss(&self) {
        self.inner.dismiss(true);
    }

    /// Re-measure the content and reposition on the next turn of the queue.
    ///
    /// A request still waiting to run is replaced, so at most one is pending.
    pub fn request_layout(&self) {
        self.inner.request_layout();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> PopupState {
        match self.inner.state.lock().phase {
            Phase::Showing => PopupState::Showing,
            Phase::Hidden | Phase::AwaitingInsets => PopupState::Hidden,
        }
    }

    pub fn is_showing(&self) -> bool {
        self.state() == PopupState::Showing
    }

    /// Returns true between `show()` and the delivery of the insets.
    pub fn is_show_pending(&self) -> bool {
        self.inner.state.lock().phase == Phase::AwaitingInsets
    }

    /// Returns true if a relayout is scheduled and has not run yet.
    pub fn has_pending_layout(&self) -> bool {
        let relayout = self.inner.state.lock().relayout;
        relayout.is_some_and(|id| self.inner.scheduler.is_active(id))
    }

    /// The popup rectangle, only while showing.
    pub fn window_rect(&self) -> Option<Rect> {
        let state = self.inner.state.lock();
        (state.phase == Phase::Showing).then(|| state.geometry.window_rect())
    }

    /// The vertical placement chosen by the last recompute.
    pub fn determined_position(&self) -> VerticalPlacement {
        self.inner.state.lock().geometry.determined_position()
    }

    /// A snapshot of the geometry state.
    pub fn geometry(&self) -> GeometryState {
        self.inner.state.lock().geometry.clone()
    }

    /// Emitted with the popup rectangle when the popup becomes visible.
    pub fn shown(&self) -> &Signal<Rect> {
        &self.inner.shown
    }

    /// Emitted when a visible popup is dismissed, whatever the cause.
    pub fn dismissed(&self) -> &Signal<()> {
        &self.inner.dismissed
    }

    pub fn anchor(&self) -> &Arc<dyn AnchorView> {
        &self.inner.anchor
    }

    // =========================================================================
    // Live settings
    // =========================================================================

    pub fn margins(&self) -> Margins {
        self.inner.state.lock().geometry.config().margins
    }

    /// Replace the margins. Takes effect on the next recompute.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`](crate::ConfigError::Invalid) if any margin is
    /// negative; the current margins are kept.
    pub fn set_margins(&self, margins: Margins) -> Result<()> {
        margins.validate()?;
        self.inner.state.lock().geometry.config_mut().margins = margins;
        Ok(())
    }

    /// Replace only the vertical safe margin. Fails like
    /// [`set_margins`](Self::set_margins).
    pub fn set_vertical_safe_margin(&self, vertical_safe: i32) -> Result<()> {
        let mut state = self.inner.state.lock();
        let margins = state.geometry.config().margins.with_vertical_safe(vertical_safe);
        margins.validate()?;
        state.geometry.config_mut().margins = margins;
        Ok(())
    }

    pub fn gravity(&self) -> Gravity {
        self.inner.state.lock().geometry.config().gravity
    }

    pub fn set_gravity(&self, gravity: Gravity) {
        self.inner.state.lock().geometry.config_mut().gravity = gravity;
    }

    pub fn background(&self) -> Background {
        self.inner.state.lock().background
    }

    /// Replace the background. A showing surface is updated right away.
    pub fn set_background(&self, background: Background) {
        let showing = {
            let mut state = self.inner.state.lock();
            state.background = background;
            state.phase == Phase::Showing
        };
        if showing {
            self.inner.surface.set_background(&background);
        }
    }
}

impl WeakPopupLifecycle {
    /// Upgrade to a strong handle if the popup is still alive.
    pub fn upgrade(&self) -> Option<PopupLifecycle> {
        self.inner.upgrade().map(|inner| PopupLifecycle { inner })
    }

    /// Forward to [`PopupLifecycle::request_layout`]; no-op once dropped.
    pub fn request_layout(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.request_layout();
        }
    }
}

impl LifecycleInner {
    #[tracing::instrument(skip_all, target = "horizon_suggest::lifecycle", level = "debug")]
    fn show(self: &Arc<Self>) -> Result<()> {
        let (root, background, cycle) = {
            let mut state = self.state.lock();
            if state.phase != Phase::Hidden {
                tracing::trace!(target: TARGET, phase = ?state.phase, "show ignored");
                return Ok(());
            }
            let root = self.anchor.root().ok_or(SuggestError::AnchorDetached)?;
            state.phase = Phase::AwaitingInsets;
            state.show_cycle += 1;
            (root, state.background, state.show_cycle)
        };

        self.surface.set_background(&background);
        self.surface.set_elevation(self.elevation);
        self.surface.set_outside_touchable(true);
        self.surface
            .set_content(self.content.clone(), ContentContainer::default());

        tracing::debug!(target: TARGET, cycle, "waiting for insets");
        let weak = Arc::downgrade(self);
        root.request_apply_insets(Box::new(move |insets| {
            if let Some(inner) = weak.upgrade() {
                inner.on_insets_applied(cycle, insets);
            }
        }));
        Ok(())
    }

    fn on_insets_applied(self: &Arc<Self>, cycle: u64, insets: Insets) {
        let recomputed = {
            let mut state = self.state.lock();
            if state.phase != Phase::AwaitingInsets || state.show_cycle != cycle {
                tracing::trace!(target: TARGET, cycle, "stale insets ignored");
                return;
            }
            state.geometry.set_stable_insets(insets);
            let _span = PerfSpan::new("popup_recompute");
            let result = state.geometry.recompute(&*self.anchor, &*self.content);
            if result.is_err() {
                state.phase = Phase::Hidden;
            }
            result
        };
        let rect = match recomputed {
            Ok(rect) => rect,
            Err(err) => {
                tracing::warn!(target: TARGET, %err, "popup not shown");
                return;
            }
        };

        self.surface.show_at(rect);
        let back_handler = self.register_back_handler();

        let mut state = self.state.lock();
        if state.phase != Phase::AwaitingInsets || state.show_cycle != cycle {
            // Dismissed while the surface was being shown.
            drop(state);
            self.unregister_back_handler(back_handler);
            return;
        }
        let weak = Arc::downgrade(self);
        state.tick = Some(self.scheduler.schedule_repeating(REPOSITION_INTERVAL, move || {
            if let Some(inner) = weak.upgrade() {
                inner.reposition();
            }
        }));
        state.back_handler = back_handler;
        state.phase = Phase::Showing;
        drop(state);

        tracing::debug!(target: TARGET, ?rect, ?insets, "popup shown");
        self.shown.emit(rect);
    }

    fn register_back_handler(self: &Arc<Self>) -> Option<BackHandlerId> {
        if !self.dismiss_on_back_press {
            return None;
        }
        let registry = self.back_registry.as_ref()?;
        let weak = Arc::downgrade(self);
        Some(registry.register(
            true,
            Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    tracing::debug!(target: TARGET, "back navigation intercepted");
                    inner.dismiss(true);
                }
            }),
        ))
    }

    fn unregister_back_handler(&self, id: Option<BackHandlerId>) {
        if let (Some(id), Some(registry)) = (id, self.back_registry.as_ref()) {
            registry.unregister(id);
        }
    }

    /// Recompute and move the surface; dismisses if the anchor was detached.
    fn reposition(&self) {
        let recomputed = {
            let mut state = self.state.lock();
            if state.phase != Phase::Showing {
                return;
            }
            let _span = PerfSpan::new("popup_recompute");
            state.geometry.recompute(&*self.anchor, &*self.content)
        };
        match recomputed {
            Ok(rect) => self.surface.update(rect),
            Err(err) => {
                tracing::warn!(target: TARGET, %err, "dismissing popup");
                self.dismiss(true);
            }
        }
    }

    fn request_layout(self: &Arc<Self>) {
        let mut state = self.state.lock();
        state.geometry.request_layout();
        if let Some(previous) = state.relayout.take() {
            let _ = self.scheduler.cancel(previous);
        }
        let weak = Arc::downgrade(self);
        let id = self.scheduler.schedule_once(Duration::ZERO, move || {
            if let Some(inner) = weak.upgrade() {
                inner.state.lock().relayout = None;
                inner.reposition();
            }
        });
        state.relayout = Some(id);
        tracing::trace!(target: TARGET, ?id, "layout requested");
    }

    /// Move to `Hidden`, stopping every task bound to the showing state.
    ///
    /// `dismiss_surface` is false when the surface itself reported the
    /// dismissal.
    fn dismiss(&self, dismiss_surface: bool) {
        let (previous, tasks, back_handler) = {
            let mut state = self.state.lock();
            let previous = std::mem::replace(&mut state.phase, Phase::Hidden);
            (
                previous,
                [state.tick.take(), state.relayout.take()],
                state.back_handler.take(),
            )
        };

        for id in tasks.into_iter().flatten() {
            let _ = self.scheduler.cancel(id);
        }
        self.unregister_back_handler(back_handler);
        if dismiss_surface {
            self.surface.dismiss();
        }

        match previous {
            Phase::Showing => {
                tracing::debug!(target: TARGET, "popup dismissed");
                self.dismissed.emit(());
            }
            Phase::AwaitingInsets => {
                tracing::debug!(target: TARGET, "pending show abandoned");
            }
            Phase::Hidden => {}
        }
    }
}

impl Drop for LifecycleInner {
    fn drop(&mut self) {
        self.surface.set_on_dismiss(None);
        let (phase, tasks, back_handler) = {
            let state = self.state.get_mut();
            (
                state.phase,
                [state.tick.take(), state.relayout.take()],
                state.back_handler.take(),
            )
        };
        for id in tasks.into_iter().flatten() {
            let _ = self.scheduler.cancel(id);
        }
        self.unregister_back_handler(back_handler);
        if phase != Phase::Hidden {
            self.surface.dismiss();
        }
    }
}

static_assertions::assert_impl_all!(PopupLifecycle: Send, Sync);
static_assertions::assert_impl_all!(WeakPopupLifecycle: Send, Sync);
