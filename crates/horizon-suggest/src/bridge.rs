//! List change bridge.
//!
//! A list-backed content view announces changes to its items through a
//! [`ListChangeNotifier`]. The [`ListChangeBridge`] listens to every kind of
//! change and asks the popup to re-measure, so the popup grows and shrinks
//! with its result list.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use horizon_suggest_core::{ConnectionId, Signal};

use crate::lifecycle::{PopupLifecycle, WeakPopupLifecycle};

const TARGET: &str = horizon_suggest_core::logging::targets::BRIDGE;

/// Opaque payload attached to a partial item change.
pub type ChangePayload = Arc<dyn Any + Send + Sync>;

/// Signals emitted by a list-backed content view.
///
/// Ranges are `(start, count)` in item positions.
pub struct ListChangeNotifier {
    /// Emitted after the whole list was replaced.
    pub reset: Signal<()>,

    /// Emitted after items were removed.
    /// Args: (start, count)
    pub range_removed: Signal<(usize, usize)>,

    /// Emitted after items were moved.
    /// Args: (from, to, count)
    pub range_moved: Signal<(usize, usize, usize)>,

    /// Emitted after items were inserted.
    /// Args: (start, count)
    pub range_inserted: Signal<(usize, usize)>,

    /// Emitted after items changed in place.
    /// Args: (start, count, payload)
    pub range_changed: Signal<(usize, usize, Option<ChangePayload>)>,
}

impl Default for ListChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ListChangeNotifier {
    pub fn new() -> Self {
        Self {
            reset: Signal::new(),
            range_removed: Signal::new(),
            range_moved: Signal::new(),
            range_inserted: Signal::new(),
            range_changed: Signal::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Convenience methods for emitting signals
    // -------------------------------------------------------------------------

    pub fn notify_reset(&self) {
        self.reset.emit(());
    }

    pub fn notify_range_removed(&self, start: usize, count: usize) {
        self.range_removed.emit((start, count));
    }

    pub fn notify_range_moved(&self, from: usize, to: usize, count: usize) {
        self.range_moved.emit((from, to, count));
    }

    pub fn notify_range_inserted(&self, start: usize, count: usize) {
        self.range_inserted.emit((start, count));
    }

    pub fn notify_range_changed(&self, start: usize, count: usize) {
        self.range_changed.emit((start, count, None));
    }

    pub fn notify_range_changed_with_payload(&self, start: usize, count: usize, payload: ChangePayload) {
        self.range_changed.emit((start, count, Some(payload)));
    }

    /// Total number of connected slots across all signals.
    pub fn connection_count(&self) -> usize {
        self.reset.connection_count()
            + self.range_removed.connection_count()
            + self.range_moved.connection_count()
            + self.range_inserted.connection_count()
            + self.range_changed.connection_count()
    }
}

impl fmt::Debug for ListChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListChangeNotifier")
            .field("connection_count", &self.connection_count())
            .finish()
    }
}

/// Something that can be told its layout is stale.
pub trait LayoutInvalidation: Send + Sync {
    fn request_layout(&self);
}

impl LayoutInvalidation for PopupLifecycle {
    fn request_layout(&self) {
        PopupLifecycle::request_layout(self);
    }
}

impl LayoutInvalidation for WeakPopupLifecycle {
    fn request_layout(&self) {
        WeakPopupLifecycle::request_layout(self);
    }
}

struct BridgeConnections {
    reset: ConnectionId,
    removed: ConnectionId,
    moved: ConnectionId,
    inserted: ConnectionId,
    changed: ConnectionId,
}

/// Forwards every list change to [`LayoutInvalidation::request_layout`].
///
/// The bridge stays connected until it is dropped.
pub struct ListChangeBridge {
    source: Arc<ListChangeNotifier>,
    connections: BridgeConnections,
}

impl ListChangeBridge {
    /// Connect `target` to every signal of `source`.
    pub fn attach<T>(source: Arc<ListChangeNotifier>, target: T) -> Self
    where
        T: LayoutInvalidation + 'static,
    {
        let target = Arc::new(target);
        let invalidate = move |kind: &'static str| {
            let target = target.clone();
            move || {
                tracing::trace!(target: TARGET, kind, "list changed, requesting layout");
                target.request_layout();
            }
        };

        let on_reset = invalidate("reset");
        let on_removed = invalidate("range_removed");
        let on_moved = invalidate("range_moved");
        let on_inserted = invalidate("range_inserted");
        let on_changed = invalidate("range_changed");

        let connections = BridgeConnections {
            reset: source.reset.connect(move |_| on_reset()),
            removed: source.range_removed.connect(move |_| on_removed()),
            moved: source.range_moved.connect(move |_| on_moved()),
            inserted: source.range_inserted.connect(move |_| on_inserted()),
            changed: source.range_changed.connect(move |_| on_changed()),
        };
        tracing::debug!(target: TARGET, "list bridge attached");

        Self {
            source,
            connections,
        }
    }

    /// The notifier this bridge listens to.
    pub fn source(&self) -> &Arc<ListChangeNotifier> {
        &self.source
    }
}

impl Drop for ListChangeBridge {
    fn drop(&mut self) {
        self.source.reset.disconnect(self.connections.reset);
        self.source.range_removed.disconnect(self.connections.removed);
        self.source.range_moved.disconnect(self.connections.moved);
        self.source.range_inserted.disconnect(self.connections.inserted);
        self.source.range_changed.disconnect(self.connections.changed);
        tracing::debug!(target: TARGET, "list bridge detached");
    }
}

impl fmt::Debug for ListChangeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListChangeBridge")
            .field("source", &self.source)
            .finish()
    }
}

static_assertions::assert_impl_all!(ListChangeNotifier: Send, Sync);
static_assertions::assert_impl_all!(ListChangeBridge: Send, Sync);
