//! Horizon Suggest - autocomplete suggestion popups for text inputs.
//!
//! A [`SuggestionWindow`] watches a text anchor. As the user types it shows
//! a floating panel next to the anchor, calls a query callback (optionally
//! debounced and gated on a minimum length), and keeps the panel glued to
//! the anchor while it is visible.
//!
//! The crate is toolkit-agnostic: the host supplies the anchor, the content
//! view, the floating surface and the UI task queue through the traits in
//! [`host`]. The [`headless`] module implements all of them in memory.
//!
//! # Modules
//!
//! - [`geometry`]: placement and sizing of the popup rectangle
//! - [`trigger`]: debounce and minimum-length gate for queries
//! - [`lifecycle`]: show/hide state machine and the repositioning tick
//! - [`bridge`]: list changes to relayout requests
//! - [`config`]: serializable settings
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_suggest::headless::HeadlessHost;
//! use horizon_suggest::{ListChangeNotifier, Suggestive};
//!
//! let host = HeadlessHost::new();
//! let results = Arc::new(ListChangeNotifier::new());
//!
//! let results_clone = results.clone();
//! let window = Suggestive::list(
//!     host.anchor.clone(),
//!     host.content.clone(),
//!     host.surface.clone(),
//!     host.scheduler.clone(),
//!     results.clone(),
//! )
//! .min_characters(2)
//! .on_query(move |_text| {
//!     // Fetch results, then tell the list they changed.
//!     results_clone.notify_reset();
//! })
//! .build()
//! .unwrap();
//!
//! host.anchor.set_text("ru");
//! assert!(!window.is_showing());
//! host.anchor.set_text("rus");
//! assert!(window.is_showing());
//! ```

pub mod appearance;
pub mod bridge;
pub mod config;
mod error;
mod factory;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod lifecycle;
pub mod trigger;
mod window;

pub use horizon_suggest_core::{
    Clock, ConnectionId, CoreError, ManualClock, PerfSpan, ScheduledTaskId, SchedulerError,
    SharedTaskScheduler, Signal, SystemClock,
};

pub use appearance::{Background, Color};
pub use bridge::{ChangePayload, LayoutInvalidation, ListChangeBridge, ListChangeNotifier};
pub use config::PopupSettings;
pub use error::{ConfigError, Result, SuggestError};
pub use factory::Suggestive;
pub use geometry::{
    ContentSizing, Gravity, Insets, Margins, PreferredPosition, Rect, Size, VerticalPlacement,
};
pub use host::{AnchorView, BackNavigationRegistry, ContentView, FloatingSurface, RootSurface, TextChange};
pub use lifecycle::{PopupLifecycle, PopupState, WeakPopupLifecycle};
pub use trigger::{MinCharactersRule, ThrottledQueryTrigger};
pub use window::{QueryCallback, SuggestionWindow, SuggestionWindowBuilder};
