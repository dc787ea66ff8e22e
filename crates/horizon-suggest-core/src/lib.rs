//! Core systems for Horizon Suggest.
//!
//! This crate provides the plumbing the suggestion popup runs on:
//!
//! - **Scheduler**: a UI task queue with cancelable one-shot and repeating tasks
//! - **Clocks**: the time source behind the scheduler, with a manual clock for tests
//! - **Signal/Slot System**: type-safe notifications between components
//! - **Logging**: `tracing` targets and a performance span guard
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use horizon_suggest_core::{ManualClock, SharedTaskScheduler, Signal};
//!
//! let clock = ManualClock::new();
//! let queue = Arc::new(SharedTaskScheduler::with_clock(Arc::new(clock.clone())));
//!
//! let changed = Arc::new(Signal::<String>::new());
//! let queue_clone = queue.clone();
//! changed.connect(move |text| {
//!     let text = text.clone();
//!     queue_clone.schedule_once(Duration::from_millis(100), move || {
//!         println!("query for {text}");
//!     });
//! });
//!
//! changed.emit("abc".to_string());
//! clock.advance(Duration::from_millis(100));
//! assert_eq!(queue.process_ready(), 1);
//! ```

mod clock;
mod error;
pub mod logging;
mod scheduler;
pub mod signal;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result, SchedulerError, SignalError};
pub use logging::PerfSpan;
pub use scheduler::{ScheduledTaskId, ScheduledTaskKind, SharedTaskScheduler, TaskScheduler};
pub use signal::{ConnectionId, Signal};
