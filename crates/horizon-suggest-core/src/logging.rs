//! Logging facilities for Horizon Suggest.
//!
//! Horizon Suggest uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_suggest=debug")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_suggest_core";
    /// Timing spans of hot paths.
    pub const PERF: &str = "horizon_suggest::perf";
    /// Scheduler target.
    pub const SCHEDULER: &str = "horizon_suggest_core::scheduler";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_suggest_core::signal";
    /// Popup geometry engine target.
    pub const GEOMETRY: &str = "horizon_suggest::geometry";
    /// Throttled query trigger target.
    pub const TRIGGER: &str = "horizon_suggest::trigger";
    /// Popup lifecycle target.
    pub const LIFECYCLE: &str = "horizon_suggest::lifecycle";
    /// Suggestion window target.
    pub const WINDOW: &str = "horizon_suggest::window";
    /// List change bridge target.
    pub const BRIDGE: &str = "horizon_suggest::bridge";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::trace_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        // Just ensure it compiles and doesn't panic
        let _span = PerfSpan::new("test_operation");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [targets::GEOMETRY, targets::TRIGGER, targets::LIFECYCLE] {
            assert!(target.starts_with("horizon_suggest::"));
        }
        assert!(targets::SCHEDULER.starts_with(targets::CORE));
    }
}
