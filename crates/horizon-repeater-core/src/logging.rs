//! Logging facilities for Horizon Repeater.
//!
//! Horizon Repeater uses the `tracing` crate for instrumentation. Nothing is
//! printed unless the application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_repeater::view_manager=trace")
//!     .init();
//! ```
//!
//! Realize/clear transitions and reindexing are logged at `trace` level under
//! [`targets::VIEW_MANAGER`]. Layout passes open a [`PerfSpan`] so their
//! duration shows up in profiling subscribers.

/// Span names used throughout Horizon Repeater for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// Measure pass span.
    pub const MEASURE: &str = "horizon_repeater::measure";
    /// Arrange pass span.
    pub const ARRANGE: &str = "horizon_repeater::arrange";
    /// Collection change processing span.
    pub const COLLECTION_CHANGE: &str = "horizon_repeater::collection_change";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal emission target.
    pub const SIGNAL: &str = "horizon_repeater_core::signal";
    /// Container (repeater) target.
    pub const REPEATER: &str = "horizon_repeater::repeater";
    /// Realize/clear state machine target.
    pub const VIEW_MANAGER: &str = "horizon_repeater::view_manager";
    /// Layout dispatch and context target.
    pub const LAYOUT: &str = "horizon_repeater::layout";
    /// Shared flow engine target.
    pub const FLOW: &str = "horizon_repeater::flow";
    /// Masonry column packing target.
    pub const MASONRY: &str = "horizon_repeater::masonry";
    /// Selection model and selector target.
    pub const SELECTION: &str = "horizon_repeater::selection";
    /// Performance spans target.
    pub const PERF: &str = "horizon_repeater::perf";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of layout passes.
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
        let span = tracing::info_span!(target: "horizon_repeater::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span_without_subscriber() {
        let span = PerfSpan::new(span_names::MEASURE);
        drop(span);
    }

    #[test]
    fn test_targets_share_crate_prefix() {
        for target in [
            targets::REPEATER,
            targets::VIEW_MANAGER,
            targets::LAYOUT,
            targets::FLOW,
            targets::MASONRY,
            targets::SELECTION,
        ] {
            assert!(target.starts_with("horizon_repeater::"));
        }
    }
}
