//! Core primitives for Horizon Repeater.
//!
//! This crate provides the host-independent building blocks the
//! virtualization engine is written against:
//!
//! - **Geometry**: `Point`, `Size` and `Rect` in logical pixels
//! - **Signals**: observer lists used for container notifications
//! - **Logging**: tracing targets and performance spans
//!
//! # Signal Example
//!
//! ```
//! use horizon_repeater_core::Signal;
//!
//! let element_prepared = Signal::<usize>::new();
//! let conn_id = element_prepared.connect(|index| {
//!     println!("prepared element for item {index}");
//! });
//! element_prepared.emit(3);
//! element_prepared.disconnect(conn_id);
//! ```

pub mod geometry;
pub mod logging;
pub mod signal;

pub use geometry::{Point, Rect, Size};
pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
