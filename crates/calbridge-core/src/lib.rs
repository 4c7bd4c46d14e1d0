//! Core helpers shared by the calbridge crates: tracing setup and time ranges.

pub mod time;
pub mod tracing;

pub use time::{TimeRange, TimeRangeError, to_rfc3339};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
