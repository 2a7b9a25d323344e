//! Shared utilities for the curation governance engine.

pub mod logging;
pub mod stats;
pub mod time;

pub use logging::{init_tracing, LogFormat};
pub use stats::StatsCounter;
pub use time::{format_deadline, format_duration};
