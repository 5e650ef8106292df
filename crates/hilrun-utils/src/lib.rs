//! # hilrun Utilities
//!
//! Shared helpers for the hilrun workspace, currently the `tracing` based
//! logging setup used by the runner binary.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
