//! # Observability
//!
//! Logging setup for the rotator binaries.
//!
//! - `logging`: `tracing` subscriber with `RUST_LOG` filtering

pub mod logging;

// Re-export for convenience
pub use logging::*;
