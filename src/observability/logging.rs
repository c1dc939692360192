//! # Logging
//!
//! Installs the global `tracing` subscriber. The filter comes from
//! `RUST_LOG` and falls back to `keyvault_rotator=info`.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "keyvault_rotator=info";

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line, for log collectors
    Json,
}

/// Install the global subscriber
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init_logging(format: LogFormat) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
}

/// `<package version>-<git hash>` as stamped by the build script
#[must_use]
pub fn build_version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), "-", env!("BUILD_GIT_HASH"))
}

/// When the binary was built, as stamped by the build script
#[must_use]
pub fn build_datetime() -> &'static str {
    env!("BUILD_DATETIME")
}
