//! Logging setup for guildsmith.
//!
//! One call configures the global `tracing` subscriber: level and
//! per-crate directives, output format, and target (a standard stream or a
//! daily rolling file).
//!
//! # Example
//!
//! ```rust,no_run
//! use guildsmith_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), guildsmith_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("guildsmith_llm=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
