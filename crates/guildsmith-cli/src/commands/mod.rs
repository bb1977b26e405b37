//! Subcommand implementations.

pub(crate) mod analyze;
pub(crate) mod cleanup;
pub(crate) mod config;
