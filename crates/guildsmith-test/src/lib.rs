//! Guildsmith Test - Shared test utilities.
//!
//! This crate provides an in-memory guild and fixtures that can be used
//! across guildsmith crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! guildsmith-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use guildsmith_test::{MockGuild, test_admin_bot};
//!
//! let guild = MockGuild::new()
//!     .with_text_channel("my channel")
//!     .with_bot_capabilities(test_admin_bot());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
