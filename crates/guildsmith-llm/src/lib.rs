//! Guildsmith LLM - model access for the cleanup advisor.
//!
//! This crate provides:
//! - The [`LlmProvider`] trait: one system prompt and one user prompt in,
//!   the model's text out
//! - [`OpenAiProvider`], an OpenAI-compatible chat completions client
//! - [`RetryingProvider`], which spaces requests out and retries failures
//! - [`LlmAdvisor`], the [`Advisor`](guildsmith_cleanup::Advisor) that asks a
//!   model for a conservative cleanup plan
//!
//! # Example
//!
//! ```rust,no_run
//! use guildsmith_llm::prelude::*;
//!
//! # fn example() -> LlmResult<()> {
//! let config = ProviderConfig::new("sk-...", "gpt-4o-mini");
//! let provider = RetryingProvider::new(OpenAiProvider::new(config)?, RetryPolicy::default());
//! let advisor = LlmAdvisor::new(provider);
//! # let _ = advisor;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod advisor;
mod error;
mod openai;
mod provider;
mod retry;

pub use advisor::{LlmAdvisor, system_prompt, user_prompt};
pub use error::{LlmError, LlmResult};
pub use openai::{OpenAiProvider, build_request_body, extract_content};
pub use provider::{DEFAULT_MODEL, LlmProvider, ProviderConfig};
pub use retry::{RateLimiter, RetryPolicy, RetryingProvider};
