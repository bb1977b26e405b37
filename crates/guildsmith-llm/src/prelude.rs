//! Prelude module - commonly used types for convenient import.
//!
//! Use `use guildsmith_llm::prelude::*;` to import all essential types.

pub use crate::{
    LlmAdvisor, LlmError, LlmProvider, LlmResult, OpenAiProvider, ProviderConfig, RetryPolicy,
    RetryingProvider,
};
