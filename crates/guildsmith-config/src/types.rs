//! Configuration types for guildsmith.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model provider used by the cleanup advisor.
    pub model: ModelConfig,
    /// Approval session behaviour.
    pub cleanup: CleanupSection,
    /// Names the workflow never touches.
    pub protection: ProtectionSection,
    /// Logging level, format, target, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// LLM provider selection, endpoint, and request pacing.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider identifier (`"openai"` or `"openai-compat"`).
    pub provider: String,
    /// Model name sent to the provider API.
    pub model: String,
    /// API key. Prefer `OPENAI_API_KEY` over storing this in a file.
    pub api_key: Option<String>,
    /// Base URL for the provider API (overrides the default endpoint).
    pub api_url: Option<String>,
    /// Maximum tokens to request per completion.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Attempts per analysis, including the first.
    pub max_attempts: u32,
    /// Minimum spacing between requests in milliseconds.
    pub min_interval_ms: u64,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .field("has_api_url", &self.api_url.is_some())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("min_interval_ms", &self.min_interval_ms)
            .finish()
    }
}

impl Serialize for ModelConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ModelConfig", 7)?;
        state.serialize_field("provider", &self.provider)?;
        state.serialize_field("model", &self.model)?;
        // api_key and api_url are intentionally omitted.
        state.serialize_field("max_tokens", &self.max_tokens)?;
        state.serialize_field("temperature", &self.temperature)?;
        state.serialize_field("request_timeout_secs", &self.request_timeout_secs)?;
        state.serialize_field("max_attempts", &self.max_attempts)?;
        state.serialize_field("min_interval_ms", &self.min_interval_ms)?;
        state.end()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            api_key: None,
            api_url: None,
            max_tokens: 2000,
            temperature: 0.7,
            request_timeout_secs: 30,
            max_attempts: 3,
            min_interval_ms: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// CleanupSection
// ---------------------------------------------------------------------------

/// Approval session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSection {
    /// Seconds the owner has to decide on each proposal.
    pub step_timeout_secs: u64,
    /// Seconds the owner has to start from the overview.
    pub overview_timeout_secs: u64,
    /// Seconds the advisor has to produce a plan.
    pub advisory_timeout_secs: u64,
    /// Open sessions on the overview instead of the first proposal.
    pub confirm_start: bool,
    /// Replacement for whitespace when normalising names. One character.
    pub name_separator: String,
    /// Finished session reports kept for lookup.
    pub retained_reports: usize,
    /// Analysis depth when none is given (`basic`, `detailed`,
    /// `comprehensive`).
    pub default_depth: String,
}

impl Default for CleanupSection {
    fn default() -> Self {
        Self {
            step_timeout_secs: 120,
            overview_timeout_secs: 300,
            advisory_timeout_secs: 30,
            confirm_start: true,
            name_separator: "-".to_owned(),
            retained_reports: 64,
            default_depth: "detailed".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProtectionSection
// ---------------------------------------------------------------------------

/// Protected name fragments. A channel or role whose name contains any of
/// these (case-insensitively) is never analysed or changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionSection {
    /// Keywords.
    pub keywords: Vec<String>,
}

impl Default for ProtectionSection {
    fn default() -> Self {
        Self {
            keywords: [
                "command",
                "hub",
                "admin",
                "mod",
                "staff",
                "log",
                "audit",
                "announcement",
                "welcome",
                "rules",
                "general",
                "important",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Where logs go: `"stderr"`, `"stdout"`, or `"file"`.
    pub target: String,
    /// Directory for daily log files when `target = "file"`.
    pub directory: Option<String>,
    /// Per-crate tracing directives (e.g. `["guildsmith_llm=debug",
    /// "hyper=warn"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: None,
            directives: Vec::new(),
        }
    }
}
