//! Bridge from `guildsmith_config::Config` to domain types.

use std::path::PathBuf;
use std::time::Duration;

use guildsmith_cleanup::{AnalysisDepth, CleanupSettings, ProtectedNames};
use guildsmith_config::Config;
use guildsmith_llm::{ProviderConfig, RetryPolicy};
use guildsmith_telemetry::{LogConfig, LogFormat, LogTarget};

/// Engine settings from the `[cleanup]` and `[protection]` sections.
pub(crate) fn to_cleanup_settings(config: &Config) -> CleanupSettings {
    let c = &config.cleanup;
    let separator = c.name_separator.chars().next().unwrap_or('-');
    CleanupSettings::default()
        .with_step_timeout(Duration::from_secs(c.step_timeout_secs))
        .with_overview_timeout(Duration::from_secs(c.overview_timeout_secs))
        .with_advisory_timeout(Duration::from_secs(c.advisory_timeout_secs))
        .with_confirm_start(c.confirm_start)
        .with_protected(ProtectedNames::new(&config.protection.keywords))
        .with_name_separator(separator)
        .with_retained_reports(c.retained_reports)
}

/// Depth used when the command line gives none.
pub(crate) fn default_depth(config: &Config) -> AnalysisDepth {
    config.cleanup.default_depth.parse().unwrap_or_default()
}

/// HTTP provider settings from the `[model]` section.
pub(crate) fn to_provider_config(config: &Config) -> ProviderConfig {
    let m = &config.model;
    let provider = ProviderConfig::new(m.api_key.clone().unwrap_or_default(), m.model.clone())
        .max_tokens(m.max_tokens)
        .temperature(m.temperature)
        .request_timeout(Duration::from_secs(m.request_timeout_secs));
    match &m.api_url {
        Some(url) => provider.base_url(url.clone()),
        None => provider,
    }
}

/// Retry pacing from the `[model]` section.
pub(crate) fn to_retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.model.max_attempts,
        min_interval: Duration::from_millis(config.model.min_interval_ms),
        ..RetryPolicy::default()
    }
}

/// Logging setup from the `[logging]` section.
pub(crate) fn to_log_config(config: &Config) -> LogConfig {
    let l = &config.logging;
    let format: LogFormat = l.format.parse().unwrap_or_default();
    let mut log = LogConfig::new(l.level.to_lowercase()).with_format(format);
    for directive in &l.directives {
        log = log.with_directive(directive.clone());
    }
    match (l.target.as_str(), &l.directory) {
        ("file", Some(dir)) => log.with_file_logging(PathBuf::from(dir)),
        ("stdout", _) => log.with_target(LogTarget::Stdout),
        _ => log.with_target(LogTarget::Stderr),
    }
}
