//! Post-merge configuration validation.
//!
//! Checks that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Most attempts allowed per analysis.
const MAX_ATTEMPTS_UPPER_BOUND: u32 = 10;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_model(config)?;
    validate_cleanup(config)?;
    validate_protection(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_model(config: &Config) -> ConfigResult<()> {
    let m = &config.model;

    if !matches!(m.provider.as_str(), "openai" | "openai-compat") {
        return Err(invalid(
            "model.provider",
            format!(
                "unsupported provider '{}'; expected one of: openai, openai-compat",
                m.provider
            ),
        ));
    }

    if m.model.trim().is_empty() {
        return Err(invalid("model.model", "model name must not be empty"));
    }

    if !(0.0..=2.0).contains(&m.temperature) {
        return Err(invalid(
            "model.temperature",
            format!(
                "temperature {} is out of range; must be between 0.0 and 2.0",
                m.temperature
            ),
        ));
    }

    if m.max_tokens == 0 {
        return Err(invalid("model.max_tokens", "max_tokens must be at least 1"));
    }

    if m.request_timeout_secs == 0 {
        return Err(invalid(
            "model.request_timeout_secs",
            "request timeout must be at least 1 second",
        ));
    }

    if m.max_attempts == 0 || m.max_attempts > MAX_ATTEMPTS_UPPER_BOUND {
        return Err(invalid(
            "model.max_attempts",
            format!("max_attempts must be between 1 and {MAX_ATTEMPTS_UPPER_BOUND}"),
        ));
    }

    if m.provider == "openai-compat" && m.api_url.is_none() {
        return Err(invalid(
            "model.api_url",
            "openai-compat provider requires api_url",
        ));
    }

    Ok(())
}

fn validate_cleanup(config: &Config) -> ConfigResult<()> {
    let c = &config.cleanup;

    for (field, value) in [
        ("cleanup.step_timeout_secs", c.step_timeout_secs),
        ("cleanup.overview_timeout_secs", c.overview_timeout_secs),
        ("cleanup.advisory_timeout_secs", c.advisory_timeout_secs),
    ] {
        if value == 0 {
            return Err(invalid(field, "timeout must be at least 1 second"));
        }
    }

    let mut chars = c.name_separator.chars();
    match (chars.next(), chars.next()) {
        (Some(sep), None) if !sep.is_whitespace() => {},
        _ => {
            return Err(invalid(
                "cleanup.name_separator",
                format!(
                    "separator '{}' must be exactly one non-whitespace character",
                    c.name_separator
                ),
            ));
        },
    }

    if c.retained_reports == 0 {
        return Err(invalid(
            "cleanup.retained_reports",
            "at least one finished report must be retained",
        ));
    }

    if !matches!(
        c.default_depth.as_str(),
        "basic" | "detailed" | "comprehensive"
    ) {
        return Err(invalid(
            "cleanup.default_depth",
            format!(
                "unknown depth '{}'; expected one of: basic, detailed, comprehensive",
                c.default_depth
            ),
        ));
    }

    Ok(())
}

fn validate_protection(config: &Config) -> ConfigResult<()> {
    let keywords = &config.protection.keywords;
    if keywords.is_empty() {
        return Err(invalid(
            "protection.keywords",
            "at least one protected keyword is required",
        ));
    }
    if keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(invalid(
            "protection.keywords",
            "protected keywords must not be blank",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    match l.target.as_str() {
        "stderr" | "stdout" => {},
        "file" => {
            if l.directory.as_deref().is_none_or(|d| d.trim().is_empty()) {
                return Err(invalid(
                    "logging.directory",
                    "file logging requires a directory",
                ));
            }
        },
        other => {
            return Err(invalid(
                "logging.target",
                format!("unknown target '{other}'; expected one of: stderr, stdout, file"),
            ));
        },
    }

    Ok(())
}
