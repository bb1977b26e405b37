//! CLI theme and styling.

use colored::Colorize;
use guildsmith_cleanup::{FixOutcome, Severity};

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Severity badge, coloured by urgency.
    pub(crate) fn severity(severity: Severity) -> String {
        let label = severity.as_str().to_uppercase();
        match severity {
            Severity::High => label.red().bold().to_string(),
            Severity::Medium => label.yellow().to_string(),
            Severity::Low => label.green().to_string(),
        }
    }

    /// One-word outcome tag for a fix result.
    pub(crate) fn outcome(outcome: FixOutcome) -> String {
        let label = outcome.to_string().to_uppercase();
        match outcome {
            FixOutcome::Applied => label.green().bold().to_string(),
            FixOutcome::Skipped => label.dimmed().to_string(),
            FixOutcome::Denied => label.red().to_string(),
        }
    }
}
