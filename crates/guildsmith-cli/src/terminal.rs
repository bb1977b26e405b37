//! Terminal rendering of cleanup screens.
//!
//! Output goes straight to stdout. Prompts and the final summary are also
//! forwarded to the command loop, which asks the owner for decisions with
//! `dialoguer` and stops once the summary arrives.

use async_trait::async_trait;
use colored::Colorize;
use dialoguer::{Select, theme::ColorfulTheme};
use tokio::sync::mpsc;

use guildsmith_cleanup::{
    CleanupPresenter, Decision, DetailedReport, FixReport, NoticeLevel, Prompt, RenderRequest,
    SessionId, SessionReport, SessionStatus, Severity,
};

use crate::theme::Theme;

/// What the command loop needs to act on.
#[derive(Debug)]
pub(crate) enum TerminalEvent {
    /// A decision is awaited.
    Prompt(Prompt),
    /// The session finished; its summary has been printed.
    Finished(SessionReport),
}

/// Prints every request and forwards prompts and the summary.
pub(crate) struct TerminalPresenter {
    events: mpsc::UnboundedSender<TerminalEvent>,
}

impl TerminalPresenter {
    pub(crate) fn new(events: mpsc::UnboundedSender<TerminalEvent>) -> Self {
        Self { events }
    }

    fn forward(&self, session: &SessionId, event: TerminalEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!(session = %session, "Terminal loop is gone");
        }
    }
}

#[async_trait]
impl CleanupPresenter for TerminalPresenter {
    async fn present(&self, session: &SessionId, request: RenderRequest) {
        tracing::debug!(session = %session, "Rendering cleanup screen");
        match request {
            RenderRequest::Prompt(prompt) => {
                println!("{}", format_prompt(&prompt));
                self.forward(session, TerminalEvent::Prompt(prompt));
            },
            RenderRequest::FixResult {
                index,
                total,
                report,
            } => println!("{}", format_fix_result(index, total, &report)),
            RenderRequest::DetailedReport(report) => println!("{}", format_detailed(&report)),
            RenderRequest::Summary(report) => {
                println!("{}", format_summary(&report));
                self.forward(session, TerminalEvent::Finished(report));
            },
            RenderRequest::Notice { level, text } => {
                let line = match level {
                    NoticeLevel::Info => Theme::info(&text),
                    NoticeLevel::Warning => Theme::warning(&text),
                    NoticeLevel::Error => Theme::error(&text),
                };
                println!("{line}");
            },
        }
    }
}

/// Menu label for a decision.
pub(crate) fn decision_label(decision: Decision) -> &'static str {
    match decision {
        Decision::Start => "Start cleanup",
        Decision::ShowReport => "Show detailed report",
        Decision::Apply => "Apply fix",
        Decision::Skip => "Skip",
        Decision::SkipAll => "Skip all remaining",
        Decision::Abort => "Stop cleanup",
    }
}

/// Ask the owner to pick one of `options`. Blocks on the terminal.
///
/// Returns `None` if the terminal cannot be read.
pub(crate) fn read_decision(options: &[Decision]) -> Option<Decision> {
    let labels: Vec<&str> = options.iter().map(|d| decision_label(*d)).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Decision")
        .items(&labels)
        .default(0)
        .interact();
    match selection {
        Ok(index) => options.get(index).copied(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read a decision from the terminal");
            None
        },
    }
}

fn format_prompt(prompt: &Prompt) -> String {
    let mut out = vec![
        String::new(),
        Theme::separator(),
        Theme::header(&prompt.title),
        prompt.body.clone(),
    ];
    for field in &prompt.fields {
        let value = match field.value.parse::<Severity>() {
            Ok(severity) if field.name == "Severity" => Theme::severity(severity),
            _ => field.value.clone(),
        };
        out.push(format!("{}", field.name.bold()));
        out.extend(value.lines().map(|line| format!("  {line}")));
    }
    if !prompt.affected_items.is_empty() {
        out.push(format!("{}", "Affected Items".bold()));
        out.extend(prompt.affected_items.iter().map(|item| format!("  • {item}")));
    }
    out.join("\n")
}

fn format_fix_result(index: usize, total: usize, report: &FixReport) -> String {
    let mut out = vec![format!(
        "{} Fix {}/{total}: {}",
        Theme::outcome(report.outcome),
        index.saturating_add(1),
        report.reason
    )];
    for (label, items) in [
        ("changed", &report.changed),
        ("protected", &report.protected),
        ("not found", &report.unresolved),
        ("not permitted", &report.not_permitted),
    ] {
        if !items.is_empty() {
            out.push(Theme::dimmed(&format!("  {label}: {}", items.join(", "))));
        }
    }
    out.join("\n")
}

fn format_detailed(report: &DetailedReport) -> String {
    let mut out = vec![String::new(), Theme::header(&report.title)];
    for section in &report.sections {
        out.push(format!("{}", section.name.bold()));
        out.extend(section.value.lines().map(|line| format!("  {line}")));
    }
    out.join("\n")
}

fn format_summary(report: &SessionReport) -> String {
    let headline = match report.status {
        SessionStatus::Completed => Theme::success("Cleanup complete"),
        SessionStatus::Aborted => Theme::warning("Cleanup stopped"),
        SessionStatus::TimedOut => Theme::warning("Cleanup timed out waiting for a decision"),
        SessionStatus::Active => Theme::info("Cleanup in progress"),
    };
    let mut out = vec![
        String::new(),
        Theme::separator(),
        headline,
        format!(
            "Applied {} of {} fixes ({} reviewed, {} left)",
            report.applied_count(),
            report.total,
            report.processed,
            report.remaining()
        ),
    ];
    out.extend(report.applied.iter().map(|d| format!("  • {d}")));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildsmith_cleanup::{FixOutcome, PromptField};
    use guildsmith_core::UserId;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_prompt_lists_fields_and_items() {
        plain();
        let prompt = Prompt {
            title: "Issue 1/2: Naming Inconsistency".to_string(),
            body: "Spaces in channel names".to_string(),
            fields: vec![
                PromptField::new("Severity", "medium"),
                PromptField::new("Proposed Solution", "Use dashes"),
            ],
            affected_items: vec!["off topic".to_string()],
            available_decisions: vec![Decision::Apply, Decision::Skip],
            step: Some((0, 2)),
        };
        let text = format_prompt(&prompt);
        assert!(text.contains("Issue 1/2: Naming Inconsistency"));
        assert!(text.contains("MEDIUM"));
        assert!(text.contains("  Use dashes"));
        assert!(text.contains("  • off topic"));
    }

    #[test]
    fn test_fix_result_lists_buckets() {
        plain();
        let report = FixReport {
            outcome: FixOutcome::Applied,
            reason: "Renamed 1 channel".to_string(),
            changed: vec!["a b → a-b".to_string()],
            protected: vec!["general chat".to_string()],
            unresolved: Vec::new(),
            not_permitted: Vec::new(),
        };
        let text = format_fix_result(0, 3, &report);
        assert!(text.starts_with("APPLIED Fix 1/3: Renamed 1 channel"));
        assert!(text.contains("changed: a b → a-b"));
        assert!(text.contains("protected: general chat"));
        assert!(!text.contains("not found"));
    }

    #[test]
    fn test_summary_counts() {
        plain();
        let report = SessionReport {
            session_id: SessionId::new(UserId::new("1"), "cli"),
            status: SessionStatus::TimedOut,
            total: 3,
            processed: 1,
            applied: vec!["Normalize names".to_string()],
            suggestions: 0,
            history: Vec::new(),
            started_at: chrono::Utc::now(),
            finished_at: None,
        };
        let text = format_summary(&report);
        assert!(text.contains("timed out"));
        assert!(text.contains("Applied 1 of 3 fixes (1 reviewed, 2 left)"));
    }

    #[test]
    fn test_decision_labels_are_distinct() {
        let all = [
            Decision::Start,
            Decision::ShowReport,
            Decision::Apply,
            Decision::Skip,
            Decision::SkipAll,
            Decision::Abort,
        ];
        let mut labels: Vec<&str> = all.iter().map(|d| decision_label(*d)).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), all.len());
    }
}
