//! Presentation requests.
//!
//! The engine never formats rich output itself. It builds plain
//! [`RenderRequest`]s and hands them to a [`CleanupPresenter`], which turns
//! them into embeds and buttons, terminal text, or anything else.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::applier::FixReport;
use crate::proposal::{Severity, Suggestion};
use crate::report::SessionReport;
use crate::session::{ApprovalSession, Decision, SessionId};

/// Most affected items shown on one prompt.
pub const MAX_AFFECTED_ITEMS: usize = 5;

/// Most entries per section on the overview.
const OVERVIEW_SECTION_LIMIT: usize = 3;

/// A titled block of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptField {
    /// Heading.
    pub name: String,
    /// Body.
    pub value: String,
}

impl PromptField {
    /// Create a field.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A screen that waits for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Title line.
    pub title: String,
    /// Main text.
    pub body: String,
    /// Extra sections.
    pub fields: Vec<PromptField>,
    /// Up to [`MAX_AFFECTED_ITEMS`] affected names.
    pub affected_items: Vec<String>,
    /// Decisions the presenter should offer.
    pub available_decisions: Vec<Decision>,
    /// `(index, total)` when the prompt is for one proposal.
    pub step: Option<(usize, usize)>,
}

/// The full listing behind the overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedReport {
    /// Title line.
    pub title: String,
    /// One section per severity and one for suggestions; empty sections omitted.
    pub sections: Vec<PromptField>,
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something did not go as hoped.
    Warning,
    /// Something failed.
    Error,
}

/// Everything the engine asks a presenter to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderRequest {
    /// Wait for a decision.
    Prompt(Prompt),
    /// The result of applying one proposal.
    FixResult {
        /// Index of the proposal.
        index: usize,
        /// Batch size.
        total: usize,
        /// What the applier did.
        report: FixReport,
    },
    /// The detailed report requested from the overview.
    DetailedReport(DetailedReport),
    /// Final summary.
    Summary(SessionReport),
    /// A standalone message.
    Notice {
        /// Severity.
        level: NoticeLevel,
        /// Message text.
        text: String,
    },
}

/// Renders cleanup screens for one frontend.
///
/// Presenters own their failures: the engine does not retry or abort on a
/// failed render. The owner can still decide through any other path to
/// [`CleanupEngine::submit_decision`](crate::CleanupEngine::submit_decision).
#[async_trait]
pub trait CleanupPresenter: Send + Sync {
    /// Show a request for a session.
    async fn present(&self, session: &SessionId, request: RenderRequest);
}

fn bullet_list<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines
        .map(|line| format!("• {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Overview screen for a session in its overview phase.
#[must_use]
pub fn overview_prompt(session: &ApprovalSession) -> Prompt {
    let proposals = session.proposals();
    let suggestions = session.suggestions();
    let mut fields = Vec::new();

    for (severity, heading) in [
        (Severity::High, "High Priority Issues"),
        (Severity::Medium, "Medium Priority Issues"),
    ] {
        let matching: Vec<&str> = proposals
            .iter()
            .filter(|p| p.severity == severity)
            .take(OVERVIEW_SECTION_LIMIT)
            .map(|p| p.description.as_str())
            .collect();
        if !matching.is_empty() {
            fields.push(PromptField::new(heading, bullet_list(matching.into_iter())));
        }
    }

    if !suggestions.is_empty() {
        fields.push(PromptField::new(
            "Optimization Suggestions",
            bullet_list(
                suggestions
                    .iter()
                    .take(OVERVIEW_SECTION_LIMIT)
                    .map(|s| s.suggestion.as_str()),
            ),
        ));
    }

    fields.push(PromptField::new(
        "Next Steps",
        "Start the cleanup to review each issue, or open the detailed report",
    ));

    Prompt {
        title: "Server Analysis Complete".to_string(),
        body: format!(
            "Found {} issues and {} optimization opportunities",
            proposals.len(),
            suggestions.len()
        ),
        fields,
        affected_items: Vec::new(),
        available_decisions: session.available_decisions().to_vec(),
        step: None,
    }
}

/// Prompt for the proposal at the cursor, if the session is reviewing one.
#[must_use]
pub fn step_prompt(session: &ApprovalSession) -> Option<Prompt> {
    let (index, proposal) = session.current()?;
    let total = session.proposals().len();
    Some(Prompt {
        title: format!(
            "Issue {}/{total}: {}",
            index.saturating_add(1),
            proposal.kind.title()
        ),
        body: proposal.description.clone(),
        fields: vec![
            PromptField::new("Severity", proposal.severity.as_str()),
            PromptField::new("Current State", proposal.current_state.clone()),
            PromptField::new("Proposed Solution", proposal.proposed_solution.clone()),
        ],
        affected_items: proposal
            .affected_items
            .iter()
            .take(MAX_AFFECTED_ITEMS)
            .cloned()
            .collect(),
        available_decisions: session.available_decisions().to_vec(),
        step: Some((index, total)),
    })
}

/// Every proposal grouped by severity, plus every suggestion.
#[must_use]
pub fn detailed_report(session: &ApprovalSession) -> DetailedReport {
    let mut sections = Vec::new();
    for (severity, heading) in [
        (Severity::High, "High Priority Issues"),
        (Severity::Medium, "Medium Priority Issues"),
        (Severity::Low, "Low Priority Issues"),
    ] {
        let matching: Vec<&str> = session
            .proposals()
            .iter()
            .filter(|p| p.severity == severity)
            .map(|p| p.description.as_str())
            .collect();
        if !matching.is_empty() {
            sections.push(PromptField::new(heading, bullet_list(matching.into_iter())));
        }
    }
    if !session.suggestions().is_empty() {
        sections.push(PromptField::new(
            "Optimization Suggestions",
            bullet_list(session.suggestions().iter().map(|s| s.suggestion.as_str())),
        ));
    }
    DetailedReport {
        title: "Detailed Server Analysis Report".to_string(),
        sections,
    }
}

/// Suggestions from an analysis that found nothing to fix.
///
/// Each suggestion gets its own section with its benefits, and a note when
/// it should only be acted on after confirmation.
#[must_use]
pub fn suggestions_report(suggestions: &[Suggestion]) -> DetailedReport {
    let sections = suggestions
        .iter()
        .map(|s| {
            let mut lines = vec![s.suggestion.clone()];
            if !s.benefits.trim().is_empty() {
                lines.push(format!("Benefits: {}", s.benefits));
            }
            if s.requires_confirmation {
                lines.push("Requires confirmation before changing anything".to_string());
            }
            let heading = if s.category.trim().is_empty() {
                "Suggestion".to_string()
            } else {
                format!("Suggestion ({})", s.category)
            };
            PromptField::new(heading, lines.join("\n"))
        })
        .collect();
    DetailedReport {
        title: "Optimization Suggestions".to_string(),
        sections,
    }
}
