//! Change proposals and their ingestion from advisor output.
//!
//! The advisor answers with JSON of the shape
//! `{"issues": [...], "optimization_suggestions": [...]}`. Each issue is
//! validated on its own: a bad issue is dropped and counted, it never fails
//! the batch. Only a response that is not a JSON object at all is an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{ProposalError, ProposalResult};

/// Text used when the advisor leaves a descriptive field out.
pub const NOT_SPECIFIED: &str = "Not specified";

/// What kind of fix a proposal describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProposalKind {
    /// An everyone-role overwrite that restates the base permissions.
    PermissionRedundancy,
    /// A resource name containing whitespace.
    NamingInconsistency,
    /// Any tag the applier does not know. Never applied.
    Unrecognized(String),
}

impl ProposalKind {
    /// The wire tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::PermissionRedundancy => "permission_redundancy",
            Self::NamingInconsistency => "naming_inconsistency",
            Self::Unrecognized(tag) => tag,
        }
    }

    /// Title-cased label ("Permission Redundancy").
    #[must_use]
    pub fn title(&self) -> String {
        self.tag()
            .split(['_', ' '])
            .filter(|w| !w.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// Whether the applier knows how to perform this kind.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for ProposalKind {
    fn from(tag: String) -> Self {
        let normalized = tag.trim().to_lowercase();
        match normalized.as_str() {
            "permission_redundancy" => Self::PermissionRedundancy,
            "naming_inconsistency" => Self::NamingInconsistency,
            _ => Self::Unrecognized(normalized),
        }
    }
}

impl From<ProposalKind> for String {
    fn from(kind: ProposalKind) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How urgent a proposal is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic.
    #[default]
    Low,
    /// Worth fixing.
    Medium,
    /// Should be fixed.
    High,
}

impl Severity {
    /// Lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// A single suggested, reversible server-structure change.
///
/// Immutable once ingested. `affected_items` are names, re-resolved against
/// live state when the fix is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeProposal {
    /// What kind of fix this is.
    pub kind: ProposalKind,
    /// How urgent it is.
    pub severity: Severity,
    /// One-line summary.
    pub description: String,
    /// What is wrong today.
    pub current_state: String,
    /// What the fix will do.
    pub proposed_solution: String,
    /// Channel or role names the fix touches, in order.
    pub affected_items: Vec<String>,
    /// Advisor hint. Approval is required regardless.
    pub auto_fixable: bool,
}

impl ChangeProposal {
    /// Create a proposal with placeholder state and solution text.
    #[must_use]
    pub fn new(kind: ProposalKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Low,
            description: description.into(),
            current_state: NOT_SPECIFIED.to_string(),
            proposed_solution: NOT_SPECIFIED.to_string(),
            affected_items: Vec::new(),
            auto_fixable: false,
        }
    }

    /// Builder: set the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Builder: set the affected items (cleaned the same way as ingestion).
    #[must_use]
    pub fn with_affected_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_items = clean_items(items.into_iter().map(Into::into));
        self
    }

    /// Builder: set the current-state and proposed-solution text.
    #[must_use]
    pub fn with_details(
        mut self,
        current_state: impl Into<String>,
        proposed_solution: impl Into<String>,
    ) -> Self {
        self.current_state = current_state.into();
        self.proposed_solution = proposed_solution.into();
        self
    }
}

/// An informational optimisation idea. Shown, never applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Area the suggestion concerns.
    pub category: String,
    /// The suggestion itself.
    pub suggestion: String,
    /// Expected benefit.
    pub benefits: String,
    /// Whether acting on it would need confirmation.
    pub requires_confirmation: bool,
}

/// Everything an advisor produced for one guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPlan {
    /// Validated proposals, in advisor order.
    pub proposals: Vec<ChangeProposal>,
    /// Informational suggestions.
    pub suggestions: Vec<Suggestion>,
    /// Issues dropped during validation.
    pub dropped: usize,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(rename = "type")]
    kind: Option<String>,
    severity: Option<String>,
    description: Option<String>,
    current_state: Option<String>,
    proposed_solution: Option<String>,
    #[serde(default)]
    affected_items: Vec<serde_json::Value>,
    #[serde(default)]
    auto_fixable: bool,
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    category: Option<String>,
    suggestion: Option<String>,
    #[serde(default)]
    benefits: Option<String>,
    #[serde(default)]
    requires_confirmation: bool,
}

impl CleanupPlan {
    /// Create a plan from already-validated proposals.
    #[must_use]
    pub fn new(proposals: Vec<ChangeProposal>) -> Self {
        Self {
            proposals,
            suggestions: Vec::new(),
            dropped: 0,
        }
    }

    /// Builder: add suggestions.
    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Whether there is nothing to review.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Parse advisor output, tolerating a surrounding markdown code fence.
    ///
    /// # Errors
    ///
    /// Returns [`ProposalError::Malformed`] if the text is not a JSON object,
    /// or if `issues` / `optimization_suggestions` are present but not arrays.
    pub fn from_llm_text(text: &str) -> ProposalResult<Self> {
        let body = strip_code_fence(text);
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| ProposalError::Malformed(format!("not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON document.
    ///
    /// # Errors
    ///
    /// See [`CleanupPlan::from_llm_text`].
    pub fn from_value(value: serde_json::Value) -> ProposalResult<Self> {
        let serde_json::Value::Object(mut root) = value else {
            return Err(ProposalError::Malformed(
                "expected a JSON object at the top level".to_string(),
            ));
        };

        let issues = take_array(&mut root, "issues")?;
        let raw_suggestions = take_array(&mut root, "optimization_suggestions")?;

        let mut plan = Self::default();
        for (index, issue) in issues.into_iter().enumerate() {
            match validate_issue(issue) {
                Ok(proposal) => {
                    if !proposal.kind.is_recognized() {
                        warn!(index, kind = %proposal.kind, "Keeping issue of unknown type");
                    }
                    plan.proposals.push(proposal);
                },
                Err(reason) => {
                    warn!(index, reason = %reason, "Dropping invalid cleanup issue");
                    plan.dropped = plan.dropped.saturating_add(1);
                },
            }
        }

        for raw in raw_suggestions {
            match serde_json::from_value::<RawSuggestion>(raw) {
                Ok(RawSuggestion {
                    category,
                    suggestion: Some(suggestion),
                    benefits,
                    requires_confirmation,
                }) if !suggestion.trim().is_empty() => plan.suggestions.push(Suggestion {
                    category: category.unwrap_or_else(|| "general".to_string()),
                    suggestion,
                    benefits: benefits.unwrap_or_else(|| NOT_SPECIFIED.to_string()),
                    requires_confirmation,
                }),
                _ => debug!("Ignoring suggestion without text"),
            }
        }

        Ok(plan)
    }
}

fn take_array(
    root: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> ProposalResult<Vec<serde_json::Value>> {
    match root.remove(key) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => Ok(items),
        Some(_) => Err(ProposalError::Malformed(format!("`{key}` must be an array"))),
    }
}

fn validate_issue(value: serde_json::Value) -> Result<ChangeProposal, String> {
    let raw: RawIssue = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let kind = non_blank(raw.kind).ok_or("missing type")?;
    let description = non_blank(raw.description).ok_or("missing description")?;
    let severity = match non_blank(raw.severity) {
        Some(s) => s.parse::<Severity>()?,
        None => Severity::Low,
    };

    let items = raw.affected_items.into_iter().filter_map(|item| match item {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    Ok(ChangeProposal {
        kind: ProposalKind::from(kind),
        severity,
        description,
        current_state: non_blank(raw.current_state).unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        proposed_solution: non_blank(raw.proposed_solution)
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        affected_items: clean_items(items),
        auto_fixable: raw.auto_fixable,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Trim, drop blanks, and dedupe while keeping first-seen order.
fn clean_items(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if !trimmed.is_empty() && !cleaned.iter().any(|seen| seen == trimmed) {
            cleaned.push(trimmed.to_string());
        }
    }
    cleaned
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(newline) => rest.get(newline.saturating_add(1)..).unwrap_or_default(),
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(
            ProposalKind::from("permission_redundancy".to_string()),
            ProposalKind::PermissionRedundancy
        );
        assert_eq!(
            ProposalKind::from(" Naming_Inconsistency ".to_string()),
            ProposalKind::NamingInconsistency
        );
        assert_eq!(
            ProposalKind::from("delete_channel".to_string()),
            ProposalKind::Unrecognized("delete_channel".to_string())
        );
        assert!(ProposalKind::NamingInconsistency.is_recognized());
        assert!(!ProposalKind::from("delete_channel".to_string()).is_recognized());
    }

    #[test]
    fn test_kind_title() {
        assert_eq!(ProposalKind::PermissionRedundancy.title(), "Permission Redundancy");
        assert_eq!(
            ProposalKind::Unrecognized("merge_roles".to_string()).title(),
            "Merge Roles"
        );
    }

    #[test]
    fn test_parse_full_plan() {
        let text = r#"{
            "issues": [
                {
                    "type": "naming_inconsistency",
                    "severity": "medium",
                    "description": "Channels use spaces",
                    "current_state": "my channel",
                    "proposed_solution": "my-channel",
                    "affected_items": ["my channel"],
                    "auto_fixable": true
                }
            ],
            "optimization_suggestions": [
                {"category": "structure", "suggestion": "Group voice channels", "benefits": "Tidier", "requires_confirmation": true}
            ]
        }"#;
        let plan = CleanupPlan::from_llm_text(text).unwrap();
        assert_eq!(plan.proposals.len(), 1);
        assert_eq!(plan.dropped, 0);
        let proposal = &plan.proposals[0];
        assert_eq!(proposal.kind, ProposalKind::NamingInconsistency);
        assert_eq!(proposal.severity, Severity::Medium);
        assert!(proposal.auto_fixable);
        assert_eq!(plan.suggestions[0].suggestion, "Group voice channels");
    }

    #[test]
    fn test_code_fence_stripped() {
        let text = "```json\n{\"issues\": []}\n```";
        let plan = CleanupPlan::from_llm_text(text).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_invalid_issues_dropped_not_fatal() {
        let text = r#"{"issues": [
            {"type": "naming_inconsistency"},
            {"description": "no type"},
            {"type": "naming_inconsistency", "description": "bad severity", "severity": "urgent"},
            {"type": "naming_inconsistency", "description": "ok"},
            "not an object"
        ]}"#;
        let plan = CleanupPlan::from_llm_text(text).unwrap();
        assert_eq!(plan.proposals.len(), 1);
        assert_eq!(plan.dropped, 4);
        assert_eq!(plan.proposals[0].description, "ok");
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let text = r#"{"issues": [{"type": "permission_redundancy", "description": "x"}]}"#;
        let plan = CleanupPlan::from_llm_text(text).unwrap();
        let proposal = &plan.proposals[0];
        assert_eq!(proposal.severity, Severity::Low);
        assert_eq!(proposal.current_state, NOT_SPECIFIED);
        assert_eq!(proposal.proposed_solution, NOT_SPECIFIED);
        assert!(proposal.affected_items.is_empty());
    }

    #[test]
    fn test_affected_items_cleaned() {
        let text = r#"{"issues": [{"type": "naming_inconsistency", "description": "x",
            "affected_items": [" my channel ", "", "my channel", "other room", null]}]}"#;
        let plan = CleanupPlan::from_llm_text(text).unwrap();
        assert_eq!(
            plan.proposals[0].affected_items,
            vec!["my channel".to_string(), "other room".to_string()]
        );
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            CleanupPlan::from_llm_text("[1, 2, 3]"),
            Err(ProposalError::Malformed(_))
        ));
        assert!(matches!(
            CleanupPlan::from_llm_text("I could not analyse this server."),
            Err(ProposalError::Malformed(_))
        ));
        assert!(matches!(
            CleanupPlan::from_llm_text(r#"{"issues": "none"}"#),
            Err(ProposalError::Malformed(_))
        ));
    }

    #[test]
    fn test_kind_serde_roundtrip_keeps_unknown_tag() {
        let kind = ProposalKind::Unrecognized("archive_channel".to_string());
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, "\"archive_channel\"");
    }
}
