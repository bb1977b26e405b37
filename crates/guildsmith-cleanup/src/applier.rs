//! Applies one approved proposal against live guild state.
//!
//! The applier is stateless between calls. It re-reads channels and roles
//! on every apply, consults the [`SafetyGate`] for each item, and reports
//! what happened in a [`FixReport`]. It never panics and never touches
//! session state; platform failures become a `Denied` report.

use guildsmith_core::{
    Capability, CapabilitySet, GuildState, OverwriteTarget, PlatformError, find_channel,
    find_role,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::proposal::{ChangeProposal, ProposalKind};
use crate::safety::SafetyGate;

/// Result class of one apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixOutcome {
    /// At least one item changed.
    Applied,
    /// Nothing needed changing (or nothing could be resolved).
    Skipped,
    /// Refused, or the platform rejected a change.
    Denied,
}

impl fmt::Display for FixOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Denied => "denied",
        })
    }
}

/// What one apply did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixReport {
    /// Result class.
    pub outcome: FixOutcome,
    /// Human-readable reason, including the changed-item count.
    pub reason: String,
    /// Items that changed, as `old → new` or a channel name.
    pub changed: Vec<String>,
    /// Items skipped because they are protected.
    pub protected: Vec<String>,
    /// Items that no longer exist.
    pub unresolved: Vec<String>,
    /// Items the bot lacks the per-resource capability to change.
    pub not_permitted: Vec<String>,
}

impl FixReport {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            outcome: FixOutcome::Denied,
            reason: reason.into(),
            changed: Vec::new(),
            protected: Vec::new(),
            unresolved: Vec::new(),
            not_permitted: Vec::new(),
        }
    }

    /// Whether anything changed.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.outcome == FixOutcome::Applied
    }
}

/// Per-item bookkeeping while an apply runs.
#[derive(Debug, Default)]
struct Progress {
    changed: Vec<String>,
    protected: Vec<String>,
    unresolved: Vec<String>,
    not_permitted: Vec<String>,
}

impl Progress {
    fn finish(self, noun: &str) -> FixReport {
        let count = self.changed.len();
        let plural = if count == 1 { "" } else { "s" };
        let (outcome, reason) = if count > 0 {
            (FixOutcome::Applied, format!("{noun} {count} item{plural}"))
        } else {
            (
                FixOutcome::Skipped,
                format!("No changes needed: {noun} 0 items"),
            )
        };
        self.report(outcome, reason)
    }

    fn abort(self, reason: String) -> FixReport {
        self.report(FixOutcome::Denied, reason)
    }

    fn report(self, outcome: FixOutcome, reason: String) -> FixReport {
        FixReport {
            outcome,
            reason,
            changed: self.changed,
            protected: self.protected,
            unresolved: self.unresolved,
            not_permitted: self.not_permitted,
        }
    }
}

/// Rewrite a name with whitespace replaced by `separator`, lower-cased.
///
/// Returns `None` when the name has no whitespace (nothing to do).
#[must_use]
pub fn normalized_name(name: &str, separator: char) -> Option<String> {
    if !name.chars().any(char::is_whitespace) {
        return None;
    }
    let replaced: String = name
        .chars()
        .map(|c| if c.is_whitespace() { separator } else { c })
        .collect();
    Some(replaced.to_lowercase())
}

/// Applies proposals through the safety gate.
#[derive(Debug, Clone)]
pub struct FixApplier {
    gate: SafetyGate,
    separator: char,
}

impl Default for FixApplier {
    fn default() -> Self {
        Self::new(SafetyGate::default())
    }
}

impl FixApplier {
    /// Create an applier using `-` as the naming separator.
    #[must_use]
    pub fn new(gate: SafetyGate) -> Self {
        Self {
            gate,
            separator: '-',
        }
    }

    /// Builder: set the naming separator.
    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// The naming separator.
    #[must_use]
    pub fn separator(&self) -> char {
        self.separator
    }

    /// The gate in use.
    #[must_use]
    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    /// Apply one proposal to the guild.
    pub async fn apply(&self, guild: &dyn GuildState, proposal: &ChangeProposal) -> FixReport {
        let Some(required) = self.gate.required_capabilities(&proposal.kind) else {
            warn!(kind = %proposal.kind, "Refusing unknown issue type");
            return FixReport::denied(format!("unknown issue type: {}", proposal.kind));
        };

        let held = match guild.bot_capabilities().await {
            Ok(held) => held,
            Err(e) => return FixReport::denied(e.to_string()),
        };
        if !self.gate.has_capability(&held, &required) {
            let missing = held.missing(&required);
            let names: Vec<&str> = missing.iter().map(|c| c.label()).collect();
            return FixReport::denied(format!("bot is missing permissions: {}", names.join(", ")));
        }

        let report = match proposal.kind {
            ProposalKind::PermissionRedundancy => {
                self.remove_redundant_overwrites(guild, proposal).await
            },
            ProposalKind::NamingInconsistency => self.normalize_names(guild, proposal, &held).await,
            ProposalKind::Unrecognized(_) => FixReport::denied("unknown issue type"),
        };

        info!(
            kind = %proposal.kind,
            outcome = %report.outcome,
            changed = report.changed.len(),
            protected = report.protected.len(),
            unresolved = report.unresolved.len(),
            "Processed cleanup proposal"
        );
        report
    }

    async fn remove_redundant_overwrites(
        &self,
        guild: &dyn GuildState,
        proposal: &ChangeProposal,
    ) -> FixReport {
        let mut progress = Progress::default();

        let (everyone, channels) = match (guild.everyone_role().await, guild.channels().await) {
            (Ok(everyone), Ok(channels)) => (everyone, channels),
            (Err(e), _) | (_, Err(e)) => return progress.abort(e.to_string()),
        };
        let target = OverwriteTarget::Role(everyone.id.clone());

        for name in &proposal.affected_items {
            if self.gate.is_protected(name) {
                warn!(item = %name, "Skipping protected channel");
                progress.protected.push(name.clone());
                continue;
            }
            let Some(channel) = find_channel(&channels, name) else {
                debug!(item = %name, "Channel no longer exists");
                progress.unresolved.push(name.clone());
                continue;
            };

            let caps = match guild.bot_channel_capabilities(&channel.id).await {
                Ok(caps) => caps,
                Err(e) if e.is_not_found() => {
                    progress.unresolved.push(name.clone());
                    continue;
                },
                Err(e) => return progress.abort(e.to_string()),
            };
            let needed = Capability::ManagePermissions;
            if !self.admits(&mut progress, name, &channel.name, &caps, needed) {
                continue;
            }

            let Some(overwrite) = channel.overwrite_for(&target) else {
                continue;
            };
            let redundant = overwrite.redundant_against(&everyone.permissions);
            if redundant.is_empty() {
                continue;
            }
            let cleaned = overwrite.without(&redundant);
            let next = if cleaned.is_empty() { None } else { Some(cleaned) };

            match guild.set_channel_overwrite(&channel.id, &target, next).await {
                Ok(()) => progress.changed.push(channel.name.clone()),
                Err(e) if e.is_not_found() => progress.unresolved.push(name.clone()),
                Err(e) => return progress.abort(refusal(&e, name)),
            }
        }

        progress.finish("Removed redundant overwrites on")
    }

    async fn normalize_names(
        &self,
        guild: &dyn GuildState,
        proposal: &ChangeProposal,
        held: &CapabilitySet,
    ) -> FixReport {
        let mut progress = Progress::default();

        let (channels, roles) = match (guild.channels().await, guild.roles().await) {
            (Ok(channels), Ok(roles)) => (channels, roles),
            (Err(e), _) | (_, Err(e)) => return progress.abort(e.to_string()),
        };

        for name in &proposal.affected_items {
            if self.gate.is_protected(name) {
                warn!(item = %name, "Skipping protected resource");
                progress.protected.push(name.clone());
                continue;
            }

            if let Some(channel) = find_channel(&channels, name) {
                let Some(renamed) = normalized_name(&channel.name, self.separator) else {
                    continue;
                };
                let caps = match guild.bot_channel_capabilities(&channel.id).await {
                    Ok(caps) => caps,
                    Err(e) if e.is_not_found() => {
                        progress.unresolved.push(name.clone());
                        continue;
                    },
                    Err(e) => return progress.abort(e.to_string()),
                };
                let needed = Capability::ManageChannels;
                if !self.admits(&mut progress, name, &channel.name, &caps, needed) {
                    continue;
                }
                match guild.rename_channel(&channel.id, &renamed).await {
                    Ok(()) => progress.changed.push(format!("{} → {renamed}", channel.name)),
                    Err(e) if e.is_not_found() => progress.unresolved.push(name.clone()),
                    Err(e) => return progress.abort(refusal(&e, name)),
                }
            } else if let Some(role) = find_role(&roles, name) {
                let Some(renamed) = normalized_name(&role.name, self.separator) else {
                    continue;
                };
                if role.managed {
                    progress.not_permitted.push(name.clone());
                    continue;
                }
                if !self.admits(&mut progress, name, &role.name, held, Capability::ManageRoles) {
                    continue;
                }
                match guild.rename_role(&role.id, &renamed).await {
                    Ok(()) => progress.changed.push(format!("{} → {renamed}", role.name)),
                    Err(e) if e.is_not_found() => progress.unresolved.push(name.clone()),
                    Err(e) => return progress.abort(refusal(&e, name)),
                }
            } else {
                debug!(item = %name, "Resource no longer exists");
                progress.unresolved.push(name.clone());
            }
        }

        progress.finish("Renamed")
    }

    /// Ask the gate whether `held` may change the resolved `resource`.
    /// A refusal is recorded against `item`.
    fn admits(
        &self,
        progress: &mut Progress,
        item: &str,
        resource: &str,
        held: &CapabilitySet,
        needed: Capability,
    ) -> bool {
        let check = self
            .gate
            .check_mutation(resource, held, &CapabilitySet::from([needed]));
        if check.protected {
            warn!(item = %item, "Skipping protected resource");
            progress.protected.push(item.to_owned());
        } else if !check.missing.is_empty() {
            debug!(item = %item, missing = ?check.missing, "Bot lacks capability on resource");
            progress.not_permitted.push(item.to_owned());
        }
        check.permits()
    }
}

fn refusal(error: &PlatformError, item: &str) -> String {
    format!("{item}: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::ProtectedNames;
    use guildsmith_core::{Channel, ChannelKind, PermissionOverwrite};
    use guildsmith_test::{MockGuild, Mutation, everyone_allowing};

    fn naming(items: &[&str]) -> ChangeProposal {
        ChangeProposal::new(ProposalKind::NamingInconsistency, "Names use spaces")
            .with_affected_items(items.iter().copied())
    }

    fn redundancy(items: &[&str]) -> ChangeProposal {
        ChangeProposal::new(ProposalKind::PermissionRedundancy, "Redundant overwrites")
            .with_affected_items(items.iter().copied())
    }

    #[test]
    fn test_normalized_name() {
        assert_eq!(normalized_name("My Channel", '-').as_deref(), Some("my-channel"));
        assert_eq!(normalized_name("a\tb c", '_').as_deref(), Some("a_b_c"));
        assert_eq!(normalized_name("Already-Fine", '-'), None);
    }

    #[tokio::test]
    async fn test_rename_channel_then_reapply_skips() {
        let guild = MockGuild::new().with_text_channel("my channel");
        let applier = FixApplier::default();

        let report = applier.apply(&guild, &naming(&["my channel"])).await;
        assert_eq!(report.outcome, FixOutcome::Applied);
        assert!(report.reason.contains('1'));
        assert!(guild.channel_named("my-channel").is_some());

        let report = applier.apply(&guild, &naming(&["my channel"])).await;
        assert_eq!(report.outcome, FixOutcome::Skipped);
        assert_eq!(report.unresolved, vec!["my channel".to_string()]);
    }

    #[tokio::test]
    async fn test_protected_never_mutated() {
        let guild = MockGuild::new().with_text_channel("general chat");
        let report = FixApplier::default()
            .apply(&guild, &naming(&["general chat"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Skipped);
        assert_eq!(report.protected, vec!["general chat".to_string()]);
        assert!(guild.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_rename_role() {
        let guild = MockGuild::new().with_role("Event Team");
        let report = FixApplier::default()
            .apply(&guild, &naming(&["Event Team"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Applied);
        assert!(guild.role_named("event-team").is_some());
    }

    #[tokio::test]
    async fn test_unknown_kind_denied() {
        let guild = MockGuild::new().with_text_channel("my channel");
        let proposal = ChangeProposal::new(
            ProposalKind::Unrecognized("delete_channel".to_string()),
            "Delete it",
        )
        .with_affected_items(["my channel"]);
        let report = FixApplier::default().apply(&guild, &proposal).await;
        assert_eq!(report.outcome, FixOutcome::Denied);
        assert!(report.reason.contains("unknown issue type"));
        assert!(guild.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_missing_capability_denied() {
        let guild = MockGuild::new()
            .with_text_channel("my channel")
            .with_bot_capabilities(CapabilitySet::from([Capability::ManageChannels]));
        let report = FixApplier::default()
            .apply(&guild, &redundancy(&["my channel"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Denied);
        assert!(report.reason.contains("Manage Permissions"));
    }

    #[tokio::test]
    async fn test_platform_refusal_denies_with_error_text() {
        let guild = MockGuild::new()
            .with_text_channel("first room")
            .with_text_channel("locked room")
            .with_forbidden("locked room");
        let report = FixApplier::default()
            .apply(&guild, &naming(&["first room", "locked room"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Denied);
        assert!(report.reason.contains("Missing Permissions"));
        assert_eq!(report.changed.len(), 1);
    }

    #[tokio::test]
    async fn test_channel_level_capability_checked() {
        let guild = MockGuild::new()
            .with_text_channel("quiet room")
            .with_bot_channel_capabilities("quiet room", CapabilitySet::empty());
        let report = FixApplier::default()
            .apply(&guild, &naming(&["quiet room"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Skipped);
        assert_eq!(report.not_permitted, vec!["quiet room".to_string()]);
        assert!(guild.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_channel_administrator_admits_rename() {
        let guild = MockGuild::new()
            .with_text_channel("team room")
            .with_bot_channel_capabilities(
                "team room",
                CapabilitySet::from([Capability::Administrator]),
            );
        let report = FixApplier::default()
            .apply(&guild, &naming(&["team room"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Applied);
        assert!(report.not_permitted.is_empty());
    }

    #[tokio::test]
    async fn test_role_rename_needs_manage_roles() {
        let guild = MockGuild::new()
            .with_text_channel("side room")
            .with_role("Event Team")
            .with_bot_capabilities(CapabilitySet::from([Capability::ManageChannels]));
        let report = FixApplier::default()
            .apply(&guild, &naming(&["side room", "Event Team"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Applied);
        assert_eq!(report.changed, vec!["side room → side-room".to_string()]);
        assert_eq!(report.not_permitted, vec!["Event Team".to_string()]);
        assert!(guild.role_named("Event Team").is_some());
    }

    #[tokio::test]
    async fn test_custom_separator_and_keywords() {
        let guild = MockGuild::new()
            .with_text_channel("vip lounge")
            .with_text_channel("general chat");
        let applier =
            FixApplier::new(SafetyGate::new(ProtectedNames::new(["vip"]))).with_separator('_');
        let report = applier
            .apply(&guild, &naming(&["vip lounge", "general chat"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Applied);
        assert!(guild.channel_named("general_chat").is_some());
        assert!(guild.channel_named("vip lounge").is_some());
    }

    #[tokio::test]
    async fn test_redundant_overwrite_removed_entirely() {
        let guild = MockGuild::new();
        let overwrite =
            everyone_allowing(&guild, &[Capability::ViewChannel, Capability::SendMessages]);
        let guild = guild.with_everyone_overwrite("fun zone", overwrite);
        let target = guild.everyone_target();

        let report = FixApplier::default()
            .apply(&guild, &redundancy(&["fun zone"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Applied);
        let channel = guild.channel_named("fun zone").unwrap();
        assert!(channel.overwrite_for(&target).is_none());
        assert!(matches!(
            guild.mutations().as_slice(),
            [Mutation::SetOverwrite { removed: true, .. }]
        ));
    }

    #[tokio::test]
    async fn test_restrictive_overwrite_entries_kept() {
        let guild = MockGuild::new();
        let overwrite = PermissionOverwrite::new(guild.everyone_target())
            .allowing(Capability::ViewChannel)
            .denying(Capability::SendMessages);
        let guild = guild.with_everyone_overwrite("art room", overwrite);
        let target = guild.everyone_target();

        let report = FixApplier::default()
            .apply(&guild, &redundancy(&["art room"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Applied);
        let channel = guild.channel_named("art room").unwrap();
        let remaining = channel.overwrite_for(&target).unwrap();
        assert_eq!(remaining.state(Capability::ViewChannel), None);
        assert_eq!(remaining.state(Capability::SendMessages), Some(false));
    }

    #[tokio::test]
    async fn test_non_redundant_overwrite_skipped() {
        let guild = MockGuild::new();
        let overwrite =
            PermissionOverwrite::new(guild.everyone_target()).denying(Capability::SendMessages);
        let guild = guild
            .with_everyone_overwrite("read only", overwrite)
            .with_channel(Channel::new("77", "no overwrite", ChannelKind::Text));

        let report = FixApplier::default()
            .apply(&guild, &redundancy(&["read only", "no overwrite"]))
            .await;
        assert_eq!(report.outcome, FixOutcome::Skipped);
        assert!(guild.mutations().is_empty());
    }
}
