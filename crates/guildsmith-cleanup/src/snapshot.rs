//! The guild snapshot an advisor sees.
//!
//! Protected resources are filtered out here, before anything leaves the
//! process, so an advisor cannot propose changes to what it never saw.

use guildsmith_core::{
    Capability, CapabilitySet, Channel, ChannelId, ChannelKind, GuildState, OverwriteTarget,
    PlatformResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::applier::{FixApplier, normalized_name};

/// Messages sampled per channel for usage analysis.
pub const USAGE_SAMPLE_SIZE: usize = 10;

/// How much analysis goes into the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    /// Structure only.
    Basic,
    /// Structure plus redundant-overwrite findings.
    #[default]
    Detailed,
    /// Everything, including naming findings.
    Comprehensive,
}

impl AnalysisDepth {
    /// Lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Detailed => "detailed",
            Self::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "detailed" => Ok(Self::Detailed),
            "comprehensive" => Ok(Self::Comprehensive),
            other => Err(format!("unknown analysis depth: {other}")),
        }
    }
}

/// What the advisor should concentrate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    /// No preference.
    #[default]
    All,
    /// Permission overwrites.
    Permissions,
    /// Channel and role names.
    Naming,
    /// Categories and layout.
    Structure,
}

impl FocusArea {
    /// Lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Permissions => "permissions",
            Self::Naming => "naming",
            Self::Structure => "structure",
        }
    }
}

impl fmt::Display for FocusArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FocusArea {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "permissions" => Ok(Self::Permissions),
            "naming" => Ok(Self::Naming),
            "structure" => Ok(Self::Structure),
            other => Err(format!("unknown focus area: {other}")),
        }
    }
}

/// A role as the advisor sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    /// Role name.
    pub name: String,
    /// Hierarchy position.
    pub position: u32,
    /// Base permissions.
    pub permissions: CapabilitySet,
    /// Colour as RGB.
    pub color: u32,
    /// Mentionable by anyone.
    pub mentionable: bool,
    /// Shown separately.
    pub hoist: bool,
    /// Members holding it.
    pub member_count: u64,
}

/// A channel as the advisor sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    /// Channel name.
    pub name: String,
    /// Channel kind.
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    /// Sort position.
    pub position: u32,
    /// Number of permission overwrites.
    pub overwrites: usize,
    /// Topic, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Age-restricted.
    pub nsfw: bool,
}

impl From<&Channel> for ChannelSummary {
    fn from(channel: &Channel) -> Self {
        Self {
            name: channel.name.clone(),
            kind: channel.kind,
            position: channel.position,
            overwrites: channel.overwrites.len(),
            topic: channel.topic.clone(),
            nsfw: channel.nsfw,
        }
    }
}

/// A category and its visible channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Category name.
    pub name: String,
    /// Sort position.
    pub position: u32,
    /// Number of permission overwrites on the category.
    pub overwrites: usize,
    /// Non-protected channels inside it.
    pub channels: Vec<ChannelSummary>,
}

/// An everyone-role overwrite that restates base permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFinding {
    /// Channel name.
    pub channel: String,
    /// Entries that change nothing.
    pub redundant: Vec<Capability>,
}

/// A channel name containing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingFinding {
    /// Current name.
    pub current: String,
    /// Name after normalisation.
    pub suggested: String,
}

/// A channel whose recent history is mostly bots and webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOnlyFinding {
    /// Channel name.
    pub channel: String,
    /// Sampled messages sent by a bot or webhook.
    pub automated: usize,
    /// Messages sampled.
    pub sampled: usize,
}

impl ReadOnlyFinding {
    /// Share of automated messages, as a whole percentage.
    #[must_use]
    pub fn automated_percent(&self) -> usize {
        self.automated
            .saturating_mul(100)
            .checked_div(self.sampled)
            .unwrap_or(0)
    }
}

/// How text channels are being used, from their recent history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageFindings {
    /// Channels with no recent messages.
    pub inactive_channels: Vec<String>,
    /// Channels where more than 80% of recent messages are automated.
    pub potential_read_only: Vec<ReadOnlyFinding>,
}

impl UsageFindings {
    /// Whether there is nothing to report.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inactive_channels.is_empty() && self.potential_read_only.is_empty()
    }

    /// Sample each channel's history. Channels whose history cannot be read
    /// are left out.
    async fn sample(guild: &dyn GuildState, channels: &[&Channel]) -> Self {
        let mut usage = Self::default();
        for channel in channels {
            let messages = match guild.recent_messages(&channel.id, USAGE_SAMPLE_SIZE).await {
                Ok(messages) => messages,
                Err(e) => {
                    debug!(channel = %channel.name, error = %e, "Skipping unreadable history");
                    continue;
                },
            };
            if messages.is_empty() {
                usage.inactive_channels.push(channel.name.clone());
                continue;
            }
            let automated = messages.iter().filter(|m| m.is_automated()).count();
            // More than 80%: automated / sampled > 4 / 5.
            if automated.saturating_mul(5) > messages.len().saturating_mul(4) {
                usage.potential_read_only.push(ReadOnlyFinding {
                    channel: channel.name.clone(),
                    automated,
                    sampled: messages.len(),
                });
            }
        }
        usage
    }
}

/// Everything the advisor is shown about one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSnapshot {
    /// Guild name.
    pub server_name: String,
    /// Member count.
    pub member_count: u64,
    /// Depth the snapshot was taken at.
    pub depth: AnalysisDepth,
    /// Requested focus.
    pub focus: FocusArea,
    /// Non-default, non-protected roles.
    pub roles: Vec<RoleSummary>,
    /// Non-protected categories.
    pub categories: Vec<CategorySummary>,
    /// Non-protected channels outside any category.
    pub channels: Vec<ChannelSummary>,
    /// Redundant overwrite findings (detailed and above).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permission_findings: Vec<PermissionFinding>,
    /// Naming findings (comprehensive only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub naming_findings: Vec<NamingFinding>,
    /// Channel usage (comprehensive only).
    #[serde(default, skip_serializing_if = "UsageFindings::is_empty")]
    pub usage: UsageFindings,
}

impl GuildSnapshot {
    /// Read the guild and build a snapshot.
    ///
    /// # Errors
    ///
    /// Propagates any platform read failure.
    pub async fn capture(
        guild: &dyn GuildState,
        applier: &FixApplier,
        depth: AnalysisDepth,
        focus: FocusArea,
    ) -> PlatformResult<Self> {
        let gate = applier.gate();
        let profile = guild.profile().await?;
        let channels = guild.channels().await?;
        let roles = guild.roles().await?;
        let everyone = guild.everyone_role().await?;

        let role_summaries = roles
            .iter()
            .filter(|r| r.id != everyone.id && !gate.is_protected(&r.name))
            .map(|r| RoleSummary {
                name: r.name.clone(),
                position: r.position,
                permissions: r.permissions.clone(),
                color: r.color,
                mentionable: r.mentionable,
                hoist: r.hoist,
                member_count: r.member_count,
            })
            .collect();

        // A channel is visible when neither it nor its category is protected.
        let hidden_categories: Vec<&ChannelId> = channels
            .iter()
            .filter(|c| c.is_category() && gate.is_protected(&c.name))
            .map(|c| &c.id)
            .collect();
        let visible = |c: &&Channel| {
            !gate.is_protected(&c.name)
                && c
                    .category
                    .as_ref()
                    .is_none_or(|parent| !hidden_categories.contains(&parent))
        };

        let categories = channels
            .iter()
            .filter(|c| c.is_category())
            .filter(visible)
            .map(|category| CategorySummary {
                name: category.name.clone(),
                position: category.position,
                overwrites: category.overwrites.len(),
                channels: channels
                    .iter()
                    .filter(|c| c.category.as_ref() == Some(&category.id))
                    .filter(visible)
                    .map(ChannelSummary::from)
                    .collect(),
            })
            .collect();

        let uncategorised = channels
            .iter()
            .filter(|c| !c.is_category() && c.category.is_none())
            .filter(visible)
            .map(ChannelSummary::from)
            .collect();

        let mut snapshot = Self {
            server_name: profile.name,
            member_count: profile.member_count,
            depth,
            focus,
            roles: role_summaries,
            categories,
            channels: uncategorised,
            permission_findings: Vec::new(),
            naming_findings: Vec::new(),
            usage: UsageFindings::default(),
        };

        if depth >= AnalysisDepth::Detailed {
            let target = OverwriteTarget::Role(everyone.id.clone());
            snapshot.permission_findings = channels
                .iter()
                .filter(visible)
                .filter_map(|c| {
                    let redundant = c
                        .overwrite_for(&target)?
                        .redundant_against(&everyone.permissions);
                    (!redundant.is_empty()).then(|| PermissionFinding {
                        channel: c.name.clone(),
                        redundant,
                    })
                })
                .collect();
        }

        if depth == AnalysisDepth::Comprehensive {
            snapshot.naming_findings = channels
                .iter()
                .filter(|c| c.kind == ChannelKind::Text)
                .filter(visible)
                .filter_map(|c| {
                    normalized_name(&c.name, applier.separator()).map(|suggested| NamingFinding {
                        current: c.name.clone(),
                        suggested,
                    })
                })
                .collect();

            let text_channels: Vec<&Channel> = channels
                .iter()
                .filter(|c| c.kind == ChannelKind::Text)
                .filter(visible)
                .collect();
            snapshot.usage = UsageFindings::sample(guild, &text_channels).await;
        }

        Ok(snapshot)
    }

    /// Every resource name the snapshot mentions.
    #[must_use]
    pub fn resource_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.roles.iter().map(|r| r.name.as_str()).collect();
        for category in &self.categories {
            names.push(category.name.as_str());
            names.extend(category.channels.iter().map(|c| c.name.as_str()));
        }
        names.extend(self.channels.iter().map(|c| c.name.as_str()));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildsmith_core::MessageSummary;
    use guildsmith_test::{MockGuild, everyone_allowing};

    fn guild() -> MockGuild {
        let guild = MockGuild::new()
            .with_category("Fun Stuff")
            .with_text_channel_in("off topic", "Fun Stuff")
            .with_text_channel_in("mod chat", "Fun Stuff")
            .with_category("Staff Area")
            .with_text_channel_in("art room", "Staff Area")
            .with_text_channel("general")
            .with_role("Moderator")
            .with_role("Artists");
        let overwrite = everyone_allowing(&guild, &[Capability::ViewChannel]);
        guild.with_everyone_overwrite("music room", overwrite)
    }

    #[tokio::test]
    async fn test_protected_resources_excluded() {
        let snapshot = GuildSnapshot::capture(
            &guild(),
            &FixApplier::default(),
            AnalysisDepth::Basic,
            FocusArea::All,
        )
        .await
        .unwrap();

        let names = snapshot.resource_names();
        assert!(names.contains(&"off topic"));
        assert!(names.contains(&"Artists"));
        assert!(names.contains(&"music room"));
        for hidden in ["mod chat", "Staff Area", "art room", "general", "Moderator", "@everyone"] {
            assert!(!names.contains(&hidden), "{hidden} leaked into snapshot");
        }
        assert!(snapshot.permission_findings.is_empty());
    }

    #[tokio::test]
    async fn test_detailed_finds_redundant_overwrites() {
        let snapshot = GuildSnapshot::capture(
            &guild(),
            &FixApplier::default(),
            AnalysisDepth::Detailed,
            FocusArea::Permissions,
        )
        .await
        .unwrap();
        assert_eq!(
            snapshot.permission_findings,
            vec![PermissionFinding {
                channel: "music room".to_string(),
                redundant: vec![Capability::ViewChannel],
            }]
        );
        assert!(snapshot.naming_findings.is_empty());
    }

    #[tokio::test]
    async fn test_comprehensive_finds_names() {
        let snapshot = GuildSnapshot::capture(
            &guild(),
            &FixApplier::default(),
            AnalysisDepth::Comprehensive,
            FocusArea::All,
        )
        .await
        .unwrap();
        let suggested: Vec<&str> = snapshot
            .naming_findings
            .iter()
            .map(|f| f.suggested.as_str())
            .collect();
        assert!(suggested.contains(&"off-topic"));
        assert!(suggested.contains(&"music-room"));
        assert!(!suggested.contains(&"mod-chat"));
        assert!(!suggested.contains(&"art-room"));
    }

    #[tokio::test]
    async fn test_comprehensive_samples_usage() {
        let guild = guild()
            .with_text_channel("bot feed")
            .with_text_channel("chatter")
            .with_text_channel("mostly bots")
            .with_messages("bot feed", vec![MessageSummary::bot(); 10])
            .with_messages(
                "chatter",
                vec![MessageSummary::human(), MessageSummary::bot()],
            )
            .with_messages(
                "mostly bots",
                [vec![MessageSummary::bot(); 4], vec![MessageSummary::human()]].concat(),
            )
            .with_messages("general", vec![MessageSummary::bot(); 10]);

        let snapshot = GuildSnapshot::capture(
            &guild,
            &FixApplier::default(),
            AnalysisDepth::Comprehensive,
            FocusArea::All,
        )
        .await
        .unwrap();

        let usage = &snapshot.usage;
        // "mostly bots" sits at exactly 80%, which is not enough.
        assert_eq!(
            usage.potential_read_only,
            vec![ReadOnlyFinding {
                channel: "bot feed".to_string(),
                automated: 10,
                sampled: 10,
            }]
        );
        assert_eq!(usage.potential_read_only[0].automated_percent(), 100);
        assert!(usage.inactive_channels.contains(&"off topic".to_string()));
        assert!(!usage.inactive_channels.contains(&"chatter".to_string()));
        // Protected channels are never sampled.
        assert!(!usage.inactive_channels.contains(&"mod chat".to_string()));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["usage"]["potential_read_only"][0]["channel"], "bot feed");
    }

    #[tokio::test]
    async fn test_usage_only_at_comprehensive() {
        let guild = guild().with_text_channel("bot feed");
        let snapshot = GuildSnapshot::capture(
            &guild,
            &FixApplier::default(),
            AnalysisDepth::Detailed,
            FocusArea::All,
        )
        .await
        .unwrap();
        assert!(snapshot.usage.is_empty());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("usage").is_none());
    }

    #[tokio::test]
    async fn test_read_failure_propagates() {
        let guild = MockGuild::new().with_failing_reads();
        let result = GuildSnapshot::capture(
            &guild,
            &FixApplier::default(),
            AnalysisDepth::Basic,
            FocusArea::All,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_depth_and_focus_parse() {
        assert_eq!("Comprehensive".parse::<AnalysisDepth>().unwrap(), AnalysisDepth::Comprehensive);
        assert_eq!("naming".parse::<FocusArea>().unwrap(), FocusArea::Naming);
        assert!("deep".parse::<AnalysisDepth>().is_err());
    }
}
