//! Guild model and the live server-state provider.
//!
//! The cleanup workflow never caches platform state across steps: every
//! fix re-reads channels and roles through [`GuildState`] at apply time.

use crate::capability::{Capability, CapabilitySet};
use crate::error::PlatformResult;
use crate::types::{ChannelId, GuildId, RoleId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kind of channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Text channel.
    #[default]
    Text,
    /// Voice channel.
    Voice,
    /// Category grouping other channels.
    Category,
    /// Announcement (news) channel.
    Announcement,
    /// Forum channel.
    Forum,
}

/// Whom a permission overwrite applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum OverwriteTarget {
    /// A role (including the everyone role).
    Role(RoleId),
    /// A single member.
    Member(UserId),
}

/// Explicit allow/deny entries for one target on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    /// Target of the overwrite.
    pub target: OverwriteTarget,
    /// Explicitly allowed capabilities.
    #[serde(default)]
    pub allow: CapabilitySet,
    /// Explicitly denied capabilities.
    #[serde(default)]
    pub deny: CapabilitySet,
}

impl PermissionOverwrite {
    /// Create an empty overwrite for a target.
    #[must_use]
    pub fn new(target: OverwriteTarget) -> Self {
        Self {
            target,
            allow: CapabilitySet::empty(),
            deny: CapabilitySet::empty(),
        }
    }

    /// Add an explicit allow.
    #[must_use]
    pub fn allowing(mut self, capability: Capability) -> Self {
        self.deny.remove(capability);
        self.allow.insert(capability);
        self
    }

    /// Add an explicit deny.
    #[must_use]
    pub fn denying(mut self, capability: Capability) -> Self {
        self.allow.remove(capability);
        self.deny.insert(capability);
        self
    }

    /// Tri-state lookup: `Some(true)` allow, `Some(false)` deny, `None` inherit.
    #[must_use]
    pub fn state(&self, capability: Capability) -> Option<bool> {
        if self.allow.contains(capability) {
            Some(true)
        } else if self.deny.contains(capability) {
            Some(false)
        } else {
            None
        }
    }

    /// Entries whose effect equals the inherited base permission.
    ///
    /// An allow of a capability the base already grants, or a deny of one the
    /// base does not grant, changes nothing.
    #[must_use]
    pub fn redundant_against(&self, base: &CapabilitySet) -> Vec<Capability> {
        let base = base.effective();
        Capability::ALL
            .into_iter()
            .filter(|cap| match self.state(*cap) {
                Some(true) => base.contains(*cap),
                Some(false) => !base.contains(*cap),
                None => false,
            })
            .collect()
    }

    /// The overwrite with the given entries cleared back to inherit.
    #[must_use]
    pub fn without(&self, capabilities: &[Capability]) -> Self {
        let mut next = self.clone();
        for cap in capabilities {
            next.allow.remove(*cap);
            next.deny.remove(*cap);
        }
        next
    }

    /// Whether the overwrite has no explicit entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

/// A channel or category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel id.
    pub id: ChannelId,
    /// Display name.
    pub name: String,
    /// Channel kind.
    #[serde(default)]
    pub kind: ChannelKind,
    /// Parent category, if any.
    #[serde(default)]
    pub category: Option<ChannelId>,
    /// Sort position.
    #[serde(default)]
    pub position: u32,
    /// Channel topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Whether the channel is age-restricted.
    #[serde(default)]
    pub nsfw: bool,
    /// Permission overwrites.
    #[serde(default)]
    pub overwrites: Vec<PermissionOverwrite>,
}

impl Channel {
    /// Create a channel with defaults.
    #[must_use]
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            category: None,
            position: 0,
            topic: None,
            nsfw: false,
            overwrites: Vec::new(),
        }
    }

    /// Builder: set the parent category.
    #[must_use]
    pub fn in_category(mut self, category: impl Into<ChannelId>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder: add a permission overwrite.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: PermissionOverwrite) -> Self {
        self.overwrites.retain(|o| o.target != overwrite.target);
        self.overwrites.push(overwrite);
        self
    }

    /// The overwrite for a target, if one exists.
    #[must_use]
    pub fn overwrite_for(&self, target: &OverwriteTarget) -> Option<&PermissionOverwrite> {
        self.overwrites.iter().find(|o| &o.target == target)
    }

    /// Whether this is a category.
    #[must_use]
    pub fn is_category(&self) -> bool {
        self.kind == ChannelKind::Category
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role id.
    pub id: RoleId,
    /// Display name.
    pub name: String,
    /// Hierarchy position (0 is the everyone role).
    #[serde(default)]
    pub position: u32,
    /// Base permissions granted by the role.
    #[serde(default)]
    pub permissions: CapabilitySet,
    /// Managed by an integration; cannot be edited.
    #[serde(default)]
    pub managed: bool,
    /// Number of members holding the role.
    #[serde(default)]
    pub member_count: u64,
    /// Display colour as RGB.
    #[serde(default)]
    pub color: u32,
    /// Shown separately in the member list.
    #[serde(default)]
    pub hoist: bool,
    /// Anyone may mention the role.
    #[serde(default)]
    pub mentionable: bool,
}

impl Role {
    /// Create a role with defaults.
    #[must_use]
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>, permissions: CapabilitySet) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: 0,
            permissions,
            managed: false,
            member_count: 0,
            color: 0,
            hoist: false,
            mentionable: false,
        }
    }

    /// Builder: set the hierarchy position.
    #[must_use]
    pub fn at_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

/// Summary of a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildProfile {
    /// Guild id.
    pub id: GuildId,
    /// Guild name.
    pub name: String,
    /// Total member count.
    #[serde(default)]
    pub member_count: u64,
    /// The guild owner.
    pub owner_id: UserId,
}

/// Who sent a recent message, as far as usage analysis cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Sent by a bot account.
    #[serde(default)]
    pub author_bot: bool,
    /// Sent through a webhook.
    #[serde(default)]
    pub webhook: bool,
}

impl MessageSummary {
    /// A message from a person.
    #[must_use]
    pub fn human() -> Self {
        Self::default()
    }

    /// A message from a bot account.
    #[must_use]
    pub fn bot() -> Self {
        Self {
            author_bot: true,
            webhook: false,
        }
    }

    /// Whether a bot or webhook sent it.
    #[must_use]
    pub fn is_automated(&self) -> bool {
        self.author_bot || self.webhook
    }
}

/// Find a channel by exact name.
#[must_use]
pub fn find_channel<'a>(channels: &'a [Channel], name: &str) -> Option<&'a Channel> {
    channels.iter().find(|c| c.name == name)
}

/// Find a role by exact name.
#[must_use]
pub fn find_role<'a>(roles: &'a [Role], name: &str) -> Option<&'a Role> {
    roles.iter().find(|r| r.name == name)
}

/// Live server-state provider for one guild.
///
/// Implementations talk to the chat platform (or an exported snapshot).
/// Reads must reflect the current state: the cleanup workflow relies on it
/// to re-resolve names at fix time.
#[async_trait]
pub trait GuildState: Send + Sync {
    /// The guild this provider is bound to.
    fn guild_id(&self) -> &GuildId;

    /// Name, member count and owner.
    async fn profile(&self) -> PlatformResult<GuildProfile>;

    /// Every channel and category, in position order.
    async fn channels(&self) -> PlatformResult<Vec<Channel>>;

    /// Every role, including the everyone role.
    async fn roles(&self) -> PlatformResult<Vec<Role>>;

    /// The default role every member holds.
    async fn everyone_role(&self) -> PlatformResult<Role>;

    /// The bot's guild-level capabilities.
    async fn bot_capabilities(&self) -> PlatformResult<CapabilitySet>;

    /// The bot's capabilities on one channel, after overwrites.
    async fn bot_channel_capabilities(&self, channel: &ChannelId)
    -> PlatformResult<CapabilitySet>;

    /// Up to `limit` of the newest messages in a channel, newest first.
    async fn recent_messages(
        &self,
        channel: &ChannelId,
        limit: usize,
    ) -> PlatformResult<Vec<MessageSummary>>;

    /// Rename a channel.
    async fn rename_channel(&self, channel: &ChannelId, name: &str) -> PlatformResult<()>;

    /// Rename a role.
    async fn rename_role(&self, role: &RoleId, name: &str) -> PlatformResult<()>;

    /// Replace (`Some`) or remove (`None`) the overwrite for `target` on a channel.
    async fn set_channel_overwrite(
        &self,
        channel: &ChannelId,
        target: &OverwriteTarget,
        overwrite: Option<PermissionOverwrite>,
    ) -> PlatformResult<()>;
}
