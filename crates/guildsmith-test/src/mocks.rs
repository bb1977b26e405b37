//! Mock implementations for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use guildsmith_core::{
    Capability, CapabilitySet, Channel, ChannelId, ChannelKind, GuildId, GuildProfile, GuildState,
    MessageSummary, OverwriteTarget, PermissionOverwrite, PlatformError, PlatformResult, Role,
    RoleId,
};

use crate::fixtures::{test_cleanup_bot, test_everyone_base, test_guild_id, test_owner};

/// A mutation the mock guild accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A channel was renamed.
    RenameChannel {
        /// Channel id.
        id: ChannelId,
        /// Name before.
        from: String,
        /// Name after.
        to: String,
    },
    /// A role was renamed.
    RenameRole {
        /// Role id.
        id: RoleId,
        /// Name before.
        from: String,
        /// Name after.
        to: String,
    },
    /// A channel overwrite was replaced or removed.
    SetOverwrite {
        /// Channel id.
        channel: ChannelId,
        /// Overwrite target.
        target: OverwriteTarget,
        /// Whether the overwrite was removed entirely.
        removed: bool,
    },
}

#[derive(Debug)]
struct MockGuildState {
    profile: GuildProfile,
    channels: Vec<Channel>,
    roles: Vec<Role>,
    everyone: RoleId,
    bot: CapabilitySet,
    bot_per_channel: HashMap<ChannelId, CapabilitySet>,
    messages: HashMap<ChannelId, Vec<MessageSummary>>,
    forbidden: HashSet<String>,
    failing_reads: bool,
    mutations: Vec<Mutation>,
    next_id: u64,
}

impl MockGuildState {
    fn allocate_id(&mut self) -> String {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id.to_string()
    }

    fn check_reads(&self) -> PlatformResult<()> {
        if self.failing_reads {
            Err(PlatformError::Request("mock guild is unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// In-memory [`GuildState`] for tests.
///
/// Clones share state, so a test can hand one clone to the engine and
/// inspect the other. Uses `std::sync::Mutex` so builders work without a
/// runtime.
#[derive(Debug, Clone)]
pub struct MockGuild {
    guild_id: GuildId,
    state: Arc<Mutex<MockGuildState>>,
}

impl MockGuild {
    /// Create a guild with an everyone role and a bot holding
    /// [`test_cleanup_bot`] capabilities.
    #[must_use]
    pub fn new() -> Self {
        let guild_id = test_guild_id();
        // The everyone role shares the guild's id.
        let everyone = Role::new(guild_id.as_str(), "@everyone", test_everyone_base());
        let state = MockGuildState {
            profile: GuildProfile {
                id: guild_id.clone(),
                name: "Test Guild".to_string(),
                member_count: 42,
                owner_id: test_owner(),
            },
            channels: Vec::new(),
            roles: vec![everyone.clone()],
            everyone: everyone.id,
            bot: test_cleanup_bot(),
            bot_per_channel: HashMap::new(),
            messages: HashMap::new(),
            forbidden: HashSet::new(),
            failing_reads: false,
            mutations: Vec::new(),
            next_id: 1000,
        };
        Self {
            guild_id,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockGuildState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a text channel with a generated id.
    #[must_use]
    pub fn with_text_channel(self, name: &str) -> Self {
        self.with_kind(name, ChannelKind::Text, None)
    }

    /// Add a category with a generated id.
    #[must_use]
    pub fn with_category(self, name: &str) -> Self {
        self.with_kind(name, ChannelKind::Category, None)
    }

    /// Add a text channel under an existing category.
    #[must_use]
    pub fn with_text_channel_in(self, name: &str, category: &str) -> Self {
        let parent = self.channel_named(category).map(|c| c.id);
        self.with_kind(name, ChannelKind::Text, parent)
    }

    fn with_kind(self, name: &str, kind: ChannelKind, category: Option<ChannelId>) -> Self {
        {
            let mut state = self.lock();
            let id = state.allocate_id();
            let position = u32::try_from(state.channels.len()).unwrap_or(u32::MAX);
            let mut channel = Channel::new(id, name, kind);
            channel.category = category;
            channel.position = position;
            state.channels.push(channel);
        }
        self
    }

    /// Add a fully specified channel.
    #[must_use]
    pub fn with_channel(self, channel: Channel) -> Self {
        self.lock().channels.push(channel);
        self
    }

    /// Add a text channel whose everyone overwrite explicitly allows `allow`.
    #[must_use]
    pub fn with_everyone_overwrite(self, name: &str, overwrite: PermissionOverwrite) -> Self {
        {
            let mut state = self.lock();
            let id = state.allocate_id();
            let channel = Channel::new(id, name, ChannelKind::Text).with_overwrite(overwrite);
            state.channels.push(channel);
        }
        self
    }

    /// Add a role with a generated id and no permissions.
    #[must_use]
    pub fn with_role(self, name: &str) -> Self {
        {
            let mut state = self.lock();
            let id = state.allocate_id();
            let position = u32::try_from(state.roles.len()).unwrap_or(u32::MAX);
            state
                .roles
                .push(Role::new(id, name, CapabilitySet::empty()).at_position(position));
        }
        self
    }

    /// Set the bot's guild-level capabilities.
    #[must_use]
    pub fn with_bot_capabilities(self, caps: CapabilitySet) -> Self {
        self.lock().bot = caps;
        self
    }

    /// Override the bot's capabilities on one channel (looked up by name).
    #[must_use]
    pub fn with_bot_channel_capabilities(self, channel: &str, caps: CapabilitySet) -> Self {
        if let Some(found) = self.channel_named(channel) {
            self.lock().bot_per_channel.insert(found.id, caps);
        }
        self
    }

    /// Seed a channel's history (looked up by name), newest first.
    #[must_use]
    pub fn with_messages(self, channel: &str, messages: Vec<MessageSummary>) -> Self {
        if let Some(found) = self.channel_named(channel) {
            self.lock().messages.insert(found.id, messages);
        }
        self
    }

    /// Make every mutation on the named resource fail with `Forbidden`.
    #[must_use]
    pub fn with_forbidden(self, name: &str) -> Self {
        self.lock().forbidden.insert(name.to_string());
        self
    }

    /// Make every read fail.
    #[must_use]
    pub fn with_failing_reads(self) -> Self {
        self.lock().failing_reads = true;
        self
    }

    /// Id of the everyone role.
    #[must_use]
    pub fn everyone_id(&self) -> RoleId {
        self.lock().everyone.clone()
    }

    /// The everyone role as an overwrite target.
    #[must_use]
    pub fn everyone_target(&self) -> OverwriteTarget {
        OverwriteTarget::Role(self.everyone_id())
    }

    /// Current state of a channel, by exact name.
    #[must_use]
    pub fn channel_named(&self, name: &str) -> Option<Channel> {
        self.lock().channels.iter().find(|c| c.name == name).cloned()
    }

    /// Current state of a role, by exact name.
    #[must_use]
    pub fn role_named(&self, name: &str) -> Option<Role> {
        self.lock().roles.iter().find(|r| r.name == name).cloned()
    }

    /// Every channel name, in order.
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        self.lock().channels.iter().map(|c| c.name.clone()).collect()
    }

    /// Delete a channel out from under the workflow.
    pub fn remove_channel(&self, name: &str) {
        self.lock().channels.retain(|c| c.name != name);
    }

    /// Every accepted mutation, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }
}

impl Default for MockGuild {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GuildState for MockGuild {
    fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    async fn profile(&self) -> PlatformResult<GuildProfile> {
        let state = self.lock();
        state.check_reads()?;
        Ok(state.profile.clone())
    }

    async fn channels(&self) -> PlatformResult<Vec<Channel>> {
        let state = self.lock();
        state.check_reads()?;
        Ok(state.channels.clone())
    }

    async fn roles(&self) -> PlatformResult<Vec<Role>> {
        let state = self.lock();
        state.check_reads()?;
        Ok(state.roles.clone())
    }

    async fn everyone_role(&self) -> PlatformResult<Role> {
        let state = self.lock();
        state.check_reads()?;
        state
            .roles
            .iter()
            .find(|r| r.id == state.everyone)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                kind: "role",
                id: state.everyone.to_string(),
            })
    }

    async fn bot_capabilities(&self) -> PlatformResult<CapabilitySet> {
        let state = self.lock();
        state.check_reads()?;
        Ok(state.bot.clone())
    }

    async fn bot_channel_capabilities(
        &self,
        channel: &ChannelId,
    ) -> PlatformResult<CapabilitySet> {
        let state = self.lock();
        state.check_reads()?;
        if !state.channels.iter().any(|c| &c.id == channel) {
            return Err(PlatformError::NotFound {
                kind: "channel",
                id: channel.to_string(),
            });
        }
        Ok(state
            .bot_per_channel
            .get(channel)
            .cloned()
            .unwrap_or_else(|| state.bot.clone()))
    }

    async fn recent_messages(
        &self,
        channel: &ChannelId,
        limit: usize,
    ) -> PlatformResult<Vec<MessageSummary>> {
        let state = self.lock();
        state.check_reads()?;
        if !state.channels.iter().any(|c| &c.id == channel) {
            return Err(PlatformError::NotFound {
                kind: "channel",
                id: channel.to_string(),
            });
        }
        Ok(state
            .messages
            .get(channel)
            .map(|history| history.iter().take(limit).copied().collect())
            .unwrap_or_default())
    }

    async fn rename_channel(&self, channel: &ChannelId, name: &str) -> PlatformResult<()> {
        let mut state = self.lock();
        let forbidden = state.forbidden.clone();
        let found = state
            .channels
            .iter_mut()
            .find(|c| &c.id == channel)
            .ok_or_else(|| PlatformError::NotFound {
                kind: "channel",
                id: channel.to_string(),
            })?;
        if forbidden.contains(&found.name) {
            return Err(PlatformError::Forbidden("Missing Permissions".to_string()));
        }
        let from = std::mem::replace(&mut found.name, name.to_string());
        state.mutations.push(Mutation::RenameChannel {
            id: channel.clone(),
            from,
            to: name.to_string(),
        });
        Ok(())
    }

    async fn rename_role(&self, role: &RoleId, name: &str) -> PlatformResult<()> {
        let mut state = self.lock();
        let forbidden = state.forbidden.clone();
        let found = state
            .roles
            .iter_mut()
            .find(|r| &r.id == role)
            .ok_or_else(|| PlatformError::NotFound {
                kind: "role",
                id: role.to_string(),
            })?;
        if forbidden.contains(&found.name) || found.managed {
            return Err(PlatformError::Forbidden("Missing Permissions".to_string()));
        }
        let from = std::mem::replace(&mut found.name, name.to_string());
        state.mutations.push(Mutation::RenameRole {
            id: role.clone(),
            from,
            to: name.to_string(),
        });
        Ok(())
    }

    async fn set_channel_overwrite(
        &self,
        channel: &ChannelId,
        target: &OverwriteTarget,
        overwrite: Option<PermissionOverwrite>,
    ) -> PlatformResult<()> {
        let mut state = self.lock();
        let forbidden = state.forbidden.clone();
        let found = state
            .channels
            .iter_mut()
            .find(|c| &c.id == channel)
            .ok_or_else(|| PlatformError::NotFound {
                kind: "channel",
                id: channel.to_string(),
            })?;
        if forbidden.contains(&found.name) {
            return Err(PlatformError::Forbidden("Missing Permissions".to_string()));
        }
        found.overwrites.retain(|o| &o.target != target);
        let removed = overwrite.is_none();
        if let Some(mut next) = overwrite {
            next.target = target.clone();
            found.overwrites.push(next);
        }
        state.mutations.push(Mutation::SetOverwrite {
            channel: channel.clone(),
            target: target.clone(),
            removed,
        });
        Ok(())
    }
}

/// Shorthand for an everyone overwrite that explicitly allows `caps`.
#[must_use]
pub fn everyone_allowing(guild: &MockGuild, caps: &[Capability]) -> PermissionOverwrite {
    caps.iter().fold(
        PermissionOverwrite::new(guild.everyone_target()),
        |ow, cap| ow.allowing(*cap),
    )
}
