//! A guild export on disk, served as live server state.
//!
//! The export is a JSON document holding the guild profile, channels, roles,
//! members, and the bot's capabilities. Mutations change the in-memory copy;
//! [`FileGuild::save`] writes it back.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use guildsmith_core::{
    CapabilitySet, Channel, ChannelId, GuildId, GuildProfile, GuildState, Invoker, MessageSummary,
    OverwriteTarget, PermissionOverwrite, PlatformError, PlatformResult, Role, RoleId, UserId,
};

/// A member and the roles they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MemberRecord {
    pub(crate) id: UserId,
    #[serde(default)]
    pub(crate) roles: Vec<RoleId>,
}

/// What the bot may do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BotRecord {
    /// Guild-level capabilities.
    #[serde(default)]
    pub(crate) capabilities: CapabilitySet,
    /// Per-channel capabilities after overwrites. Channels not listed use
    /// the guild-level set.
    #[serde(default)]
    pub(crate) channel_capabilities: BTreeMap<ChannelId, CapabilitySet>,
}

/// The on-disk export format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GuildExport {
    pub(crate) profile: GuildProfile,
    /// Id of the role every member holds.
    pub(crate) everyone_role: RoleId,
    #[serde(default)]
    pub(crate) channels: Vec<Channel>,
    #[serde(default)]
    pub(crate) roles: Vec<Role>,
    #[serde(default)]
    pub(crate) members: Vec<MemberRecord>,
    #[serde(default)]
    pub(crate) bot: BotRecord,
    /// Recent history per channel, newest first.
    #[serde(default)]
    pub(crate) messages: BTreeMap<ChannelId, Vec<MessageSummary>>,
}

/// A [`GuildState`] backed by a [`GuildExport`].
#[derive(Debug)]
pub(crate) struct FileGuild {
    guild_id: GuildId,
    state: Mutex<GuildExport>,
}

impl FileGuild {
    /// Wrap an export.
    ///
    /// # Errors
    ///
    /// Fails if the everyone role is not among the export's roles.
    pub(crate) fn new(export: GuildExport) -> anyhow::Result<Self> {
        if !export.roles.iter().any(|r| r.id == export.everyone_role) {
            anyhow::bail!(
                "everyone role {} is not listed in the export's roles",
                export.everyone_role
            );
        }
        Ok(Self {
            guild_id: export.profile.id.clone(),
            state: Mutex::new(export),
        })
    }

    /// Read an export from a JSON file.
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read guild export {}", path.display()))?;
        let export: GuildExport = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a valid guild export", path.display()))?;
        Self::new(export)
    }

    /// Write the current state back as pretty JSON.
    pub(crate) fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&*self.lock())?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write guild export {}", path.display()))
    }

    /// The principal `user` acts as: the everyone role's permissions plus
    /// those of every role the member holds.
    pub(crate) fn invoker(&self, user: &UserId) -> Invoker {
        let state = self.lock();
        let held: Vec<&RoleId> = state
            .members
            .iter()
            .find(|m| &m.id == user)
            .map(|m| m.roles.iter().collect())
            .unwrap_or_default();
        let capabilities: CapabilitySet = state
            .roles
            .iter()
            .filter(|r| r.id == state.everyone_role || held.contains(&&r.id))
            .flat_map(|r| r.permissions.iter())
            .collect();

        let invoker = Invoker::in_guild(user.clone(), self.guild_id.clone(), capabilities);
        if &state.profile.owner_id == user {
            invoker.as_owner()
        } else {
            invoker
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuildExport> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn channel_not_found(id: &ChannelId) -> PlatformError {
    PlatformError::NotFound {
        kind: "channel",
        id: id.to_string(),
    }
}

#[async_trait]
impl GuildState for FileGuild {
    fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    async fn profile(&self) -> PlatformResult<GuildProfile> {
        Ok(self.lock().profile.clone())
    }

    async fn channels(&self) -> PlatformResult<Vec<Channel>> {
        let mut channels = self.lock().channels.clone();
        channels.sort_by_key(|c| c.position);
        Ok(channels)
    }

    async fn roles(&self) -> PlatformResult<Vec<Role>> {
        Ok(self.lock().roles.clone())
    }

    async fn everyone_role(&self) -> PlatformResult<Role> {
        let state = self.lock();
        state
            .roles
            .iter()
            .find(|r| r.id == state.everyone_role)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                kind: "role",
                id: state.everyone_role.to_string(),
            })
    }

    async fn bot_capabilities(&self) -> PlatformResult<CapabilitySet> {
        Ok(self.lock().bot.capabilities.clone())
    }

    async fn bot_channel_capabilities(
        &self,
        channel: &ChannelId,
    ) -> PlatformResult<CapabilitySet> {
        let state = self.lock();
        if !state.channels.iter().any(|c| &c.id == channel) {
            return Err(channel_not_found(channel));
        }
        Ok(state
            .bot
            .channel_capabilities
            .get(channel)
            .cloned()
            .unwrap_or_else(|| state.bot.capabilities.clone()))
    }

    async fn recent_messages(
        &self,
        channel: &ChannelId,
        limit: usize,
    ) -> PlatformResult<Vec<MessageSummary>> {
        let state = self.lock();
        if !state.channels.iter().any(|c| &c.id == channel) {
            return Err(channel_not_found(channel));
        }
        Ok(state
            .messages
            .get(channel)
            .map(|history| history.iter().take(limit).copied().collect())
            .unwrap_or_default())
    }

    async fn rename_channel(&self, channel: &ChannelId, name: &str) -> PlatformResult<()> {
        let mut state = self.lock();
        let found = state
            .channels
            .iter_mut()
            .find(|c| &c.id == channel)
            .ok_or_else(|| channel_not_found(channel))?;
        name.clone_into(&mut found.name);
        Ok(())
    }

    async fn rename_role(&self, role: &RoleId, name: &str) -> PlatformResult<()> {
        let mut state = self.lock();
        let found = state
            .roles
            .iter_mut()
            .find(|r| &r.id == role)
            .ok_or_else(|| PlatformError::NotFound {
                kind: "role",
                id: role.to_string(),
            })?;
        if found.managed {
            return Err(PlatformError::Forbidden(format!(
                "role {} is managed by an integration",
                found.name
            )));
        }
        name.clone_into(&mut found.name);
        Ok(())
    }

    async fn set_channel_overwrite(
        &self,
        channel: &ChannelId,
        target: &OverwriteTarget,
        overwrite: Option<PermissionOverwrite>,
    ) -> PlatformResult<()> {
        let mut state = self.lock();
        let found = state
            .channels
            .iter_mut()
            .find(|c| &c.id == channel)
            .ok_or_else(|| channel_not_found(channel))?;
        found.overwrites.retain(|o| &o.target != target);
        if let Some(mut next) = overwrite {
            next.target = target.clone();
            found.overwrites.push(next);
        }
        Ok(())
    }
}
