//! Command guards.
//!
//! Guards are plain functions the command layer composes before it hands
//! anything to the cleanup engine. They never touch session state.

use crate::capability::{Capability, CapabilitySet};
use crate::types::{GuildId, UserId};
use thiserror::Error;

/// The principal that issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    /// Who issued the command.
    pub user_id: UserId,
    /// The guild it was issued in, if any (direct messages have none).
    pub guild_id: Option<GuildId>,
    /// The invoker's guild-level capabilities.
    pub capabilities: CapabilitySet,
    /// Whether the invoker owns the guild.
    pub is_owner: bool,
}

impl Invoker {
    /// Create an invoker inside a guild.
    #[must_use]
    pub fn in_guild(user_id: UserId, guild_id: GuildId, capabilities: CapabilitySet) -> Self {
        Self {
            user_id,
            guild_id: Some(guild_id),
            capabilities,
            is_owner: false,
        }
    }

    /// Builder: mark as guild owner.
    #[must_use]
    pub fn as_owner(mut self) -> Self {
        self.is_owner = true;
        self
    }
}

/// A guard refused the command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// The command was issued outside a guild.
    #[error("this command can only be used in a server")]
    NotInGuild,

    /// The invoker is neither an administrator nor the owner.
    #[error("you need administrator permissions to use this command")]
    NotAdmin,

    /// The bot lacks capabilities it needs.
    #[error("bot is missing permissions: {}", format_missing(.missing))]
    BotMissing {
        /// What is missing.
        missing: Vec<Capability>,
    },
}

fn format_missing(missing: &[Capability]) -> String {
    missing
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for guards.
pub type GuardResult<T> = Result<T, GuardError>;

/// Require that the command was issued in a guild.
///
/// # Errors
///
/// Returns [`GuardError::NotInGuild`] for direct-message invocations.
pub fn require_guild(invoker: &Invoker) -> GuardResult<&GuildId> {
    invoker.guild_id.as_ref().ok_or(GuardError::NotInGuild)
}

/// Require administrator capability or guild ownership.
///
/// # Errors
///
/// Returns [`GuardError::NotAdmin`] when neither holds.
pub fn require_admin(invoker: &Invoker) -> GuardResult<()> {
    if invoker.is_owner || invoker.capabilities.contains(Capability::Administrator) {
        Ok(())
    } else {
        Err(GuardError::NotAdmin)
    }
}

/// Require that `held` covers `required`.
///
/// # Errors
///
/// Returns [`GuardError::BotMissing`] listing every absent capability.
pub fn require_capabilities(held: &CapabilitySet, required: &CapabilitySet) -> GuardResult<()> {
    let missing = held.missing(required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(GuardError::BotMissing { missing })
    }
}

/// Capabilities the bot needs before any cleanup command runs.
#[must_use]
pub fn baseline_bot_capabilities() -> CapabilitySet {
    CapabilitySet::from([
        Capability::ManageChannels,
        Capability::ManageRoles,
        Capability::SendMessages,
        Capability::EmbedLinks,
        Capability::AttachFiles,
        Capability::ReadMessageHistory,
        Capability::ManageMessages,
    ])
}
