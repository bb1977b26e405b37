//! Test fixtures for common types.

use guildsmith_core::{Capability, CapabilitySet, GuildId, UserId, baseline_bot_capabilities};

/// The guild id every [`MockGuild`](crate::MockGuild) uses by default.
#[must_use]
pub fn test_guild_id() -> GuildId {
    GuildId::new("900")
}

/// The guild owner, and the usual session owner in tests.
#[must_use]
pub fn test_owner() -> UserId {
    UserId::new("100")
}

/// A member who does not own anything.
#[must_use]
pub fn test_stranger() -> UserId {
    UserId::new("200")
}

/// A bot holding the administrator capability.
#[must_use]
pub fn test_admin_bot() -> CapabilitySet {
    CapabilitySet::from([Capability::Administrator])
}

/// A bot holding the baseline set plus permission management.
#[must_use]
pub fn test_cleanup_bot() -> CapabilitySet {
    baseline_bot_capabilities().with(Capability::ManagePermissions)
}

/// Base permissions of the everyone role.
#[must_use]
pub fn test_everyone_base() -> CapabilitySet {
    CapabilitySet::from([
        Capability::ViewChannel,
        Capability::SendMessages,
        Capability::EmbedLinks,
        Capability::AttachFiles,
        Capability::ReadMessageHistory,
    ])
}
