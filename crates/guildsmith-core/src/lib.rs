//! Guildsmith Core - Foundation types and traits for the guildsmith assistant.
//!
//! This crate provides:
//! - Opaque identifiers for users, guilds, channels, and roles
//! - [`Capability`] and [`CapabilitySet`] for administrative permissions
//! - The guild model (channels, roles, permission overwrites)
//! - The [`GuildState`] trait, the live server-state provider
//! - Platform error types
//! - Guard functions composed by command handlers before the core runs

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod capability;
pub mod error;
pub mod guard;
pub mod guild;
pub mod types;

pub use capability::{Capability, CapabilitySet};
pub use error::{PlatformError, PlatformResult};
pub use guard::{
    GuardError, GuardResult, Invoker, baseline_bot_capabilities, require_admin,
    require_capabilities, require_guild,
};
pub use guild::{
    Channel, ChannelKind, GuildProfile, GuildState, MessageSummary, OverwriteTarget,
    PermissionOverwrite, Role, find_channel, find_role,
};
pub use types::{ChannelId, GuildId, RoleId, UserId};
