//! Prelude module - commonly used types for convenient import.
//!
//! Use `use guildsmith_core::prelude::*;` to import all essential types.

// Identifiers
pub use crate::{ChannelId, GuildId, RoleId, UserId};

// Capabilities
pub use crate::{Capability, CapabilitySet};

// Guild model
pub use crate::{
    Channel, ChannelKind, GuildProfile, GuildState, MessageSummary, OverwriteTarget,
    PermissionOverwrite, Role,
};

// Errors
pub use crate::{GuardError, GuardResult, PlatformError, PlatformResult};
