//! Opaque platform identifiers.
//!
//! Platform ids are snowflakes on Discord, but nothing in guildsmith does
//! arithmetic on them, so they are carried as strings.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a raw platform id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw id.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

platform_id!(
    /// A platform user (a member of the guild, or the bot itself).
    UserId
);
platform_id!(
    /// A guild (server).
    GuildId
);
platform_id!(
    /// A channel or category within a guild.
    ChannelId
);
platform_id!(
    /// A role within a guild.
    RoleId
);
