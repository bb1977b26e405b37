//! Prelude module - commonly used test utilities.
//!
//! Use `use guildsmith_test::prelude::*;` in test modules.

pub use crate::{MockGuild, Mutation, everyone_allowing};
pub use crate::{
    test_admin_bot, test_cleanup_bot, test_everyone_base, test_guild_id, test_owner,
    test_stranger,
};
