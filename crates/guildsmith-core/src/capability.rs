//! Administrative capabilities and capability sets.
//!
//! A [`CapabilitySet`] is what a principal holds on a guild (or on one
//! channel). Checks are always "held is a superset of required", with
//! [`Capability::Administrator`] implying every other capability.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single administrative permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Full administrator; implies every other capability.
    Administrator,
    /// See the channel and read its messages.
    ViewChannel,
    /// Post messages.
    SendMessages,
    /// Post embeds.
    EmbedLinks,
    /// Upload files.
    AttachFiles,
    /// Read message history.
    ReadMessageHistory,
    /// Delete or pin other members' messages.
    ManageMessages,
    /// Create, rename, and delete channels.
    ManageChannels,
    /// Create, rename, and delete roles.
    ManageRoles,
    /// Edit channel permission overwrites.
    ManagePermissions,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 10] = [
        Capability::Administrator,
        Capability::ViewChannel,
        Capability::SendMessages,
        Capability::EmbedLinks,
        Capability::AttachFiles,
        Capability::ReadMessageHistory,
        Capability::ManageMessages,
        Capability::ManageChannels,
        Capability::ManageRoles,
        Capability::ManagePermissions,
    ];

    /// Human-readable label, as shown in platform settings.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::ViewChannel => "View Channel",
            Self::SendMessages => "Send Messages",
            Self::EmbedLinks => "Embed Links",
            Self::AttachFiles => "Attach Files",
            Self::ReadMessageHistory => "Read Message History",
            Self::ManageMessages => "Manage Messages",
            Self::ManageChannels => "Manage Channels",
            Self::ManageRoles => "Manage Roles",
            Self::ManagePermissions => "Manage Permissions",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordered set of capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// The empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Every capability.
    #[must_use]
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Check whether a capability is explicitly present.
    #[must_use]
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Add a capability.
    pub fn insert(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    /// Remove a capability. Returns whether it was present.
    pub fn remove(&mut self, capability: Capability) -> bool {
        self.0.remove(&capability)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    /// The set as actually granted: administrator expands to everything.
    #[must_use]
    pub fn effective(&self) -> Self {
        if self.contains(Capability::Administrator) {
            Self::all()
        } else {
            self.clone()
        }
    }

    /// Check whether this set (taken literally) contains every capability in `other`.
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        self.0.is_superset(&other.0)
    }

    /// Capabilities in `required` that the effective set lacks, in order.
    #[must_use]
    pub fn missing(&self, required: &Self) -> Vec<Capability> {
        let effective = self.effective();
        required
            .iter()
            .filter(|c| !effective.contains(*c))
            .collect()
    }

    /// Iterate over the capabilities in order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Number of capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(caps: [Capability; N]) -> Self {
        caps.into_iter().collect()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.iter().map(Capability::label).collect();
        f.write_str(&labels.join(", "))
    }
}
