//! Safety gate for automated mutations.
//!
//! Two independent checks run before anything is changed:
//!
//! - **Protection**: a resource whose name contains a protected keyword is
//!   never analysed or mutated, whoever asks.
//! - **Capability**: the acting principal must hold every capability the
//!   change needs.

use guildsmith_core::{Capability, CapabilitySet};

use crate::proposal::ProposalKind;

/// Keywords protected when configuration does not override them.
pub const DEFAULT_PROTECTED_KEYWORDS: &[&str] = &[
    "command",
    "hub",
    "admin",
    "mod",
    "staff",
    "log",
    "audit",
    "announcement",
    "welcome",
    "rules",
    "general",
    "important",
];

/// Case-insensitive substring set of protected name fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedNames {
    keywords: Vec<String>,
}

impl ProtectedNames {
    /// Build from keywords. Blanks are ignored, duplicates collapse.
    #[must_use]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !cleaned.contains(&keyword) {
                cleaned.push(keyword);
            }
        }
        Self { keywords: cleaned }
    }

    /// Whether `name` contains any protected keyword.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let lowered = name.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// The normalised keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for ProtectedNames {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_KEYWORDS)
    }
}

/// Result of [`SafetyGate::check_mutation`]. Both checks are always run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationCheck {
    /// The resource name is protected.
    pub protected: bool,
    /// Required capabilities the principal lacks.
    pub missing: Vec<Capability>,
}

impl MutationCheck {
    /// Whether the mutation may proceed.
    #[must_use]
    pub fn permits(&self) -> bool {
        !self.protected && self.missing.is_empty()
    }
}

/// Gate consulted before every mutation.
#[derive(Debug, Clone, Default)]
pub struct SafetyGate {
    protected: ProtectedNames,
}

impl SafetyGate {
    /// Create a gate over a protected-name set.
    #[must_use]
    pub fn new(protected: ProtectedNames) -> Self {
        Self { protected }
    }

    /// The protected-name set.
    #[must_use]
    pub fn protected(&self) -> &ProtectedNames {
        &self.protected
    }

    /// Whether the named resource is excluded from automation.
    #[must_use]
    pub fn is_protected(&self, name: &str) -> bool {
        self.protected.matches(name)
    }

    /// Whether `held` covers `required`. Administrator covers everything.
    #[must_use]
    pub fn has_capability(&self, held: &CapabilitySet, required: &CapabilitySet) -> bool {
        held.missing(required).is_empty()
    }

    /// Run both checks for a mutation of the named resource.
    #[must_use]
    pub fn check_mutation(
        &self,
        name: &str,
        held: &CapabilitySet,
        required: &CapabilitySet,
    ) -> MutationCheck {
        MutationCheck {
            protected: self.is_protected(name),
            missing: held.missing(required),
        }
    }

    /// Guild-level capabilities a fix of `kind` needs.
    ///
    /// `None` for kinds the applier does not know; those are refused.
    #[must_use]
    pub fn required_capabilities(&self, kind: &ProposalKind) -> Option<CapabilitySet> {
        match kind {
            ProposalKind::PermissionRedundancy => Some(CapabilitySet::from([
                Capability::ManageChannels,
                Capability::ManagePermissions,
            ])),
            ProposalKind::NamingInconsistency => {
                Some(CapabilitySet::from([Capability::ManageChannels]))
            },
            ProposalKind::Unrecognized(_) => None,
        }
    }
}
