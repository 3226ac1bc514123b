// ── DRS behavior and override state ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Per-VM DRS automation level.
///
/// Wire names are the vSphere spellings (`manual`, `partiallyAutomated`,
/// `fullyAutomated`). Parsing also accepts kebab and snake case.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
pub enum DrsBehavior {
    /// DRS only recommends placements and migrations.
    #[default]
    #[strum(to_string = "manual")]
    Manual,
    /// Initial placement is automatic, migrations are recommended.
    #[strum(
        to_string = "partiallyAutomated",
        serialize = "partially-automated",
        serialize = "partially_automated"
    )]
    PartiallyAutomated,
    /// DRS places and migrates the VM on its own.
    #[strum(
        to_string = "fullyAutomated",
        serialize = "fully-automated",
        serialize = "fully_automated"
    )]
    FullyAutomated,
}

impl DrsBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::PartiallyAutomated => "partiallyAutomated",
            Self::FullyAutomated => "fullyAutomated",
        }
    }

    /// Canonical names of every accepted behavior.
    pub fn allowed() -> Vec<&'static str> {
        Self::iter().map(Self::as_str).collect()
    }
}

/// The override currently recorded for a VM on its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum OverrideState {
    /// No per-VM override; the VM follows the cluster default.
    Unset,
    Set { behavior: DrsBehavior, enabled: bool },
}

impl OverrideState {
    /// Whether this state already satisfies `desired`.
    ///
    /// `Unset` never matches, and neither does a disabled override.
    pub fn satisfies(&self, desired: DrsBehavior) -> bool {
        matches!(self, Self::Set { behavior, enabled: true } if *behavior == desired)
    }

    /// The behavior DRS applies through this override; `None` when no
    /// override exists or it is disabled.
    pub fn effective_behavior(&self) -> Option<DrsBehavior> {
        match self {
            Self::Set {
                behavior,
                enabled: true,
            } => Some(*behavior),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}
