//! Policies the runner applies when a target already exists.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::principal::Grant;

/// How a re-applied principal's grants combine with the grants it already
/// holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantPolicy {
    /// The declared grants replace the existing ones wholly. Grants that are
    /// no longer declared are dropped.
    Replace,
}

/// Grant policy used when updating an existing principal.
pub const GRANT_POLICY: GrantPolicy = GrantPolicy::Replace;

impl GrantPolicy {
    /// Compute the grant set a principal ends up with.
    #[must_use]
    pub fn apply(self, _existing: &BTreeSet<Grant>, declared: &BTreeSet<Grant>) -> BTreeSet<Grant> {
        match self {
            GrantPolicy::Replace => declared.clone(),
        }
    }
}

/// What to do when a creation call reports that its target already exists,
/// i.e. something created it between the existence check and the write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Continue down the existing-target path: a collection becomes a no-op,
    /// a principal is updated to the declared definition.
    #[default]
    TreatAsExisting,
    /// Abort the run like any other store error.
    Fatal,
}
