//! Bootstrap steps and the per-step state machine.
//!
//! Every step moves through
//! `NotChecked → Checked → {Created | Updated | NoOp} → Done`. The
//! [`StepTracker`] rejects any other path, so a step cannot finish without
//! having looked at the current state of its target first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collection::CollectionOptions;
use crate::database::DatabaseRef;
use crate::principal::Principal;

// ── Steps ───────────────────────────────────────────────────────────────────

/// One ordered action of a bootstrap plan.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapStep {
    /// Create the principal, or overwrite its credential and grants.
    EnsurePrincipal {
        /// Database the principal is defined on.
        database: DatabaseRef,
        /// The declared principal.
        principal: Principal,
    },
    /// Create the collection if it does not exist.
    EnsureCollection {
        /// Database holding the collection.
        database: DatabaseRef,
        /// Collection name.
        collection: String,
        /// Options applied only when the collection is created.
        options: CollectionOptions,
    },
}

impl BootstrapStep {
    /// Ensure `principal` exists on `database`.
    #[must_use]
    pub fn ensure_principal(database: impl Into<String>, principal: Principal) -> Self {
        Self::EnsurePrincipal {
            database: DatabaseRef::new(database),
            principal,
        }
    }

    /// Ensure `database.collection` exists, with no creation options.
    #[must_use]
    pub fn ensure_collection(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::ensure_collection_with(database, collection, CollectionOptions::new())
    }

    /// Ensure `database.collection` exists, created with `options` if absent.
    #[must_use]
    pub fn ensure_collection_with(
        database: impl Into<String>,
        collection: impl Into<String>,
        options: CollectionOptions,
    ) -> Self {
        Self::EnsureCollection {
            database: DatabaseRef::new(database),
            collection: collection.into(),
            options,
        }
    }

    /// The database this step touches.
    #[must_use]
    pub fn database(&self) -> &DatabaseRef {
        match self {
            Self::EnsurePrincipal { database, .. } | Self::EnsureCollection { database, .. } => {
                database
            }
        }
    }

    /// The entity this step converges.
    #[must_use]
    pub fn target(&self) -> StepTarget {
        match self {
            Self::EnsurePrincipal {
                database,
                principal,
            } => StepTarget::Principal {
                database: database.name().to_string(),
                name: principal.name.clone(),
            },
            Self::EnsureCollection {
                database,
                collection,
                ..
            } => StepTarget::Collection {
                database: database.name().to_string(),
                collection: collection.clone(),
            },
        }
    }
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ensure {}", self.target())
    }
}

/// The entity a step converges, without any secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepTarget {
    /// A user on a database.
    Principal {
        /// Database the user is defined on.
        database: String,
        /// User name.
        name: String,
    },
    /// A collection in a database.
    Collection {
        /// Database holding the collection.
        database: String,
        /// Collection name.
        collection: String,
    },
}

impl fmt::Display for StepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Principal { database, name } => write!(f, "user \"{name}\" on \"{database}\""),
            Self::Collection {
                database,
                collection,
            } => write!(f, "collection \"{database}.{collection}\""),
        }
    }
}

// ── Outcomes and states ─────────────────────────────────────────────────────

/// How a step converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The target did not exist and was created.
    Created,
    /// The target existed and was overwritten with the declared definition.
    Updated,
    /// The target existed and was left untouched.
    AlreadyExists,
}

impl Outcome {
    /// The terminal state this outcome corresponds to.
    #[must_use]
    pub fn state(self) -> StepState {
        match self {
            Outcome::Created => StepState::Created,
            Outcome::Updated => StepState::Updated,
            Outcome::AlreadyExists => StepState::NoOp,
        }
    }
}

/// Where a step is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Nothing has been asked of the store yet.
    NotChecked,
    /// The target's existence has been looked up.
    Checked,
    /// The target was created.
    Created,
    /// The target was overwritten.
    Updated,
    /// The target was left as is.
    NoOp,
    /// The step is complete.
    Done,
}

impl StepState {
    fn outcome(self) -> Option<Outcome> {
        match self {
            StepState::Created => Some(Outcome::Created),
            StepState::Updated => Some(Outcome::Updated),
            StepState::NoOp => Some(Outcome::AlreadyExists),
            _ => None,
        }
    }
}

/// A step tried to move between two states that are not connected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid step transition from {from:?} to {to:?}")]
pub struct StateError {
    /// State the step was in.
    pub from: StepState,
    /// State it tried to enter.
    pub to: StepState,
}

/// Enforces the per-step state machine and remembers the path taken.
#[derive(Debug, Clone)]
pub struct StepTracker {
    history: Vec<StepState>,
}

impl StepTracker {
    /// A tracker in [`StepState::NotChecked`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: vec![StepState::NotChecked],
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> StepState {
        // history always holds at least the initial state
        self.history
            .last()
            .copied()
            .unwrap_or(StepState::NotChecked)
    }

    /// Every state visited, in order.
    #[must_use]
    pub fn history(&self) -> &[StepState] {
        &self.history
    }

    /// `NotChecked → Checked`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the target was already checked.
    pub fn checked(&mut self) -> Result<(), StateError> {
        self.advance(StepState::NotChecked, StepState::Checked)
    }

    /// `Checked → Created | Updated | NoOp`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the target has not been checked, or the step
    /// already resolved.
    pub fn resolve(&mut self, outcome: Outcome) -> Result<(), StateError> {
        self.advance(StepState::Checked, outcome.state())
    }

    /// `Created | Updated | NoOp → Done`, returning the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the step has not resolved.
    pub fn finish(&mut self) -> Result<Outcome, StateError> {
        let from = self.state();
        let outcome = from.outcome().ok_or(StateError {
            from,
            to: StepState::Done,
        })?;
        self.history.push(StepState::Done);
        Ok(outcome)
    }

    fn advance(&mut self, expected: StepState, to: StepState) -> Result<(), StateError> {
        let from = self.state();
        if from != expected {
            return Err(StateError { from, to });
        }
        self.history.push(to);
        Ok(())
    }
}

impl Default for StepTracker {
    fn default() -> Self {
        Self::new()
    }
}
