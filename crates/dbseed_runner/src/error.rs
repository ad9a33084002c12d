//! Run-level errors.

use dbseed_model::{PlanError, StateError};
use dbseed_store::StoreError;

/// Why a run stopped. Every variant is fatal: the remaining steps are not
/// attempted, and re-running the whole plan is the recovery.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The plan failed validation; nothing was sent to the store.
    #[error("invalid plan: {0}")]
    Plan(#[from] PlanError),

    /// The store could not be reached before the first step.
    #[error("store unreachable: {0}")]
    Unreachable(#[source] StoreError),

    /// A step failed against the store.
    #[error("step {number} ({step}) failed after {completed} completed step(s): {source}")]
    Step {
        /// 1-based step number.
        number: usize,
        /// Description of the step.
        step: String,
        /// Steps that completed before this one.
        completed: usize,
        /// The store error.
        #[source]
        source: StoreError,
    },

    /// A step left its state machine.
    #[error("step {number} ({step}): {source}")]
    State {
        /// 1-based step number.
        number: usize,
        /// Description of the step.
        step: String,
        /// The rejected transition.
        #[source]
        source: StateError,
    },
}
