//! # dbseed_model
//!
//! The data model of an idempotent database bootstrap.
//!
//! This crate provides:
//!
//! - [`Principal`] and [`Grant`] — database users and their role grants.
//! - [`CollectionOptions`] — write-once options passed to collection creation.
//! - [`DatabaseRef`] and [`MaterializedDatabase`] — logical vs confirmed databases.
//! - [`BootstrapStep`], [`StepTracker`] — ordered actions and their per-step state machine.
//! - [`Plan`] — a validated, ordered list of steps, loadable from JSON.
//! - [`policy`] — the grant and conflict policies applied by the runner.

pub mod collection;
pub mod database;
pub mod plan;
pub mod policy;
pub mod principal;
pub mod step;

pub use collection::CollectionOptions;
pub use database::{DatabaseRef, MaterializedDatabase};
pub use plan::{Plan, PlanError};
pub use policy::{ConflictPolicy, GRANT_POLICY, GrantPolicy};
pub use principal::{Grant, Principal, Secret};
pub use step::{BootstrapStep, Outcome, StateError, StepState, StepTarget, StepTracker};
