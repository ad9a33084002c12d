//! Per-step reports and the run summary.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use dbseed_model::{MaterializedDatabase, Outcome, StepTarget};

use crate::config::RunMode;

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// 1-based position of the step in the plan.
    pub number: usize,
    /// The entity the step converged.
    pub target: StepTarget,
    /// How it converged.
    pub outcome: Outcome,
    /// `false` in a dry run, where the outcome is only what would happen.
    pub applied: bool,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match (self.outcome, self.applied) {
            (Outcome::AlreadyExists, _) => {
                return match &self.target {
                    StepTarget::Principal { database, name } => {
                        write!(f, "User \"{name}\" on \"{database}\" already exists")
                    }
                    StepTarget::Collection {
                        database,
                        collection,
                    } => write!(f, "Collection \"{database}.{collection}\" already exists"),
                };
            }
            (Outcome::Created, true) => "Created",
            (Outcome::Created, false) => "Would create",
            (Outcome::Updated, true) => "Updated",
            (Outcome::Updated, false) => "Would update",
        };
        write!(f, "{verb} {}", self.target)
    }
}

/// Structured result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Identifier attached to every log line of the run.
    pub run_id: Uuid,
    /// Apply or dry run.
    pub mode: RunMode,
    /// One report per step, in plan order.
    pub steps: Vec<StepReport>,
    /// Steps that created their target.
    pub created: usize,
    /// Steps that overwrote an existing principal.
    pub updated: usize,
    /// Steps that found their target already present.
    pub unchanged: usize,
    /// Databases confirmed to exist, in the order they were first seen.
    pub materialized: Vec<MaterializedDatabase>,
    /// Wall time of the run, in milliseconds.
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub(crate) fn new(run_id: Uuid, mode: RunMode) -> Self {
        Self {
            run_id,
            mode,
            steps: Vec::new(),
            created: 0,
            updated: 0,
            unchanged: 0,
            materialized: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub(crate) fn record(&mut self, report: StepReport, materialized: Option<MaterializedDatabase>) {
        match report.outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::AlreadyExists => self.unchanged += 1,
        }
        if let Some(database) = materialized
            && !self.materialized.contains(&database)
        {
            self.materialized.push(database);
        }
        self.steps.push(report);
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    /// Returns `true` if `database` was confirmed to exist during the run.
    #[must_use]
    pub fn is_materialized(&self, database: &str) -> bool {
        self.materialized.iter().any(|m| m.name() == database)
    }

    /// The outcomes of all steps, in plan order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.steps.iter().map(|step| step.outcome).collect()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.mode {
            RunMode::Apply => "Bootstrap complete",
            RunMode::DryRun => "Dry run complete",
        };
        write!(
            f,
            "{prefix}: {} created, {} updated, {} unchanged",
            self.created, self.updated, self.unchanged
        )
    }
}
