//! Bootstrap runner — applies a plan's steps, in order, against a store.
//!
//! Each step looks at its target first and then converges it: principals are
//! created or overwritten, collections are created or left alone. The first
//! store error aborts the run; the plan is meant to be re-run as a whole.

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use dbseed_model::{
    BootstrapStep, CollectionOptions, ConflictPolicy, DatabaseRef, GRANT_POLICY, Grant,
    MaterializedDatabase, Outcome, Plan, Principal, StateError, StepTracker,
};
use dbseed_store::connection::resolve_uri;
use dbseed_store::{DocumentStore, MongoStore, StoreError};

use crate::config::RunnerConfig;
use crate::error::RunError;
use crate::report::{RunSummary, StepReport};

enum StepError {
    Store(StoreError),
    State(StateError),
}

impl From<StoreError> for StepError {
    fn from(err: StoreError) -> Self {
        StepError::Store(err)
    }
}

impl From<StateError> for StepError {
    fn from(err: StateError) -> Self {
        StepError::State(err)
    }
}

/// Applies bootstrap plans.
///
/// Call [`BootstrapRunner::run`] with a store and a plan; the callback sees
/// each step's report as soon as the step completes.
#[derive(Debug)]
pub struct BootstrapRunner {
    /// Runner configuration.
    config: RunnerConfig,
}

impl BootstrapRunner {
    /// Create a runner.
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Returns the runner configuration.
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Build a MongoDB store from the configured connection string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection string is invalid.
    pub async fn connect(&self) -> Result<MongoStore, StoreError> {
        let uri = resolve_uri(self.config.mongo_uri.as_deref());
        MongoStore::connect_to(&uri, self.config.server_selection_timeout).await
    }

    /// Run every step of `plan` against `store`.
    ///
    /// Each call is a separate run with a fresh run id, carried by its
    /// tracing span and its [`RunSummary`].
    ///
    /// 1. Validate the plan.
    /// 2. Ping the store; an unreachable store aborts before any step.
    /// 3. For each step, in order: check the target, converge it, report.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] on the first failure. Steps before it have been
    /// applied and reported; steps after it are not attempted.
    pub async fn run<S, F>(
        &self,
        store: &S,
        plan: &Plan,
        mut on_report: F,
    ) -> Result<RunSummary, RunError>
    where
        S: DocumentStore + ?Sized,
        F: FnMut(&StepReport),
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("bootstrap", %run_id);
        self.run_steps(run_id, store, plan, &mut on_report)
            .instrument(span)
            .await
    }

    async fn run_steps<S, F>(
        &self,
        run_id: Uuid,
        store: &S,
        plan: &Plan,
        on_report: &mut F,
    ) -> Result<RunSummary, RunError>
    where
        S: DocumentStore + ?Sized,
        F: FnMut(&StepReport),
    {
        plan.validate()?;

        let started = Instant::now();
        info!(
            steps = plan.steps().len(),
            mode = ?self.config.mode,
            "bootstrap starting"
        );
        store.ping().await.map_err(RunError::Unreachable)?;

        let mut summary = RunSummary::new(run_id, self.config.mode);

        for (index, step) in plan.steps().iter().enumerate() {
            let number = index + 1;
            let mut tracker = StepTracker::new();

            let result = match step {
                BootstrapStep::EnsurePrincipal {
                    database,
                    principal,
                } => {
                    self.ensure_principal(store, database, principal, &mut tracker)
                        .await
                }
                BootstrapStep::EnsureCollection {
                    database,
                    collection,
                    options,
                } => {
                    self.ensure_collection(store, database, collection, options, &mut tracker)
                        .await
                }
            };

            let materialized = match result {
                Ok(materialized) => materialized,
                Err(StepError::Store(source)) => {
                    return Err(RunError::Step {
                        number,
                        step: step.to_string(),
                        completed: index,
                        source,
                    });
                }
                Err(StepError::State(source)) => {
                    return Err(RunError::State {
                        number,
                        step: step.to_string(),
                        source,
                    });
                }
            };

            let outcome = tracker.finish().map_err(|source| RunError::State {
                number,
                step: step.to_string(),
                source,
            })?;

            let report = StepReport {
                number,
                target: step.target(),
                outcome,
                applied: !self.config.is_dry_run(),
            };
            info!(step = number, ?outcome, "{report}");
            on_report(&report);
            summary.record(report, materialized);
        }

        summary.finish(started.elapsed());
        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            elapsed_ms = summary.elapsed_ms,
            "bootstrap finished"
        );
        Ok(summary)
    }

    async fn ensure_principal<S>(
        &self,
        store: &S,
        database: &DatabaseRef,
        principal: &Principal,
        tracker: &mut StepTracker,
    ) -> Result<Option<MaterializedDatabase>, StepError>
    where
        S: DocumentStore + ?Sized,
    {
        let existing = store.find_principal(database, &principal.name).await?;
        tracker.checked()?;
        debug!(
            database = %database,
            principal = %principal.name,
            exists = existing.is_some(),
            "checked user"
        );

        let outcome = match existing {
            Some(record) => {
                if !self.config.is_dry_run() {
                    overwrite_principal(store, database, principal, &record.grants).await?;
                }
                Outcome::Updated
            }
            None if self.config.is_dry_run() => Outcome::Created,
            None => match store.create_principal(database, principal).await {
                Ok(()) => Outcome::Created,
                Err(err) if self.tolerates(&err) => {
                    warn!(
                        database = %database,
                        principal = %principal.name,
                        %err,
                        "user appeared after the check, updating it instead"
                    );
                    let Some(current) = store.find_principal(database, &principal.name).await?
                    else {
                        return Err(err.into());
                    };
                    overwrite_principal(store, database, principal, &current.grants).await?;
                    Outcome::Updated
                }
                Err(err) => return Err(err.into()),
            },
        };

        tracker.resolve(outcome)?;
        Ok(None)
    }

    async fn ensure_collection<S>(
        &self,
        store: &S,
        database: &DatabaseRef,
        collection: &str,
        options: &CollectionOptions,
        tracker: &mut StepTracker,
    ) -> Result<Option<MaterializedDatabase>, StepError>
    where
        S: DocumentStore + ?Sized,
    {
        let exists = store.collection_exists(database, collection).await?;
        tracker.checked()?;
        debug!(database = %database, collection, exists, "checked collection");

        let (outcome, materialized) = if exists {
            (
                Outcome::AlreadyExists,
                Some(MaterializedDatabase::confirmed(database)),
            )
        } else if self.config.is_dry_run() {
            (Outcome::Created, None)
        } else {
            match store.create_collection(database, collection, options).await {
                Ok(materialized) => (Outcome::Created, Some(materialized)),
                Err(err) if self.tolerates(&err) => {
                    warn!(
                        database = %database,
                        collection,
                        %err,
                        "collection appeared after the check, leaving it as is"
                    );
                    (
                        Outcome::AlreadyExists,
                        Some(MaterializedDatabase::confirmed(database)),
                    )
                }
                Err(err) => return Err(err.into()),
            }
        };

        tracker.resolve(outcome)?;
        Ok(materialized)
    }

    fn tolerates(&self, err: &StoreError) -> bool {
        err.is_conflict() && self.config.conflict_policy == ConflictPolicy::TreatAsExisting
    }
}

/// Update a principal to its declared definition, combining grants per
/// [`GRANT_POLICY`].
async fn overwrite_principal<S>(
    store: &S,
    database: &DatabaseRef,
    principal: &Principal,
    current: &BTreeSet<Grant>,
) -> Result<(), StoreError>
where
    S: DocumentStore + ?Sized,
{
    let declared = Principal {
        grants: GRANT_POLICY.apply(current, &principal.grants),
        ..principal.clone()
    };
    store.update_principal(database, &declared).await
}

#[cfg(test)]
mod tests {
    use dbseed_model::StepState;
    use dbseed_store::MemoryStore;

    use super::*;
    use crate::config::RunMode;

    fn svc_plan() -> Plan {
        Plan::new(vec![
            BootstrapStep::ensure_principal(
                "svc-db",
                Principal::new("svcUser", "pw").grant("readWrite", "svc-db"),
            ),
            BootstrapStep::ensure_collection("svc-db", "user"),
        ])
    }

    #[test]
    fn test_runner_creation() {
        let runner = BootstrapRunner::new(RunnerConfig::new().with_mongo_uri("mongodb://db:27017"));
        assert_eq!(runner.config().mongo_uri.as_deref(), Some("mongodb://db:27017"));
        assert_eq!(runner.config().mode, RunMode::Apply);
    }

    #[tokio::test]
    async fn test_reports_arrive_in_plan_order() {
        let store = MemoryStore::new();
        let runner = BootstrapRunner::new(RunnerConfig::new());
        let mut numbers = Vec::new();

        let summary = runner
            .run(&store, &svc_plan(), |report| numbers.push(report.number))
            .await
            .unwrap();

        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(summary.outcomes(), vec![Outcome::Created, Outcome::Created]);
        assert!(!summary.run_id.is_nil());
    }

    #[tokio::test]
    async fn test_each_run_gets_its_own_id() {
        let store = MemoryStore::new();
        let runner = BootstrapRunner::new(RunnerConfig::new());

        let first = runner.run(&store, &svc_plan(), |_| {}).await.unwrap();
        let second = runner.run(&store, &svc_plan(), |_| {}).await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(second.created, 0);
    }

    #[tokio::test]
    async fn test_tracker_passes_through_checked() {
        let store = MemoryStore::new();
        let runner = BootstrapRunner::new(RunnerConfig::new());
        let mut tracker = StepTracker::new();

        let materialized = runner
            .ensure_collection(
                &store,
                &DatabaseRef::new("svc-db"),
                "user",
                &CollectionOptions::new(),
                &mut tracker,
            )
            .await
            .ok()
            .flatten();

        assert_eq!(materialized.map(|m| m.name().to_string()), Some("svc-db".to_string()));
        assert_eq!(
            tracker.history(),
            &[StepState::NotChecked, StepState::Checked, StepState::Created]
        );
    }

    #[tokio::test]
    async fn test_invalid_plan_never_reaches_store() {
        let store = MemoryStore::new();
        store.set_unreachable(true);
        let runner = BootstrapRunner::new(RunnerConfig::new());

        let err = runner
            .run(&store, &Plan::new(vec![]), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Plan(_)));
    }

    #[tokio::test]
    async fn test_fatal_conflict_policy_aborts() {
        let store = MemoryStore::new();
        store.insert_document("svc-db", "user", serde_json::json!({ "name": "x" }));
        store.race_next_collection_lookup("svc-db", "user");

        let runner = BootstrapRunner::new(
            RunnerConfig::new().with_conflict_policy(ConflictPolicy::Fatal),
        );
        let plan = Plan::new(vec![BootstrapStep::ensure_collection("svc-db", "user")]);
        let err = runner.run(&store, &plan, |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Step { number: 1, completed: 0, ref source, .. } if source.is_conflict()
        ));
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let store = MemoryStore::new();
        let dyn_store: &dyn DocumentStore = &store;
        let runner = BootstrapRunner::new(RunnerConfig::new());

        let summary = runner.run(dyn_store, &svc_plan(), |_| {}).await.unwrap();
        assert_eq!(summary.created, 2);
        assert!(store.database_exists("svc-db"));
    }
}
