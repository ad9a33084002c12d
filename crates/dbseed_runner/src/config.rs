//! Runner configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use dbseed_model::ConflictPolicy;
use dbseed_store::connection::DEFAULT_SERVER_SELECTION_TIMEOUT;

/// Whether a run writes to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Check every target and converge it.
    #[default]
    Apply,
    /// Check every target and report what applying would do.
    DryRun,
}

/// Configuration for a bootstrap run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Optional connection string override (defaults to `MONGODB_URI` env or localhost).
    pub mongo_uri: Option<String>,
    /// Apply or dry run.
    pub mode: RunMode,
    /// What a creation call that finds its target already present means.
    pub conflict_policy: ConflictPolicy,
    /// How long to wait for a reachable server.
    pub server_selection_timeout: Duration,
}

impl RunnerConfig {
    /// An applying run with the default conflict policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mongo_uri: None,
            mode: RunMode::Apply,
            conflict_policy: ConflictPolicy::default(),
            server_selection_timeout: DEFAULT_SERVER_SELECTION_TIMEOUT,
        }
    }

    /// Override the connection string.
    #[must_use]
    pub fn with_mongo_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongo_uri = Some(uri.into());
        self
    }

    /// Set the run mode.
    #[must_use]
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the conflict policy.
    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Set the server selection timeout.
    #[must_use]
    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    /// Returns `true` for a dry run.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.mode == RunMode::DryRun
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}
