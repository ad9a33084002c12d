//! Bootstrap plans: ordered step lists loaded at process start.
//!
//! A plan file is JSON:
//!
//! ```json
//! {
//!   "steps": [
//!     {
//!       "kind": "ensure_principal",
//!       "database": "admin",
//!       "name": "admin",
//!       "credential": { "env": "DBSEED_ADMIN_PASSWORD" },
//!       "grants": [{ "role": "root", "db": "admin" }]
//!     },
//!     { "kind": "ensure_collection", "database": "product-service", "collection": "user" }
//!   ]
//! }
//! ```
//!
//! Credentials are either literals or environment variable names; variables
//! are resolved when the plan is loaded.

use std::path::Path;

use serde::Deserialize;

use crate::collection::CollectionOptions;
use crate::principal::{Grant, Principal};
use crate::step::BootstrapStep;

/// Environment variable holding the admin password of the built-in plan.
pub const ADMIN_PASSWORD_ENV: &str = "DBSEED_ADMIN_PASSWORD";

/// Environment variable holding the service user password of the built-in plan.
pub const SERVICE_PASSWORD_ENV: &str = "DBSEED_SERVICE_PASSWORD";

/// Longest database name MongoDB accepts, in bytes.
pub const MAX_DATABASE_NAME_LEN: usize = 63;

const FORBIDDEN_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '\0'];

/// Errors raised while loading or validating a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The plan file could not be read.
    #[error("failed to read plan file {path}: {source}")]
    Read {
        /// Path of the plan file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The plan is not valid JSON or does not match the plan format.
    #[error("failed to parse plan: {0}")]
    Parse(#[from] serde_json::Error),

    /// A credential refers to an environment variable that is not set.
    #[error("credential for user \"{principal}\" reads ${var}, which is not set")]
    MissingCredential {
        /// The principal whose credential is missing.
        principal: String,
        /// The environment variable name.
        var: String,
    },

    /// The plan has no steps.
    #[error("plan has no steps")]
    Empty,

    /// A step names something the database would reject.
    #[error("step {step}: {reason}")]
    Invalid {
        /// 1-based step number.
        step: usize,
        /// What is wrong with it.
        reason: String,
    },
}

// ── File format ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanFile {
    steps: Vec<PlanFileStep>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum PlanFileStep {
    EnsurePrincipal {
        database: String,
        name: String,
        credential: CredentialSource,
        #[serde(default)]
        grants: Vec<Grant>,
    },
    EnsureCollection {
        database: String,
        collection: String,
        #[serde(default)]
        options: CollectionOptions,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CredentialSource {
    Literal(String),
    Env(String),
}

// ── Plan ────────────────────────────────────────────────────────────────────

/// An ordered list of bootstrap steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    steps: Vec<BootstrapStep>,
}

impl Plan {
    /// Build a plan from steps, in execution order.
    #[must_use]
    pub fn new(steps: Vec<BootstrapStep>) -> Self {
        Self { steps }
    }

    /// The steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[BootstrapStep] {
        &self.steps
    }

    /// Load a plan file, resolving credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the file cannot be read or parsed, or a
    /// credential variable is unset.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Parse a plan, resolving credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the JSON is malformed or a credential
    /// variable is unset.
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        Self::from_json_with(json, |var| std::env::var(var).ok())
    }

    /// Parse a plan, resolving credential variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the JSON is malformed or `lookup` returns
    /// `None` for a credential variable.
    pub fn from_json_with(
        json: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PlanError> {
        let file: PlanFile = serde_json::from_str(json)?;
        let steps = file
            .steps
            .into_iter()
            .map(|step| -> Result<BootstrapStep, PlanError> {
                match step {
                    PlanFileStep::EnsurePrincipal {
                        database,
                        name,
                        credential,
                        grants,
                    } => {
                        let secret = match credential {
                            CredentialSource::Literal(value) => value,
                            CredentialSource::Env(var) => {
                                lookup(&var).ok_or_else(|| PlanError::MissingCredential {
                                    principal: name.clone(),
                                    var,
                                })?
                            }
                        };
                        let principal = Principal::new(name, secret).with_grants(grants);
                        Ok(BootstrapStep::ensure_principal(database, principal))
                    }
                    PlanFileStep::EnsureCollection {
                        database,
                        collection,
                        options,
                    } => Ok(BootstrapStep::ensure_collection_with(
                        database, collection, options,
                    )),
                }
            })
            .collect::<Result<Vec<_>, PlanError>>()?;
        Ok(Self { steps })
    }

    /// The product-service bring-up: a root admin, a read/write service user
    /// and the `user` collection that materializes the service database.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::MissingCredential`] if [`ADMIN_PASSWORD_ENV`] or
    /// [`SERVICE_PASSWORD_ENV`] is unset.
    pub fn product_service() -> Result<Self, PlanError> {
        Self::product_service_with(|var| std::env::var(var).ok())
    }

    /// [`Plan::product_service`] with credentials resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::MissingCredential`] if a password is missing.
    pub fn product_service_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PlanError> {
        let secret = |principal: &str, var: &str| {
            lookup(var).ok_or_else(|| PlanError::MissingCredential {
                principal: principal.to_string(),
                var: var.to_string(),
            })
        };

        let admin = Principal::new("admin", secret("admin", ADMIN_PASSWORD_ENV)?)
            .grant("root", "admin");
        let service = Principal::new("productAdmin", secret("productAdmin", SERVICE_PASSWORD_ENV)?)
            .grant("readWrite", "product-service");

        Ok(Self::new(vec![
            BootstrapStep::ensure_principal("admin", admin),
            BootstrapStep::ensure_principal("product-service", service),
            BootstrapStep::ensure_collection("product-service", "user"),
        ]))
    }

    /// Check every step against the database's naming rules.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Empty`] for a plan without steps, or
    /// [`PlanError::Invalid`] for the first offending step.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::Empty);
        }

        for (index, step) in self.steps.iter().enumerate() {
            let invalid = |reason: String| PlanError::Invalid {
                step: index + 1,
                reason,
            };

            validate_database_name(step.database().name()).map_err(invalid)?;

            match step {
                BootstrapStep::EnsurePrincipal { principal, .. } => {
                    if principal.name.is_empty() {
                        return Err(invalid("user name is empty".to_string()));
                    }
                    for grant in &principal.grants {
                        if grant.role.is_empty() {
                            return Err(invalid(format!(
                                "user \"{}\" has a grant with an empty role",
                                principal.name
                            )));
                        }
                        validate_database_name(&grant.database)
                            .map_err(|reason| invalid(format!("grant {grant}: {reason}")))?;
                    }
                }
                BootstrapStep::EnsureCollection { collection, .. } => {
                    validate_collection_name(collection).map_err(invalid)?;
                }
            }
        }
        Ok(())
    }
}

fn validate_database_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("database name is empty".to_string());
    }
    if name.len() > MAX_DATABASE_NAME_LEN {
        return Err(format!(
            "database name \"{name}\" is longer than {MAX_DATABASE_NAME_LEN} bytes"
        ));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_DATABASE_CHARS.contains(c)) {
        return Err(format!("database name \"{name}\" contains {c:?}"));
    }
    Ok(())
}

fn validate_collection_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("collection name is empty".to_string());
    }
    if name.contains(['$', '\0']) {
        return Err(format!("collection name \"{name}\" contains '$' or NUL"));
    }
    if name.starts_with("system.") {
        return Err(format!("collection name \"{name}\" is in the reserved system namespace"));
    }
    Ok(())
}
