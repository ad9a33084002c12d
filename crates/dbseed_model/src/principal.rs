//! Database principals (users) and their role grants.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A `(role, database)` pair conferring permissions on a database scope.
///
/// Grants order by role first, then database, so a principal's grant set
/// has a stable order regardless of how it was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    /// Role name, e.g. `"root"` or `"readWrite"`.
    pub role: String,
    /// The database the role applies to.
    #[serde(rename = "db", alias = "database")]
    pub database: String,
}

impl Grant {
    /// Create a grant of `role` on `database`.
    #[must_use]
    pub fn new(role: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            database: database.into(),
        }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.role, self.database)
    }
}

/// A credential string that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret, for handing to the database driver.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// A database user: a name unique within its database, a credential, and a
/// set of grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// User name, unique per database.
    pub name: String,
    /// The password the user authenticates with.
    pub credential: Secret,
    /// Roles granted to the user.
    pub grants: BTreeSet<Grant>,
}

impl Principal {
    /// Create a principal with no grants.
    #[must_use]
    pub fn new(name: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credential: Secret::new(credential),
            grants: BTreeSet::new(),
        }
    }

    /// Add a grant of `role` on `database`.
    #[must_use]
    pub fn grant(mut self, role: impl Into<String>, database: impl Into<String>) -> Self {
        self.grants.insert(Grant::new(role, database));
        self
    }

    /// Replace the grant set.
    #[must_use]
    pub fn with_grants(mut self, grants: impl IntoIterator<Item = Grant>) -> Self {
        self.grants = grants.into_iter().collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let principal = Principal::new("admin", "hunter2").grant("root", "admin");
        let debug = format!("{principal:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("Secret(***)"));
        assert_eq!(principal.credential.expose(), "hunter2");
    }

    #[test]
    fn test_duplicate_grants_collapse() {
        let principal = Principal::new("svc", "pw")
            .grant("readWrite", "svc-db")
            .grant("readWrite", "svc-db")
            .grant("read", "reporting");
        assert_eq!(principal.grants.len(), 2);
    }

    #[test]
    fn test_grant_order_is_declaration_independent() {
        let a = Principal::new("svc", "pw")
            .grant("read", "a")
            .grant("readWrite", "b");
        let b = Principal::new("svc", "pw")
            .grant("readWrite", "b")
            .grant("read", "a");
        assert_eq!(a, b);
    }

    #[test]
    fn test_grant_uses_db_key_on_the_wire() {
        let json = serde_json::to_value(Grant::new("root", "admin")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "root", "db": "admin" }));

        let parsed: Grant =
            serde_json::from_value(serde_json::json!({ "role": "read", "database": "x" })).unwrap();
        assert_eq!(parsed, Grant::new("read", "x"));
    }
}
