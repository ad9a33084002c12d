//! Logical and materialized database handles.
//!
//! A document database hands out database handles lazily: naming a database
//! does not create it, and it only persists once something is written to it.
//! The two phases are separate types here. A [`DatabaseRef`] is a name with
//! no guarantee of existence; a [`MaterializedDatabase`] is only produced once
//! the server has confirmed the database exists.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical reference to a database. Obtaining one performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseRef(String);

impl DatabaseRef {
    /// Reference a database by name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A database the server has confirmed to exist, either because a write just
/// created it or because it already holds a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MaterializedDatabase(String);

impl MaterializedDatabase {
    /// Record that `database` exists on the server.
    ///
    /// Store backends call this after a successful collection write or a
    /// positive collection lookup; nothing else should.
    #[must_use]
    pub fn confirmed(database: &DatabaseRef) -> Self {
        Self(database.0.clone())
    }

    /// The database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaterializedDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
