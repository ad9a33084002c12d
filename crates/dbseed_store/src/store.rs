//! The store seam the runner is written against.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dbseed_model::{CollectionOptions, DatabaseRef, Grant, MaterializedDatabase, Principal};

use crate::error::StoreError;

/// What the store reports about an existing principal. Credentials are never
/// read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRecord {
    /// User name.
    pub name: String,
    /// Grants the user currently holds.
    pub grants: BTreeSet<Grant>,
}

/// The operations a bootstrap needs from a document database.
///
/// Every call completes before the next is issued; implementations do not need
/// to support overlapping calls from one run.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Verify the server is reachable and accepts our credentials.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Look up a principal by name within `database`.
    async fn find_principal(
        &self,
        database: &DatabaseRef,
        name: &str,
    ) -> Result<Option<PrincipalRecord>, StoreError>;

    /// Create a principal. Fails with [`StoreError::Conflict`] if it exists.
    async fn create_principal(
        &self,
        database: &DatabaseRef,
        principal: &Principal,
    ) -> Result<(), StoreError>;

    /// Overwrite an existing principal's credential and grants.
    async fn update_principal(
        &self,
        database: &DatabaseRef,
        principal: &Principal,
    ) -> Result<(), StoreError>;

    /// Returns `true` if `database` holds a collection named `collection`.
    async fn collection_exists(
        &self,
        database: &DatabaseRef,
        collection: &str,
    ) -> Result<bool, StoreError>;

    /// Create a collection with `options`, materializing the database.
    /// Fails with [`StoreError::Conflict`] if it exists.
    async fn create_collection(
        &self,
        database: &DatabaseRef,
        collection: &str,
        options: &CollectionOptions,
    ) -> Result<MaterializedDatabase, StoreError>;
}
