//! In-process document store.
//!
//! Models the parts of a document database a bootstrap touches: users per
//! database, collections with their creation options and documents, and
//! lazy databases that only exist once a collection has been created in
//! them. Failures can be injected to exercise the runner's abort paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use serde_json::Value;

use dbseed_model::{CollectionOptions, DatabaseRef, MaterializedDatabase, Principal};

use crate::error::StoreError;
use crate::store::{DocumentStore, PrincipalRecord};

type Key = (String, String);

fn key(database: &DatabaseRef, name: &str) -> Key {
    (database.name().to_string(), name.to_string())
}

#[derive(Debug, Clone)]
struct StoredCollection {
    options: CollectionOptions,
    documents: Vec<Value>,
}

/// A [`DocumentStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Users keyed by `(database, name)`.
    principals: DashMap<Key, Principal>,
    /// Collections keyed by `(database, collection)`.
    collections: DashMap<Key, StoredCollection>,
    /// Databases that have been written to.
    databases: DashSet<String>,
    /// Users whose next lookups report them missing, with a count.
    hidden_principals: DashMap<Key, usize>,
    /// Collections whose next lookups report them missing, with a count.
    hidden_collections: DashMap<Key, usize>,
    /// When set, every call fails with [`StoreError::Connection`].
    unreachable: AtomicBool,
    /// When set, every write fails with [`StoreError::Permission`].
    read_only: AtomicBool,
    /// Number of successful writes.
    writes: AtomicUsize,
}

impl MemoryStore {
    /// An empty deployment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Failure injection ───────────────────────────────────────────────────

    /// Make every call fail as if the server refused the connection.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make every write fail as if the connected user lacked the rights.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Make the next lookup of user `name` on `database` miss, as if another
    /// writer created it right after the check. Each call hides one more
    /// lookup.
    pub fn race_next_principal_lookup(&self, database: &str, name: &str) {
        *self
            .hidden_principals
            .entry((database.to_string(), name.to_string()))
            .or_default() += 1;
    }

    /// Make the next lookup of `database.collection` miss, as if another
    /// writer created it right after the check. Each call hides one more
    /// lookup.
    pub fn race_next_collection_lookup(&self, database: &str, collection: &str) {
        *self
            .hidden_collections
            .entry((database.to_string(), collection.to_string()))
            .or_default() += 1;
    }

    // ── Inspection ──────────────────────────────────────────────────────────

    /// The stored principal, credential included.
    #[must_use]
    pub fn principal(&self, database: &str, name: &str) -> Option<Principal> {
        self.principals
            .get(&(database.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of principals defined on `database`.
    #[must_use]
    pub fn principal_count(&self, database: &str) -> usize {
        self.principals
            .iter()
            .filter(|entry| entry.key().0 == database)
            .count()
    }

    /// Options the collection was created with.
    #[must_use]
    pub fn collection_options(&self, database: &str, collection: &str) -> Option<CollectionOptions> {
        self.collections
            .get(&(database.to_string(), collection.to_string()))
            .map(|entry| entry.options.clone())
    }

    /// Documents held by the collection.
    #[must_use]
    pub fn documents(&self, database: &str, collection: &str) -> Option<Vec<Value>> {
        self.collections
            .get(&(database.to_string(), collection.to_string()))
            .map(|entry| entry.documents.clone())
    }

    /// Insert a document, creating the collection implicitly like a driver
    /// insert would.
    pub fn insert_document(&self, database: &str, collection: &str, document: Value) {
        self.collections
            .entry((database.to_string(), collection.to_string()))
            .or_insert_with(|| StoredCollection {
                options: CollectionOptions::new(),
                documents: Vec::new(),
            })
            .documents
            .push(document);
        self.databases.insert(database.to_string());
    }

    /// Returns `true` once `database` has been written to.
    #[must_use]
    pub fn database_exists(&self, database: &str) -> bool {
        self.databases.contains(database)
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn connected(&self) -> Result<(), StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection refused".to_string()));
        }
        Ok(())
    }

    fn writable(&self, what: &str) -> Result<(), StoreError> {
        self.connected()?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::Permission(format!("not authorized to {what}")));
        }
        Ok(())
    }
}

/// Consume one hidden lookup of `key`, if any are left.
fn take_hidden(hidden: &DashMap<Key, usize>, key: &Key) -> bool {
    match hidden.entry(key.clone()) {
        Entry::Occupied(mut remaining) => {
            *remaining.get_mut() -= 1;
            if *remaining.get() == 0 {
                remaining.remove();
            }
            true
        }
        Entry::Vacant(_) => false,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.connected()
    }

    async fn find_principal(
        &self,
        database: &DatabaseRef,
        name: &str,
    ) -> Result<Option<PrincipalRecord>, StoreError> {
        self.connected()?;
        let key = key(database, name);
        if take_hidden(&self.hidden_principals, &key) {
            return Ok(None);
        }
        Ok(self.principals.get(&key).map(|entry| PrincipalRecord {
            name: entry.name.clone(),
            grants: entry.grants.clone(),
        }))
    }

    async fn create_principal(
        &self,
        database: &DatabaseRef,
        principal: &Principal,
    ) -> Result<(), StoreError> {
        self.writable("createUser")?;
        match self.principals.entry(key(database, &principal.name)) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!(
                    "User \"{}@{}\" already exists",
                    principal.name, database
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(principal.clone());
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_principal(
        &self,
        database: &DatabaseRef,
        principal: &Principal,
    ) -> Result<(), StoreError> {
        self.writable("updateUser")?;
        let mut entry = self
            .principals
            .get_mut(&key(database, &principal.name))
            .ok_or_else(|| {
                StoreError::Backend(format!(
                    "User {}@{} not found (code 11)",
                    principal.name, database
                ))
            })?;
        entry.credential = principal.credential.clone();
        entry.grants = principal.grants.clone();
        drop(entry);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn collection_exists(
        &self,
        database: &DatabaseRef,
        collection: &str,
    ) -> Result<bool, StoreError> {
        self.connected()?;
        let key = key(database, collection);
        if take_hidden(&self.hidden_collections, &key) {
            return Ok(false);
        }
        Ok(self.collections.contains_key(&key))
    }

    async fn create_collection(
        &self,
        database: &DatabaseRef,
        collection: &str,
        options: &CollectionOptions,
    ) -> Result<MaterializedDatabase, StoreError> {
        self.writable("create")?;
        match self.collections.entry(key(database, collection)) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!(
                    "Collection {database}.{collection} already exists."
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(StoredCollection {
                    options: options.clone(),
                    documents: Vec::new(),
                });
            }
        }
        self.databases.insert(database.name().to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(MaterializedDatabase::confirmed(database))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::Barrier;

    use super::*;

    #[tokio::test]
    async fn test_principal_lifecycle() {
        let store = MemoryStore::new();
        let db = DatabaseRef::new("svc-db");
        let principal = Principal::new("svcUser", "pw").grant("readWrite", "svc-db");

        assert!(store.find_principal(&db, "svcUser").await.unwrap().is_none());
        store.create_principal(&db, &principal).await.unwrap();
        assert!(
            store
                .create_principal(&db, &principal)
                .await
                .unwrap_err()
                .is_conflict()
        );

        let updated = Principal::new("svcUser", "pw2").grant("read", "svc-db");
        store.update_principal(&db, &updated).await.unwrap();
        assert_eq!(store.principal("svc-db", "svcUser"), Some(updated));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_user_creation_does_not_materialize_database() {
        let store = MemoryStore::new();
        let db = DatabaseRef::new("svc-db");
        store
            .create_principal(&db, &Principal::new("svcUser", "pw"))
            .await
            .unwrap();
        assert!(!store.database_exists("svc-db"));

        let materialized = store
            .create_collection(&db, "user", &CollectionOptions::new())
            .await
            .unwrap();
        assert_eq!(materialized.name(), "svc-db");
        assert!(store.database_exists("svc-db"));
    }

    #[tokio::test]
    async fn test_update_missing_principal_fails() {
        let store = MemoryStore::new();
        let err = store
            .update_principal(&DatabaseRef::new("d"), &Principal::new("ghost", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn test_race_hides_counted_lookups() {
        let store = MemoryStore::new();
        let db = DatabaseRef::new("d");
        store.insert_document("d", "c", json!({ "x": 1 }));
        store.race_next_collection_lookup("d", "c");
        store.race_next_collection_lookup("d", "c");

        assert!(!store.collection_exists(&db, "c").await.unwrap());
        assert!(!store.collection_exists(&db, "c").await.unwrap());
        assert!(store.collection_exists(&db, "c").await.unwrap());
    }

    #[tokio::test]
    async fn test_races_are_kept_apart_by_kind() {
        let store = MemoryStore::new();
        let db = DatabaseRef::new("d");
        store.insert_document("d", "user", json!({ "x": 1 }));
        store
            .create_principal(&db, &Principal::new("user", "pw"))
            .await
            .unwrap();
        store.race_next_principal_lookup("d", "user");

        assert!(store.collection_exists(&db, "user").await.unwrap());
        assert!(store.find_principal(&db, "user").await.unwrap().is_none());
        assert!(store.find_principal(&db, "user").await.unwrap().is_some());

        store.race_next_collection_lookup("d", "user");
        assert!(store.find_principal(&db, "user").await.unwrap().is_some());
        assert!(!store.collection_exists(&db, "user").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_creates_admit_one_winner() {
        for _ in 0..500 {
            let store = Arc::new(MemoryStore::new());
            let barrier = Arc::new(Barrier::new(2));

            let creators: Vec<_> = (0..2)
                .map(|_| {
                    let store = Arc::clone(&store);
                    let barrier = Arc::clone(&barrier);
                    tokio::spawn(async move {
                        let db = DatabaseRef::new("d");
                        barrier.wait().await;
                        let user = store
                            .create_principal(&db, &Principal::new("u", "pw"))
                            .await;
                        let collection = store
                            .create_collection(&db, "c", &CollectionOptions::new())
                            .await;
                        (user, collection)
                    })
                })
                .collect();

            let mut users = Vec::new();
            let mut collections = Vec::new();
            for creator in creators {
                let (user, collection) = creator.await.unwrap();
                users.push(user);
                collections.push(collection.map(|_| ()));
            }

            for results in [users, collections] {
                assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
                assert!(
                    results
                        .iter()
                        .filter_map(|r| r.as_ref().err())
                        .all(StoreError::is_conflict)
                );
            }
            assert_eq!(store.write_count(), 2);
        }
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        let db = DatabaseRef::new("d");

        store.set_read_only(true);
        let err = store
            .create_collection(&db, "c", &CollectionOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Permission(_)));
        assert!(store.collection_exists(&db, "c").await.is_ok());

        store.set_unreachable(true);
        assert!(matches!(
            store.ping().await.unwrap_err(),
            StoreError::Connection(_)
        ));
        assert_eq!(store.write_count(), 0);
    }
}
