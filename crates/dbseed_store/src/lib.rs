//! # dbseed_store
//!
//! Document store access for the bootstrap runner.
//!
//! This crate provides:
//!
//! - [`store`] — the [`DocumentStore`] trait the runner drives.
//! - [`mongo`] — the MongoDB backend.
//! - [`memory`] — an in-process backend with failure injection, for tests.
//! - [`connection`] — connection string defaults and resolution.
//! - [`error`] — the store error taxonomy.

pub mod connection;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{DocumentStore, PrincipalRecord};
