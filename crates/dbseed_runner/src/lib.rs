//! # dbseed_runner
//!
//! Idempotent bootstrap of a document database.
//!
//! A run takes an ordered [`Plan`](dbseed_model::Plan) and a
//! [`DocumentStore`](dbseed_store::DocumentStore) and converges every step:
//!
//! 1. Validates the plan and pings the store.
//! 2. For each step, in order, looks up the target and then creates it,
//!    overwrites it (principals) or leaves it alone (collections).
//! 3. Reports each step as it completes and returns a [`RunSummary`].
//!
//! Running the same plan again converges to the same state and reports no
//! creations for targets that already exist.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dbseed_model::Plan;
//! use dbseed_runner::{BootstrapRunner, RunnerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = BootstrapRunner::new(RunnerConfig::new());
//!     let store = runner.connect().await?;
//!     let plan = Plan::product_service()?;
//!     let summary = runner.run(&store, &plan, |report| println!("{report}")).await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod report;
pub mod runner;

pub use config::{RunMode, RunnerConfig};
pub use error::RunError;
pub use report::{RunSummary, StepReport};
pub use runner::BootstrapRunner;
