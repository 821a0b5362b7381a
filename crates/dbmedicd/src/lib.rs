//! dbmedicd - autonomous diagnostic orchestration for managed databases.
//!
//! A trigger is classified into a scenario, the scenario's minimal probe set
//! runs concurrently under a deadline, results are aggregated, scored and
//! turned into recommendations. Invalid selections and total execution
//! failures get exactly one retry with the full registry.

pub mod aggregator;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod executor;
pub mod fallback;
pub mod probe;
pub mod recommender;
pub mod render;
pub mod scoring;
pub mod selector;

pub use catalog::{CatalogIssue, Scenario, ScenarioCatalog};
pub use classifier::{Classification, Classifier};
pub use config::MedicConfig;
pub use engine::{Investigation, Investigator, SelectionSummary};
pub use executor::{BatchOutcome, BatchResult, ProbeExecutor};
pub use fallback::{ControlledRun, FallbackController, RunState, Transition};
pub use probe::registry::ProbeRegistry;
pub use probe::{Probe, ProbeContext};
pub use selector::{ProbeSelector, Selection};
