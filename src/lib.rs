// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod ingest;
pub mod pipeline;
pub mod reconcile;
pub mod state;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::ScraperConfig;
pub use crate::ingest::types::{Campus, CanonicalEvent, EventSource, FetchError};
pub use crate::pipeline::{FetchVia, Pipeline, RunSummary};
pub use crate::state::{reset_kill_switch, FailureState, JsonFileStateStore, StateStore};
pub use crate::store::EventStore;
