//! Logging and observability
//!
//! Diagnostics go through `tracing`; routing decisions are also appended to a
//! JSONL navigation history.

pub mod jsonl;
pub mod tracing_setup;

pub use jsonl::{JsonlLogger, NavigationRecord};
pub use tracing_setup::{init_tracing, LogFormat};
