//! Pageflow - Page-flow resolution engine
//!
//! Decides which page of a multi-step form a user should see next, given
//! the ordered page definitions and the answers collected so far. Pages may
//! be gated by named conditions and are skipped once their section of the
//! state validates.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod cli;
pub mod doctor;
pub mod error;
pub mod flow;
pub mod log;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use doctor::{diagnose, DiagnosticReport};
pub use error::{ConfigError, ProviderError};
pub use flow::condition::{ConditionDef, ConditionOp, ConditionRegistry};
pub use flow::config::{FlowConfig, GlobalConfig, PageConfig};
pub use flow::definition::{Flow, Progress};
pub use flow::host::{FlowHost, Navigation};
pub use flow::page::{Page, PageBehavior, PageBuilder, RouteHook, RouteOptions};
pub use flow::resolver::{explain_next, resolve_next, CandidateVerdict, RouteDecision, Trace};
pub use flow::schema::{FieldKind, FieldRule, FieldValidator, SchemaValidator, ValidationSchema};
pub use flow::state::{
    FileStateProvider, MemoryStateProvider, RequestContext, State, StateProvider,
};
pub use flow::template::{Renderer, Response, TemplateRenderer};
pub use log::{JsonlLogger, NavigationRecord};
