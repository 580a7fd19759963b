//! Page flow engine
//!
//! Page definitions, the conditions and schemas they reference, and the
//! resolver that picks the next page from the current state.

pub mod condition;
pub mod config;
pub mod definition;
pub mod host;
pub mod page;
pub mod resolver;
pub mod schema;
pub mod state;
pub mod template;
