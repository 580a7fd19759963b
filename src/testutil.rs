//! Shared test utilities
//!
//! Common page and state builders used across test modules. Only compiled in
//! test builds.

use serde_json::Value;

use crate::flow::page::Page;
use crate::flow::schema::ValidationSchema;
use crate::flow::state::State;

/// A page that collects nothing.
#[must_use]
pub fn plain_page(path: &str) -> Page {
    Page::builder(path).build().unwrap()
}

/// A form page bound to `section` whose fields are all required text.
#[must_use]
pub fn form_page(path: &str, section: &str, fields: &[&str]) -> Page {
    Page::builder(path)
        .section(section)
        .schema(ValidationSchema::required_text(fields))
        .build()
        .unwrap()
}

/// Build a state from a JSON object literal.
///
/// Panics if `value` is not an object.
#[must_use]
pub fn state(value: Value) -> State {
    State::from_value(value).unwrap()
}
