//! Page templates and rendering
//!
//! Supports `{{variable_name}}` syntax. Unknown variables are left as-is.
//! Real deployments plug their own [`Renderer`] in; [`TemplateRenderer`] is
//! the built-in one used by the CLI and tests.

use std::collections::HashMap;

use serde_json::Value;

use crate::flow::state::State;

/// Values made available to a template.
pub type ViewModel = HashMap<String, String>;

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP-style status code
    pub status: u16,
    /// Template the body was produced from
    pub template: String,
    /// Rendered body
    pub body: String,
}

impl Response {
    /// A 200 response.
    #[must_use]
    pub fn ok(template: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            template: template.into(),
            body: body.into(),
        }
    }
}

/// Turns a template id and view model into a response.
pub trait Renderer: Send + Sync {
    /// Render `template_id` with `view_model`.
    fn render(&self, template_id: &str, view_model: &ViewModel) -> Response;
}

/// Renders templates held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    templates: HashMap<String, String>,
}

impl TemplateRenderer {
    /// Create a renderer over the given templates.
    #[must_use]
    pub const fn new(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }

    /// Returns true if a template with this id exists.
    #[must_use]
    pub fn contains(&self, template_id: &str) -> bool {
        self.templates.contains_key(template_id)
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template_id: &str, view_model: &ViewModel) -> Response {
        self.templates.get(template_id).map_or_else(
            || Response {
                status: 500,
                template: template_id.to_string(),
                body: format!("Unknown template '{template_id}'"),
            },
            |template| Response::ok(template_id, expand_template(template, view_model)),
        )
    }
}

/// Expand `{{variable_name}}` patterns in a template string.
///
/// Resolution: looks up each `{{name}}` in `vars`. If found, replaces with
/// the value. If not found, leaves the `{{name}}` literal in the output.
/// Partial syntax like `{{incomplete` is also left as-is.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn expand_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        match after_open.find("}}") {
            Some(close) => {
                let var_name = &after_open[..close];
                // Only match if the variable name contains no whitespace
                if !var_name.is_empty() && !var_name.contains(char::is_whitespace) {
                    match vars.get(var_name) {
                        Some(value) => result.push_str(value),
                        None => result.push_str(&rest[open..open + 2 + close + 2]),
                    }
                    rest = &after_open[close + 2..];
                } else {
                    result.push_str("{{");
                    rest = after_open;
                }
            }
            None => {
                result.push_str("{{");
                rest = after_open;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Flatten every answer into `section.field` keys, plus unscoped keys as-is.
///
/// Strings are inserted verbatim; other scalars use their JSON form.
#[must_use]
pub fn answers_view_model(state: &State) -> ViewModel {
    let mut vars = ViewModel::new();
    for (key, value) in state.as_map() {
        match value {
            Value::Object(fields) => {
                for (field, answer) in fields {
                    vars.insert(format!("{key}.{field}"), display_value(answer));
                }
            }
            other => {
                vars.insert(key.clone(), display_value(other));
            }
        }
    }
    vars
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
