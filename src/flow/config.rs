//! Flow configuration parser
//!
//! Parses `flow.toml` into page, condition and template definitions.
//! Structural mistakes are rejected here; cross-references between pages and
//! the condition registry are checked when the [`Flow`](crate::Flow) is built.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flow::condition::{ConditionDef, ConditionOp};
use crate::flow::page::default_template;
use crate::flow::schema::{FieldKind, FieldRule};

/// Global settings shared by the whole flow
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Flow name, recorded in navigation logs
    #[serde(default)]
    pub name: String,
    /// Route callers fall back to when no page is left to visit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_next: Option<String>,
}

/// A single page definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageConfig {
    /// Unique routable path, starting with `/`
    pub path: String,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// State section the page owns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Condition gating the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Template id, defaults to the path without its leading `/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Page behaviour: `question`, `content` or `summary`
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Whether the page collects answers; defaults to having fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_form_components: Option<bool>,
    /// Fields collected by the page
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

fn default_kind() -> String {
    "question".to_string()
}

impl PageConfig {
    /// Template id this page renders.
    #[must_use]
    pub fn template_id(&self) -> String {
        self.template
            .clone()
            .unwrap_or_else(|| default_template(&self.path))
    }
}

/// Top-level configuration parsed from flow.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Declarative conditions
    #[serde(rename = "condition", default)]
    pub conditions: Vec<ConditionDef>,
    /// Template bodies keyed by id. Empty when an external renderer is used.
    #[serde(default)]
    pub templates: HashMap<String, String>,
    /// Pages in traversal order
    #[serde(rename = "page", default)]
    pub pages: Vec<PageConfig>,
}

impl FlowConfig {
    /// Parse a flow.toml file from a path
    ///
    /// # Arguments
    /// * `path` - Location of the flow definition, typically `flow.toml`
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The content is not valid TOML or does not match the expected shape
    /// - Any structural check in [`FlowConfig::parse`] fails
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse flow.toml content from a string
    ///
    /// Deserializes the content, then runs the structural checks:
    /// - at least one page, with well-formed unique paths
    /// - unique condition names whose values suit their operator
    /// - unique field names within each page
    /// - known template ids, when the config carries templates
    ///
    /// # Errors
    /// Returns the first structural problem found, with the offending page
    /// or condition named in the error context
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse flow.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Find a page by path
    #[must_use]
    pub fn get_page(&self, path: &str) -> Option<&PageConfig> {
        self.pages.iter().find(|p| p.path == path)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.pages.is_empty() {
            bail!("Flow must define at least one [[page]]");
        }

        // Check that page paths are well-formed
        for page in &self.pages {
            validate_path(&page.path)?;
        }

        // Check for duplicate page paths
        let mut seen = HashSet::new();
        for page in &self.pages {
            if !seen.insert(&page.path) {
                bail!("Duplicate page path: '{}'", page.path);
            }
        }

        // The fallback route is a path too, though it need not be a flow page
        if let Some(default_next) = &self.global.default_next {
            validate_path(default_next).context("in [global] default_next")?;
        }

        // Conditions are looked up by name, so names must be unique
        let mut condition_names = HashSet::new();
        for condition in &self.conditions {
            if !condition_names.insert(&condition.name) {
                bail!("Duplicate condition name: '{}'", condition.name);
            }
            validate_condition(condition)
                .with_context(|| format!("in condition '{}'", condition.name))?;
        }

        for page in &self.pages {
            validate_fields(&page.fields)
                .with_context(|| format!("in page '{}'", page.path))?;
        }

        // Templates are only checked when the config carries its own
        if !self.templates.is_empty() {
            for page in &self.pages {
                let id = page.template_id();
                if !self.templates.contains_key(&id) {
                    bail!("Page '{}' uses unknown template '{id}'", page.path);
                }
            }
        }

        Ok(())
    }
}

fn validate_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("Page path cannot be empty");
    }
    if !path.starts_with('/') {
        bail!("Invalid path '{path}': paths must start with '/'");
    }
    if path.contains(char::is_whitespace) {
        bail!("Invalid path '{path}': paths cannot contain whitespace");
    }
    Ok(())
}

fn validate_condition(condition: &ConditionDef) -> Result<()> {
    if condition.name.trim().is_empty() {
        bail!("Condition name cannot be empty");
    }
    if condition.field.trim().is_empty() {
        bail!("Condition field cannot be empty");
    }
    match (condition.op, &condition.value) {
        (op, None) if op.needs_value() => {
            bail!("Operator '{op:?}' requires a value");
        }
        (ConditionOp::OneOf, Some(value)) if !value.is_array() => {
            bail!("Operator 'one_of' requires a list value");
        }
        (ConditionOp::Gt | ConditionOp::Gte | ConditionOp::Lt | ConditionOp::Lte, Some(value))
            if !matches!(value, Value::Number(_)) =>
        {
            bail!("Comparison operators require a numeric value");
        }
        _ => Ok(()),
    }
}

fn validate_fields(fields: &[FieldRule]) -> Result<()> {
    let mut names = HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            bail!("Field name cannot be empty");
        }
        if !names.insert(&field.name) {
            bail!("Duplicate field name: '{}'", field.name);
        }
        if field.kind == FieldKind::Choice && field.options.is_empty() {
            bail!("Choice field '{}' has no options", field.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID_CONFIG: &str = r#"
[global]
name = "apply"
default_next = "/summary"

[[condition]]
name = "isOver18"
field = "age"
op = "gte"
value = 18

[[page]]
path = "/start"
kind = "content"

[[page]]
path = "/name"
title = "Your name"
section = "name"

[[page.fields]]
name = "first"

[[page.fields]]
name = "last"
max_length = 50

[[page]]
path = "/eligibility"
section = "eligibility"
condition = "isOver18"

[[page.fields]]
name = "reason"
kind = "choice"
options = ["work", "study"]

[[page]]
path = "/confirm"
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = FlowConfig::parse(VALID_CONFIG).unwrap();

        assert_eq!(config.global.name, "apply");
        assert_eq!(config.global.default_next.as_deref(), Some("/summary"));
        assert_eq!(config.conditions.len(), 1);
        assert_eq!(config.pages.len(), 4);
    }

    #[test]
    fn test_parse_page_fields() {
        let config = FlowConfig::parse(VALID_CONFIG).unwrap();
        let name = config.get_page("/name").unwrap();

        assert_eq!(name.title.as_deref(), Some("Your name"));
        assert_eq!(name.section.as_deref(), Some("name"));
        assert_eq!(name.kind, "question");
        assert_eq!(name.fields.len(), 2);
        assert_eq!(name.fields[1].max_length, Some(50));
        assert_eq!(name.has_form_components, None);
    }

    #[test]
    fn test_parse_condition() {
        let config = FlowConfig::parse(VALID_CONFIG).unwrap();
        let condition = &config.conditions[0];
        assert_eq!(condition.name, "isOver18");
        assert_eq!(condition.op, ConditionOp::Gte);
        assert_eq!(condition.value, Some(json!(18)));
    }

    #[test]
    fn test_page_order_preserved() {
        let config = FlowConfig::parse(VALID_CONFIG).unwrap();
        let paths: Vec<_> = config.pages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["/start", "/name", "/eligibility", "/confirm"]);
    }

    #[test]
    fn test_template_id_defaults_to_path() {
        let config = FlowConfig::parse(VALID_CONFIG).unwrap();
        assert_eq!(config.get_page("/name").unwrap().template_id(), "name");
    }

    #[test]
    fn test_global_section_optional() {
        let toml = r#"
[[page]]
path = "/start"
"#;
        let config = FlowConfig::parse(toml).unwrap();
        assert_eq!(config.global, GlobalConfig::default());
    }

    #[test]
    fn test_reject_duplicate_page_paths() {
        let toml = r#"
[[page]]
path = "/start"

[[page]]
path = "/start"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(
            err.to_string().contains("Duplicate page path"),
            "Expected 'Duplicate page path' error, got: {err}"
        );
    }

    #[test]
    fn test_reject_empty_path() {
        let toml = r#"
[[page]]
path = ""
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(
            err.to_string().contains("empty"),
            "Expected 'empty' error, got: {err}"
        );
    }

    #[test]
    fn test_reject_relative_path() {
        let toml = r#"
[[page]]
path = "start"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }

    #[test]
    fn test_reject_bad_default_next() {
        let toml = r#"
[global]
default_next = "summary"

[[page]]
path = "/start"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        let msg = format!("{err:?}");
        assert!(msg.contains("default_next"), "got: {msg}");
    }

    #[test]
    fn test_reject_duplicate_condition_names() {
        let toml = r#"
[[condition]]
name = "a"
field = "x"
op = "present"

[[condition]]
name = "a"
field = "y"
op = "absent"

[[page]]
path = "/start"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("Duplicate condition name"));
    }

    #[test]
    fn test_reject_condition_without_value() {
        let toml = r#"
[[condition]]
name = "adult"
field = "age"
op = "gte"

[[page]]
path = "/start"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        let msg = format!("{err:?}");
        assert!(msg.contains("requires a value"), "got: {msg}");
        assert!(msg.contains("in condition 'adult'"), "got: {msg}");
    }

    #[test]
    fn test_reject_one_of_without_list() {
        let toml = r#"
[[condition]]
name = "wales"
field = "country"
op = "one_of"
value = "Wales"

[[page]]
path = "/start"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(format!("{err:?}").contains("list value"));
    }

    #[test]
    fn test_reject_non_numeric_comparison() {
        let toml = r#"
[[condition]]
name = "adult"
field = "age"
op = "gt"
value = "eighteen"

[[page]]
path = "/start"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(format!("{err:?}").contains("numeric value"));
    }

    #[test]
    fn test_reject_unknown_operator() {
        let toml = r#"
[[condition]]
name = "adult"
field = "age"
op = "roughly"
value = 18

[[page]]
path = "/start"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_reject_duplicate_field_names() {
        let toml = r#"
[[page]]
path = "/name"
section = "name"

[[page.fields]]
name = "first"

[[page.fields]]
name = "first"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        let msg = format!("{err:?}");
        assert!(msg.contains("Duplicate field name"), "got: {msg}");
        assert!(msg.contains("in page '/name'"), "got: {msg}");
    }

    #[test]
    fn test_reject_choice_without_options() {
        let toml = r#"
[[page]]
path = "/colour"

[[page.fields]]
name = "colour"
kind = "choice"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(format!("{err:?}").contains("has no options"));
    }

    #[test]
    fn test_reject_unknown_template_when_templates_given() {
        let toml = r#"
[templates]
start = "Start"

[[page]]
path = "/start"

[[page]]
path = "/name"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("unknown template 'name'"));
    }

    #[test]
    fn test_reject_missing_pages() {
        let toml = r#"
[global]
name = "empty"
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(
            err.to_string().contains("at least one [[page]]"),
            "Expected 'at least one [[page]]' error, got: {err}"
        );
    }

    #[test]
    fn test_reject_conditions_without_pages() {
        let toml = r#"
[[condition]]
name = "adult"
field = "age"
op = "gte"
value = 18
"#;
        let err = FlowConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("at least one [[page]]"));
    }

    #[test]
    fn test_reject_invalid_toml() {
        let err = FlowConfig::parse("not valid toml {{{").unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = FlowConfig::from_path("/nonexistent/flow.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_from_path_valid_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("flow.toml");
        std::fs::write(&config_path, VALID_CONFIG).unwrap();

        let config = FlowConfig::from_path(&config_path).unwrap();
        assert_eq!(config.pages.len(), 4);
    }
}
