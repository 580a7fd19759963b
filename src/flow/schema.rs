//! Validation schemas for page sections
//!
//! A schema lists the fields a page collects. Validation never fails with an
//! error; it produces a [`ValidationReport`] that the resolver reads as
//! "complete" or "incomplete".

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type of value a field accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Non-empty string
    #[default]
    Text,
    /// Number, or a string that parses as one
    Number,
    /// Boolean, or the strings `"true"` / `"false"`
    Boolean,
    /// One of a fixed list of options
    Choice,
    /// Any non-null value
    Any,
}

/// Rule for a single field in a section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldRule {
    /// Field name inside the section
    pub name: String,
    /// Accepted value type
    #[serde(default)]
    pub kind: FieldKind,
    /// Whether the field must be answered on submission
    #[serde(default = "default_required")]
    pub required: bool,
    /// Allowed values for `choice` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Maximum length in characters for `text` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

const fn default_required() -> bool {
    true
}

impl FieldRule {
    /// A required field of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            options: Vec::new(),
            max_length: None,
        }
    }

    /// Mark the field optional for submission.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Restrict a choice field to the given options.
    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Limit text length.
    #[must_use]
    pub const fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

/// The declared fields of one page's section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationSchema {
    /// Field rules in declaration order
    pub fields: Vec<FieldRule>,
}

impl ValidationSchema {
    /// Build a schema from field rules.
    #[must_use]
    pub const fn new(fields: Vec<FieldRule>) -> Self {
        Self { fields }
    }

    /// Shorthand: every named field is required text.
    #[must_use]
    pub fn required_text(names: &[&str]) -> Self {
        Self::new(
            names
                .iter()
                .map(|n| FieldRule::new(*n, FieldKind::Text))
                .collect(),
        )
    }

    /// Find a field rule by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// How field presence is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    /// Honour each field's own `required` flag.
    #[default]
    Declared,
    /// Treat every declared field as required.
    Required,
}

/// Options passed to a [`SchemaValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidateOptions {
    /// Presence mode
    pub presence: Presence,
}

impl ValidateOptions {
    /// Options used when deciding whether a page is complete.
    #[must_use]
    pub const fn all_required() -> Self {
        Self {
            presence: Presence::Required,
        }
    }
}

/// What was wrong with a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    /// The value being validated is not an object.
    NotAnObject,
    /// Required but absent, null or empty.
    Missing,
    /// Present with the wrong type.
    WrongType(FieldKind),
    /// Not one of the allowed options.
    NotAnOption,
    /// Longer than allowed.
    TooLong(usize),
}

/// A single failed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name, empty for whole-value problems
    pub field: String,
    /// The failure
    pub problem: FieldProblem,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.problem {
            FieldProblem::NotAnObject => write!(f, "value must be an object"),
            FieldProblem::Missing => write!(f, "'{}' is required", self.field),
            FieldProblem::WrongType(kind) => {
                write!(f, "'{}' must be of kind {kind:?}", self.field)
            }
            FieldProblem::NotAnOption => {
                write!(f, "'{}' is not one of the allowed options", self.field)
            }
            FieldProblem::TooLong(max) => {
                write!(f, "'{}' must be at most {max} characters", self.field)
            }
        }
    }
}

/// Outcome of validating a value against a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// All failures, in schema order
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks a value against a schema.
pub trait SchemaValidator: Send + Sync {
    /// Validate `value` and report every failing field.
    fn validate(
        &self,
        value: &Value,
        schema: &ValidationSchema,
        options: ValidateOptions,
    ) -> ValidationReport;
}

/// Default validator: presence, type, options and length checks.
///
/// Unknown keys in the value are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldValidator;

impl SchemaValidator for FieldValidator {
    fn validate(
        &self,
        value: &Value,
        schema: &ValidationSchema,
        options: ValidateOptions,
    ) -> ValidationReport {
        let Some(answers) = value.as_object() else {
            return ValidationReport {
                errors: vec![FieldError {
                    field: String::new(),
                    problem: FieldProblem::NotAnObject,
                }],
            };
        };

        let errors = schema
            .fields
            .iter()
            .filter_map(|rule| {
                let required = match options.presence {
                    Presence::Required => true,
                    Presence::Declared => rule.required,
                };
                check_field(rule, answers.get(&rule.name), required).map(|problem| FieldError {
                    field: rule.name.clone(),
                    problem,
                })
            })
            .collect();

        ValidationReport { errors }
    }
}

/// Null and the empty string count as unanswered.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn check_field(rule: &FieldRule, value: Option<&Value>, required: bool) -> Option<FieldProblem> {
    let value = match value {
        v if is_blank(v) => return required.then_some(FieldProblem::Missing),
        Some(v) => v,
        None => return None,
    };

    match rule.kind {
        FieldKind::Text => {
            let Some(text) = value.as_str() else {
                return Some(FieldProblem::WrongType(FieldKind::Text));
            };
            match rule.max_length {
                Some(max) if text.chars().count() > max => Some(FieldProblem::TooLong(max)),
                _ => None,
            }
        }
        FieldKind::Number => {
            let numeric = value.is_number()
                || value
                    .as_str()
                    .is_some_and(|s| s.trim().parse::<f64>().is_ok());
            (!numeric).then_some(FieldProblem::WrongType(FieldKind::Number))
        }
        FieldKind::Boolean => {
            let boolean = value.is_boolean() || matches!(value.as_str(), Some("true" | "false"));
            (!boolean).then_some(FieldProblem::WrongType(FieldKind::Boolean))
        }
        FieldKind::Choice => {
            let chosen = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Some(FieldProblem::WrongType(FieldKind::Choice)),
            };
            (!rule.options.iter().any(|o| *o == chosen)).then_some(FieldProblem::NotAnOption)
        }
        FieldKind::Any => None,
    }
}
