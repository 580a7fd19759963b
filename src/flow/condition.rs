//! Condition registry
//!
//! Conditions are named predicates over the entire [`State`]. Pages refer to
//! them by name; names are checked against the registry when the flow is
//! built, so resolution never meets an unknown name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::flow::state::State;

/// A condition predicate. Evaluated fresh on every resolution.
pub type Predicate = Arc<dyn Fn(&State) -> bool + Send + Sync>;

/// Comparison applied by a declarative condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    /// Field equals the value
    Equals,
    /// Field is absent or differs from the value
    NotEquals,
    /// Field is a number greater than the value
    Gt,
    /// Field is a number greater than or equal to the value
    Gte,
    /// Field is a number less than the value
    Lt,
    /// Field is a number less than or equal to the value
    Lte,
    /// Field is answered (not null, not empty)
    Present,
    /// Field is unanswered
    Absent,
    /// Field equals one of the listed values
    OneOf,
}

impl ConditionOp {
    /// Whether the op compares against a `value`.
    #[must_use]
    pub const fn needs_value(self) -> bool {
        !matches!(self, Self::Present | Self::Absent)
    }
}

/// A condition declared in `flow.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionDef {
    /// Name pages use to refer to the condition
    pub name: String,
    /// Dotted path into the state, e.g. `age` or `eligibility.country`
    pub field: String,
    /// Comparison to apply
    pub op: ConditionOp,
    /// Right-hand side of the comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ConditionDef {
    /// Evaluate against a state.
    #[must_use]
    pub fn evaluate(&self, state: &State) -> bool {
        let actual = state.lookup(&self.field).filter(|v| !is_unanswered(v));
        let expected = self.value.as_ref();

        match (self.op, actual, expected) {
            (ConditionOp::Present, actual, _) => actual.is_some(),
            (ConditionOp::Absent, actual, _) => actual.is_none(),
            (ConditionOp::Equals, Some(a), Some(e)) => loosely_equal(a, e),
            (ConditionOp::NotEquals, Some(a), Some(e)) => !loosely_equal(a, e),
            (ConditionOp::NotEquals, None, _) => true,
            (ConditionOp::OneOf, Some(a), Some(Value::Array(options))) => {
                options.iter().any(|o| loosely_equal(a, o))
            }
            (
                op @ (ConditionOp::Gt | ConditionOp::Gte | ConditionOp::Lt | ConditionOp::Lte),
                Some(a),
                Some(e),
            ) => match (as_number(a), as_number(e)) {
                (Some(a), Some(e)) => match op {
                    ConditionOp::Gt => a > e,
                    ConditionOp::Gte => a >= e,
                    ConditionOp::Lt => a < e,
                    _ => a <= e,
                },
                _ => false,
            },
            _ => false,
        }
    }

    /// Compile into a registry predicate.
    #[must_use]
    pub fn into_predicate(self) -> Predicate {
        Arc::new(move |state: &State| self.evaluate(state))
    }
}

fn is_unanswered(value: &Value) -> bool {
    value.is_null() || value.as_str().is_some_and(str::is_empty)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality that treats `"18"` and `18` as the same answer.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => false,
    }
}

/// Explicit mapping from condition name to predicate.
#[derive(Clone, Default)]
pub struct ConditionRegistry {
    predicates: HashMap<String, Predicate>,
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl ConditionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile declarative conditions into a registry.
    pub fn from_definitions(defs: &[ConditionDef]) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for def in defs {
            registry.insert(def.name.clone(), def.clone().into_predicate())?;
        }
        Ok(registry)
    }

    /// Register a predicate under `name`. Names must be unique.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F) -> Result<(), ConfigError>
    where
        F: Fn(&State) -> bool + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(predicate))
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, predicate: F) -> Result<Self, ConfigError>
    where
        F: Fn(&State) -> bool + Send + Sync + 'static,
    {
        self.register(name, predicate)?;
        Ok(self)
    }

    /// Move every predicate of `other` into this registry.
    pub fn merge(&mut self, other: Self) -> Result<(), ConfigError> {
        for (name, predicate) in other.predicates {
            self.insert(name, predicate)?;
        }
        Ok(())
    }

    fn insert(&mut self, name: String, predicate: Predicate) -> Result<(), ConfigError> {
        if self.predicates.contains_key(&name) {
            return Err(ConfigError::DuplicateCondition(name));
        }
        self.predicates.insert(name, predicate);
        Ok(())
    }

    /// Returns true if a predicate is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Evaluate the named predicate. `None` if the name is unknown.
    #[must_use]
    pub fn evaluate(&self, name: &str, state: &State) -> Option<bool> {
        self.predicates.get(name).map(|p| p(state))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
