//! Flow definition
//!
//! A [`Flow`] is the ordered, immutable list of pages for one questionnaire
//! together with the condition registry and schema validator they use.
//! Construction checks every cross-reference up front.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::flow::condition::ConditionRegistry;
use crate::flow::config::{FlowConfig, PageConfig};
use crate::flow::page::{behavior_for_kind, Page};
use crate::flow::schema::{
    FieldValidator, SchemaValidator, ValidateOptions, ValidationReport, ValidationSchema,
};
use crate::flow::state::State;

/// The complete ordered set of pages making up one questionnaire.
#[derive(Clone)]
pub struct Flow {
    name: String,
    pages: Vec<Page>,
    conditions: ConditionRegistry,
    validator: Arc<dyn SchemaValidator>,
    default_next: Option<String>,
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("pages", &self.pages)
            .field("conditions", &self.conditions)
            .field("default_next", &self.default_next)
            .finish_non_exhaustive()
    }
}

/// How far through the flow a state is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Eligible pages that collect answers
    pub steps: usize,
    /// Of those, pages whose section validates
    pub completed: usize,
}

impl Flow {
    /// Build a flow, validating page paths and condition references.
    pub fn new(pages: Vec<Page>, conditions: ConditionRegistry) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for page in &pages {
            if !seen.insert(page.path()) {
                return Err(ConfigError::DuplicatePath(page.path().to_string()));
            }
            if let Some(condition) = page.condition() {
                if !conditions.contains(condition) {
                    return Err(ConfigError::UnknownCondition {
                        page: page.path().to_string(),
                        condition: condition.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            name: String::new(),
            pages,
            conditions,
            validator: Arc::new(FieldValidator),
            default_next: None,
        })
    }

    /// Build a flow from parsed configuration.
    ///
    /// `extra` holds programmatic predicates registered alongside the
    /// declarative `[[condition]]` entries.
    pub fn from_config(config: &FlowConfig, extra: ConditionRegistry) -> Result<Self, ConfigError> {
        let mut conditions = ConditionRegistry::from_definitions(&config.conditions)?;
        conditions.merge(extra)?;

        let pages = config
            .pages
            .iter()
            .map(build_page)
            .collect::<Result<Vec<_>, _>>()?;

        let mut flow = Self::new(pages, conditions)?;
        flow.name.clone_from(&config.global.name);
        flow.default_next.clone_from(&config.global.default_next);
        Ok(flow)
    }

    /// Replace the schema validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Set the flow name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the route callers fall back to at the end of the flow.
    #[must_use]
    pub fn with_default_next(mut self, path: impl Into<String>) -> Self {
        self.default_next = Some(path.into());
        self
    }

    /// Flow name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pages in traversal order
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Find a page by path
    #[must_use]
    pub fn page(&self, path: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.path() == path)
    }

    /// Condition registry
    #[must_use]
    pub const fn conditions(&self) -> &ConditionRegistry {
        &self.conditions
    }

    /// Schema validator
    #[must_use]
    pub fn validator(&self) -> &dyn SchemaValidator {
        self.validator.as_ref()
    }

    /// Fallback route at the end of the flow, if configured
    #[must_use]
    pub fn default_next(&self) -> Option<&str> {
        self.default_next.as_deref()
    }

    /// Whether a page is on the current path. Conditions see the whole state.
    #[must_use]
    pub fn is_eligible(&self, page: &Page, state: &State) -> bool {
        page.condition().is_none_or(|name| {
            // Names were checked in `new`, so a miss cannot happen here.
            self.conditions.evaluate(name, state).unwrap_or(false)
        })
    }

    /// Validate a page's relevant value with every declared field required.
    /// Pages without a schema validate trivially.
    #[must_use]
    pub fn completion_report(&self, page: &Page, state: &State) -> ValidationReport {
        page.validation_schema()
            .map_or_else(ValidationReport::default, |schema| {
                self.validator.validate(
                    &state.relevant_value(page.section()),
                    schema,
                    ValidateOptions::all_required(),
                )
            })
    }

    /// Count eligible form pages and how many of them are complete.
    #[must_use]
    pub fn progress(&self, state: &State) -> Progress {
        let form_pages = self
            .pages
            .iter()
            .filter(|p| p.has_form_components() && self.is_eligible(p, state));

        let (steps, completed) = form_pages.fold((0, 0), |(steps, completed), page| {
            let done = self.completion_report(page, state).is_valid();
            (steps + 1, completed + usize::from(done))
        });

        Progress { steps, completed }
    }
}

fn build_page(config: &PageConfig) -> Result<Page, ConfigError> {
    let behavior = behavior_for_kind(&config.kind).ok_or_else(|| ConfigError::UnknownKind {
        page: config.path.clone(),
        kind: config.kind.clone(),
    })?;

    let mut builder = Page::builder(&config.path).behavior(behavior);
    if let Some(title) = &config.title {
        builder = builder.title(title);
    }
    if let Some(section) = &config.section {
        builder = builder.section(section);
    }
    if let Some(condition) = &config.condition {
        builder = builder.condition(condition);
    }
    if let Some(template) = &config.template {
        builder = builder.template(template);
    }
    if !config.fields.is_empty() {
        builder = builder.schema(ValidationSchema::new(config.fields.clone()));
    }
    if let Some(has_form_components) = config.has_form_components {
        builder = builder.has_form_components(has_form_components);
    }

    builder.build()
}
