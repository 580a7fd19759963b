//! Page definitions
//!
//! A [`Page`] is one immutable step in a flow. Per-page GET behaviour and the
//! hooks a hosting router wraps around GET/POST handling come from a
//! [`PageBehavior`]; page variants with nothing special use
//! [`DefaultBehavior`].

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ConfigError, ProviderError};
use crate::flow::schema::{
    SchemaValidator, ValidateOptions, ValidationReport, ValidationSchema,
};
use crate::flow::state::{RequestContext, State, StateProvider};
use crate::flow::template::{answers_view_model, Renderer, Response, ViewModel};

/// Request method a hook is wrapped around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Page view
    Get,
    /// Answer submission
    Post,
}

/// Whether a hook runs before or after the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Before the handler
    Pre,
    /// After the handler
    Post,
}

/// What the router should do after a hook ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Carry on with normal handling.
    Continue,
    /// Stop and send this response instead.
    Respond(Response),
}

/// A hook the hosting router calls around a page's handlers.
pub trait RouteHook: Send + Sync {
    /// Run the hook.
    fn call(&self, page: &Page, method: Method, stage: Stage, ctx: &RequestContext)
        -> HookOutcome;
}

/// Inert hook: logs the call and continues.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHook;

impl RouteHook for LoggingHook {
    fn call(
        &self,
        page: &Page,
        method: Method,
        stage: Stage,
        ctx: &RequestContext,
    ) -> HookOutcome {
        debug!(
            page = page.path(),
            ?method,
            ?stage,
            session = %ctx.session_id,
            "route hook"
        );
        HookOutcome::Continue
    }
}

/// Hooks for one method of one page.
#[derive(Clone)]
pub struct RouteOptions {
    /// Runs before the handler
    pub pre: Arc<dyn RouteHook>,
    /// Runs after the handler
    pub post: Arc<dyn RouteHook>,
}

impl RouteOptions {
    /// Options whose hooks only log.
    #[must_use]
    pub fn inert() -> Self {
        Self {
            pre: Arc::new(LoggingHook),
            post: Arc::new(LoggingHook),
        }
    }
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self::inert()
    }
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions").finish_non_exhaustive()
    }
}

/// Capabilities a page variant can customise.
///
/// Every method has a default, so a variant with no special behaviour
/// implements only [`kind`](Self::kind).
pub trait PageBehavior: Send + Sync {
    /// Short name of the variant, e.g. `question` or `summary`.
    fn kind(&self) -> &'static str;

    /// Render the page for a GET request.
    ///
    /// The default renders the page's own template with an empty view model.
    fn render_get(&self, page: &Page, state: &State, renderer: &dyn Renderer) -> Response {
        let _ = state;
        renderer.render(page.template(), &ViewModel::new())
    }

    /// Hooks for GET handling.
    fn get_route_options(&self, page: &Page) -> RouteOptions {
        let _ = page;
        RouteOptions::inert()
    }

    /// Hooks for POST handling.
    fn post_route_options(&self, page: &Page) -> RouteOptions {
        let _ = page;
        RouteOptions::inert()
    }
}

/// Question and content pages: everything default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl PageBehavior for DefaultBehavior {
    fn kind(&self) -> &'static str {
        "question"
    }
}

/// Check-your-answers page: renders every answer given so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryBehavior;

impl PageBehavior for SummaryBehavior {
    fn kind(&self) -> &'static str {
        "summary"
    }

    fn render_get(&self, page: &Page, state: &State, renderer: &dyn Renderer) -> Response {
        let mut view_model = answers_view_model(state);
        if let Some(title) = page.title() {
            view_model.insert("title".to_string(), title.to_string());
        }
        renderer.render(page.template(), &view_model)
    }
}

/// Look up a built-in behaviour by the `kind` used in `flow.toml`.
#[must_use]
pub fn behavior_for_kind(kind: &str) -> Option<Arc<dyn PageBehavior>> {
    match kind {
        "question" | "content" => Some(Arc::new(DefaultBehavior)),
        "summary" => Some(Arc::new(SummaryBehavior)),
        _ => None,
    }
}

/// One step of a flow.
#[derive(Clone)]
pub struct Page {
    path: String,
    title: Option<String>,
    section: Option<String>,
    condition: Option<String>,
    template: String,
    has_form_components: bool,
    schema: Option<ValidationSchema>,
    behavior: Arc<dyn PageBehavior>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("path", &self.path)
            .field("section", &self.section)
            .field("condition", &self.condition)
            .field("has_form_components", &self.has_form_components)
            .field("kind", &self.behavior.kind())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Start building a page at `path`.
    #[must_use]
    pub fn builder(path: impl Into<String>) -> PageBuilder {
        PageBuilder::new(path)
    }

    /// Unique routable path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Display title
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// State section this page reads and writes
    #[must_use]
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// Name of the condition gating this page
    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Template id rendered on GET
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether the page collects answers
    #[must_use]
    pub const fn has_form_components(&self) -> bool {
        self.has_form_components
    }

    /// Schema for the page's section. Always set when the page has form components.
    #[must_use]
    pub const fn validation_schema(&self) -> Option<&ValidationSchema> {
        self.schema.as_ref()
    }

    /// The page's behaviour
    #[must_use]
    pub fn behavior(&self) -> &dyn PageBehavior {
        self.behavior.as_ref()
    }

    /// Hooks for GET handling.
    #[must_use]
    pub fn get_route_options(&self) -> RouteOptions {
        self.behavior.get_route_options(self)
    }

    /// Hooks for POST handling.
    #[must_use]
    pub fn post_route_options(&self) -> RouteOptions {
        self.behavior.post_route_options(self)
    }

    /// Build the GET handler for this page over a state source.
    #[must_use]
    pub fn get_handler<'a>(
        &'a self,
        state: &'a dyn StateProvider,
        renderer: &'a dyn Renderer,
    ) -> GetHandler<'a> {
        GetHandler {
            page: self,
            state,
            renderer,
        }
    }

    /// Validate a submission with each field's own `required` flag.
    /// Pages without a schema accept anything.
    #[must_use]
    pub fn validate_submission(
        &self,
        state: &State,
        validator: &dyn SchemaValidator,
    ) -> ValidationReport {
        self.schema.as_ref().map_or_else(ValidationReport::default, |schema| {
            validator.validate(
                &state.relevant_value(self.section()),
                schema,
                ValidateOptions::default(),
            )
        })
    }
}

/// Renders one page for a request, fetching state first.
pub struct GetHandler<'a> {
    page: &'a Page,
    state: &'a dyn StateProvider,
    renderer: &'a dyn Renderer,
}

impl GetHandler<'_> {
    /// Handle a GET. Provider errors are returned unchanged.
    pub async fn handle(&self, ctx: &RequestContext) -> Result<Response, ProviderError> {
        let state = self.state.get_state(ctx).await?;
        Ok(self.page.behavior.render_get(self.page, &state, self.renderer))
    }
}

/// Builder for [`Page`]. `build` enforces page-level invariants.
#[derive(Clone)]
pub struct PageBuilder {
    path: String,
    title: Option<String>,
    section: Option<String>,
    condition: Option<String>,
    template: Option<String>,
    has_form_components: Option<bool>,
    schema: Option<ValidationSchema>,
    behavior: Arc<dyn PageBehavior>,
}

impl PageBuilder {
    /// Start a page at `path` with default behaviour.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: None,
            section: None,
            condition: None,
            template: None,
            has_form_components: None,
            schema: None,
            behavior: Arc::new(DefaultBehavior),
        }
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Bind the page to a state section.
    #[must_use]
    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Gate the page on a named condition.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Override the template id (defaults to the path without its leading `/`).
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Declare whether the page collects answers.
    /// Defaults to whether a schema was given.
    #[must_use]
    pub const fn has_form_components(mut self, value: bool) -> Self {
        self.has_form_components = Some(value);
        self
    }

    /// Attach a validation schema.
    #[must_use]
    pub fn schema(mut self, schema: ValidationSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Use a custom behaviour.
    #[must_use]
    pub fn behavior(mut self, behavior: Arc<dyn PageBehavior>) -> Self {
        self.behavior = behavior;
        self
    }

    /// Finish the page.
    pub fn build(self) -> Result<Page, ConfigError> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::EmptyPath);
        }

        let has_form_components = self
            .has_form_components
            .unwrap_or(self.schema.is_some());
        if has_form_components && self.schema.is_none() {
            return Err(ConfigError::MissingSchema { page: self.path });
        }

        let template = self.template.unwrap_or_else(|| default_template(&self.path));

        Ok(Page {
            path: self.path,
            title: self.title,
            section: self.section,
            condition: self.condition,
            template,
            has_form_components,
            schema: self.schema,
            behavior: self.behavior,
        })
    }
}

/// `/contact/email` renders `contact/email`; `/` renders `index`.
pub(crate) fn default_template(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        "index".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::schema::{FieldKind, FieldRule, FieldValidator};
    use crate::flow::state::MemoryStateProvider;
    use crate::flow::template::TemplateRenderer;
    use serde_json::json;
    use std::collections::HashMap;

    fn renderer() -> TemplateRenderer {
        let mut templates = HashMap::new();
        templates.insert("start".to_string(), "Start {{title}}".to_string());
        templates.insert(
            "summary".to_string(),
            "{{title}}: {{name.first}} {{name.last}}".to_string(),
        );
        TemplateRenderer::new(templates)
    }

    #[test]
    fn test_build_defaults() {
        let page = Page::builder("/start").build().unwrap();
        assert_eq!(page.path(), "/start");
        assert_eq!(page.template(), "start");
        assert!(!page.has_form_components());
        assert!(page.validation_schema().is_none());
        assert_eq!(page.behavior().kind(), "question");
    }

    #[test]
    fn test_root_path_template_is_index() {
        let page = Page::builder("/").build().unwrap();
        assert_eq!(page.template(), "index");
    }

    #[test]
    fn test_schema_implies_form_components() {
        let page = Page::builder("/name")
            .section("name")
            .schema(ValidationSchema::required_text(&["first"]))
            .build()
            .unwrap();
        assert!(page.has_form_components());
        assert_eq!(page.section(), Some("name"));
    }

    #[test]
    fn test_form_page_without_schema_rejected() {
        let err = Page::builder("/name")
            .has_form_components(true)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingSchema {
                page: "/name".to_string()
            }
        );
    }

    #[test]
    fn test_schema_with_form_components_disabled_is_allowed() {
        let page = Page::builder("/info")
            .schema(ValidationSchema::required_text(&["x"]))
            .has_form_components(false)
            .build()
            .unwrap();
        assert!(!page.has_form_components());
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = Page::builder("  ").build().unwrap_err();
        assert_eq!(err, ConfigError::EmptyPath);
    }

    #[test]
    fn test_behavior_for_kind() {
        assert_eq!(behavior_for_kind("question").unwrap().kind(), "question");
        assert_eq!(behavior_for_kind("content").unwrap().kind(), "question");
        assert_eq!(behavior_for_kind("summary").unwrap().kind(), "summary");
        assert!(behavior_for_kind("wizard").is_none());
    }

    #[test]
    fn test_default_render_uses_empty_view_model() {
        let page = Page::builder("/start").title("Hello").build().unwrap();
        let response = page
            .behavior()
            .render_get(&page, &State::new(), &renderer());
        // Title is not passed to default pages
        assert_eq!(response.body, "Start {{title}}");
    }

    #[test]
    fn test_summary_render_includes_answers() {
        let page = Page::builder("/summary")
            .title("Check")
            .behavior(Arc::new(SummaryBehavior))
            .build()
            .unwrap();
        let state = State::from_value(json!({"name": {"first": "A", "last": "B"}})).unwrap();
        let response = page.behavior().render_get(&page, &state, &renderer());
        assert_eq!(response.body, "Check: A B");
    }

    #[test]
    fn test_default_route_hooks_continue() {
        let page = Page::builder("/start").build().unwrap();
        let ctx = RequestContext::new("s1");
        for options in [page.get_route_options(), page.post_route_options()] {
            assert_eq!(
                options.pre.call(&page, Method::Get, Stage::Pre, &ctx),
                HookOutcome::Continue
            );
            assert_eq!(
                options.post.call(&page, Method::Post, Stage::Post, &ctx),
                HookOutcome::Continue
            );
        }
    }

    #[test]
    fn test_validate_submission_honours_optional_fields() {
        let page = Page::builder("/name")
            .section("name")
            .schema(ValidationSchema::new(vec![
                FieldRule::new("first", FieldKind::Text),
                FieldRule::new("middle", FieldKind::Text).optional(),
            ]))
            .build()
            .unwrap();
        let state = State::from_value(json!({"name": {"first": "A"}})).unwrap();
        assert!(page.validate_submission(&state, &FieldValidator).is_valid());

        let empty = State::new();
        let report = page.validate_submission(&empty, &FieldValidator);
        assert_eq!(report.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_get_handler_fetches_state_then_renders() {
        let provider = MemoryStateProvider::new();
        provider.set_field("s1", "name", "first", json!("A")).await;
        provider.set_field("s1", "name", "last", json!("B")).await;

        let page = Page::builder("/summary")
            .title("Check")
            .behavior(Arc::new(SummaryBehavior))
            .build()
            .unwrap();
        let renderer = renderer();
        let handler = page.get_handler(&provider, &renderer);
        let response = handler.handle(&RequestContext::new("s1")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "Check: A B");
    }
}
