//! Flow host
//!
//! The caller side of the engine: wires a [`Flow`] to a state provider, a
//! renderer and an optional navigation log. It runs the page hooks around
//! GET handling and turns "end of flow" into the configured default route.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::ProviderError;
use crate::flow::definition::Flow;
use crate::flow::page::{HookOutcome, Method, Stage};
use crate::flow::resolver::{explain_next, CandidateVerdict, RouteDecision};
use crate::flow::state::{RequestContext, StateProvider};
use crate::flow::template::{Renderer, Response};
use crate::log::jsonl::{JsonlLogger, NavigationRecord};

/// Where to send the user after a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Path to redirect to, or `None` when the flow is complete and no
    /// default is configured
    pub to: Option<String>,
    /// True when `to` is the default route rather than a flow page
    pub fallback: bool,
}

/// Serves a flow for a hosting router.
pub struct FlowHost {
    flow: Arc<Flow>,
    provider: Arc<dyn StateProvider>,
    renderer: Arc<dyn Renderer>,
    logger: Option<JsonlLogger>,
}

impl FlowHost {
    /// Create a host without a navigation log.
    #[must_use]
    pub fn new(
        flow: Arc<Flow>,
        provider: Arc<dyn StateProvider>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            flow,
            provider,
            renderer,
            logger: None,
        }
    }

    /// Append every navigation decision to `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: JsonlLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The hosted flow
    #[must_use]
    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    /// Handle a GET for `path`: pre hook, handler, post hook.
    ///
    /// Unknown paths produce a 404 response. A hook answering
    /// [`HookOutcome::Respond`] replaces everything after it.
    pub async fn get(&self, path: &str, ctx: &RequestContext) -> Result<Response, ProviderError> {
        let Some(page) = self.flow.page(path) else {
            debug!(path, "no such page");
            return Ok(Response {
                status: 404,
                template: String::new(),
                body: format!("No page at '{path}'"),
            });
        };

        let options = page.get_route_options();
        if let HookOutcome::Respond(response) = options.pre.call(page, Method::Get, Stage::Pre, ctx)
        {
            return Ok(response);
        }

        let response = page
            .get_handler(self.provider.as_ref(), self.renderer.as_ref())
            .handle(ctx)
            .await?;

        match options.post.call(page, Method::Get, Stage::Post, ctx) {
            HookOutcome::Continue => Ok(response),
            HookOutcome::Respond(replacement) => Ok(replacement),
        }
    }

    /// Decide where to go after `current`.
    ///
    /// Provider errors are returned unchanged. Failing to write the
    /// navigation log is reported but does not fail the request.
    pub async fn next_path(
        &self,
        current: &str,
        ctx: &RequestContext,
    ) -> Result<Navigation, ProviderError> {
        let state = self.provider.get_state(ctx).await?;
        let trace = explain_next(current, &self.flow, &state);

        let navigation = match &trace.decision {
            RouteDecision::GoTo { path, reason } => {
                info!(from = current, to = %path, %reason, "next page");
                Navigation {
                    to: Some(path.clone()),
                    fallback: false,
                }
            }
            RouteDecision::EndOfFlow => {
                let fallback = self.flow.default_next().map(str::to_string);
                warn!(from = current, default = ?fallback, "flow complete, using default route");
                Navigation {
                    fallback: fallback.is_some(),
                    to: fallback,
                }
            }
        };

        if let Some(logger) = &self.logger {
            let skipped = trace
                .steps
                .iter()
                .filter(|step| {
                    matches!(
                        step.verdict,
                        CandidateVerdict::Ineligible | CandidateVerdict::Complete
                    )
                })
                .map(|step| step.path.clone())
                .collect();

            let record = NavigationRecord {
                timestamp: Utc::now(),
                flow: self.flow.name().to_string(),
                session: ctx.session_id.clone(),
                from: current.to_string(),
                to: navigation.to.clone(),
                fallback: navigation.fallback,
                skipped,
            };
            if let Err(e) = logger.append(&record) {
                warn!(error = %format!("{e:#}"), "failed to write navigation log");
            }
        }

        Ok(navigation)
    }
}
