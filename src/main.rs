//! Pageflow - Page-flow resolution engine
//!
//! CLI entry point: resolve, inspect and lint flow definitions.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pageflow::cli::{render_diagnostic_report, render_pages, render_trace};
use pageflow::flow::state::parse_state;
use pageflow::log::{init_tracing, LogFormat};
use pageflow::{
    diagnose, explain_next, ConditionRegistry, Flow, FlowConfig, FlowHost, JsonlLogger,
    MemoryStateProvider, RequestContext, State, TemplateRenderer,
};

/// Page-flow resolution engine
///
/// Decides which page of a multi-step form comes next, given the flow
/// definition and the answers collected so far.
#[derive(Parser, Debug)]
#[command(name = "pageflow", version, about)]
struct Cli {
    /// Diagnostic output format: compact or json
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the path of the next page
    Next {
        /// Path to the flow.toml definition
        #[arg(long, default_value = "flow.toml")]
        config: PathBuf,

        /// JSON file holding the current answers
        #[arg(long)]
        state: Option<PathBuf>,

        /// Page the user just completed
        #[arg(long)]
        current: String,

        /// Route to use when the flow is complete (overrides the config)
        #[arg(long)]
        default: Option<String>,

        /// Directory for the navigation log (no log when omitted)
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Session id recorded in the navigation log
        #[arg(long, default_value = "cli")]
        session: String,

        /// Print how each candidate page was judged
        #[arg(long)]
        explain: bool,
    },

    /// Lint a flow definition
    Check {
        /// Path to the flow.toml definition
        #[arg(long, default_value = "flow.toml")]
        config: PathBuf,
    },

    /// List pages in traversal order
    Pages {
        /// Path to the flow.toml definition
        #[arg(long, default_value = "flow.toml")]
        config: PathBuf,

        /// JSON file holding the current answers, to show completion
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Render a page through its hooks and GET handler
    Render {
        /// Path to the flow.toml definition
        #[arg(long, default_value = "flow.toml")]
        config: PathBuf,

        /// JSON file holding the current answers
        #[arg(long)]
        state: Option<PathBuf>,

        /// Page to render
        #[arg(long)]
        page: String,
    },
}

/// Load and build a flow from a flow.toml file.
fn load_flow(path: &Path) -> Result<(FlowConfig, Flow)> {
    let config = FlowConfig::from_path(path)
        .with_context(|| format!("Failed to load config from '{}'", path.display()))?;
    let flow = Flow::from_config(&config, ConditionRegistry::new())
        .with_context(|| format!("Invalid flow definition in '{}'", path.display()))?;
    Ok((config, flow))
}

/// Read a state file. No file means no answers yet.
fn load_state(path: Option<&Path>) -> Result<State> {
    let Some(path) = path else {
        return Ok(State::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    parse_state(&content)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))
}

/// Build a host serving `state` for `session`.
async fn host_for(
    config: &FlowConfig,
    flow: Flow,
    session: &str,
    state: State,
) -> (FlowHost, RequestContext) {
    let provider = MemoryStateProvider::new();
    provider.put(session, state).await;
    let renderer = TemplateRenderer::new(config.templates.clone());
    let host = FlowHost::new(Arc::new(flow), Arc::new(provider), Arc::new(renderer));
    (host, RequestContext::new(session))
}

async fn run_next(
    config_path: &Path,
    state_path: Option<&Path>,
    current: &str,
    default: Option<String>,
    log_dir: Option<&Path>,
    session: &str,
    explain: bool,
) -> Result<()> {
    let (config, mut flow) = load_flow(config_path)?;
    if let Some(default) = default {
        flow = flow.with_default_next(default);
    }
    let state = load_state(state_path)?;

    if explain {
        render_trace(&explain_next(current, &flow, &state));
    }

    let (mut host, ctx) = host_for(&config, flow, session, state).await;
    if let Some(log_dir) = log_dir {
        host = host.with_logger(JsonlLogger::new(log_dir)?);
    }

    let navigation = host
        .next_path(current, &ctx)
        .await
        .context("Failed to resolve next page")?;

    match navigation.to {
        Some(path) => println!("{path}"),
        None => {
            eprintln!("End of flow: no next page and no default route configured.");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn run_check(config_path: &Path) -> Result<()> {
    let config = FlowConfig::from_path(config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;
    let report = diagnose(&config);
    render_diagnostic_report(&report);

    if report.error_count() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_pages(config_path: &Path, state_path: Option<&Path>) -> Result<()> {
    let (_, flow) = load_flow(config_path)?;
    let state = state_path.map(|p| load_state(Some(p))).transpose()?;
    render_pages(&flow, state.as_ref());
    for page in flow.pages() {
        println!("{}", page.path());
    }
    Ok(())
}

async fn run_render(config_path: &Path, state_path: Option<&Path>, page: &str) -> Result<()> {
    let (config, flow) = load_flow(config_path)?;
    let state = load_state(state_path)?;
    let (host, ctx) = host_for(&config, flow, "cli", state).await;

    let response = host
        .get(page, &ctx)
        .await
        .with_context(|| format!("Failed to render '{page}'"))?;

    println!("{}", response.body);
    if response.status != 200 {
        eprintln!("Render failed with status {}", response.status);
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Command::Next {
            config,
            state,
            current,
            default,
            log_dir,
            session,
            explain,
        } => {
            run_next(
                &config,
                state.as_deref(),
                &current,
                default,
                log_dir.as_deref(),
                &session,
                explain,
            )
            .await
        }
        Command::Check { config } => run_check(&config),
        Command::Pages { config, state } => run_pages(&config, state.as_deref()),
        Command::Render {
            config,
            state,
            page,
        } => run_render(&config, state.as_deref(), &page).await,
    }
}
