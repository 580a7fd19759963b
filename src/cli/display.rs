//! CLI display for traces, page lists and lint reports
//!
//! All output goes to stderr so stdout remains clean for piping.

use colored::Colorize;

use crate::doctor::{DiagnosticReport, Severity};
use crate::flow::definition::Flow;
use crate::flow::resolver::{CandidateVerdict, RouteDecision, Trace};
use crate::flow::state::State;

/// One-line description of a verdict
#[must_use]
pub fn describe_verdict(verdict: &CandidateVerdict) -> String {
    match verdict {
        CandidateVerdict::Ineligible => "skipped (condition false)".to_string(),
        CandidateVerdict::Complete => "skipped (complete)".to_string(),
        CandidateVerdict::NoForm => "stop (no form)".to_string(),
        CandidateVerdict::Incomplete(errors) => {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            format!("stop ({})", details.join("; "))
        }
        CandidateVerdict::NotScanned => "not scanned".to_string(),
    }
}

/// Print a resolution trace
pub fn render_trace(trace: &Trace) {
    eprintln!(
        "\n{} {}",
        "===".bold().cyan(),
        format!("Next after {}", trace.current).bold().cyan()
    );
    eprintln!("{}", "─".repeat(50).dimmed());

    for step in &trace.steps {
        let marker = match step.verdict {
            CandidateVerdict::NoForm | CandidateVerdict::Incomplete(_) => "▶".green().bold(),
            CandidateVerdict::NotScanned => "·".dimmed(),
            _ => "✓".dimmed(),
        };
        eprintln!(
            "  {marker} {} {}",
            step.path.bold(),
            describe_verdict(&step.verdict).dimmed()
        );
    }

    eprintln!("{}", "─".repeat(50).dimmed());
    match &trace.decision {
        RouteDecision::GoTo { path, reason } => {
            eprintln!("  {} {} {}", "→".green().bold(), path.bold(), reason.dimmed());
        }
        RouteDecision::EndOfFlow => {
            eprintln!("  {} {}", "■".yellow().bold(), "End of flow".yellow());
        }
    }
    eprintln!();
}

/// One row of the page listing, without colors
#[must_use]
pub fn describe_page(flow: &Flow, index: usize, state: Option<&State>) -> Option<String> {
    let page = flow.pages().get(index)?;
    let mut parts = vec![format!("{:>2}. {}", index + 1, page.path())];

    parts.push(format!("[{}]", page.behavior().kind()));
    if let Some(section) = page.section() {
        parts.push(format!("section={section}"));
    }
    if let Some(condition) = page.condition() {
        parts.push(format!("if={condition}"));
    }
    if let Some(state) = state {
        let status = if !flow.is_eligible(page, state) {
            "ineligible"
        } else if !page.has_form_components() {
            "no form"
        } else if flow.completion_report(page, state).is_valid() {
            "complete"
        } else {
            "incomplete"
        };
        parts.push(format!("({status})"));
    }

    Some(parts.join(" "))
}

/// Print every page in order, with completion status when a state is given
pub fn render_pages(flow: &Flow, state: Option<&State>) {
    let title = if flow.name().is_empty() {
        "Pages".to_string()
    } else {
        format!("Pages: {}", flow.name())
    };
    eprintln!("\n{} {}", "===".bold().cyan(), title.bold().cyan());
    eprintln!("{}", "─".repeat(50).dimmed());

    for index in 0..flow.pages().len() {
        if let Some(row) = describe_page(flow, index, state) {
            eprintln!("  {row}");
        }
    }

    if let Some(state) = state {
        let progress = flow.progress(state);
        eprintln!("{}", "─".repeat(50).dimmed());
        eprintln!(
            "  {} {}/{} steps complete",
            "Progress:".dimmed(),
            progress.completed,
            progress.steps
        );
    }
    eprintln!();
}

/// Print a lint report
pub fn render_diagnostic_report(report: &DiagnosticReport) {
    eprintln!("\n{} {}", "===".bold().cyan(), "Flow check".bold().cyan());
    eprintln!("{}", "─".repeat(50).dimmed());

    if report.is_clean() {
        eprintln!("  {} No issues found", "✓".green().bold());
        eprintln!();
        return;
    }

    for finding in &report.findings {
        let label = match finding.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
        };
        eprintln!("  {label} {} {}", finding.code.dimmed(), finding.message);
        if let Some(suggestion) = &finding.suggestion {
            eprintln!("        {} {suggestion}", "→".dimmed());
        }
    }

    eprintln!("{}", "─".repeat(50).dimmed());
    eprintln!(
        "  {} error(s), {} warning(s), {} info",
        report.error_count(),
        report.warning_count(),
        report.info_count()
    );
    eprintln!();
}
