//! Flow doctor: static checks on a flow definition
//!
//! Analyzes a parsed `flow.toml` for definitions that load but route in
//! surprising ways. Returns a structured report with categories:
//! errors (must fix), warnings (should fix), info (suggestions).

use std::collections::{HashMap, HashSet};

use crate::flow::condition::ConditionRegistry;
use crate::flow::config::{FlowConfig, PageConfig};
use crate::flow::definition::Flow;

/// Severity level for a diagnostic finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Must fix: the flow cannot be built
    Error,
    /// Should fix: the flow routes in a way that is probably unintended
    Warning,
    /// Suggestion: informational improvement
    Info,
}

/// A single diagnostic finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Severity of the finding
    pub severity: Severity,
    /// Short code for the finding (e.g., "P001")
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Suggested fix (optional)
    pub suggestion: Option<String>,
}

/// Diagnostic report from `pageflow check`
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    /// All findings, in order of severity (errors first)
    pub findings: Vec<Finding>,
}

impl DiagnosticReport {
    /// Returns true if the report has no findings at all
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Returns the number of errors
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Returns the number of warnings
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Returns the number of info items
    #[must_use]
    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }
}

/// Run all diagnostic checks and return a report.
#[must_use]
pub fn diagnose(config: &FlowConfig) -> DiagnosticReport {
    let mut findings = Vec::new();

    check_flow_builds(config, &mut findings);
    check_capturing_pages(config, &mut findings);
    check_unused_conditions(config, &mut findings);
    check_condition_fields(config, &mut findings);
    check_empty_sections(config, &mut findings);
    check_shared_fields(config, &mut findings);

    // Sort: errors first, then warnings, then info
    findings.sort_by_key(|f| match f.severity {
        Severity::Error => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    });

    DiagnosticReport { findings }
}

fn collects_answers(page: &PageConfig) -> bool {
    page.has_form_components.unwrap_or(!page.fields.is_empty())
}

/// P000: The definition must build into a flow
fn check_flow_builds(config: &FlowConfig, findings: &mut Vec<Finding>) {
    if let Err(e) = Flow::from_config(config, ConditionRegistry::new()) {
        findings.push(Finding {
            severity: Severity::Error,
            code: "P000".to_string(),
            message: e.to_string(),
            suggestion: None,
        });
    }
}

/// P001: An always-eligible page without answers stops every scan that reaches it
fn check_capturing_pages(config: &FlowConfig, findings: &mut Vec<Finding>) {
    for page in config.pages.iter().skip(1) {
        if page.condition.is_none() && !collects_answers(page) {
            findings.push(Finding {
                severity: Severity::Warning,
                code: "P001".to_string(),
                message: format!(
                    "Page '{}' collects no answers and has no condition; \
                     every resolution that reaches it will stop there",
                    page.path
                ),
                suggestion: Some(format!(
                    "Gate '{}' with a condition, or move it to the start of the flow",
                    page.path
                )),
            });
        }
    }
}

/// P002: Conditions nobody references
fn check_unused_conditions(config: &FlowConfig, findings: &mut Vec<Finding>) {
    let used: HashSet<&str> = config
        .pages
        .iter()
        .filter_map(|p| p.condition.as_deref())
        .collect();

    for condition in &config.conditions {
        if !used.contains(condition.name.as_str()) {
            findings.push(Finding {
                severity: Severity::Info,
                code: "P002".to_string(),
                message: format!("Condition '{}' is not used by any page", condition.name),
                suggestion: Some(format!(
                    "Remove '{}' from flow.toml or reference it from a page",
                    condition.name
                )),
            });
        }
    }
}

/// P003: Conditions that read a field no page collects
fn check_condition_fields(config: &FlowConfig, findings: &mut Vec<Finding>) {
    let mut collected: HashSet<String> = HashSet::new();
    for page in config.pages.iter().filter(|p| !p.fields.is_empty()) {
        // A condition may test a whole section
        if let Some(section) = &page.section {
            collected.insert(section.clone());
        }
        for field in &page.fields {
            collected.insert(match &page.section {
                Some(section) => format!("{section}.{}", field.name),
                None => field.name.clone(),
            });
        }
    }

    for condition in &config.conditions {
        if !collected.contains(&condition.field) {
            findings.push(Finding {
                severity: Severity::Warning,
                code: "P003".to_string(),
                message: format!(
                    "Condition '{}' reads '{}', which no page collects",
                    condition.name, condition.field
                ),
                suggestion: Some(
                    "Make sure the value is written to the state outside the flow".to_string(),
                ),
            });
        }
    }
}

/// P004: Sections bound to pages that collect nothing
fn check_empty_sections(config: &FlowConfig, findings: &mut Vec<Finding>) {
    for page in &config.pages {
        if let Some(section) = &page.section {
            if page.fields.is_empty() {
                findings.push(Finding {
                    severity: Severity::Warning,
                    code: "P004".to_string(),
                    message: format!(
                        "Page '{}' binds section '{section}' but declares no fields",
                        page.path
                    ),
                    suggestion: Some(format!(
                        "Add [[page.fields]] to '{}' or drop its section",
                        page.path
                    )),
                });
            }
        }
    }
}

/// P005: The same field declared by two form pages in one section
fn check_shared_fields(config: &FlowConfig, findings: &mut Vec<Finding>) {
    let mut owners: HashMap<(&str, &str), &str> = HashMap::new();

    for page in config.pages.iter().filter(|p| collects_answers(p)) {
        let Some(section) = page.section.as_deref() else {
            continue;
        };
        for field in &page.fields {
            match owners.get(&(section, field.name.as_str())) {
                Some(first) => findings.push(Finding {
                    severity: Severity::Info,
                    code: "P005".to_string(),
                    message: format!(
                        "Field '{section}.{}' is declared by both '{first}' and '{}'",
                        field.name, page.path
                    ),
                    suggestion: Some(
                        "Both pages count as complete once either is answered".to_string(),
                    ),
                }),
                None => {
                    owners.insert((section, field.name.as_str()), page.path.as_str());
                }
            }
        }
    }
}
