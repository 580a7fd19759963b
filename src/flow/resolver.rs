//! Flow resolver: decides which page a user should see next.
//!
//! The scan is "find the first incomplete, eligible page": every page except
//! the current one is visited in flow order, pages whose condition is false
//! are skipped, pages that collect nothing stop the scan, and form pages
//! stop it only when their section does not yet validate with every declared
//! field required. No match means the end of the flow.
//!
//! Resolution is a pure function of `(current, flow, state)`. It holds no
//! state between calls and never suspends.

use tracing::debug;

use crate::flow::definition::Flow;
use crate::flow::page::Page;
use crate::flow::schema::FieldError;
use crate::flow::state::State;

/// How a candidate page was judged during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateVerdict {
    /// Condition is false; the page is not on the current path.
    Ineligible,
    /// Form page whose section already validates.
    Complete,
    /// Eligible page that collects nothing. Always a stop.
    NoForm,
    /// Form page with missing or invalid answers.
    Incomplete(Vec<FieldError>),
    /// Comes after the selected page; never looked at.
    NotScanned,
}

impl CandidateVerdict {
    /// Whether this verdict ends the scan on this page.
    #[must_use]
    pub const fn is_stop(&self) -> bool {
        matches!(self, Self::NoForm | Self::Incomplete(_))
    }
}

/// The result of routing after a page completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Proceed to a specific page.
    GoTo {
        /// Path of the next page
        path: String,
        /// Why this page was chosen
        reason: String,
    },
    /// No page is left to visit; the caller picks its own default.
    EndOfFlow,
}

/// One candidate and how it was judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// Candidate page path
    pub path: String,
    /// Verdict for the candidate
    pub verdict: CandidateVerdict,
}

/// Full account of a resolution, for display and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    /// Page the user just completed
    pub current: String,
    /// Every candidate in flow order
    pub steps: Vec<TraceStep>,
    /// Outcome of the scan
    pub decision: RouteDecision,
}

/// Judge a single candidate against the state.
#[must_use]
pub fn evaluate_candidate(page: &Page, flow: &Flow, state: &State) -> CandidateVerdict {
    let verdict = if !flow.is_eligible(page, state) {
        CandidateVerdict::Ineligible
    } else if !page.has_form_components() {
        CandidateVerdict::NoForm
    } else {
        let report = flow.completion_report(page, state);
        if report.is_valid() {
            CandidateVerdict::Complete
        } else {
            CandidateVerdict::Incomplete(report.errors)
        }
    };

    debug!(page = page.path(), ?verdict, "candidate");
    verdict
}

/// Path of the next page to visit after `current`, or `None` at the end of
/// the flow.
///
/// Never returns `current` itself.
#[must_use]
pub fn resolve_next<'a>(current: &str, flow: &'a Flow, state: &State) -> Option<&'a str> {
    // `current` need not be in the flow
    let next = flow
        .pages()
        .iter()
        .filter(|page| page.path() != current)
        .find(|page| evaluate_candidate(page, flow, state).is_stop())
        .map(Page::path);

    debug!(from = current, to = ?next, "resolved next page");
    next
}

/// Same scan as [`resolve_next`], recording the verdict for every candidate.
#[must_use]
pub fn explain_next(current: &str, flow: &Flow, state: &State) -> Trace {
    let mut steps = Vec::new();
    let mut decision = RouteDecision::EndOfFlow;

    for page in flow.pages().iter().filter(|page| page.path() != current) {
        if matches!(decision, RouteDecision::GoTo { .. }) {
            steps.push(TraceStep {
                path: page.path().to_string(),
                verdict: CandidateVerdict::NotScanned,
            });
            continue;
        }

        let verdict = evaluate_candidate(page, flow, state);
        if verdict.is_stop() {
            decision = RouteDecision::GoTo {
                path: page.path().to_string(),
                reason: stop_reason(&verdict),
            };
        }
        steps.push(TraceStep {
            path: page.path().to_string(),
            verdict,
        });
    }

    Trace {
        current: current.to_string(),
        steps,
        decision,
    }
}

fn stop_reason(verdict: &CandidateVerdict) -> String {
    match verdict {
        CandidateVerdict::NoForm => "Page collects no answers".to_string(),
        CandidateVerdict::Incomplete(errors) => {
            let fields: Vec<&str> = errors
                .iter()
                .map(|e| e.field.as_str())
                .filter(|f| !f.is_empty())
                .collect();
            if fields.is_empty() {
                "Section answers are invalid".to_string()
            } else {
                format!("Missing or invalid: {}", fields.join(", "))
            }
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::condition::ConditionRegistry;
    use crate::flow::schema::ValidationSchema;
    use crate::testutil::{form_page, plain_page, state};
    use serde_json::{json, Value};

    fn is_over_18() -> ConditionRegistry {
        ConditionRegistry::new()
            .with("isOver18", |s: &State| {
                s.get("age").and_then(Value::as_f64).unwrap_or(0.0) >= 18.0
            })
            .unwrap()
    }

    /// Start (no form), Name (first, last), Confirm (no form)
    fn basic_flow() -> Flow {
        Flow::new(
            vec![
                plain_page("/start"),
                form_page("/name", "name", &["first", "last"]),
                plain_page("/confirm"),
            ],
            ConditionRegistry::new(),
        )
        .unwrap()
    }

    fn eligibility_flow() -> Flow {
        Flow::new(
            vec![
                plain_page("/start"),
                Page::builder("/eligibility")
                    .section("eligibility")
                    .condition("isOver18")
                    .schema(ValidationSchema::required_text(&["employer"]))
                    .build()
                    .unwrap(),
                form_page("/name", "name", &["first", "last"]),
            ],
            is_over_18(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_state_goes_to_first_form_page() {
        let flow = basic_flow();
        assert_eq!(resolve_next("/start", &flow, &State::new()), Some("/name"));
    }

    #[test]
    fn test_completed_section_is_skipped() {
        let flow = basic_flow();
        let s = state(json!({"name": {"first": "A", "last": "B"}}));
        // /name validates, so the scan moves on to /confirm
        assert_eq!(resolve_next("/start", &flow, &s), Some("/confirm"));
    }

    #[test]
    fn test_ungated_start_page_stops_scan_from_later_page() {
        let flow = basic_flow();
        let s = state(json!({"name": {"first": "A", "last": "B"}}));
        assert_eq!(resolve_next("/name", &flow, &s), Some("/start"));
    }

    #[test]
    fn test_partial_section_returns_to_form_page() {
        let flow = basic_flow();
        let s = state(json!({"name": {"first": "A"}}));
        assert_eq!(resolve_next("/confirm", &flow, &s), Some("/start"));
        assert_eq!(resolve_next("/start", &flow, &s), Some("/name"));
    }

    #[test]
    fn test_ineligible_page_skipped_even_when_incomplete() {
        let flow = eligibility_flow();
        let s = state(json!({"age": 16}));
        assert_eq!(resolve_next("/start", &flow, &s), Some("/name"));
    }

    #[test]
    fn test_eligible_incomplete_page_selected() {
        let flow = eligibility_flow();
        let s = state(json!({"age": 30}));
        assert_eq!(resolve_next("/start", &flow, &s), Some("/eligibility"));
    }

    #[test]
    fn test_condition_reads_outside_own_section() {
        // The condition reads `age`, which is not in the page's section
        let flow = eligibility_flow();
        let s = state(json!({"age": 30, "eligibility": {"employer": "X"}}));
        assert_eq!(resolve_next("/start", &flow, &s), Some("/name"));
    }

    #[test]
    fn test_end_of_flow_when_everything_complete() {
        let flow = Flow::new(
            vec![
                form_page("/name", "name", &["first"]),
                form_page("/email", "contact", &["email"]),
            ],
            ConditionRegistry::new(),
        )
        .unwrap();
        let s = state(json!({"name": {"first": "A"}, "contact": {"email": "a@b"}}));
        assert_eq!(resolve_next("/name", &flow, &s), None);
    }

    #[test]
    fn test_empty_flow_is_end_of_flow() {
        let flow = Flow::new(vec![], ConditionRegistry::new()).unwrap();
        assert_eq!(resolve_next("/anything", &flow, &State::new()), None);
    }

    #[test]
    fn test_single_page_flow_never_returns_current() {
        let flow = Flow::new(vec![plain_page("/only")], ConditionRegistry::new()).unwrap();
        assert_eq!(resolve_next("/only", &flow, &State::new()), None);
    }

    #[test]
    fn test_current_page_not_in_flow() {
        let flow = basic_flow();
        assert_eq!(
            resolve_next("/elsewhere", &flow, &State::new()),
            Some("/start")
        );
    }

    #[test]
    fn test_no_form_page_is_not_skipped_for_later_page() {
        let flow = basic_flow();
        let s = state(json!({"name": {"first": "A", "last": "B"}}));
        // From /confirm, /start comes first and collects nothing
        assert_eq!(resolve_next("/confirm", &flow, &s), Some("/start"));
    }

    #[test]
    fn test_earlier_incomplete_page_wins() {
        let flow = Flow::new(
            vec![
                form_page("/a", "a", &["x"]),
                form_page("/b", "b", &["y"]),
                form_page("/c", "c", &["z"]),
            ],
            ConditionRegistry::new(),
        )
        .unwrap();
        // /a answered out of order with /c; /b is still the first gap
        let s = state(json!({"a": {"x": "1"}, "c": {"z": "1"}}));
        assert_eq!(resolve_next("/c", &flow, &s), Some("/b"));
        assert_eq!(resolve_next("/b", &flow, &s), None);
    }

    #[test]
    fn test_unscoped_form_page_validates_whole_state() {
        let flow = Flow::new(
            vec![
                Page::builder("/age")
                    .schema(ValidationSchema::new(vec![
                        crate::flow::schema::FieldRule::new(
                            "age",
                            crate::flow::schema::FieldKind::Number,
                        ),
                    ]))
                    .build()
                    .unwrap(),
                plain_page("/done"),
            ],
            ConditionRegistry::new(),
        )
        .unwrap();
        assert_eq!(resolve_next("/done", &flow, &State::new()), Some("/age"));
        assert_eq!(
            resolve_next("/done", &flow, &state(json!({"age": 40}))),
            None
        );
    }

    #[test]
    fn test_idempotent() {
        let flow = eligibility_flow();
        let s = state(json!({"age": 30, "name": {"first": "A"}}));
        let first = resolve_next("/start", &flow, &s);
        let second = resolve_next("/start", &flow, &s);
        assert_eq!(first, second);
    }

    #[test]
    fn test_explain_matches_resolve() {
        let flow = eligibility_flow();
        for s in [
            State::new(),
            state(json!({"age": 16})),
            state(json!({"age": 30, "eligibility": {"employer": "X"}})),
            state(json!({"age": 30, "eligibility": {"employer": "X"}, "name": {"first": "A", "last": "B"}})),
        ] {
            for page in flow.pages() {
                let trace = explain_next(page.path(), &flow, &s);
                let expected = resolve_next(page.path(), &flow, &s);
                match (&trace.decision, expected) {
                    (RouteDecision::GoTo { path, .. }, Some(next)) => assert_eq!(path, next),
                    (RouteDecision::EndOfFlow, None) => {}
                    (decision, expected) => {
                        panic!("explain {decision:?} disagrees with resolve {expected:?}")
                    }
                }
            }
        }
    }

    #[test]
    fn test_explain_records_verdicts() {
        let flow = eligibility_flow();
        let s = state(json!({"age": 16, "name": {"first": "A"}}));
        let trace = explain_next("/start", &flow, &s);

        assert_eq!(trace.current, "/start");
        assert_eq!(trace.steps.len(), 2);
        assert_eq!(trace.steps[0].verdict, CandidateVerdict::Ineligible);
        assert!(matches!(
            trace.steps[1].verdict,
            CandidateVerdict::Incomplete(ref errors) if errors.len() == 1 && errors[0].field == "last"
        ));
        assert_eq!(
            trace.decision,
            RouteDecision::GoTo {
                path: "/name".to_string(),
                reason: "Missing or invalid: last".to_string(),
            }
        );
    }

    #[test]
    fn test_explain_marks_pages_after_stop_not_scanned() {
        let flow = basic_flow();
        let trace = explain_next("/confirm", &flow, &State::new());
        assert_eq!(trace.steps[0].verdict, CandidateVerdict::NoForm);
        assert_eq!(trace.steps[1].verdict, CandidateVerdict::NotScanned);
    }

    #[test]
    fn test_explain_end_of_flow() {
        let flow = Flow::new(
            vec![form_page("/name", "name", &["first"])],
            ConditionRegistry::new(),
        )
        .unwrap();
        let trace = explain_next("/start", &flow, &state(json!({"name": {"first": "A"}})));
        assert_eq!(trace.decision, RouteDecision::EndOfFlow);
        assert_eq!(trace.steps[0].verdict, CandidateVerdict::Complete);
    }

    #[test]
    fn test_verdict_is_stop() {
        assert!(CandidateVerdict::NoForm.is_stop());
        assert!(CandidateVerdict::Incomplete(vec![]).is_stop());
        assert!(!CandidateVerdict::Complete.is_stop());
        assert!(!CandidateVerdict::Ineligible.is_stop());
        assert!(!CandidateVerdict::NotScanned.is_stop());
    }
}
