//! CLI output formatting
//!
//! Human-readable terminal display for resolution traces, page listings and
//! lint reports.

pub mod display;

pub use display::render_diagnostic_report;
pub use display::render_pages;
pub use display::render_trace;
