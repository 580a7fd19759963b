//! JSONL (JSON Lines) logging for navigation history
//!
//! Provides append-only logging of routing decisions to `navigation.jsonl`.
//! The file lives in the directory passed to [`JsonlLogger::new`], usually
//! `.pageflow` next to the flow definition.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// One routing decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavigationRecord {
    /// ISO 8601 timestamp of the decision
    pub timestamp: DateTime<Utc>,
    /// Name of the flow that was resolved
    pub flow: String,
    /// Session the decision was made for
    pub session: String,
    /// Page the user just completed
    pub from: String,
    /// Page chosen, or `None` at the end of the flow
    pub to: Option<String>,
    /// True when `to` is the configured default rather than a flow page
    #[serde(default)]
    pub fallback: bool,
    /// Candidates skipped before the chosen page
    #[serde(default)]
    pub skipped: Vec<String>,
}

/// JSONL logger for navigation history
///
/// Each line of `navigation.jsonl` is one [`NavigationRecord`].
#[derive(Debug, Clone)]
pub struct JsonlLogger {
    log_path: PathBuf,
}

impl JsonlLogger {
    /// Create a new JSONL logger
    ///
    /// # Arguments
    /// * `log_dir` - Directory where navigation.jsonl will be stored (typically `.pageflow`)
    ///
    /// # Errors
    /// Returns an error if the log directory cannot be created
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Result<Self> {
        let log_dir = log_dir.as_ref();

        // Create the log directory if it doesn't exist
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        Ok(Self {
            log_path: log_dir.join("navigation.jsonl"),
        })
    }

    /// Append a record to the log
    ///
    /// # Arguments
    /// * `record` - The routing decision to log
    ///
    /// # Errors
    /// Returns an error if:
    /// - The log file cannot be opened or created
    /// - The record cannot be serialized to JSON
    /// - Writing to the file fails
    pub fn append(&self, record: &NavigationRecord) -> Result<()> {
        // Open in append mode, creating the file on first write
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open log file: {}", self.log_path.display()))?;

        let json = serde_json::to_string(record)
            .context("Failed to serialize navigation record to JSON")?;

        // One record per line
        writeln!(file, "{json}").context("Failed to write to log file")?;

        Ok(())
    }

    /// Read all records from the log
    ///
    /// # Returns
    /// Every navigation record, oldest first. Blank lines are ignored.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The log file cannot be read
    /// - Any line cannot be parsed as a navigation record
    pub fn read_all(&self) -> Result<Vec<NavigationRecord>> {
        // Nothing has been logged yet
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.log_path)
            .with_context(|| format!("Failed to read log file: {}", self.log_path.display()))?;

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line_num, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse line {} as JSON", line_num + 1))
            })
            .collect()
    }

    /// Get the path to the log file
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
