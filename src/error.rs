//! Error taxonomy
//!
//! Configuration problems are fatal and surface while a [`Flow`](crate::Flow)
//! is being built. State retrieval failures come from the state provider and
//! are passed through to the caller untouched. Schema validation failures are
//! not errors at all; see [`ValidationReport`](crate::flow::schema::ValidationReport).

use thiserror::Error;

/// A flow definition that cannot be used. Detected at construction time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Two pages share the same path.
    #[error("Duplicate page path: '{0}'")]
    DuplicatePath(String),

    /// A page path is empty or whitespace.
    #[error("Page path cannot be empty")]
    EmptyPath,

    /// A page names a condition the registry does not know.
    #[error("Page '{page}' references unknown condition '{condition}'")]
    UnknownCondition {
        /// Path of the offending page
        page: String,
        /// The unresolved condition name
        condition: String,
    },

    /// A page collects answers but has no validation schema.
    #[error("Page '{page}' has form components but no validation schema")]
    MissingSchema {
        /// Path of the offending page
        page: String,
    },

    /// The same condition name was registered twice.
    #[error("Condition '{0}' is already registered")]
    DuplicateCondition(String),

    /// A page selects a behaviour kind that does not exist.
    #[error("Page '{page}' uses unknown page kind '{kind}'")]
    UnknownKind {
        /// Path of the offending page
        page: String,
        /// The unresolved kind
        kind: String,
    },
}

/// Failure to fetch a state snapshot.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No state exists for the session.
    #[error("No state found for session '{0}'")]
    NotFound(String),

    /// The underlying storage could not be read.
    #[error("State storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored state is not a JSON object.
    #[error("Malformed state for session '{session}': {reason}")]
    Malformed {
        /// Session whose state could not be decoded
        session: String,
        /// Decoder message
        reason: String,
    },
}
