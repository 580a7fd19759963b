//! Answer state and the providers that supply it
//!
//! State maps section names to section answers (objects of field -> value).
//! Pages without a section may also read unscoped top-level keys. The
//! resolver only ever borrows a snapshot; persistence belongs to a
//! [`StateProvider`].
//!
//! Providers are expected to serialize concurrent requests for the same
//! session so each resolution sees a consistent snapshot. Nothing in the
//! resolver enforces that.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::ProviderError;

/// A snapshot of everything a user has answered so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(Map<String, Value>);

impl State {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from a JSON value. Returns `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Top-level entry, either a section or an unscoped key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a dotted path such as `name.first` or `age`.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// The value a page validates: its section, or the whole state when the
    /// page has no section. A missing section reads as an empty object.
    #[must_use]
    pub fn relevant_value(&self, section: Option<&str>) -> Cow<'_, Value> {
        match section {
            Some(name) => self
                .0
                .get(name)
                .map_or_else(|| Cow::Owned(Value::Object(Map::new())), Cow::Borrowed),
            None => Cow::Owned(Value::Object(self.0.clone())),
        }
    }

    /// Set a top-level key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Set one field inside a section, creating the section if needed.
    /// A non-object section is replaced.
    pub fn set_field(&mut self, section: &str, field: &str, value: Value) {
        let entry = self
            .0
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(fields) = entry {
            fields.insert(field.to_string(), value);
        }
    }

    /// Borrow the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns true if nothing has been answered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for State {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Per-request information handed to providers and handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Session the request belongs to
    pub session_id: String,
}

impl RequestContext {
    /// Create a context for the given session.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

/// Source of state snapshots.
#[async_trait]
pub trait StateProvider: Send + Sync {
    /// Fetch the current state for the request's session.
    async fn get_state(&self, ctx: &RequestContext) -> Result<State, ProviderError>;
}

/// Process-local provider. Unknown sessions start with an empty state.
#[derive(Debug, Default)]
pub struct MemoryStateProvider {
    sessions: RwLock<HashMap<String, State>>,
}

impl MemoryStateProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the state stored for a session.
    pub async fn put(&self, session_id: &str, state: State) {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), state);
    }

    /// Record one answer. Holds the write lock for the whole update, so
    /// submissions for the same session are applied one at a time.
    pub async fn set_field(&self, session_id: &str, section: &str, field: &str, value: Value) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .set_field(section, field, value);
    }

    /// Drop a session's state.
    pub async fn clear(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}

#[async_trait]
impl StateProvider for MemoryStateProvider {
    async fn get_state(&self, ctx: &RequestContext) -> Result<State, ProviderError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&ctx.session_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Reads `<dir>/<session>.json` on every call.
#[derive(Debug, Clone)]
pub struct FileStateProvider {
    dir: PathBuf,
}

impl FileStateProvider {
    /// Create a provider rooted at `dir`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the state file for a session, or `None` if the id is not a
    /// plain file name.
    #[must_use]
    pub fn state_path(&self, session_id: &str) -> Option<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.dir.join(format!("{session_id}.json")))
    }
}

#[async_trait]
impl StateProvider for FileStateProvider {
    async fn get_state(&self, ctx: &RequestContext) -> Result<State, ProviderError> {
        let path = self
            .state_path(&ctx.session_id)
            .ok_or_else(|| ProviderError::NotFound(ctx.session_id.clone()))?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::NotFound(ctx.session_id.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        parse_state(&content).map_err(|reason| ProviderError::Malformed {
            session: ctx.session_id.clone(),
            reason,
        })
    }
}

/// Decode a JSON document into a state. The document must be an object.
pub fn parse_state(content: &str) -> Result<State, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    State::from_value(value).ok_or_else(|| "state must be a JSON object".to_string())
}
