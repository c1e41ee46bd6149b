//! Immutable session snapshot handed to every check.
//!
//! A context is assembled once per run by the log-parsing collaborator and
//! then shared read-only as `Arc<EvalContext>` across every concurrent check
//! in the batch. There are no mutating accessors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Whether the session under inspection is a top-level session or a nested
/// sub-agent session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionScope {
    #[default]
    Session,
    Subagent,
}

/// Precomputed statistics derived from a session's log entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EvalLogStats {
    pub turn_count: u64,
    pub user_count: u64,
    pub assistant_count: u64,
    pub tool_call_count: u64,
    pub subagent_count: u64,
    /// Human-readable session duration (e.g. `"4m 12s"`).
    pub duration: String,
    /// Model names in first-seen order.
    pub models: Vec<String>,
}

impl EvalLogStats {
    /// First model seen in the session, if any.
    pub fn primary_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }
}

/// The read-only bundle of session data every check observes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "ContextDocument", rename_all = "camelCase")]
pub struct EvalContext {
    entries: Vec<Value>,
    stats: EvalLogStats,
    project_name: String,
    session_id: String,
    scope: ExecutionScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    subagent_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subagent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_session_id: Option<String>,
}

impl EvalContext {
    /// Start building a session-scoped context.
    pub fn builder(
        project_name: impl Into<String>,
        session_id: impl Into<String>,
    ) -> EvalContextBuilder {
        EvalContextBuilder::new(project_name.into(), session_id.into())
    }

    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    pub fn stats(&self) -> &EvalLogStats {
        &self.stats
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn scope(&self) -> ExecutionScope {
        self.scope
    }

    pub fn subagent_type(&self) -> Option<&str> {
        self.subagent_type.as_deref()
    }

    pub fn subagent_id(&self) -> Option<&str> {
        self.subagent_id.as_deref()
    }

    pub fn parent_session_id(&self) -> Option<&str> {
        self.parent_session_id.as_deref()
    }

    pub fn is_subagent(&self) -> bool {
        self.scope == ExecutionScope::Subagent
    }
}

/// Validating builder for [`EvalContext`].
#[derive(Debug, Clone)]
pub struct EvalContextBuilder {
    entries: Vec<Value>,
    stats: EvalLogStats,
    project_name: String,
    session_id: String,
    scope: ExecutionScope,
    subagent_type: Option<String>,
    subagent_id: Option<String>,
    parent_session_id: Option<String>,
}

impl EvalContextBuilder {
    fn new(project_name: String, session_id: String) -> Self {
        Self {
            entries: Vec::new(),
            stats: EvalLogStats::default(),
            project_name,
            session_id,
            scope: ExecutionScope::Session,
            subagent_type: None,
            subagent_id: None,
            parent_session_id: None,
        }
    }

    pub fn entries(mut self, entries: Vec<Value>) -> Self {
        self.entries = entries;
        self
    }

    pub fn stats(mut self, stats: EvalLogStats) -> Self {
        self.stats = stats;
        self
    }

    /// Mark the context as a sub-agent run, optionally tagged with the
    /// sub-agent type (e.g. `"Explore"`).
    pub fn subagent(mut self, subagent_type: Option<String>) -> Self {
        self.scope = ExecutionScope::Subagent;
        self.subagent_type = subagent_type;
        self
    }

    pub fn subagent_id(mut self, subagent_id: impl Into<String>) -> Self {
        self.subagent_id = Some(subagent_id.into());
        self
    }

    pub fn parent_session_id(mut self, parent_session_id: impl Into<String>) -> Self {
        self.parent_session_id = Some(parent_session_id.into());
        self
    }

    /// Validate identifiers and freeze the context.
    pub fn build(self) -> Result<EvalContext> {
        if self.project_name.trim().is_empty() {
            return Err(EngineError::InvalidContext(
                "project_name must not be empty".to_string(),
            ));
        }
        if self.session_id.trim().is_empty() {
            return Err(EngineError::InvalidContext(
                "session_id must not be empty".to_string(),
            ));
        }
        if self.scope == ExecutionScope::Session
            && (self.subagent_type.is_some()
                || self.subagent_id.is_some()
                || self.parent_session_id.is_some())
        {
            return Err(EngineError::InvalidContext(
                "subagent fields require subagent scope".to_string(),
            ));
        }

        Ok(EvalContext {
            entries: self.entries,
            stats: self.stats,
            project_name: self.project_name,
            session_id: self.session_id,
            scope: self.scope,
            subagent_type: self.subagent_type,
            subagent_id: self.subagent_id,
            parent_session_id: self.parent_session_id,
        })
    }
}

/// Wire shape accepted when deserializing a context; validated through the
/// builder.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextDocument {
    #[serde(default)]
    entries: Vec<Value>,
    #[serde(default)]
    stats: EvalLogStats,
    project_name: String,
    session_id: String,
    #[serde(default)]
    scope: ExecutionScope,
    subagent_type: Option<String>,
    subagent_id: Option<String>,
    parent_session_id: Option<String>,
}

impl TryFrom<ContextDocument> for EvalContext {
    type Error = EngineError;

    fn try_from(doc: ContextDocument) -> Result<Self> {
        let mut builder = EvalContext::builder(doc.project_name, doc.session_id)
            .entries(doc.entries)
            .stats(doc.stats);
        if doc.scope == ExecutionScope::Subagent {
            builder = builder.subagent(doc.subagent_type);
        } else {
            builder.subagent_type = doc.subagent_type;
        }
        if let Some(id) = doc.subagent_id {
            builder = builder.subagent_id(id);
        }
        if let Some(parent) = doc.parent_session_id {
            builder = builder.parent_session_id(parent);
        }
        builder.build()
    }
}
