//! Error taxonomy for the check engine.
//!
//! Two layers:
//! - [`EngineError`]: API-level failures returned to callers (malformed
//!   contexts, bad registrations).
//! - [`CheckFailure`]: item-level failures that never leave the engine; they
//!   are rendered into an item's error result.

/// Errors returned by the public engine API.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid context: {0}")]
    InvalidContext(String),

    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine API operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Why a single item failed. The `Display` output is the message stored in
/// the item's error result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckFailure {
    /// The item's own condition returned an error.
    #[error("Condition error: {0}")]
    Condition(String),

    /// The item's function returned an error.
    #[error("{0}")]
    Execution(String),

    /// The item exceeded the engine's soft per-item timeout.
    #[error("timed out after {limit_ms}ms")]
    TimedOut { limit_ms: u64 },
}
