//! Per-item results shared by every domain adapter.

use serde::{Deserialize, Serialize};

/// Name used for a slot whose task faulted outside the check contract.
pub const UNEXPECTED_NAME: &str = "?";

/// Message used for a slot whose task faulted outside the check contract.
pub const UNEXPECTED_MESSAGE: &str = "Unexpected rejection";

/// What happened to a single item. Exactly one case holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Skipped,
    Success { value: T },
    Error { message: String },
}

/// The result of running one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult<T> {
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome<T>,
    /// Condition check plus execution time; 0 when skipped.
    pub duration_ms: u64,
}

impl<T> ItemResult<T> {
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: Outcome::Skipped,
            duration_ms: 0,
        }
    }

    pub fn success(name: impl Into<String>, value: T, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            outcome: Outcome::Success { value },
            duration_ms,
        }
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            outcome: Outcome::Error {
                message: message.into(),
            },
            duration_ms,
        }
    }

    /// Sentinel result for a fault the engine could not attribute to a check.
    pub fn unexpected() -> Self {
        Self::error(UNEXPECTED_NAME, UNEXPECTED_MESSAGE, 0)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success { value } => Some(value),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// `(error_count, skipped_count)` over a result list.
pub fn count_outcomes<T>(results: &[ItemResult<T>]) -> (usize, usize) {
    results.iter().fold((0, 0), |(errors, skipped), r| match r.outcome {
        Outcome::Skipped => (errors, skipped + 1),
        Outcome::Error { .. } => (errors + 1, skipped),
        Outcome::Success { .. } => (errors, skipped),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_has_zero_duration() {
        let r: ItemResult<u32> = ItemResult::skipped("a");
        assert!(r.is_skipped());
        assert_eq!(r.duration_ms, 0);
        assert!(r.value().is_none());
    }

    #[test]
    fn test_unexpected_uses_sentinel() {
        let r: ItemResult<u32> = ItemResult::unexpected();
        assert_eq!(r.name, UNEXPECTED_NAME);
        assert_eq!(r.error_message(), Some(UNEXPECTED_MESSAGE));
    }

    #[test]
    fn test_count_outcomes() {
        let results = vec![
            ItemResult::success("a", 1, 3),
            ItemResult::skipped("b"),
            ItemResult::error("c", "boom", 2),
            ItemResult::error("d", "bang", 1),
        ];
        assert_eq!(count_outcomes(&results), (2, 1));
    }

    #[test]
    fn test_serialized_shape_is_tagged() {
        let r = ItemResult::success("turns", 4, 10);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "turns", "status": "success", "value": 4, "durationMs": 10})
        );

        let r: ItemResult<u32> = ItemResult::error("x", "boom", 5);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "boom");
    }
}
