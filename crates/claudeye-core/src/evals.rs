//! Evaluations: checks that grade a session with pass/fail and a score.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::check::{CheckFn, Condition, EvalScope};
use crate::context::EvalContext;
use crate::engine::{ExecutionEngine, RunAdapter, RunnableItem};
use crate::registry::ScopedItem;
use crate::result::{count_outcomes, ItemResult, Outcome};

/// Value returned by an eval function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalOutcome {
    pub pass: bool,
    /// Score in 0.0–1.0.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EvalOutcome {
    /// Passing outcome with score 1.0.
    pub fn pass() -> Self {
        Self {
            pass: true,
            score: 1.0,
            message: None,
        }
    }

    /// Failing outcome with score 0.0.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            pass: false,
            score: 0.0,
            message: Some(message.into()),
        }
    }

    /// Pass/fail from a predicate, scored 1.0 or 0.0.
    pub fn from_bool(pass: bool) -> Self {
        if pass {
            Self::pass()
        } else {
            Self {
                pass: false,
                score: 0.0,
                message: None,
            }
        }
    }

    /// Override the score, clamped to 0.0–1.0 (NaN becomes 0.0).
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = clamp_score(score);
        self
    }

    /// Same outcome with its score forced into 0.0–1.0.
    pub fn normalized(self) -> Self {
        let score = self.score;
        self.with_score(score)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// An eval stored in the registry.
#[derive(Debug, Clone)]
pub struct RegisteredEval {
    pub name: String,
    pub check: CheckFn<EvalOutcome>,
    pub condition: Option<Condition>,
    pub scope: EvalScope,
    pub subagent_type: Option<String>,
}

impl RegisteredEval {
    pub fn new(name: impl Into<String>, check: CheckFn<EvalOutcome>) -> Self {
        Self {
            name: name.into(),
            check,
            condition: None,
            scope: EvalScope::Session,
            subagent_type: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_scope(mut self, scope: EvalScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_subagent_type(mut self, subagent_type: impl Into<String>) -> Self {
        self.subagent_type = Some(subagent_type.into());
        self
    }
}

impl ScopedItem for RegisteredEval {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> EvalScope {
        self.scope
    }

    fn subagent_type(&self) -> Option<&str> {
        self.subagent_type.as_deref()
    }
}

impl RunnableItem for RegisteredEval {
    type Output = EvalOutcome;

    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> &CheckFn<EvalOutcome> {
        &self.check
    }

    fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }
}

/// Result of running a single eval.
pub type EvalRunResult = ItemResult<EvalOutcome>;

/// Summary of running a batch of evals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvalRunSummary {
    pub results: Vec<EvalRunResult>,
    pub total_duration_ms: u64,
    pub pass_count: usize,
    pub fail_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
}

impl EvalRunSummary {
    /// Mean score over evals that produced an outcome.
    pub fn average_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .results
            .iter()
            .filter_map(|r| r.value().map(|o| o.score))
            .collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }

    /// True when every executed eval passed and none errored.
    pub fn all_passed(&self) -> bool {
        self.fail_count == 0 && self.error_count == 0
    }
}

/// Adapter shaping engine output into eval results.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalAdapter;

impl RunAdapter for EvalAdapter {
    type Item = RegisteredEval;
    type Result = EvalRunResult;
    type Summary = EvalRunSummary;

    const KIND: &'static str = "evals";

    fn skip_result(&self, item: &RegisteredEval) -> EvalRunResult {
        ItemResult::skipped(&item.name)
    }

    fn success_result(
        &self,
        item: &RegisteredEval,
        value: EvalOutcome,
        duration_ms: u64,
    ) -> EvalRunResult {
        ItemResult::success(&item.name, value.normalized(), duration_ms)
    }

    fn error_result(&self, item: &RegisteredEval, error: String, duration_ms: u64) -> EvalRunResult {
        ItemResult::error(&item.name, error, duration_ms)
    }

    fn unexpected_result(&self) -> EvalRunResult {
        ItemResult::unexpected()
    }

    fn build_summary(&self, results: Vec<EvalRunResult>, total_duration_ms: u64) -> EvalRunSummary {
        let (error_count, skipped_count) = count_outcomes(&results);
        let (pass_count, fail_count) = results.iter().fold((0, 0), |(p, f), r| match &r.outcome {
            Outcome::Success { value } if value.pass => (p + 1, f),
            Outcome::Success { .. } => (p, f + 1),
            _ => (p, f),
        });
        EvalRunSummary {
            results,
            total_duration_ms,
            pass_count,
            fail_count,
            error_count,
            skipped_count,
        }
    }
}

/// Run `evals` against `context`.
pub async fn run_evals(
    engine: &ExecutionEngine,
    evals: &[RegisteredEval],
    context: Arc<EvalContext>,
) -> EvalRunSummary {
    engine.run_all(evals, context, &EvalAdapter).await
}
