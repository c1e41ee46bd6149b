//! Enrichers: checks that extract key-value metadata from a session (token
//! counts, model names, costs) rather than grading it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::check::{CheckFn, Condition, EvalScope};
use crate::context::EvalContext;
use crate::engine::{ExecutionEngine, RunAdapter, RunnableItem};
use crate::registry::ScopedItem;
use crate::result::{count_outcomes, ItemResult};

/// Allowed value types for enrichment data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EnrichmentValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl From<bool> for EnrichmentValue {
    fn from(v: bool) -> Self {
        EnrichmentValue::Boolean(v)
    }
}

impl From<f64> for EnrichmentValue {
    fn from(v: f64) -> Self {
        EnrichmentValue::Number(v)
    }
}

impl From<u64> for EnrichmentValue {
    fn from(v: u64) -> Self {
        EnrichmentValue::Number(v as f64)
    }
}

impl From<&str> for EnrichmentValue {
    fn from(v: &str) -> Self {
        EnrichmentValue::String(v.to_string())
    }
}

impl From<String> for EnrichmentValue {
    fn from(v: String) -> Self {
        EnrichmentValue::String(v)
    }
}

/// Key-value map returned by an enricher.
pub type EnrichmentData = BTreeMap<String, EnrichmentValue>;

/// An enricher stored in the registry.
#[derive(Debug, Clone)]
pub struct RegisteredEnricher {
    pub name: String,
    pub check: CheckFn<EnrichmentData>,
    pub condition: Option<Condition>,
    pub scope: EvalScope,
    pub subagent_type: Option<String>,
}

impl RegisteredEnricher {
    pub fn new(name: impl Into<String>, check: CheckFn<EnrichmentData>) -> Self {
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

impl ScopedItem for RegisteredEnricher {
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

impl RunnableItem for RegisteredEnricher {
    type Output = EnrichmentData;

    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> &CheckFn<EnrichmentData> {
        &self.check
    }

    fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }
}

/// Result of running a single enricher.
pub type EnrichRunResult = ItemResult<EnrichmentData>;

/// Summary of running a batch of enrichers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichRunSummary {
    pub results: Vec<EnrichRunResult>,
    /// Every successful enricher's data merged in item order; later items
    /// win on key collisions.
    pub data: EnrichmentData,
    pub total_duration_ms: u64,
    pub error_count: usize,
    pub skipped_count: usize,
}

/// Adapter shaping engine output into enrichment results.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichAdapter;

impl RunAdapter for EnrichAdapter {
    type Item = RegisteredEnricher;
    type Result = EnrichRunResult;
    type Summary = EnrichRunSummary;

    const KIND: &'static str = "enrichers";

    fn skip_result(&self, item: &RegisteredEnricher) -> EnrichRunResult {
        ItemResult::skipped(&item.name)
    }

    fn success_result(
        &self,
        item: &RegisteredEnricher,
        value: EnrichmentData,
        duration_ms: u64,
    ) -> EnrichRunResult {
        ItemResult::success(&item.name, value, duration_ms)
    }

    fn error_result(
        &self,
        item: &RegisteredEnricher,
        error: String,
        duration_ms: u64,
    ) -> EnrichRunResult {
        ItemResult::error(&item.name, error, duration_ms)
    }

    fn unexpected_result(&self) -> EnrichRunResult {
        ItemResult::unexpected()
    }

    fn build_summary(
        &self,
        results: Vec<EnrichRunResult>,
        total_duration_ms: u64,
    ) -> EnrichRunSummary {
        let (error_count, skipped_count) = count_outcomes(&results);
        let mut data = EnrichmentData::new();
        for value in results.iter().filter_map(ItemResult::value) {
            data.extend(value.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        EnrichRunSummary {
            results,
            data,
            total_duration_ms,
            error_count,
            skipped_count,
        }
    }
}

/// Run `enrichers` against `context`.
pub async fn run_enrichers(
    engine: &ExecutionEngine,
    enrichers: &[RegisteredEnricher],
    context: Arc<EvalContext>,
) -> EnrichRunSummary {
    engine.run_all(enrichers, context, &EnrichAdapter).await
}
