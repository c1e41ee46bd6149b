//! Filter execution: computes one value per filter for a session.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::EvalContext;
use crate::engine::{ExecutionEngine, RunAdapter};
use crate::result::{count_outcomes, ItemResult};

use super::registry::RegisteredFilter;

/// Value a filter computes for one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Boolean(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Number(v)
    }
}

impl From<u64> for FilterValue {
    fn from(v: u64) -> Self {
        FilterValue::Number(v as f64)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::String(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::String(v)
    }
}

pub type FilterComputeResult = ItemResult<FilterValue>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterComputeSummary {
    pub results: Vec<FilterComputeResult>,
    pub total_duration_ms: u64,
    pub error_count: usize,
    pub skipped_count: usize,
}

impl FilterComputeSummary {
    /// Values of the filters that succeeded, keyed by filter name.
    pub fn values(&self) -> BTreeMap<String, FilterValue> {
        self.results
            .iter()
            .filter_map(|r| r.value().map(|v| (r.name.clone(), v.clone())))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterAdapter;

impl RunAdapter for FilterAdapter {
    type Item = RegisteredFilter;
    type Result = FilterComputeResult;
    type Summary = FilterComputeSummary;

    const KIND: &'static str = "filters";

    fn skip_result(&self, item: &RegisteredFilter) -> FilterComputeResult {
        ItemResult::skipped(&item.name)
    }

    fn success_result(
        &self,
        item: &RegisteredFilter,
        value: FilterValue,
        duration_ms: u64,
    ) -> FilterComputeResult {
        ItemResult::success(&item.name, value, duration_ms)
    }

    fn error_result(
        &self,
        item: &RegisteredFilter,
        error: String,
        duration_ms: u64,
    ) -> FilterComputeResult {
        ItemResult::error(&item.name, error, duration_ms)
    }

    fn unexpected_result(&self) -> FilterComputeResult {
        ItemResult::unexpected()
    }

    fn build_summary(
        &self,
        results: Vec<FilterComputeResult>,
        total_duration_ms: u64,
    ) -> FilterComputeSummary {
        let (error_count, skipped_count) = count_outcomes(&results);
        FilterComputeSummary {
            results,
            total_duration_ms,
            error_count,
            skipped_count,
        }
    }
}

/// Compute `filters` for `context`.
pub async fn run_filters(
    engine: &ExecutionEngine,
    filters: &[RegisteredFilter],
    context: Arc<EvalContext>,
) -> FilterComputeSummary {
    engine.run_all(filters, context, &FilterAdapter).await
}
