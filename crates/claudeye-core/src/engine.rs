//! Generic driver behind eval, enrichment and dashboard-filter execution.
//!
//! All three domains share one control flow:
//!   1. Evaluate the global condition once; if it fails, skip everything.
//!   2. Spawn one task per item; each checks its own condition, then runs.
//!   3. Slot results back into input order; a faulted task gets a sentinel
//!      result. Dropping the batch future aborts tasks still in flight.
//!   4. Fold the ordered results into a domain summary.
//!
//! Domains differ only in result shapes and aggregation, which live behind
//! [`RunAdapter`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::check::{CheckFn, Condition};
use crate::condition::{
    evaluate_global, evaluate_item_condition, GlobalCondition, GlobalVerdict, ItemGate,
};
use crate::context::EvalContext;
use crate::error::CheckFailure;
use crate::metrics::METRICS;
use crate::obs;
use crate::result::UNEXPECTED_NAME;

/// Minimum shape of an item the engine can run.
pub trait RunnableItem: Clone + Send + Sync + 'static {
    /// Value produced by the item's function.
    type Output: Send + 'static;

    fn name(&self) -> &str;

    fn check(&self) -> &CheckFn<Self::Output>;

    fn condition(&self) -> Option<&Condition>;
}

/// Strategy that shapes results and summaries for one domain.
pub trait RunAdapter {
    type Item: RunnableItem;
    type Result;
    type Summary;

    /// Label used in logs and spans (`"evals"`, `"enrichers"`, `"filters"`).
    const KIND: &'static str;

    /// Result when an item is skipped by the global or its own condition.
    fn skip_result(&self, item: &Self::Item) -> Self::Result;

    /// Result when the item's function returned a value.
    fn success_result(
        &self,
        item: &Self::Item,
        value: <Self::Item as RunnableItem>::Output,
        duration_ms: u64,
    ) -> Self::Result;

    /// Result when the item's condition or function failed.
    fn error_result(&self, item: &Self::Item, error: String, duration_ms: u64) -> Self::Result;

    /// Fallback for a task that faulted outside the check contract.
    fn unexpected_result(&self) -> Self::Result;

    /// Fold ordered results into the domain summary.
    fn build_summary(&self, results: Vec<Self::Result>, total_duration_ms: u64) -> Self::Summary;
}

/// Engine tunables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Soft limit for one item's condition plus execution. `None` waits
    /// indefinitely.
    pub item_timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }
}

/// What a single item task reports back before the adapter shapes it.
#[derive(Debug)]
enum ItemOutcome<T> {
    Skipped,
    Success { value: T, duration_ms: u64 },
    Failed { failure: CheckFailure, duration_ms: u64 },
}

/// Runs batches of items against a context.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    global: GlobalCondition,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(global: GlobalCondition, config: EngineConfig) -> Self {
        Self { global, config }
    }

    pub fn global_condition(&self) -> &GlobalCondition {
        &self.global
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `items` against `context` and build the adapter's summary.
    ///
    /// Never fails: every item-level failure is folded into its own result,
    /// and results keep the input order regardless of completion order.
    pub async fn run_all<A: RunAdapter>(
        &self,
        items: &[A::Item],
        context: Arc<EvalContext>,
        adapter: &A,
    ) -> A::Summary {
        let batch_id = Uuid::new_v4().to_string();
        let span = obs::batch_span(A::KIND, &batch_id, context.session_id());
        self.run_batch(items, context, adapter).instrument(span).await
    }

    async fn run_batch<A: RunAdapter>(
        &self,
        items: &[A::Item],
        context: Arc<EvalContext>,
        adapter: &A,
    ) -> A::Summary {
        let start = Instant::now();
        let session_id = context.session_id().to_string();
        obs::emit_batch_started(A::KIND, &session_id, items.len());
        METRICS.inc_batches_run();

        if items.is_empty() {
            return adapter.build_summary(Vec::new(), elapsed_ms(start));
        }

        let verdict = evaluate_global(
            self.global.get(),
            Arc::clone(&context),
            self.config.item_timeout,
        )
        .await;

        let mut error_count = 0usize;
        let mut skipped_count = 0usize;
        let results = match verdict {
            GlobalVerdict::Pass => {
                let mut join_set = JoinSet::new();
                for (idx, item) in items.iter().cloned().enumerate() {
                    let context = Arc::clone(&context);
                    let timeout = self.config.item_timeout;
                    join_set.spawn(async move { (idx, execute_item(item, context, timeout).await) });
                }

                // Dropping the set aborts whatever is still running.
                let mut slots: Vec<Option<ItemOutcome<_>>> =
                    std::iter::repeat_with(|| None).take(items.len()).collect();
                while let Some(joined) = join_set.join_next().await {
                    match joined {
                        Ok((idx, outcome)) => slots[idx] = Some(outcome),
                        Err(join_err) => {
                            obs::emit_unexpected_fault(A::KIND, UNEXPECTED_NAME, &join_err)
                        }
                    }
                }

                let mut results = Vec::with_capacity(items.len());
                for (item, slot) in items.iter().zip(slots) {
                    let result = match slot {
                        Some(ItemOutcome::Skipped) => {
                            skipped_count += 1;
                            adapter.skip_result(item)
                        }
                        Some(ItemOutcome::Success { value, duration_ms }) => {
                            adapter.success_result(item, value, duration_ms)
                        }
                        Some(ItemOutcome::Failed { failure, duration_ms }) => {
                            error_count += 1;
                            obs::emit_item_failed(A::KIND, item.name(), &failure);
                            adapter.error_result(item, failure.to_string(), duration_ms)
                        }
                        None => {
                            error_count += 1;
                            adapter.unexpected_result()
                        }
                    };
                    results.push(result);
                }
                results
            }
            GlobalVerdict::Fail | GlobalVerdict::Errored(_) => {
                let reason = match &verdict {
                    GlobalVerdict::Errored(msg) => Some(msg.as_str()),
                    _ => None,
                };
                obs::emit_global_skip(A::KIND, &session_id, reason);
                METRICS.inc_batches_skipped();
                skipped_count = items.len();
                items.iter().map(|item| adapter.skip_result(item)).collect()
            }
        };

        METRICS.add_items_executed((items.len() - skipped_count) as u64);
        METRICS.add_items_failed(error_count as u64);
        METRICS.add_items_skipped(skipped_count as u64);

        let total_duration_ms = elapsed_ms(start);
        obs::emit_batch_finished(
            A::KIND,
            &session_id,
            total_duration_ms,
            error_count,
            skipped_count,
        );
        adapter.build_summary(results, total_duration_ms)
    }
}

/// Body of one item task: condition, then function, timed from one start.
async fn execute_item<I: RunnableItem>(
    item: I,
    ctx: Arc<EvalContext>,
    timeout: Option<Duration>,
) -> ItemOutcome<I::Output> {
    let start = Instant::now();

    let work = async {
        match evaluate_item_condition(item.condition(), Arc::clone(&ctx)).await {
            ItemGate::Run => {}
            ItemGate::Skip => return ItemOutcome::Skipped,
            ItemGate::Error(message) => {
                return ItemOutcome::Failed {
                    failure: CheckFailure::Condition(message),
                    duration_ms: elapsed_ms(start),
                }
            }
        }

        match item.check().call(Arc::clone(&ctx)).await {
            Ok(value) => ItemOutcome::Success {
                value,
                duration_ms: elapsed_ms(start),
            },
            Err(e) => ItemOutcome::Failed {
                failure: CheckFailure::Execution(e.to_string()),
                duration_ms: elapsed_ms(start),
            },
        }
    };

    match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(outcome) => outcome,
            Err(_) => ItemOutcome::Failed {
                failure: CheckFailure::TimedOut {
                    limit_ms: limit.as_millis() as u64,
                },
                duration_ms: elapsed_ms(start),
            },
        },
        None => work.await,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
