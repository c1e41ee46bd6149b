//! Claudeye core library
//!
//! Runs independently registered checks (evals, enrichers and dashboard
//! filters) against an immutable session context, under a batch-wide global
//! condition and per-item conditions, with per-item failure isolation and
//! timing.

pub mod app;
pub mod auth;
pub mod builtin;
pub mod cache;
pub mod check;
pub mod condition;
pub mod context;
pub mod dashboard;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod evals;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod result;
pub mod telemetry;

pub use app::App;
pub use auth::{parse_auth_users, AuthRegistry, AuthUser};
pub use cache::{
    cache_key, content_hash, module_hash, CacheBackend, CacheEntry, CacheError, CacheMeta,
    CacheMode, MemoryCacheBackend, SummaryCache,
};
pub use check::{CheckFn, Condition, EvalScope};
pub use condition::{GlobalCondition, GlobalVerdict};
pub use context::{EvalContext, EvalContextBuilder, EvalLogStats, ExecutionScope};
pub use dashboard::{
    DashboardRegistry, DashboardSessionRow, DashboardView, FilterComputeSummary, FilterMeta,
    FilterValue, RegisteredFilter,
};
pub use engine::{EngineConfig, ExecutionEngine, RunAdapter, RunnableItem};
pub use enrich::{EnrichRunSummary, EnrichmentData, EnrichmentValue, RegisteredEnricher};
pub use error::{CheckFailure, EngineError, Result};
pub use evals::{EvalOutcome, EvalRunSummary, RegisteredEval};
pub use registry::{ScopedItem, ScopedRegistry};
pub use result::{ItemResult, Outcome};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
