//! Two-level gating: one batch-wide global condition, then per-item
//! conditions.
//!
//! The global condition is evaluated once per batch on its own task and
//! fails closed: an error, a panic or a timeout is treated exactly like a
//! `false` result. Per-item condition errors surface as that item's error.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::debug;

use crate::check::Condition;
use crate::context::EvalContext;

/// Cloneable handle to the (at most one) batch-wide condition.
///
/// Independent of every registry; clearing a registry never touches it.
#[derive(Debug, Clone, Default)]
pub struct GlobalCondition {
    slot: Arc<RwLock<Option<Condition>>>,
}

impl GlobalCondition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `condition`, replacing any previous one.
    pub fn set(&self, condition: Condition) {
        *self.slot.write().unwrap_or_else(|p| p.into_inner()) = Some(condition);
        debug!("global condition set");
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    pub fn get(&self) -> Option<Condition> {
        self.slot.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_set(&self) -> bool {
        self.slot.read().unwrap_or_else(|p| p.into_inner()).is_some()
    }
}

/// Outcome of evaluating the global condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalVerdict {
    /// No condition, or it returned `true`.
    Pass,
    /// The condition returned `false`.
    Fail,
    /// The condition errored, panicked or timed out.
    Errored(String),
}

impl GlobalVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, GlobalVerdict::Pass)
    }
}

/// Evaluate the global condition once for a batch.
pub async fn evaluate_global(
    condition: Option<Condition>,
    ctx: Arc<EvalContext>,
    timeout: Option<Duration>,
) -> GlobalVerdict {
    let Some(condition) = condition else {
        return GlobalVerdict::Pass;
    };

    // A one-task set so a cancelled batch also aborts the condition.
    let mut task = JoinSet::new();
    task.spawn(async move {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, condition.call(ctx))
                .await
                .unwrap_or_else(|_| {
                    Err(anyhow::anyhow!(
                        "timed out after {}ms",
                        limit.as_millis()
                    ))
                }),
            None => condition.call(ctx).await,
        }
    });

    match task.join_next().await {
        Some(Ok(Ok(true))) => GlobalVerdict::Pass,
        Some(Ok(Ok(false))) => GlobalVerdict::Fail,
        Some(Ok(Err(e))) => GlobalVerdict::Errored(e.to_string()),
        Some(Err(join_err)) => {
            GlobalVerdict::Errored(format!("global condition task failed: {join_err}"))
        }
        None => GlobalVerdict::Errored("global condition task missing".to_string()),
    }
}

/// Decision for a single item after its own condition ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemGate {
    Run,
    Skip,
    /// The condition errored; carries the raw error message.
    Error(String),
}

/// Evaluate an item's own condition. Items without one always run.
pub async fn evaluate_item_condition(
    condition: Option<&Condition>,
    ctx: Arc<EvalContext>,
) -> ItemGate {
    match condition {
        None => ItemGate::Run,
        Some(condition) => match condition.call(ctx).await {
            Ok(true) => ItemGate::Run,
            Ok(false) => ItemGate::Skip,
            Err(e) => ItemGate::Error(e.to_string()),
        },
    }
}
