//! Structured observability hooks for check batches.
//!
//! This module provides:
//! - Batch-scoped tracing spans via [`batch_span`]
//! - Emission functions for batch start/finish, global skips and item faults
//!
//! Events are emitted at `info!` (lifecycle) and `warn!` (faults). Filter with
//! `CLAUDEYE_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{info, warn, Span};

/// Span covering one `run_all` batch. Attach with `Instrument::instrument`.
pub fn batch_span(kind: &'static str, batch_id: &str, session_id: &str) -> Span {
    tracing::info_span!("claudeye.batch", kind = kind, batch_id = %batch_id, session_id = %session_id)
}

/// Emit event: batch started.
pub fn emit_batch_started(kind: &str, session_id: &str, item_count: usize) {
    info!(event = "batch.started", kind = kind, session_id = %session_id, item_count = item_count);
}

/// Emit event: batch finished with its aggregate counts.
pub fn emit_batch_finished(
    kind: &str,
    session_id: &str,
    duration_ms: u64,
    error_count: usize,
    skipped_count: usize,
) {
    info!(
        event = "batch.finished",
        kind = kind,
        session_id = %session_id,
        duration_ms = duration_ms,
        error_count = error_count,
        skipped_count = skipped_count,
    );
}

/// Emit event: the global condition skipped the whole batch.
pub fn emit_global_skip(kind: &str, session_id: &str, reason: Option<&str>) {
    match reason {
        Some(reason) => warn!(
            event = "batch.global_skip",
            kind = kind,
            session_id = %session_id,
            error = %reason,
            "global condition errored; skipping batch"
        ),
        None => info!(event = "batch.global_skip", kind = kind, session_id = %session_id),
    }
}

/// Emit event: a single item ended in an error result.
pub fn emit_item_failed(kind: &str, name: &str, error: &dyn std::fmt::Display) {
    warn!(event = "item.failed", kind = kind, name = %name, error = %error);
}

/// Emit event: an item task faulted outside its check (panic or cancellation).
pub fn emit_unexpected_fault(kind: &str, name: &str, error: &dyn std::fmt::Display) {
    warn!(event = "item.unexpected_fault", kind = kind, name = %name, error = %error);
}
