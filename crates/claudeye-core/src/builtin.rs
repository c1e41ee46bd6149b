//! Stock checks registered by the CLI.
//!
//! Two dashboard views (`performance`, `quality`), a `model` filter in the
//! default view, two evals and two enrichers. All of them read only
//! `stats` and `entries`.

use serde_json::Value;

use crate::app::App;
use crate::check::{CheckFn, EvalScope};
use crate::dashboard::{FilterValue, RegisteredFilter};
use crate::enrich::{EnrichmentData, RegisteredEnricher};
use crate::error::Result;
use crate::evals::{EvalOutcome, RegisteredEval};

const UNKNOWN_MODEL: &str = "unknown";

/// Content blocks of an entry's `message.content`, when it is an array.
fn content_blocks(entry: &Value) -> &[Value] {
    entry
        .pointer("/message/content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Number of tool blocks flagged `is_error` across all entries.
pub fn count_tool_errors(entries: &[Value]) -> usize {
    entries
        .iter()
        .flat_map(content_blocks)
        .filter(|block| {
            matches!(
                block.get("type").and_then(Value::as_str),
                Some("tool_use" | "tool_result")
            ) && block.get("is_error").and_then(Value::as_bool) == Some(true)
        })
        .count()
}

/// Whether any assistant entry carries a tool block flagged `is_error`.
pub fn has_assistant_tool_errors(entries: &[Value]) -> bool {
    entries
        .iter()
        .filter(|e| e.get("type").and_then(Value::as_str) == Some("assistant"))
        .flat_map(content_blocks)
        .any(|block| {
            block.get("type").and_then(Value::as_str) == Some("tool_use")
                && block.get("is_error").and_then(Value::as_bool) == Some(true)
        })
}

fn primary_model(ctx: &crate::context::EvalContext) -> String {
    ctx.stats()
        .primary_model()
        .unwrap_or(UNKNOWN_MODEL)
        .to_string()
}

/// Register every stock view, filter, eval and enricher on `app`.
pub fn register_builtins(app: &App) -> Result<()> {
    register_dashboard(app)?;
    register_evals(app)?;
    register_enrichers(app)?;
    Ok(())
}

fn register_dashboard(app: &App) -> Result<()> {
    let dashboard = app.dashboard();

    dashboard
        .view("performance", "Performance Metrics")?
        .filter(
            "turn-count",
            "Turn Count",
            CheckFn::from_sync(|ctx| Ok(FilterValue::from(ctx.stats().turn_count))),
        )?
        .filter(
            "tool-calls",
            "Tool Calls",
            CheckFn::from_sync(|ctx| Ok(FilterValue::from(ctx.stats().tool_call_count))),
        )?
        .filter(
            "uses-subagents",
            "Uses Subagents",
            CheckFn::from_sync(|ctx| Ok(FilterValue::Boolean(ctx.stats().subagent_count > 0))),
        )?;

    dashboard
        .view("quality", "Quality Checks")?
        .filter(
            "has-errors",
            "Has Errors",
            CheckFn::from_sync(|ctx| {
                Ok(FilterValue::Boolean(has_assistant_tool_errors(ctx.entries())))
            }),
        )?
        .filter(
            "primary-model",
            "Primary Model",
            CheckFn::from_sync(|ctx| Ok(FilterValue::String(primary_model(ctx)))),
        )?;

    dashboard.register_filter(
        RegisteredFilter::new(
            "model",
            CheckFn::from_sync(|ctx| Ok(FilterValue::String(primary_model(ctx)))),
        )
        .with_label("Model"),
    )
}

fn register_evals(app: &App) -> Result<()> {
    app.register_eval(
        RegisteredEval::new(
            "has-assistant-reply",
            CheckFn::from_sync(|ctx| {
                let replied = ctx.stats().assistant_count > 0
                    || ctx
                        .entries()
                        .iter()
                        .any(|e| e.get("type").and_then(Value::as_str) == Some("assistant"));
                Ok(if replied {
                    EvalOutcome::pass()
                } else {
                    EvalOutcome::fail("no assistant messages in session")
                })
            }),
        )
        .with_scope(EvalScope::Both),
    )?;

    app.register_eval(
        RegisteredEval::new(
            "no-tool-errors",
            CheckFn::from_sync(|ctx| {
                let errors = count_tool_errors(ctx.entries());
                if errors == 0 {
                    return Ok(EvalOutcome::pass());
                }
                let calls = (ctx.stats().tool_call_count as usize).max(errors);
                let score = 1.0 - errors as f64 / calls as f64;
                Ok(EvalOutcome::fail(format!("{errors} of {calls} tool calls failed"))
                    .with_score(score))
            }),
        )
        .with_scope(EvalScope::Both)
        .with_condition(CheckFn::from_sync(|ctx| Ok(ctx.stats().tool_call_count > 0))),
    )
}

fn register_enrichers(app: &App) -> Result<()> {
    app.register_enricher(RegisteredEnricher::new(
        "session-shape",
        CheckFn::from_sync(|ctx| {
            let stats = ctx.stats();
            let mut data = EnrichmentData::new();
            data.insert("turns".to_string(), stats.turn_count.into());
            data.insert("toolCalls".to_string(), stats.tool_call_count.into());
            data.insert("subagents".to_string(), stats.subagent_count.into());
            data.insert("duration".to_string(), stats.duration.clone().into());
            Ok(data)
        }),
    ))?;

    app.register_enricher(
        RegisteredEnricher::new(
            "primary-model",
            CheckFn::from_sync(|ctx| {
                let mut data = EnrichmentData::new();
                data.insert("model".to_string(), primary_model(ctx).into());
                Ok(data)
            }),
        )
        .with_scope(EvalScope::Both),
    )
}
