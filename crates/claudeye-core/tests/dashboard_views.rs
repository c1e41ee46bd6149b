//! Dashboard views: stock filters computed over several sessions, then
//! metadata and selections applied to the resulting rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use claudeye_core::builtin::register_builtins;
use claudeye_core::dashboard::{
    apply_filters, build_filter_meta, initial_states, BoolFilter, FilterKind, FilterState,
    DEFAULT_VIEW,
};
use claudeye_core::{App, DashboardSessionRow, EvalContext, EvalLogStats, FilterValue};
use serde_json::json;

fn ctx(session: &str, turns: u64, tools: u64, subagents: u64, model: &str) -> Arc<EvalContext> {
    Arc::new(
        EvalContext::builder("proj", session)
            .stats(EvalLogStats {
                turn_count: turns,
                tool_call_count: tools,
                subagent_count: subagents,
                models: vec![model.to_string()],
                ..Default::default()
            })
            .build()
            .unwrap(),
    )
}

async fn rows_for(app: &App, view: &str, contexts: &[Arc<EvalContext>]) -> Vec<DashboardSessionRow> {
    let mut rows = Vec::new();
    for c in contexts {
        let summary = app.run_dashboard_view(Arc::clone(c), view).await;
        rows.push(DashboardSessionRow::from_summary(
            c.project_name(),
            c.session_id(),
            &summary,
        ));
    }
    rows
}

#[tokio::test]
async fn test_performance_view_meta_and_filtering() {
    let app = App::default();
    register_builtins(&app).unwrap();

    let contexts = vec![
        ctx("s1", 3, 0, 0, "claude-sonnet"),
        ctx("s2", 12, 8, 2, "claude-opus"),
        ctx("s3", 30, 40, 1, "claude-opus"),
    ];
    let rows = rows_for(&app, "performance", &contexts).await;
    assert_eq!(rows[1].filter_values["turn-count"], FilterValue::Number(12.0));
    assert_eq!(rows[0].filter_values["uses-subagents"], FilterValue::Boolean(false));

    let filters = app.dashboard().filters_for_view("performance");
    let meta = build_filter_meta(&filters, &rows);
    assert_eq!(meta.len(), 3);
    assert_eq!(meta[0].label, "Turn Count");
    assert_eq!(meta[0].kind, FilterKind::Number { min: 3.0, max: 30.0 });
    assert_eq!(meta[2].kind, FilterKind::Boolean);

    let mut states = initial_states(&meta);
    assert_eq!(apply_filters(&rows, &meta, &states).len(), 3);

    states.insert(
        "uses-subagents".to_string(),
        FilterState::Boolean {
            state: BoolFilter::True,
        },
    );
    states.insert(
        "turn-count".to_string(),
        FilterState::Number {
            min: 10.0,
            max: 20.0,
        },
    );
    let kept: Vec<_> = apply_filters(&rows, &meta, &states)
        .into_iter()
        .map(|r| r.session_id.as_str())
        .collect();
    assert_eq!(kept, vec!["s2"]);
}

#[tokio::test]
async fn test_quality_view_detects_tool_errors() {
    let app = App::default();
    register_builtins(&app).unwrap();

    let erroring = Arc::new(
        EvalContext::builder("proj", "bad")
            .entries(vec![json!({
                "type": "assistant",
                "message": {"content": [{"type": "tool_use", "name": "Bash", "is_error": true}]}
            })])
            .build()
            .unwrap(),
    );
    let summary = app.run_dashboard_view(erroring, "quality").await;
    let values = summary.values();
    assert_eq!(values["has-errors"], FilterValue::Boolean(true));
    assert_eq!(values["primary-model"], FilterValue::from("unknown"));
}

#[tokio::test]
async fn test_default_view_string_filter() {
    let app = App::default();
    register_builtins(&app).unwrap();

    let contexts = vec![
        ctx("s1", 1, 0, 0, "claude-sonnet"),
        ctx("s2", 1, 0, 0, "claude-opus"),
    ];
    let rows = rows_for(&app, DEFAULT_VIEW, &contexts).await;
    let meta = build_filter_meta(&app.dashboard().filters_for_view(DEFAULT_VIEW), &rows);
    assert_eq!(
        meta[0].kind,
        FilterKind::String {
            values: vec!["claude-opus".to_string(), "claude-sonnet".to_string()]
        }
    );

    let mut states = BTreeMap::new();
    states.insert(
        "model".to_string(),
        FilterState::String {
            selected: ["claude-opus".to_string()].into_iter().collect(),
        },
    );
    let kept = apply_filters(&rows, &meta, &states);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].session_id, "s2");
}
