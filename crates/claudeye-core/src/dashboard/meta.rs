//! Filter metadata derived from computed values, and the predicates that
//! apply filter selections to session rows.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::registry::RegisteredFilter;
use super::runner::{FilterComputeSummary, FilterValue};

/// One session's computed filter values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSessionRow {
    pub project_name: String,
    pub session_id: String,
    pub filter_values: BTreeMap<String, FilterValue>,
}

impl DashboardSessionRow {
    pub fn from_summary(
        project_name: impl Into<String>,
        session_id: impl Into<String>,
        summary: &FilterComputeSummary,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            session_id: session_id.into(),
            filter_values: summary.values(),
        }
    }
}

/// Control type of a filter, inferred from its observed values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterKind {
    Boolean,
    Number { min: f64, max: f64 },
    String { values: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterMeta {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FilterKind,
}

/// Build metadata for `filters` (in their order) from the values in `rows`.
///
/// The first observed value fixes a filter's type; values of any other type
/// are ignored. Filters with no observed value are omitted.
pub fn build_filter_meta(
    filters: &[RegisteredFilter],
    rows: &[DashboardSessionRow],
) -> Vec<FilterMeta> {
    filters
        .iter()
        .filter_map(|filter| {
            let mut observed = rows
                .iter()
                .filter_map(|row| row.filter_values.get(&filter.name));
            let kind = match observed.next()? {
                FilterValue::Boolean(_) => FilterKind::Boolean,
                FilterValue::Number(first) => {
                    let (min, max) = observed
                        .filter_map(|v| match v {
                            FilterValue::Number(n) => Some(*n),
                            _ => None,
                        })
                        .fold((*first, *first), |(lo, hi), n| (lo.min(n), hi.max(n)));
                    FilterKind::Number { min, max }
                }
                FilterValue::String(first) => {
                    let mut values: BTreeSet<String> = observed
                        .filter_map(|v| match v {
                            FilterValue::String(s) => Some(s.clone()),
                            _ => None,
                        })
                        .collect();
                    values.insert(first.clone());
                    FilterKind::String {
                        values: values.into_iter().collect(),
                    }
                }
            };
            Some(FilterMeta {
                name: filter.name.clone(),
                label: filter.label.clone(),
                kind,
            })
        })
        .collect()
}

/// Boolean filter selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BoolFilter {
    #[default]
    All,
    True,
    False,
}

/// The active selection for one filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterState {
    Boolean { state: BoolFilter },
    Number { min: f64, max: f64 },
    /// An empty selection matches everything.
    String { selected: BTreeSet<String> },
}

impl FilterState {
    /// The selection that lets every row through.
    pub fn initial(meta: &FilterMeta) -> Self {
        match &meta.kind {
            FilterKind::Boolean => FilterState::Boolean {
                state: BoolFilter::All,
            },
            FilterKind::Number { min, max } => FilterState::Number {
                min: *min,
                max: *max,
            },
            FilterKind::String { values } => FilterState::String {
                selected: values.iter().cloned().collect(),
            },
        }
    }

    /// A concrete boolean or string selection only admits values of its own
    /// type. Number ranges cannot judge other types and let them through.
    fn admits(&self, value: &FilterValue) -> bool {
        match self {
            FilterState::Boolean { state } => match state {
                BoolFilter::All => true,
                BoolFilter::True => matches!(value, FilterValue::Boolean(true)),
                BoolFilter::False => matches!(value, FilterValue::Boolean(false)),
            },
            FilterState::Number { min, max } => match value {
                FilterValue::Number(n) => *n >= *min && *n <= *max,
                _ => true,
            },
            FilterState::String { selected } => {
                selected.is_empty()
                    || matches!(value, FilterValue::String(s) if selected.contains(s))
            }
        }
    }
}

/// Initial states for every filter in `meta`, keyed by filter name.
pub fn initial_states(meta: &[FilterMeta]) -> BTreeMap<String, FilterState> {
    meta.iter()
        .map(|m| (m.name.clone(), FilterState::initial(m)))
        .collect()
}

/// Rows passing every filter in `meta` under `states`.
///
/// A row without a value for a filter, or a filter without a state, passes
/// that filter.
pub fn apply_filters<'a>(
    rows: &'a [DashboardSessionRow],
    meta: &[FilterMeta],
    states: &BTreeMap<String, FilterState>,
) -> Vec<&'a DashboardSessionRow> {
    rows.iter()
        .filter(|row| {
            meta.iter().all(|m| {
                match (row.filter_values.get(&m.name), states.get(&m.name)) {
                    (Some(value), Some(state)) => state.admits(value),
                    _ => true,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckFn;

    fn filter(name: &str) -> RegisteredFilter {
        RegisteredFilter::new(name, CheckFn::constant(FilterValue::Boolean(false)))
    }

    fn row(session: &str, values: &[(&str, FilterValue)]) -> DashboardSessionRow {
        DashboardSessionRow {
            project_name: "proj".to_string(),
            session_id: session.to_string(),
            filter_values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    fn sample_rows() -> Vec<DashboardSessionRow> {
        vec![
            row(
                "s1",
                &[
                    ("errors", true.into()),
                    ("turns", 4u64.into()),
                    ("model", "opus".into()),
                ],
            ),
            row(
                "s2",
                &[
                    ("errors", false.into()),
                    ("turns", 20u64.into()),
                    ("model", "sonnet".into()),
                ],
            ),
            row("s3", &[("turns", 11u64.into()), ("model", "opus".into())]),
        ]
    }

    fn sessions(rows: &[&DashboardSessionRow]) -> Vec<String> {
        rows.iter().map(|r| r.session_id.clone()).collect()
    }

    #[test]
    fn test_meta_infers_types_in_filter_order() {
        let filters = vec![filter("model"), filter("missing"), filter("turns"), filter("errors")];
        let meta = build_filter_meta(&filters, &sample_rows());

        assert_eq!(meta.len(), 3);
        assert_eq!(meta[0].name, "model");
        assert_eq!(
            meta[0].kind,
            FilterKind::String {
                values: vec!["opus".to_string(), "sonnet".to_string()]
            }
        );
        assert_eq!(meta[1].kind, FilterKind::Number { min: 4.0, max: 20.0 });
        assert_eq!(meta[2].kind, FilterKind::Boolean);
    }

    #[test]
    fn test_meta_ignores_values_of_other_types() {
        let rows = vec![
            row("a", &[("mixed", 3u64.into())]),
            row("b", &[("mixed", "seven".into())]),
            row("c", &[("mixed", 9u64.into())]),
        ];
        let meta = build_filter_meta(&[filter("mixed")], &rows);
        assert_eq!(meta[0].kind, FilterKind::Number { min: 3.0, max: 9.0 });
    }

    #[test]
    fn test_initial_states_admit_every_row() {
        let rows = sample_rows();
        let meta = build_filter_meta(&[filter("errors"), filter("turns"), filter("model")], &rows);
        let states = initial_states(&meta);
        assert_eq!(apply_filters(&rows, &meta, &states).len(), 3);
    }

    #[test]
    fn test_boolean_and_missing_values() {
        let rows = sample_rows();
        let meta = build_filter_meta(&[filter("errors")], &rows);
        let mut states = initial_states(&meta);
        states.insert(
            "errors".to_string(),
            FilterState::Boolean {
                state: BoolFilter::True,
            },
        );
        // s3 has no value for "errors" and passes through
        assert_eq!(sessions(&apply_filters(&rows, &meta, &states)), vec!["s1", "s3"]);
    }

    #[test]
    fn test_number_range_is_inclusive() {
        let rows = sample_rows();
        let meta = build_filter_meta(&[filter("turns")], &rows);
        let mut states = BTreeMap::new();
        states.insert(
            "turns".to_string(),
            FilterState::Number {
                min: 4.0,
                max: 11.0,
            },
        );
        assert_eq!(sessions(&apply_filters(&rows, &meta, &states)), vec!["s1", "s3"]);
    }

    #[test]
    fn test_string_selection_and_empty_selection() {
        let rows = sample_rows();
        let meta = build_filter_meta(&[filter("model")], &rows);
        let mut states = BTreeMap::new();
        states.insert(
            "model".to_string(),
            FilterState::String {
                selected: ["sonnet".to_string()].into_iter().collect(),
            },
        );
        assert_eq!(sessions(&apply_filters(&rows, &meta, &states)), vec!["s2"]);

        states.insert(
            "model".to_string(),
            FilterState::String {
                selected: BTreeSet::new(),
            },
        );
        assert_eq!(apply_filters(&rows, &meta, &states).len(), 3);
    }

    #[test]
    fn test_selections_reject_values_of_other_types() {
        let rows = vec![
            row("s1", &[("flag", FilterValue::Boolean(true))]),
            row("s2", &[("flag", FilterValue::from("yes"))]),
            row("s3", &[("flag", FilterValue::Number(1.0))]),
        ];
        let meta = build_filter_meta(&[filter("flag")], &rows);
        let mut states = BTreeMap::new();

        states.insert(
            "flag".to_string(),
            FilterState::Boolean {
                state: BoolFilter::True,
            },
        );
        assert_eq!(sessions(&apply_filters(&rows, &meta, &states)), vec!["s1"]);

        states.insert(
            "flag".to_string(),
            FilterState::String {
                selected: BTreeSet::from(["yes".to_string()]),
            },
        );
        assert_eq!(sessions(&apply_filters(&rows, &meta, &states)), vec!["s2"]);

        states.insert(
            "flag".to_string(),
            FilterState::Number { min: 0.0, max: 0.5 },
        );
        assert_eq!(
            sessions(&apply_filters(&rows, &meta, &states)),
            vec!["s1", "s2"]
        );
    }

    #[test]
    fn test_meta_serializes_with_type_tag() {
        let meta = FilterMeta {
            name: "turns".to_string(),
            label: "Turns".to_string(),
            kind: FilterKind::Number { min: 1.0, max: 5.0 },
        };
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            serde_json::json!({"name": "turns", "label": "Turns", "type": "number", "min": 1.0, "max": 5.0})
        );
    }
}
