//! Dashboard filters and views.
//!
//! Filters are checks that compute one value per session, grouped into named
//! views. Their values feed [`meta`], which derives the filter controls and
//! applies them to session rows.

pub mod meta;
pub mod registry;
pub mod runner;

pub use meta::{
    apply_filters, build_filter_meta, initial_states, BoolFilter, DashboardSessionRow, FilterKind,
    FilterMeta, FilterState,
};
pub use registry::{DashboardRegistry, DashboardView, RegisteredFilter, ViewRegistrar, DEFAULT_VIEW};
pub use runner::{run_filters, FilterAdapter, FilterComputeResult, FilterComputeSummary, FilterValue};
