//! Registry of dashboard filters and the views that group them.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::check::{CheckFn, Condition, EvalScope};
use crate::engine::RunnableItem;
use crate::error::{EngineError, Result};
use crate::registry::{ScopedItem, ScopedRegistry};

use super::runner::FilterValue;

/// View that filters land in when none is named.
pub const DEFAULT_VIEW: &str = "default";

/// A filter stored in the registry.
#[derive(Debug, Clone)]
pub struct RegisteredFilter {
    pub name: String,
    /// Display label; defaults to the name.
    pub label: String,
    pub check: CheckFn<FilterValue>,
    pub condition: Option<Condition>,
    pub view: String,
}

impl RegisteredFilter {
    pub fn new(name: impl Into<String>, check: CheckFn<FilterValue>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            check,
            condition: None,
            view: DEFAULT_VIEW.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn in_view(mut self, view: impl Into<String>) -> Self {
        self.view = view.into();
        self
    }
}

impl ScopedItem for RegisteredFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> EvalScope {
        EvalScope::Session
    }

    fn partition(&self) -> &str {
        &self.view
    }
}

impl RunnableItem for RegisteredFilter {
    type Output = FilterValue;

    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> &CheckFn<FilterValue> {
        &self.check
    }

    fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }
}

/// A named group of filters shown together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardView {
    pub name: String,
    pub label: String,
}

/// Filters partitioned by view, plus the view list itself.
#[derive(Debug, Clone)]
pub struct DashboardRegistry {
    filters: ScopedRegistry<RegisteredFilter>,
    views: Arc<RwLock<Vec<DashboardView>>>,
}

impl Default for DashboardRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardRegistry {
    pub fn new() -> Self {
        Self {
            filters: ScopedRegistry::new("filters"),
            views: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Upsert on (view, name).
    pub fn register_filter(&self, filter: RegisteredFilter) -> Result<()> {
        if filter.view.trim().is_empty() {
            return Err(EngineError::InvalidRegistration(format!(
                "filter {:?}: view name must not be empty",
                filter.name
            )));
        }
        self.filters.register(filter)
    }

    /// Every filter across all views, in registration order.
    pub fn filters(&self) -> Vec<RegisteredFilter> {
        self.filters.get_all()
    }

    pub fn filters_for_view(&self, view: &str) -> Vec<RegisteredFilter> {
        self.filters.filtered(|f| f.view == view)
    }

    pub fn has_filters(&self) -> bool {
        self.filters.has()
    }

    pub fn clear_filters(&self) {
        self.filters.clear();
    }

    /// Upsert a view by name, keeping its original position.
    pub fn register_view(&self, view: DashboardView) -> Result<()> {
        if view.name.trim().is_empty() {
            return Err(EngineError::InvalidRegistration(
                "view name must not be empty".to_string(),
            ));
        }
        let mut views = self.views.write().unwrap_or_else(|p| p.into_inner());
        match views.iter_mut().find(|v| v.name == view.name) {
            Some(existing) => *existing = view,
            None => {
                debug!(view = %view.name, "registering dashboard view");
                views.push(view);
            }
        }
        Ok(())
    }

    pub fn views(&self) -> Vec<DashboardView> {
        self.views.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn has_views(&self) -> bool {
        !self.views.read().unwrap_or_else(|p| p.into_inner()).is_empty()
    }

    pub fn clear_views(&self) {
        self.views.write().unwrap_or_else(|p| p.into_inner()).clear();
    }

    /// Register `name` as a view and return a handle that adds filters to it.
    ///
    /// ```
    /// use claudeye_core::check::CheckFn;
    /// use claudeye_core::dashboard::{DashboardRegistry, FilterValue};
    ///
    /// let dashboard = DashboardRegistry::new();
    /// dashboard
    ///     .view("performance", "Performance")?
    ///     .filter("turn-count", "Turns", CheckFn::from_sync(|ctx| {
    ///         Ok(FilterValue::Number(ctx.stats().turn_count as f64))
    ///     }))?;
    /// assert_eq!(dashboard.filters_for_view("performance").len(), 1);
    /// # Ok::<(), claudeye_core::EngineError>(())
    /// ```
    pub fn view(&self, name: impl Into<String>, label: impl Into<String>) -> Result<ViewRegistrar> {
        let name = name.into();
        self.register_view(DashboardView {
            name: name.clone(),
            label: label.into(),
        })?;
        Ok(ViewRegistrar {
            registry: self.clone(),
            view: name,
        })
    }
}

/// Fluent handle returned by [`DashboardRegistry::view`].
#[derive(Debug, Clone)]
pub struct ViewRegistrar {
    registry: DashboardRegistry,
    view: String,
}

impl ViewRegistrar {
    pub fn view_name(&self) -> &str {
        &self.view
    }

    /// Register an unconditioned filter in this view.
    pub fn filter(
        &self,
        name: impl Into<String>,
        label: impl Into<String>,
        check: CheckFn<FilterValue>,
    ) -> Result<&Self> {
        self.add(RegisteredFilter::new(name, check).with_label(label))
    }

    /// Register a prepared filter in this view, overriding its view name.
    pub fn add(&self, filter: RegisteredFilter) -> Result<&Self> {
        self.registry.register_filter(filter.in_view(self.view.clone()))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(v: bool) -> CheckFn<FilterValue> {
        CheckFn::constant(FilterValue::Boolean(v))
    }

    fn names(filters: &[RegisteredFilter]) -> Vec<&str> {
        filters.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_label_and_view_default() {
        let f = RegisteredFilter::new("has-errors", flag(true));
        assert_eq!(f.label, "has-errors");
        assert_eq!(f.view, DEFAULT_VIEW);
    }

    #[test]
    fn test_same_name_in_two_views_is_two_filters() {
        let dash = DashboardRegistry::new();
        dash.register_filter(RegisteredFilter::new("x", flag(true)).in_view("a"))
            .unwrap();
        dash.register_filter(RegisteredFilter::new("x", flag(false)).in_view("b"))
            .unwrap();

        assert_eq!(dash.filters().len(), 2);
        assert_eq!(names(&dash.filters_for_view("a")), vec!["x"]);
        assert_eq!(names(&dash.filters_for_view("b")), vec!["x"]);
        assert!(dash.filters_for_view("missing").is_empty());
    }

    #[test]
    fn test_reregistration_within_view_replaces() {
        let dash = DashboardRegistry::new();
        dash.register_filter(RegisteredFilter::new("x", flag(true)))
            .unwrap();
        dash.register_filter(RegisteredFilter::new("y", flag(true)))
            .unwrap();
        dash.register_filter(RegisteredFilter::new("x", flag(false)).with_label("X2"))
            .unwrap();

        let all = dash.filters();
        assert_eq!(names(&all), vec!["x", "y"]);
        assert_eq!(all[0].label, "X2");
    }

    #[test]
    fn test_view_registrar_targets_its_view() {
        let dash = DashboardRegistry::new();
        dash.view("perf", "Performance")
            .unwrap()
            .filter("turns", "Turns", flag(true))
            .unwrap()
            .filter("tools", "Tool calls", flag(true))
            .unwrap();
        dash.register_filter(RegisteredFilter::new("model", flag(true)))
            .unwrap();

        assert_eq!(names(&dash.filters_for_view("perf")), vec!["turns", "tools"]);
        assert_eq!(names(&dash.filters_for_view(DEFAULT_VIEW)), vec!["model"]);
        assert_eq!(
            dash.views(),
            vec![DashboardView {
                name: "perf".to_string(),
                label: "Performance".to_string()
            }]
        );
    }

    #[test]
    fn test_view_reregistration_updates_label_in_place() {
        let dash = DashboardRegistry::new();
        dash.view("a", "A").unwrap();
        dash.view("b", "B").unwrap();
        dash.view("a", "Alpha").unwrap();
        let views = dash.views();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].label, "Alpha");
    }

    #[test]
    fn test_clearing_views_and_filters_is_independent() {
        let dash = DashboardRegistry::new();
        dash.view("a", "A")
            .unwrap()
            .filter("x", "X", flag(true))
            .unwrap();

        dash.clear_views();
        assert!(!dash.has_views());
        assert!(dash.has_filters());

        dash.view("a", "A").unwrap();
        dash.clear_filters();
        assert!(dash.has_views());
        assert!(!dash.has_filters());
    }

    #[test]
    fn test_empty_view_name_rejected() {
        let dash = DashboardRegistry::new();
        assert!(dash.view("", "Nothing").is_err());
        assert!(dash
            .register_filter(RegisteredFilter::new("x", flag(true)).in_view(" "))
            .is_err());
    }
}
