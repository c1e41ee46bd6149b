//! Application handle bundling every registry with one engine.
//!
//! An [`App`] is cheap to clone; clones share registries. Two `App::new`
//! calls are fully independent, which keeps tests isolated from each other.

use std::sync::Arc;

use tracing::debug;

use crate::auth::AuthRegistry;
use crate::check::Condition;
use crate::condition::GlobalCondition;
use crate::context::EvalContext;
use crate::dashboard::{run_filters, DashboardRegistry, FilterComputeSummary};
use crate::engine::{EngineConfig, ExecutionEngine};
use crate::enrich::{run_enrichers, EnrichRunSummary, RegisteredEnricher};
use crate::error::Result;
use crate::evals::{run_evals, EvalRunSummary, RegisteredEval};
use crate::registry::{ScopedItem, ScopedRegistry};

#[derive(Debug, Clone)]
pub struct App {
    evals: ScopedRegistry<RegisteredEval>,
    enrichers: ScopedRegistry<RegisteredEnricher>,
    dashboard: DashboardRegistry,
    auth: AuthRegistry,
    engine: ExecutionEngine,
}

impl Default for App {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl App {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            evals: ScopedRegistry::new("evals"),
            enrichers: ScopedRegistry::new("enrichers"),
            dashboard: DashboardRegistry::new(),
            auth: AuthRegistry::new(),
            engine: ExecutionEngine::new(GlobalCondition::new(), config),
        }
    }

    pub fn evals(&self) -> &ScopedRegistry<RegisteredEval> {
        &self.evals
    }

    pub fn enrichers(&self) -> &ScopedRegistry<RegisteredEnricher> {
        &self.enrichers
    }

    pub fn dashboard(&self) -> &DashboardRegistry {
        &self.dashboard
    }

    pub fn auth(&self) -> &AuthRegistry {
        &self.auth
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn register_eval(&self, eval: RegisteredEval) -> Result<()> {
        self.evals.register(eval)
    }

    pub fn register_enricher(&self, enricher: RegisteredEnricher) -> Result<()> {
        self.enrichers.register(enricher)
    }

    /// Install the batch-wide condition shared by evals, enrichers and
    /// filters.
    pub fn condition(&self, condition: Condition) {
        self.engine.global_condition().set(condition);
    }

    /// Evals that apply to `ctx`, in registration order.
    pub fn evals_for(&self, ctx: &EvalContext) -> Vec<RegisteredEval> {
        select_for(&self.evals, ctx)
    }

    /// Enrichers that apply to `ctx`, in registration order.
    pub fn enrichers_for(&self, ctx: &EvalContext) -> Vec<RegisteredEnricher> {
        select_for(&self.enrichers, ctx)
    }

    pub async fn run_evals(&self, ctx: Arc<EvalContext>) -> EvalRunSummary {
        let evals = self.evals_for(&ctx);
        run_evals(&self.engine, &evals, ctx).await
    }

    pub async fn run_enrichers(&self, ctx: Arc<EvalContext>) -> EnrichRunSummary {
        let enrichers = self.enrichers_for(&ctx);
        run_enrichers(&self.engine, &enrichers, ctx).await
    }

    /// Compute the filters of `view` for `ctx`. An unknown view yields an
    /// empty summary.
    pub async fn run_dashboard_view(
        &self,
        ctx: Arc<EvalContext>,
        view: &str,
    ) -> FilterComputeSummary {
        let filters = self.dashboard.filters_for_view(view);
        run_filters(&self.engine, &filters, ctx).await
    }

    /// Clear every registry and the global condition.
    pub fn reset(&self) {
        self.evals.clear();
        self.enrichers.clear();
        self.dashboard.clear_filters();
        self.dashboard.clear_views();
        self.auth.clear();
        self.engine.global_condition().clear();
        debug!("app registries reset");
    }
}

fn select_for<T: ScopedItem>(registry: &ScopedRegistry<T>, ctx: &EvalContext) -> Vec<T> {
    if ctx.is_subagent() {
        registry.get_subagent_scoped(ctx.subagent_type())
    } else {
        registry.get_session_scoped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{CheckFn, EvalScope};
    use crate::dashboard::FilterValue;
    use crate::enrich::EnrichmentData;
    use crate::evals::EvalOutcome;

    fn session() -> Arc<EvalContext> {
        Arc::new(EvalContext::builder("proj", "sess").build().unwrap())
    }

    fn subagent(kind: &str) -> Arc<EvalContext> {
        Arc::new(
            EvalContext::builder("proj", "sess")
                .subagent(Some(kind.to_string()))
                .build()
                .unwrap(),
        )
    }

    fn eval(name: &str, scope: EvalScope) -> RegisteredEval {
        RegisteredEval::new(name, CheckFn::constant(EvalOutcome::pass())).with_scope(scope)
    }

    fn result_names(summary: &EvalRunSummary) -> Vec<&str> {
        summary.results.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_run_evals_selects_by_context_scope() {
        let app = App::default();
        app.register_eval(eval("session-only", EvalScope::Session))
            .unwrap();
        app.register_eval(eval("both", EvalScope::Both)).unwrap();
        app.register_eval(eval("explore-only", EvalScope::Subagent).with_subagent_type("Explore"))
            .unwrap();

        let s = app.run_evals(session()).await;
        assert_eq!(result_names(&s), vec!["session-only", "both"]);

        let s = app.run_evals(subagent("Explore")).await;
        assert_eq!(result_names(&s), vec!["both", "explore-only"]);

        let s = app.run_evals(subagent("Plan")).await;
        assert_eq!(result_names(&s), vec!["both"]);
    }

    #[tokio::test]
    async fn test_global_condition_applies_to_every_domain() {
        let app = App::default();
        app.register_eval(eval("e", EvalScope::Session)).unwrap();
        app.register_enricher(RegisteredEnricher::new(
            "x",
            CheckFn::constant(EnrichmentData::new()),
        ))
        .unwrap();
        app.dashboard()
            .view("v", "V")
            .unwrap()
            .filter("f", "F", CheckFn::constant(FilterValue::Boolean(true)))
            .unwrap();
        app.condition(Condition::constant(false));

        assert_eq!(app.run_evals(session()).await.skipped_count, 1);
        assert_eq!(app.run_enrichers(session()).await.skipped_count, 1);
        assert_eq!(app.run_dashboard_view(session(), "v").await.skipped_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_view_is_empty() {
        let app = App::default();
        let summary = app.run_dashboard_view(session(), "nope").await;
        assert!(summary.results.is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let app = App::default();
        app.register_eval(eval("e", EvalScope::Session)).unwrap();
        app.dashboard().view("v", "V").unwrap();
        app.auth()
            .register_users(vec![crate::auth::AuthUser::new("a", "b")]);
        app.condition(Condition::constant(true));

        app.reset();
        assert!(!app.evals().has());
        assert!(!app.dashboard().has_views());
        assert!(!app.auth().has_users());
        assert!(!app.engine().global_condition().is_set());
    }

    #[test]
    fn test_apps_are_independent() {
        let a = App::default();
        let b = App::default();
        a.register_eval(eval("e", EvalScope::Session)).unwrap();
        assert!(a.evals().has());
        assert!(!b.evals().has());
    }
}
