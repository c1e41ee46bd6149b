//! Claudeye CLI
//!
//! The `claudeye` command runs the stock checks against session contexts
//! that a log parser has already written to disk as JSON.
//!
//! ## Commands
//!
//! - `run`: Run evals and enrichers for each context
//! - `dashboard`: Compute one dashboard view's filters across contexts
//! - `list`: Show registered views, filters, evals and enrichers

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info, Level};

use claudeye_core::builtin::register_builtins;
use claudeye_core::dashboard::{build_filter_meta, DEFAULT_VIEW};
use claudeye_core::metrics::METRICS;
use claudeye_core::telemetry::{init_tracing, LogFormat};
use claudeye_core::{
    cache_key, content_hash, module_hash, App, CacheMode, DashboardSessionRow, EngineConfig,
    EnrichRunSummary, EvalContext, EvalRunSummary, FilterMeta, MemoryCacheBackend, SummaryCache,
    VERSION,
};

#[derive(Parser)]
#[command(name = "claudeye")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run evals, enrichers and dashboard filters over AI agent sessions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Soft per-item time limit in milliseconds
    #[arg(long, global = true, env = "CLAUDEYE_ITEM_TIMEOUT_MS")]
    item_timeout_ms: Option<u64>,

    /// Reuse summaries for unchanged sessions within this invocation
    #[arg(long, global = true, env = "CLAUDEYE_CACHE", value_enum, default_value_t = CacheArg::On)]
    cache: CacheArg,

    /// File whose contents identify the registered checks in cache entries
    #[arg(long, global = true, env = "CLAUDEYE_EVALS_MODULE")]
    evals_module: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run evals and enrichers against session contexts
    Run {
        /// Context documents (JSON)
        #[arg(required = true)]
        contexts: Vec<PathBuf>,
    },

    /// Compute a dashboard view's filters across session contexts
    Dashboard {
        /// View name
        #[arg(long, default_value = DEFAULT_VIEW)]
        view: String,

        /// Context documents (JSON)
        #[arg(required = true)]
        contexts: Vec<PathBuf>,
    },

    /// List registered views, filters, evals and enrichers
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CacheArg {
    On,
    Off,
}

impl From<CacheArg> for CacheMode {
    fn from(arg: CacheArg) -> Self {
        match arg {
            CacheArg::On => CacheMode::On,
            CacheArg::Off => CacheMode::Off,
        }
    }
}

/// A context document plus the fingerprint of the file it came from.
struct LoadedContext {
    context: Arc<EvalContext>,
    content_hash: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionReport {
    project_name: String,
    session_id: String,
    evals: EvalRunSummary,
    enrichments: EnrichRunSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardReport {
    view: String,
    filter_meta: Vec<FilterMeta>,
    sessions: Vec<DashboardSessionRow>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(format, level);

    let app = build_app(cli.item_timeout_ms)?;
    let cache = SummaryCache::new(
        Arc::new(MemoryCacheBackend::new()),
        module_fingerprint(cli.evals_module.as_deref())?,
        cli.cache.into(),
    );

    let result = match cli.command {
        Commands::Run { contexts } => {
            let reports = cmd_run(&app, &cache, &contexts).await?;
            print_json(&reports)
        }
        Commands::Dashboard { view, contexts } => {
            let report = cmd_dashboard(&app, &view, &contexts).await?;
            print_json(&report)
        }
        Commands::List => {
            print!("{}", cmd_list(&app));
            Ok(())
        }
    };

    METRICS.flush();
    result
}

/// App with the stock checks registered.
fn build_app(item_timeout_ms: Option<u64>) -> Result<App> {
    let mut config = EngineConfig::default();
    if let Some(ms) = item_timeout_ms {
        config = config.with_item_timeout(Duration::from_millis(ms));
    }
    let app = App::new(config);
    register_builtins(&app).context("Failed to register stock checks")?;
    Ok(app)
}

/// Hash of the evals module file, or of the CLI version when the stock
/// checks are the only ones registered.
fn module_fingerprint(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read evals module: {:?}", path))?;
            Ok(module_hash(&bytes))
        }
        None => Ok(module_hash(VERSION.as_bytes())),
    }
}

fn load_context(path: &Path) -> Result<LoadedContext> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file: {:?}", path))?;
    let context: EvalContext = serde_json::from_str(&content)
        .with_context(|| format!("Invalid context document in {:?}", path))?;

    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat context file: {:?}", path))?;
    let mtime_ms = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    debug!(path = ?path, session_id = context.session_id(), "loaded context");
    Ok(LoadedContext {
        context: Arc::new(context),
        content_hash: content_hash(mtime_ms, metadata.len()),
    })
}

async fn cmd_run(app: &App, cache: &SummaryCache, paths: &[PathBuf]) -> Result<Vec<SessionReport>> {
    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let loaded = load_context(path)?;
        let ctx = loaded.context;

        let eval_names: Vec<String> = app.evals_for(&ctx).into_iter().map(|e| e.name).collect();
        let evals: EvalRunSummary = cache
            .get_or_compute(
                &cache_key("evals", ctx.project_name(), ctx.session_id()),
                &loaded.content_hash,
                &eval_names,
                || app.run_evals(Arc::clone(&ctx)),
            )
            .await;

        let enricher_names: Vec<String> =
            app.enrichers_for(&ctx).into_iter().map(|e| e.name).collect();
        let enrichments: EnrichRunSummary = cache
            .get_or_compute(
                &cache_key("enrichments", ctx.project_name(), ctx.session_id()),
                &loaded.content_hash,
                &enricher_names,
                || app.run_enrichers(Arc::clone(&ctx)),
            )
            .await;

        info!(
            session_id = ctx.session_id(),
            passed = evals.pass_count,
            failed = evals.fail_count,
            errors = evals.error_count + enrichments.error_count,
            "session checked"
        );
        reports.push(SessionReport {
            project_name: ctx.project_name().to_string(),
            session_id: ctx.session_id().to_string(),
            evals,
            enrichments,
        });
    }
    Ok(reports)
}

async fn cmd_dashboard(app: &App, view: &str, paths: &[PathBuf]) -> Result<DashboardReport> {
    let filters = app.dashboard().filters_for_view(view);
    if filters.is_empty() {
        bail!("No filters are registered for view '{}'", view);
    }

    let mut sessions = Vec::with_capacity(paths.len());
    for path in paths {
        let ctx = load_context(path)?.context;
        let summary = app.run_dashboard_view(Arc::clone(&ctx), view).await;
        sessions.push(DashboardSessionRow::from_summary(
            ctx.project_name(),
            ctx.session_id(),
            &summary,
        ));
    }

    Ok(DashboardReport {
        view: view.to_string(),
        filter_meta: build_filter_meta(&filters, &sessions),
        sessions,
    })
}

fn cmd_list(app: &App) -> String {
    let mut out = String::new();
    out.push_str("Views:\n");
    for view in app.dashboard().views() {
        out.push_str(&format!("  {} ({})\n", view.name, view.label));
        for filter in app.dashboard().filters_for_view(&view.name) {
            out.push_str(&format!("    - {} [{}]\n", filter.name, filter.label));
        }
    }
    let defaults = app.dashboard().filters_for_view(DEFAULT_VIEW);
    if !defaults.is_empty() {
        out.push_str(&format!("  {}\n", DEFAULT_VIEW));
        for filter in defaults {
            out.push_str(&format!("    - {} [{}]\n", filter.name, filter.label));
        }
    }
    out.push_str("Evals:\n");
    for name in app.evals().names() {
        out.push_str(&format!("  {}\n", name));
    }
    out.push_str("Enrichers:\n");
    for name in app.enrichers().names() {
        out.push_str(&format!("  {}\n", name));
    }
    out
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
