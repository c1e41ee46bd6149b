//! Centralised tracing initialisation for Claudeye binaries.
//!
//! Call [`init_tracing`] once at program start. Later calls are ignored; the
//! global subscriber can only be set once per process.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "CLAUDEYE_LOG";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    /// Newline-delimited JSON.
    Json,
}

/// Filter from `CLAUDEYE_LOG`, then `RUST_LOG`, then `level`.
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Initialise the global tracing subscriber. Logs go to stderr so command
/// output on stdout stays machine-readable.
pub fn init_tracing(format: LogFormat, level: Level) {
    let filter = env_filter(level);

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok(),
    };
}
