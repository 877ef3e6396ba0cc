use anyhow::{Context as _, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "quillcast=info,tower_http=info";

/// Install the global subscriber: stderr always, plus a daily rolling file
/// when a log directory is configured. `RUST_LOG` wins over the configured
/// filter; `verbose` raises the default to debug.
///
/// Keep the returned guard alive for the life of the process so buffered
/// file output is flushed.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let fallback = match (&config.filter, verbose) {
        (Some(filter), _) => filter.clone(),
        (None, true) => "quillcast=debug,tower_http=debug".to_string(),
        (None, false) => DEFAULT_FILTER.to_string(),
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .with_context(|| format!("invalid log filter `{fallback}`"))?;

    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "quillcast.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .context("logging already initialised")?;

    Ok(guard)
}
