use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging based on configuration.
///
/// Logs always go to stderr; with `file` set they also go to that file
/// (rotated daily with `rotation`). The returned guard flushes the file
/// writer on drop and must be kept alive. Fails if a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    // RUST_LOG wins over the configured level
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::from_str(&log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if let Some(log_file) = &config.file {
        let path = Path::new(log_file);
        let (non_blocking, file_guard) = if config.rotation {
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("searchflow.log");
            tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, file_name))
        } else {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", log_file))?;
            tracing_appender::non_blocking(file)
        };
        guard = Some(file_guard);
        layers.push(fmt_layer(non_blocking, config.json));
    }

    // Console output stays human-readable when a JSON file is written
    let console_json = config.json && config.file.is_none();
    layers.push(fmt_layer(std::io::stderr, console_json));

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    Ok(guard)
}

fn fmt_layer<W>(writer: W, json: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}
