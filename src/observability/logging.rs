use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "pipeline.log";

/// Initializes the logging system with both console and file output.
/// Only the binaries call this; the library just emits `tracing` events.
/// Hold the returned guard until exit so buffered file lines are flushed.
pub fn init_logging() -> WorkerGuard {
    let (subscriber, guard) = build_subscriber(Path::new(LOG_DIR));
    subscriber.init();
    guard
}

/// JSON lines into a daily-rolling file under `dir`, plain text to stderr
fn build_subscriber(dir: &Path) -> (impl tracing::Subscriber + Send + Sync + 'static, WorkerGuard) {
    // Ensure logs directory exists
    let _ = fs::create_dir_all(dir);

    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    // JSON lines in the file, so each stage's structured fields stay queryable
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // Console goes to stderr; stdout carries the stage outcome JSON
    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    // Respect RUST_LOG if set; otherwise info for our crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_pipeline=info,warn"));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer);
    (subscriber, guard)
}
