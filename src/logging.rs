//! Logging setup: stderr plus a daily-rotated file in the log directory.
//!
//! Log level is controlled via the `PHOTO_CURATOR_LOG` environment variable
//! (`debug`, `info`, `warn`, `error`); defaults to `info`.

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(log_dir: &Path) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_env("PHOTO_CURATOR_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "photo_curator.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the worker guard alive for the process lifetime; init() runs once.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}
