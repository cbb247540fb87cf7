use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub enum LogTarget<'a> {
    /// The terminal belongs to the UI, so logs go to a file.
    File(&'a Path),
    Stderr,
}

fn env_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

pub fn init_logging(target: LogTarget<'_>, level: Option<&str>) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter(level))
        .with_file(true)
        .with_line_number(true);

    match target {
        LogTarget::File(path) => {
            let log_file = Arc::new(
                std::fs::File::create(path)
                    .with_context(|| format!("create log file: {}", path.display()))?,
            );
            let subscriber = builder.with_ansi(false).with_writer(log_file).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::Stderr => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    info!("logging initialized");
    Ok(())
}
