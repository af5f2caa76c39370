//! Tracing setup for the command-line front end
//!
//! Everything is written to `<data_dir>/lspotato.log`; stderr only shows
//! warnings unless `verbose` is set. The filter is read from `LSPOTATO_LOG`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Environment variable holding the log filter directive
pub const LOG_ENV: &str = "LSPOTATO_LOG";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the program.
pub fn init(log_path: &Path, verbose: bool) -> anyhow::Result<WorkerGuard> {
    let log_dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(log_dir)?;

    let file_name = log_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "lspotato.log".into());
    let appender = tracing_appender::rolling::never(log_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .with_filter(stderr_level),
        )
        .try_init()?;

    Ok(guard)
}
