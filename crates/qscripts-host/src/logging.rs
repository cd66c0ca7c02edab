use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ProjectPaths;

const MAX_LOG_SIZE: u64 = 1024 * 1024; // 1MB

/// Initialize console logging, plus `<data_dir>/logs/qscripts.log` when `to_file` is set
///
/// `default_level` applies when `RUST_LOG` is not set. The returned guard must
/// be kept alive for the duration of the program.
pub fn init_logging(default_level: &str, to_file: bool) -> io::Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if !to_file {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return Ok(None);
    }

    let log_path = log_file_path()?;
    let file = open_log_file(&log_path)?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stdout).with_ansi(true))
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!("Logging to file: {}", log_path.display());
    Ok(Some(guard))
}

/// Default level for a `-d` count: none is info, one is debug, more is trace
pub fn level_for_verbosity(debug: u8) -> &'static str {
    match debug {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn log_file_path() -> io::Result<PathBuf> {
    let paths = ProjectPaths::new("qscripts")
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Failed to find home directory"))?;
    Ok(paths.log_dir().join("qscripts.log"))
}

/// Open the log for appending, starting over once it passes [`MAX_LOG_SIZE`]
fn open_log_file(log_path: &Path) -> io::Result<File> {
    if let Some(dir) = log_path.parent() {
        fs::create_dir_all(dir)?;
    }
    truncate_if_needed(log_path)?;
    OpenOptions::new().create(true).append(true).open(log_path)
}

fn truncate_if_needed(log_path: &Path) -> io::Result<()> {
    if log_path.exists() && fs::metadata(log_path)?.len() > MAX_LOG_SIZE {
        File::create(log_path)?.set_len(0)?;
    }
    Ok(())
}
