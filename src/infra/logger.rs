// src/infra/logger.rs — Structured logging with tracing

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::infra::paths;

/// Log level implied by the verbosity flags. `RUST_LOG` still wins.
pub fn level_for(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A second initialisation in the same process is a no-op.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// Initialise logging to stderr and, when `logs_dir` is given, tee every
/// record into a timestamped file there. Returns the run log path.
pub fn init_run_logging(level: &str, logs_dir: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    let Some(logs_dir) = logs_dir else {
        init_logging(level);
        return Ok(None);
    };

    paths::ensure_dir(logs_dir)?;
    let path = run_log_path(logs_dir, chrono::Local::now());
    let file = File::create(&path)
        .map_err(|e| anyhow::anyhow!("Cannot create run log {}: {e}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);
    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    Ok(Some(path))
}

/// `<logs_dir>/<YYYY-MM-DD_HH-MM-SS>.log`
pub fn run_log_path(logs_dir: &Path, at: chrono::DateTime<chrono::Local>) -> PathBuf {
    logs_dir.join(format!("{}.log", at.format("%Y-%m-%d_%H-%M-%S")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_level_for_flags() {
        assert_eq!(level_for(false, false), "info");
        assert_eq!(level_for(true, false), "debug");
        assert_eq!(level_for(false, true), "warn");
        // verbose beats quiet
        assert_eq!(level_for(true, true), "debug");
    }

    #[test]
    fn test_run_log_path_format() {
        let at = chrono::Local
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 30)
            .single()
            .unwrap();
        let p = run_log_path(Path::new("logs"), at);
        assert_eq!(p, PathBuf::from("logs/2024-03-09_07-05-30.log"));
    }
}
