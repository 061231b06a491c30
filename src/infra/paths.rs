// src/infra/paths.rs — Well-known file and directory names
//
// Everything is relative to the working directory the run is started from.
// SWITCHGEAR_CONFIG points the TOML config somewhere else.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "switchgear.toml";
pub const MODULE_LIST_FILE: &str = "modules.txt";
pub const ITERATE_LIST_FILE: &str = "iterate.txt";
pub const OPTIONS_FILE: &str = "options.txt";
pub const SCENARIO_LIST_FILE: &str = "scenarios.txt";
pub const SCENARIO_QUEUE_DIR: &str = "scenario_queue";
pub const INPUTS_DIR: &str = "inputs";
pub const OUTPUTS_DIR: &str = "outputs";
pub const LOGS_DIR: &str = "logs";
pub const SCRIPT_MODULES_DIR: &str = "modules";

pub const SOLVER_STATUS_FILE: &str = "solver_status.json";
pub const SOLUTION_FILE: &str = "solution.json";
pub const DEFAULT_DATA_TABLE: &str = "data";

/// Config file: $SWITCHGEAR_CONFIG or ./switchgear.toml
pub fn config_file_path() -> PathBuf {
    std::env::var_os("SWITCHGEAR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

/// Journal file for one worker identity inside the queue directory.
pub fn journal_path(queue_dir: &Path, job_id: &str) -> PathBuf {
    queue_dir.join(format!("{job_id}_running.txt"))
}

/// Module list search order when `--module-list` is absent.
pub fn module_list_candidates(inputs_dir: &Path) -> Vec<PathBuf> {
    vec![
        PathBuf::from(MODULE_LIST_FILE),
        inputs_dir.join(MODULE_LIST_FILE),
    ]
}

/// Default script directories searched after any configured ones.
pub fn default_script_dirs(inputs_dir: &Path) -> Vec<PathBuf> {
    vec![
        PathBuf::from(SCRIPT_MODULES_DIR),
        inputs_dir.join(SCRIPT_MODULES_DIR),
    ]
}

/// Create a directory tree, tolerating another process creating it first.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}
