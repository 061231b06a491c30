// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub iteration: IterationConfig,

    #[serde(default)]
    pub modules: ModulesConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Program name or path of the external solver.
    pub name: String,
    /// Whitespace-separated `key=value` pairs handed to the solver untouched.
    pub options_string: Option<String>,
    pub keepfiles: bool,
    pub tempdir: Option<PathBuf>,
    pub stream_output: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            name: "glpk".into(),
            options_string: None,
            keepfiles: false,
            tempdir: None,
            stream_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationConfig {
    /// Per-level round cap; `None` iterates until the level converges.
    pub max_iter: Option<u32>,
    pub max_depth: usize,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            max_iter: None,
            max_depth: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    pub module_list: Option<PathBuf>,
    /// Extra directories searched for `.rhai` modules, before the defaults.
    pub script_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub scenario_list: PathBuf,
    pub scenario_queue: PathBuf,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            scenario_list: PathBuf::from(paths::SCENARIO_LIST_FILE),
            scenario_queue: PathBuf::from(paths::SCENARIO_QUEUE_DIR),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub inputs_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            inputs_dir: PathBuf::from(paths::INPUTS_DIR),
            outputs_dir: PathBuf::from(paths::OUTPUTS_DIR),
            logs_dir: PathBuf::from(paths::LOGS_DIR),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.solver.name, "glpk");
        assert!(!c.solver.keepfiles);
        assert_eq!(c.iteration.max_iter, None);
        assert_eq!(c.iteration.max_depth, 8);
        assert_eq!(c.queue.scenario_list, PathBuf::from("scenarios.txt"));
        assert_eq!(c.queue.scenario_queue, PathBuf::from("scenario_queue"));
        assert_eq!(c.paths.inputs_dir, PathBuf::from("inputs"));
        assert_eq!(c.paths.outputs_dir, PathBuf::from("outputs"));
        assert_eq!(c.paths.logs_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.iteration.max_depth, 8);
        assert!(config.modules.script_dirs.is_empty());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[solver]
name = "cbc"
options_string = "ratio=0.01 threads=4"
keepfiles = true
stream_output = true

[iteration]
max_iter = 20
max_depth = 3

[modules]
module_list = "conf/modules.txt"
script_dirs = ["shared/modules"]

[queue]
scenario_list = "runs.txt"
scenario_queue = "/scratch/queue"

[paths]
inputs_dir = "in"
outputs_dir = "out"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.solver.name, "cbc");
        assert_eq!(
            config.solver.options_string.as_deref(),
            Some("ratio=0.01 threads=4")
        );
        assert!(config.solver.keepfiles);
        assert!(config.solver.stream_output);
        assert_eq!(config.iteration.max_iter, Some(20));
        assert_eq!(config.iteration.max_depth, 3);
        assert_eq!(
            config.modules.module_list,
            Some(PathBuf::from("conf/modules.txt"))
        );
        assert_eq!(config.modules.script_dirs, vec![PathBuf::from("shared/modules")]);
        assert_eq!(config.queue.scenario_list, PathBuf::from("runs.txt"));
        assert_eq!(config.paths.inputs_dir, PathBuf::from("in"));
        // Unset fields keep their defaults
        assert_eq!(config.paths.logs_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: Config = toml::from_str("[solver]\nkeepfiles = true\n").unwrap();
        assert_eq!(config.solver.name, "glpk");
        assert!(config.solver.keepfiles);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchgear.toml");
        std::fs::write(&path, "[solver\nname = 1").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
