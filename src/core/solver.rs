// src/core/solver.rs — External solver collaborator

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::infra::errors::SwitchgearError;
use crate::model::instance::{ModelInstance, Solution};
use crate::util::truncate_str;

/// Opaque options handed to the solver as `key=value` pairs.
pub type SolverOptions = BTreeMap<String, String>;

/// Parse `--solver-options-string`: whitespace-separated `key=value` tokens.
pub fn parse_solver_options(options: &str) -> Result<SolverOptions, SwitchgearError> {
    let mut parsed = SolverOptions::new();
    for token in options.split_whitespace() {
        let (key, value) = token.split_once('=').ok_or_else(|| {
            SwitchgearError::config(format!(
                "Solver option '{token}' must have the form option=value"
            ))
        })?;
        if key.is_empty() {
            return Err(SwitchgearError::config(format!(
                "Solver option '{token}' has an empty name"
            )));
        }
        parsed.insert(key.to_string(), value.to_string());
    }
    Ok(parsed)
}

/// What came back from one solver invocation, before classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverResult {
    pub status: String,
    pub termination: String,
    pub solution: Option<Solution>,
    pub message: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
pub trait Solver {
    fn name(&self) -> String;

    /// Solve a populated instance once. Errors mean the solver could not be
    /// run at all; every outcome it reports comes back as a `SolverResult`.
    fn solve(
        &mut self,
        instance: &ModelInstance,
        options: &SolverOptions,
    ) -> Result<SolverResult, SwitchgearError>;
}

#[derive(Debug, Clone)]
pub struct SolverSettings {
    pub name: String,
    pub options: SolverOptions,
    pub keepfiles: bool,
    pub tempdir: Option<PathBuf>,
    pub stream_output: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            name: "glpk".into(),
            options: SolverOptions::new(),
            keepfiles: false,
            tempdir: None,
            stream_output: false,
        }
    }
}

/// Runs an external solver program:
/// `<program> <problem.json> <result.json> [key=value...]`.
///
/// The program writes a JSON object `{status, termination, objective?,
/// values?, message?}` to the result path.
pub struct CommandSolver {
    settings: SolverSettings,
}

#[derive(Debug, Deserialize)]
struct ResultFile {
    status: String,
    termination: String,
    objective: Option<f64>,
    values: Option<BTreeMap<String, f64>>,
    message: Option<String>,
}

impl CommandSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    fn program(&self) -> Result<PathBuf, SwitchgearError> {
        which::which(&self.settings.name).map_err(|e| SwitchgearError::Solver {
            solver: self.settings.name.clone(),
            message: format!("not found on PATH ({e})"),
        })
    }

    fn solver_error(&self, message: impl Into<String>) -> SwitchgearError {
        SwitchgearError::Solver {
            solver: self.settings.name.clone(),
            message: message.into(),
        }
    }
}

impl Solver for CommandSolver {
    fn name(&self) -> String {
        self.settings.name.clone()
    }

    fn solve(
        &mut self,
        instance: &ModelInstance,
        options: &SolverOptions,
    ) -> Result<SolverResult, SwitchgearError> {
        let program = self.program()?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("switchgear-");
        let workdir = match &self.settings.tempdir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };
        let workdir_path = workdir.path().to_path_buf();
        // Dropping `_cleanup` removes the directory unless the files are kept.
        let _cleanup = if self.settings.keepfiles {
            let kept = workdir.keep();
            tracing::info!("Keeping solver files in {}", kept.display());
            None
        } else {
            Some(workdir)
        };
        let problem_path = workdir_path.join("problem.json");
        let result_path = workdir_path.join("result.json");
        std::fs::write(
            &problem_path,
            serde_json::to_vec_pretty(&instance.problem_json())?,
        )?;

        let mut command = Command::new(&program);
        command
            .arg(&problem_path)
            .arg(&result_path)
            .args(options.iter().map(|(k, v)| format!("{k}={v}")))
            .stdin(Stdio::null())
            .stderr(Stdio::piped());
        if self.settings.stream_output {
            command.stdout(Stdio::inherit());
        } else {
            command.stdout(Stdio::null());
        }

        tracing::debug!(
            "Running {} on {}",
            program.display(),
            problem_path.display()
        );
        let output = command
            .output()
            .map_err(|e| self.solver_error(format!("failed to start: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.solver_error(format!(
                "exited with {}: {}",
                output.status,
                truncate_str(stderr.trim(), 2000)
            )));
        }

        let content = std::fs::read_to_string(&result_path)
            .map_err(|e| self.solver_error(format!("no result file: {e}")))?;
        let parsed: ResultFile = serde_json::from_str(&content)
            .map_err(|e| self.solver_error(format!("unreadable result file: {e}")))?;

        Ok(SolverResult {
            status: parsed.status,
            termination: parsed.termination,
            solution: parsed.values.map(|values| Solution {
                objective: parsed.objective,
                values,
            }),
            message: parsed.message,
        })
    }
}
