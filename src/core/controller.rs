// src/core/controller.rs — Solve controller: run the solver once and classify

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::solver::{Solver, SolverOptions, SolverResult};
use crate::infra::errors::SwitchgearError;
use crate::infra::paths;
use crate::model::component::ComponentKind;
use crate::model::context::AbstractModel;
use crate::model::instance::{ModelInstance, Solution};

const OPTIMAL_TERMINATIONS: &[&str] = &["optimal", "locallyoptimal", "globallyoptimal"];
const INFEASIBLE_TERMINATIONS: &[&str] = &["infeasible", "infeasibleorunbounded"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveOutcome {
    Solved,
    /// A non-fatal solver issue (time or iteration limit, ...); values are usable.
    SolvedWithWarnings,
    /// Proven to have no feasible solution.
    Infeasible,
    /// The solver returned without anything retrievable.
    NoSolutionReturned,
}

impl SolveOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solved => "solved",
            Self::SolvedWithWarnings => "solved_with_warnings",
            Self::Infeasible => "infeasible",
            Self::NoSolutionReturned => "no_solution_returned",
        }
    }

    pub fn has_solution(&self) -> bool {
        matches!(self, Self::Solved | Self::SolvedWithWarnings)
    }
}

impl std::fmt::Display for SolveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata about one solve; written to `solver_status.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub solver: String,
    pub outcome: SolveOutcome,
    pub status: String,
    pub termination: String,
    pub iteration_node: Vec<u32>,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

fn normalize(term: &str) -> String {
    term.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Values are retrievable only if the solver reported a solution with at
/// least one value for every variable in the model.
fn retrievable(model: &AbstractModel, solution: Option<&Solution>) -> bool {
    let Some(solution) = solution else {
        return false;
    };
    model
        .components_of(ComponentKind::Var)
        .all(|var| solution.has_values_for(&var.name))
}

/// Map a raw solver result onto exactly one outcome.
pub fn classify(model: &AbstractModel, result: &SolverResult) -> SolveOutcome {
    let termination = normalize(&result.termination);
    if INFEASIBLE_TERMINATIONS.contains(&termination.as_str()) {
        return SolveOutcome::Infeasible;
    }
    if !retrievable(model, result.solution.as_ref()) {
        return SolveOutcome::NoSolutionReturned;
    }
    if normalize(&result.status) == "ok" && OPTIMAL_TERMINATIONS.contains(&termination.as_str()) {
        SolveOutcome::Solved
    } else {
        SolveOutcome::SolvedWithWarnings
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolveControllerConfig {
    pub outputs_dir: PathBuf,
    pub save_solution: bool,
    /// Keep going without a loaded solution when none is returned.
    pub allow_missing_solution: bool,
}

/// Runs the solver on an instance, installs the solution and records the
/// outcome.
pub struct SolveController<'a> {
    solver: &'a mut dyn Solver,
    options: SolverOptions,
    config: SolveControllerConfig,
    solve_count: usize,
}

impl<'a> SolveController<'a> {
    pub fn new(solver: &'a mut dyn Solver, options: SolverOptions, config: SolveControllerConfig) -> Self {
        Self {
            solver,
            options,
            config,
            solve_count: 0,
        }
    }

    pub fn solve_count(&self) -> usize {
        self.solve_count
    }

    /// Solve once and classify. Only a missing solution (without the
    /// diagnostic opt-in) is an error here; infeasibility is reported as an
    /// outcome.
    pub fn solve(&mut self, instance: &mut ModelInstance) -> Result<SolveReport, SwitchgearError> {
        let solver_name = self.solver.name();
        tracing::info!(
            "Solving model with {} (iteration node [{}])",
            solver_name,
            instance.node_label()
        );

        let started = Instant::now();
        let result = self.solver.solve(instance, &self.options)?;
        let elapsed_secs = started.elapsed().as_secs_f64();
        self.solve_count += 1;

        let outcome = classify(&instance.model, &result);
        let report = SolveReport {
            solver: solver_name,
            outcome,
            status: result.status.clone(),
            termination: result.termination.clone(),
            iteration_node: instance.iteration_node.clone(),
            elapsed_secs,
            message: result.message.clone(),
            finished_at: chrono::Utc::now(),
        };
        write_status(&self.config.outputs_dir, &report)?;

        match outcome {
            SolveOutcome::Solved => {
                tracing::info!("Solved in {:.2}s", elapsed_secs);
            }
            SolveOutcome::SolvedWithWarnings => {
                tracing::warn!(
                    "Solver finished with status '{}', termination '{}'; using the values it returned",
                    report.status,
                    report.termination
                );
            }
            SolveOutcome::Infeasible => {
                tracing::warn!("Model is infeasible (termination '{}')", report.termination);
                instance.solution = None;
                return Ok(report);
            }
            SolveOutcome::NoSolutionReturned => {
                instance.solution = None;
                if self.config.allow_missing_solution {
                    tracing::warn!(
                        "No solution returned (status '{}', termination '{}'); continuing without a loaded solution",
                        report.status,
                        report.termination
                    );
                    return Ok(report);
                }
                return Err(SwitchgearError::NoSolution {
                    status: report.status,
                    termination: report.termination,
                });
            }
        }

        instance.solution = result.solution;
        if self.config.save_solution {
            if let Some(solution) = &instance.solution {
                save_solution(&self.config.outputs_dir, solution)?;
            }
        }
        Ok(report)
    }

    /// Like `solve`, but an infeasible model is an error.
    pub fn solve_feasible(
        &mut self,
        instance: &mut ModelInstance,
    ) -> Result<SolveReport, SwitchgearError> {
        let report = self.solve(instance)?;
        if report.outcome == SolveOutcome::Infeasible {
            return Err(SwitchgearError::Infeasible {
                solver: report.solver,
                termination: report.termination,
            });
        }
        Ok(report)
    }
}

fn write_status(outputs_dir: &Path, report: &SolveReport) -> Result<(), SwitchgearError> {
    paths::ensure_dir(outputs_dir)?;
    let path = outputs_dir.join(paths::SOLVER_STATUS_FILE);
    std::fs::write(&path, serde_json::to_vec_pretty(report)?)?;
    Ok(())
}

pub fn save_solution(outputs_dir: &Path, solution: &Solution) -> Result<(), SwitchgearError> {
    paths::ensure_dir(outputs_dir)?;
    let path = outputs_dir.join(paths::SOLUTION_FILE);
    std::fs::write(&path, serde_json::to_vec_pretty(solution)?)?;
    tracing::info!("Saved solution to {}", path.display());
    Ok(())
}

/// Read a solution saved by an earlier `--save-solution` run.
pub fn load_prior_solution(outputs_dir: &Path) -> Result<Solution, SwitchgearError> {
    let path = outputs_dir.join(paths::SOLUTION_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        SwitchgearError::config(format!(
            "Cannot reload prior solution from {}: {e}",
            path.display()
        ))
    })?;
    Ok(serde_json::from_str(&content)?)
}
