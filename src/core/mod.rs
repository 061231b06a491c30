// src/core/mod.rs — Solve, iterate and run orchestration

pub mod controller;
pub mod iterate;
pub mod pipeline;
pub mod solver;

pub use controller::{SolveController, SolveOutcome, SolveReport};
pub use iterate::{IterationContext, IterationController, IterationPlan};
pub use pipeline::{run_model, RunSettings, RunSummary};
pub use solver::{CommandSolver, Solver, SolverResult, SolverSettings};
