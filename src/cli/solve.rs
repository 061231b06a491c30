// src/cli/solve.rs — `switchgear solve`

use std::path::Path;

use super::args::{self, ParsedSolve};
use crate::core::pipeline::{run_model, RunSummary};
use crate::core::solver::CommandSolver;
use crate::infra::config::Config;
use crate::infra::errors::SwitchgearError;
use crate::infra::{logger, paths};
use crate::model::data::JsonDataLoader;
use crate::modules::loader::ModuleCatalog;

pub fn run_solve(config: &Config, cli_args: &[String]) -> anyhow::Result<()> {
    let mut tokens = args::read_option_file(Path::new(paths::OPTIONS_FILE))?;
    tokens.extend(cli_args.iter().cloned());

    let parsed = match args::parse_solve_args(&tokens) {
        Ok(parsed) => parsed,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => return Err(SwitchgearError::config(e.to_string().trim()).into()),
    };

    if let Some(path) = logger::init_run_logging(parsed.log_level, parsed.run_log_dir(config).as_deref())? {
        tracing::info!("Logging this run to {}", path.display());
    }

    let summary = execute(config, parsed)?;
    print_summary(&summary);
    Ok(())
}

/// Build settings from a parsed invocation and run the model with the
/// default catalog, JSON data loader and command-line solver.
pub fn execute(config: &Config, parsed: ParsedSolve) -> Result<RunSummary, SwitchgearError> {
    let settings = parsed.into_settings(config)?;
    let catalog = ModuleCatalog::new(settings.all_script_dirs());
    let loader = JsonDataLoader::new(&settings.inputs_dir);
    let mut solver = CommandSolver::new(settings.solver.clone());
    run_model(&settings, &catalog, &loader, &mut solver)
}

fn print_summary(summary: &RunSummary) {
    if let Some(name) = &summary.scenario_name {
        println!("Scenario: {name}");
    }
    println!("Modules:  {}", summary.modules.join(", "));
    if summary.reloaded {
        println!("Solution: reloaded from prior run");
    }
    for report in &summary.solves {
        let node: Vec<String> = report.iteration_node.iter().map(u32::to_string).collect();
        println!(
            "Solve [{}]: {} ({}/{}) in {:.2}s",
            node.join(","),
            report.outcome,
            report.status,
            report.termination,
            report.elapsed_secs
        );
    }
    for level in &summary.levels {
        if !level.converged {
            println!(
                "Level {} under [{}] stopped after {} rounds without converging",
                level.level,
                level
                    .parent_node
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(","),
                level.rounds
            );
        }
    }
    println!("Elapsed:  {:.2}s", summary.elapsed_secs);
}
