// src/cli/scenarios.rs — `switchgear solve-scenarios`

use std::path::Path;

use super::args::{self, LogFlags};
use super::solve;
use crate::infra::config::Config;
use crate::infra::errors::SwitchgearError;
use crate::infra::{logger, paths};
use crate::queue::identity;
use crate::queue::ScenarioQueue;

pub fn run_solve_scenarios(config: &Config, cli_args: &[String]) -> anyhow::Result<()> {
    let option_file = args::read_option_file(Path::new(paths::OPTIONS_FILE))?;
    let (file_manager, file_passthrough) = args::partition_manager_args(&option_file)?;
    let (cli_manager, cli_passthrough) = args::partition_manager_args(cli_args)?;
    let manager = file_manager.merge(cli_manager);

    let log_flags = LogFlags::scan(file_passthrough.iter().chain(cli_passthrough.iter()));
    let logs_dir = log_flags.log_run.then(|| {
        log_flags
            .logs_dir
            .clone()
            .unwrap_or_else(|| config.paths.logs_dir.clone())
    });
    if let Some(path) = logger::init_run_logging(log_flags.level(), logs_dir.as_deref())? {
        tracing::info!("Logging this worker to {}", path.display());
    }

    let list_path = manager
        .scenario_list
        .clone()
        .unwrap_or_else(|| config.queue.scenario_list.clone());
    let queue_dir = manager
        .scenario_queue
        .clone()
        .unwrap_or_else(|| config.queue.scenario_queue.clone());
    let job_id = identity::resolve_job_id(manager.job_id.as_deref());
    tracing::debug!("Worker identity {}", job_id);

    let mut queue = ScenarioQueue::open(list_path, queue_dir, &job_id)?;
    let summary = queue.run(&manager.scenarios, |scenario| {
        let mut tokens = file_passthrough.clone();
        tokens.extend(scenario.solve_args());
        tokens.extend(cli_passthrough.iter().cloned());

        let parsed = args::parse_solve_args(&tokens).map_err(|e| {
            SwitchgearError::config(format!(
                "Scenario '{}': {}",
                scenario.name,
                e.to_string().trim()
            ))
        })?;
        solve::execute(config, parsed).map(|_| ())
    })?;

    tracing::info!(
        "Worker {} finished: {} completed, {} failed, {} skipped",
        job_id,
        summary.completed.len(),
        summary.failed.len(),
        summary.skipped.len()
    );
    if !summary.failed.is_empty() {
        anyhow::bail!(
            "{} scenario(s) failed: {}",
            summary.failed.len(),
            summary.failed.join(", ")
        );
    }
    Ok(())
}
