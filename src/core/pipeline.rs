// src/core/pipeline.rs — One model run, from module list to post-solve hooks

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use super::controller::{load_prior_solution, SolveController, SolveControllerConfig, SolveReport};
use super::iterate::{IterationController, IterationPlan, LevelReport, MAX_ITERATION_DEPTH};
use super::solver::{Solver, SolverSettings};
use crate::infra::config::Config;
use crate::infra::errors::SwitchgearError;
use crate::infra::paths;
use crate::model::assembler::assemble;
use crate::model::checks;
use crate::model::data::DataLoader;
use crate::model::instance::ModelInstance;
use crate::modules::arguments;
use crate::modules::loader::ModuleCatalog;
use crate::modules::resolver::{self, ModuleEdit};

/// Everything one model run needs, after config, options file and command
/// line have been merged.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub module_list: Option<PathBuf>,
    pub module_edits: Vec<ModuleEdit>,
    pub script_dirs: Vec<PathBuf>,
    pub inputs_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub iterate_list: Option<PathBuf>,
    pub max_iter: Option<u32>,
    pub max_depth: usize,
    pub scenario_name: Option<String>,
    pub solver: SolverSettings,
    pub save_solution: bool,
    pub reload_prior_solution: bool,
    pub allow_missing_solution: bool,
    /// `--set KEY=VALUE` pairs, readable by modules during assembly.
    pub module_options: BTreeMap<String, String>,
    /// Tokens for the flags modules declare, parsed once they are loaded.
    pub module_args: Vec<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            module_list: config.modules.module_list.clone(),
            module_edits: Vec::new(),
            script_dirs: config.modules.script_dirs.clone(),
            inputs_dir: config.paths.inputs_dir.clone(),
            outputs_dir: config.paths.outputs_dir.clone(),
            iterate_list: None,
            max_iter: config.iteration.max_iter,
            max_depth: config.iteration.max_depth,
            scenario_name: None,
            solver: SolverSettings {
                name: config.solver.name.clone(),
                options: BTreeMap::new(),
                keepfiles: config.solver.keepfiles,
                tempdir: config.solver.tempdir.clone(),
                stream_output: config.solver.stream_output,
            },
            save_solution: false,
            reload_prior_solution: false,
            allow_missing_solution: false,
            module_options: BTreeMap::new(),
            module_args: Vec::new(),
        }
    }

    /// Configured script directories followed by the defaults.
    pub fn all_script_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.script_dirs.clone();
        for dir in paths::default_script_dirs(&self.inputs_dir) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    fn iteration_plan(&self) -> Result<IterationPlan, SwitchgearError> {
        match &self.iterate_list {
            Some(path) => IterationPlan::load(path, true),
            None => IterationPlan::load(&PathBuf::from(paths::ITERATE_LIST_FILE), false),
        }
    }
}

/// What a finished run reports back.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub scenario_name: Option<String>,
    pub modules: Vec<String>,
    pub solves: Vec<SolveReport>,
    pub levels: Vec<LevelReport>,
    pub reloaded: bool,
    pub elapsed_secs: f64,
}

/// resolve → load → module flags → assemble → load data → validate →
/// pre_solve → iterate/solve (or reload) → post_solve.
pub fn run_model(
    settings: &RunSettings,
    catalog: &ModuleCatalog,
    loader: &dyn DataLoader,
    solver: &mut dyn Solver,
) -> Result<RunSummary, SwitchgearError> {
    let started = Instant::now();
    if let Some(name) = &settings.scenario_name {
        tracing::info!("Running scenario '{}'", name);
    }

    let base = resolver::read_base_list(settings.module_list.as_deref(), &settings.inputs_dir)?;
    let names = resolver::resolve(&base, &settings.module_edits)?;
    let mut modules = catalog.load(&names)?;

    let mut module_options = arguments::parse_module_arguments(&modules, &settings.module_args)?;
    module_options.extend(settings.module_options.clone());

    let max_depth = if settings.max_depth == 0 {
        MAX_ITERATION_DEPTH
    } else {
        settings.max_depth
    };
    let levels = settings.iteration_plan()?.bind(&modules, max_depth)?;

    let model = assemble(&mut modules, module_options)?;
    let data = loader.load(&model)?;
    checks::validate(&model, &data)?;

    paths::ensure_dir(&settings.outputs_dir)?;
    let mut instance = ModelInstance::new(model, data, &settings.outputs_dir)
        .with_scenario(settings.scenario_name.clone());

    for module in modules.iter_mut() {
        module.pre_solve(&mut instance)?;
    }

    let mut solves = Vec::new();
    let mut level_reports = Vec::new();
    if settings.reload_prior_solution {
        instance.solution = Some(load_prior_solution(&settings.outputs_dir)?);
        tracing::info!(
            "Reloaded prior solution from {}",
            settings.outputs_dir.display()
        );
    } else {
        let mut controller = SolveController::new(
            solver,
            settings.solver.options.clone(),
            SolveControllerConfig {
                outputs_dir: settings.outputs_dir.clone(),
                save_solution: settings.save_solution,
                allow_missing_solution: settings.allow_missing_solution,
            },
        );
        let mut iteration = IterationController::new(levels, settings.max_iter);
        iteration.run(&mut modules, &mut instance, &mut |inst| {
            solves.push(controller.solve_feasible(inst)?);
            Ok(())
        })?;
        level_reports = iteration.into_reports();
    }

    for module in modules.iter_mut() {
        module.post_solve(&mut instance)?;
    }

    let elapsed_secs = started.elapsed().as_secs_f64();
    tracing::info!(
        "Run finished in {:.2}s ({} solves)",
        elapsed_secs,
        solves.len()
    );
    Ok(RunSummary {
        scenario_name: settings.scenario_name.clone(),
        modules: modules.names(),
        solves,
        levels: level_reports,
        reloaded: settings.reload_prior_solution,
        elapsed_secs,
    })
}
