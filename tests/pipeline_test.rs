// tests/pipeline_test.rs — Integration test: full run with a stub solver

use std::collections::BTreeMap;
use std::path::Path;

use pretty_assertions::assert_eq;

use switchgear::cli::args::parse_solve_args;
use switchgear::core::pipeline::{run_model, RunSettings};
use switchgear::core::solver::{Solver, SolverOptions, SolverResult};
use switchgear::core::SolveOutcome;
use switchgear::infra::config::Config;
use switchgear::infra::errors::SwitchgearError;
use switchgear::model::{JsonDataLoader, ModelInstance, Solution};
use switchgear::modules::ModuleCatalog;
use switchgear::queue::ScenarioDescriptor;

/// Answers every solve with the same termination and, when `values` is
/// set, a solution built from the current data.
struct StubSolver {
    termination: &'static str,
    values: bool,
    calls: usize,
}

impl StubSolver {
    fn optimal() -> Self {
        Self {
            termination: "optimal",
            values: true,
            calls: 0,
        }
    }
}

impl Solver for StubSolver {
    fn name(&self) -> String {
        "stub".into()
    }

    fn solve(
        &mut self,
        instance: &ModelInstance,
        _options: &SolverOptions,
    ) -> Result<SolverResult, SwitchgearError> {
        self.calls += 1;
        let solution = self.values.then(|| {
            let mut values = BTreeMap::new();
            for gen in instance.data.set_members("GENS") {
                values.insert(format!("output[{gen}]"), 1.0);
            }
            Solution {
                objective: instance.data.param("cost", Some("g1")),
                values,
            }
        });
        Ok(SolverResult {
            status: "ok".into(),
            termination: self.termination.into(),
            solution,
            message: None,
        })
    }
}

const GENERATORS: &str = r#"
fn prerequisites() { ["objective"] }

fn declare_components(model) {
    model.add_set("GENS");
    model.add_param("cost", #{ index: "GENS" });
    model.add_var("output", #{ index: "GENS" });
    model.add_expression("gen_cost", ["output", "cost"]);
    model.register("objective_terms", "gen_cost");
    model.require_data("cost");
}

// Raise g1's cost until the second solve, then agree.
fn post_iterate(instance) {
    let cost = instance.param("cost", "g1");
    instance.set_param("cost", "g1", cost + 1.0);
    instance.round() >= 1
}
"#;

fn setup(dir: &Path, data: &str, iterate: &str) -> RunSettings {
    std::fs::create_dir_all(dir.join("inputs/modules")).unwrap();
    std::fs::write(dir.join("inputs/modules/generators.rhai"), GENERATORS).unwrap();
    std::fs::write(dir.join("inputs/data.json"), data).unwrap();
    std::fs::write(dir.join("modules.txt"), "objective\ngenerators\n").unwrap();
    std::fs::write(dir.join("iterate.txt"), iterate).unwrap();
    RunSettings {
        module_list: Some(dir.join("modules.txt")),
        inputs_dir: dir.join("inputs"),
        outputs_dir: dir.join("outputs"),
        iterate_list: Some(dir.join("iterate.txt")),
        scenario_name: Some("base".into()),
        save_solution: true,
        ..RunSettings::default()
    }
}

fn catalog(settings: &RunSettings) -> ModuleCatalog {
    ModuleCatalog::new(settings.all_script_dirs())
}

const DATA: &str = r#"{"GENS": ["g1", "g2"], "cost": {"g1": 10.0, "g2": 20.0}}"#;

#[test]
fn test_iterated_run_solves_until_module_converges() {
    let dir = tempfile::tempdir().unwrap();
    let settings = setup(dir.path(), DATA, "generators\n");
    let mut solver = StubSolver::optimal();

    let summary = run_model(
        &settings,
        &catalog(&settings),
        &JsonDataLoader::new(&settings.inputs_dir),
        &mut solver,
    )
    .unwrap();

    assert_eq!(solver.calls, 2);
    assert_eq!(summary.modules, vec!["objective", "generators"]);
    let nodes: Vec<Vec<u32>> = summary.solves.iter().map(|s| s.iteration_node.clone()).collect();
    assert_eq!(nodes, vec![vec![0], vec![1]]);
    assert!(summary.solves.iter().all(|s| s.outcome == SolveOutcome::Solved));
    assert_eq!(summary.levels.len(), 1);
    assert!(summary.levels[0].converged);

    // The second solve saw the cost raised by the first round.
    let saved: Solution = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("outputs/solution.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(saved.objective, Some(11.0));
    assert!(dir.path().join("outputs/solver_status.json").exists());
}

#[test]
fn test_missing_indexed_data_fails_before_solving() {
    let dir = tempfile::tempdir().unwrap();
    let settings = setup(
        dir.path(),
        r#"{"GENS": ["g1", "g2", "g3"], "cost": {"g1": 10.0}}"#,
        "",
    );
    let mut solver = StubSolver::optimal();

    let err = run_model(
        &settings,
        &catalog(&settings),
        &JsonDataLoader::new(&settings.inputs_dir),
        &mut solver,
    )
    .unwrap_err();

    assert_eq!(solver.calls, 0);
    assert!(err.terminates_run());
    match err {
        SwitchgearError::MissingData { component, total, sample, .. } => {
            assert_eq!(component, "cost");
            assert_eq!(total, 2);
            assert_eq!(sample, vec!["g2", "g3"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_infeasible_is_scenario_failure() {
    let dir = tempfile::tempdir().unwrap();
    let settings = setup(dir.path(), DATA, "");
    let mut solver = StubSolver {
        termination: "infeasible",
        values: false,
        calls: 0,
    };

    let err = run_model(
        &settings,
        &catalog(&settings),
        &JsonDataLoader::new(&settings.inputs_dir),
        &mut solver,
    )
    .unwrap_err();
    assert!(matches!(err, SwitchgearError::Infeasible { .. }));
    assert!(!err.terminates_run());
}

#[test]
fn test_missing_solution_allowed_for_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let settings = RunSettings {
        allow_missing_solution: true,
        ..setup(dir.path(), DATA, "")
    };
    let mut solver = StubSolver {
        termination: "maxTimeLimit",
        values: false,
        calls: 0,
    };

    let summary = run_model(
        &settings,
        &catalog(&settings),
        &JsonDataLoader::new(&settings.inputs_dir),
        &mut solver,
    )
    .unwrap();
    assert_eq!(summary.solves[0].outcome, SolveOutcome::NoSolutionReturned);

    let strict = RunSettings {
        allow_missing_solution: false,
        ..settings
    };
    let err = run_model(
        &strict,
        &catalog(&strict),
        &JsonDataLoader::new(&strict.inputs_dir),
        &mut solver,
    )
    .unwrap_err();
    assert!(matches!(err, SwitchgearError::NoSolution { .. }));
}

const PRICING: &str = r#"
fn declare_arguments(args) {
    args.declare_argument("carbon-price", #{ help: "Carbon price per tonne", "default": 0 });
}

fn declare_components(model) {
    model.add_param("carbon_price", #{ "default": parse_float(model.option("carbon-price")) });
}
"#;

/// Records what the assembled model looked like when it reached the solver.
#[derive(Default)]
struct ModelSpy {
    carbon_price: Option<f64>,
    scenario: Option<String>,
}

impl Solver for ModelSpy {
    fn name(&self) -> String {
        "spy".into()
    }

    fn solve(
        &mut self,
        instance: &ModelInstance,
        _options: &SolverOptions,
    ) -> Result<SolverResult, SwitchgearError> {
        self.carbon_price = instance
            .model
            .component("carbon_price")
            .and_then(|c| c.default);
        self.scenario = instance.scenario_name.clone();
        Ok(SolverResult {
            status: "ok".into(),
            termination: "optimal".into(),
            solution: Some(Solution::default()),
            message: None,
        })
    }
}

#[test]
fn test_scenario_line_carries_module_flag() {
    let dir = tempfile::tempdir().unwrap();
    let paths = setup(dir.path(), DATA, "");
    std::fs::write(dir.path().join("inputs/modules/pricing.rhai"), PRICING).unwrap();
    std::fs::write(dir.path().join("modules.txt"), "objective\ngenerators\npricing\n").unwrap();

    let scenario = ScenarioDescriptor::parse("high_carbon --carbon-price 40 --max-iter 3").unwrap();
    let parsed = parse_solve_args(&scenario.solve_args()).unwrap();
    assert_eq!(parsed.module_args, vec!["--carbon-price", "40"]);
    assert_eq!(parsed.args.max_iter, Some(3));

    let settings = RunSettings {
        module_list: paths.module_list.clone(),
        inputs_dir: paths.inputs_dir.clone(),
        outputs_dir: paths.outputs_dir.clone(),
        iterate_list: paths.iterate_list.clone(),
        ..parsed.into_settings(&Config::default()).unwrap()
    };
    let mut solver = ModelSpy::default();
    run_model(
        &settings,
        &catalog(&settings),
        &JsonDataLoader::new(&settings.inputs_dir),
        &mut solver,
    )
    .unwrap();
    assert_eq!(solver.carbon_price, Some(40.0));
    assert_eq!(solver.scenario.as_deref(), Some("high_carbon"));

    // Without the flag the declared default applies.
    let mut defaults = ModelSpy::default();
    let settings = RunSettings {
        module_args: Vec::new(),
        ..settings
    };
    run_model(
        &settings,
        &catalog(&settings),
        &JsonDataLoader::new(&settings.inputs_dir),
        &mut defaults,
    )
    .unwrap();
    assert_eq!(defaults.carbon_price, Some(0.0));
}
