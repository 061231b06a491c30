// src/cli/args.rs — `solve` argument parsing, options file and passthrough

use std::path::{Path, PathBuf};

use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};

use crate::core::pipeline::RunSettings;
use crate::core::solver::parse_solver_options;
use crate::infra::config::Config;
use crate::infra::errors::SwitchgearError;
use crate::infra::logger;
use crate::modules::resolver::ModuleEdit;

/// Everything `switchgear solve` understands itself. Parsed from the options
/// file tokens followed by the command line, so later values win. Anything
/// else is left for the flags that loaded modules declare.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "switchgear solve", args_override_self = true)]
pub struct SolveArgs {
    /// Module list file (default: ./modules.txt, then <inputs-dir>/modules.txt)
    #[arg(long, value_name = "PATH")]
    pub module_list: Option<PathBuf>,

    /// Add modules to the end of the list
    #[arg(
        long = "include-modules",
        visible_alias = "include-module",
        value_name = "MODULE",
        num_args = 1..,
        action = ArgAction::Append
    )]
    pub include_modules: Vec<String>,

    /// Remove modules from the list
    #[arg(
        long = "exclude-modules",
        visible_alias = "exclude-module",
        value_name = "MODULE",
        num_args = 1..,
        action = ArgAction::Append
    )]
    pub exclude_modules: Vec<String>,

    #[arg(long, value_name = "DIR")]
    pub inputs_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    pub outputs_dir: Option<PathBuf>,

    /// Iteration levels file (default: ./iterate.txt)
    #[arg(long, value_name = "PATH")]
    pub iterate_list: Option<PathBuf>,

    /// Round cap per iteration level
    #[arg(long, value_name = "N")]
    pub max_iter: Option<u32>,

    #[arg(long, value_name = "NAME")]
    pub scenario_name: Option<String>,

    /// Solver program name or path
    #[arg(long, value_name = "NAME")]
    pub solver: Option<String>,

    /// Whitespace-separated key=value options passed to the solver
    #[arg(long, value_name = "OPTIONS", allow_hyphen_values = true)]
    pub solver_options_string: Option<String>,

    /// Keep the solver's temporary files
    #[arg(long)]
    pub keepfiles: bool,

    /// Show the solver's own output
    #[arg(long, visible_alias = "stream-solver")]
    pub stream_output: bool,

    #[arg(long, value_name = "DIR")]
    pub tempdir: Option<PathBuf>,

    /// Write <outputs-dir>/solution.json after solving
    #[arg(long)]
    pub save_solution: bool,

    /// Load <outputs-dir>/solution.json instead of solving
    #[arg(long)]
    pub reload_prior_solution: bool,

    /// Carry on without a loaded solution when the solver returns none
    #[arg(long)]
    pub allow_missing_solution: bool,

    /// Module option, readable from modules during assembly
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        action = ArgAction::Append
    )]
    pub set: Vec<(String, String)>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long)]
    pub quiet: bool,

    /// Also write the log to a timestamped file in --logs-dir
    #[arg(long)]
    pub log_run: bool,

    #[arg(long, value_name = "DIR")]
    pub logs_dir: Option<PathBuf>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// A parsed `solve` invocation plus the facts that depend on argument
/// order.
#[derive(Debug, Clone)]
pub struct ParsedSolve {
    pub args: SolveArgs,
    /// Include/exclude edits in command-line order.
    pub edits: Vec<ModuleEdit>,
    pub log_level: &'static str,
    /// Tokens `solve` does not recognise, in order, for module flags.
    pub module_args: Vec<String>,
}

pub fn parse_solve_args(tokens: &[String]) -> Result<ParsedSolve, clap::Error> {
    let (own, module_args) = split_module_args(tokens);
    let argv = std::iter::once("switchgear solve".to_string()).chain(own);
    let matches = SolveArgs::command().try_get_matches_from(argv)?;
    let args = SolveArgs::from_arg_matches(&matches)?;
    let edits = module_edits(&matches);

    let verbose = if args.verbose && args.quiet {
        cli_index(&matches, "verbose") >= cli_index(&matches, "quiet")
    } else {
        args.verbose
    };
    let log_level = logger::level_for(verbose, args.quiet && !verbose);

    Ok(ParsedSolve {
        args,
        edits,
        log_level,
        module_args,
    })
}

/// Separate the tokens `solve` parses from those meant for module flags,
/// keeping the order on both sides. A recognised flag takes its values with
/// it: one token, or every following non-flag token for multi-value flags.
fn split_module_args(tokens: &[String]) -> (Vec<String>, Vec<String>) {
    let mut command = SolveArgs::command();
    command.build();

    let mut own = Vec::new();
    let mut module_args = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        i += 1;

        let known = if let Some(long) = token.strip_prefix("--") {
            let name = long.split_once('=').map_or(long, |(name, _)| name);
            command.get_arguments().find(|arg| {
                arg.get_long() == Some(name)
                    || arg
                        .get_all_aliases()
                        .is_some_and(|aliases| aliases.contains(&name))
            })
        } else {
            let mut chars = token.strip_prefix('-').unwrap_or_default().chars();
            match (chars.next(), chars.next()) {
                (Some(short), None) => command
                    .get_arguments()
                    .find(|arg| arg.get_short() == Some(short)),
                _ => None,
            }
        };
        let Some(arg) = known else {
            module_args.push(token.clone());
            continue;
        };

        own.push(token.clone());
        if token.contains('=') || !arg.get_action().takes_values() {
            continue;
        }
        let multiple = arg
            .get_num_args()
            .is_some_and(|range| range.max_values() > 1);
        if multiple {
            while i < tokens.len() && !tokens[i].starts_with('-') {
                own.push(tokens[i].clone());
                i += 1;
            }
        } else if i < tokens.len() {
            own.push(tokens[i].clone());
            i += 1;
        }
    }
    (own, module_args)
}

fn cli_index(matches: &ArgMatches, id: &str) -> Option<usize> {
    if matches.value_source(id) != Some(ValueSource::CommandLine) {
        return None;
    }
    matches.indices_of(id).and_then(|indices| indices.last())
}

/// Merge `--include-modules` and `--exclude-modules` values back into one
/// ordered edit list.
fn module_edits(matches: &ArgMatches) -> Vec<ModuleEdit> {
    let mut positioned: Vec<(usize, bool, String)> = Vec::new();
    for (id, include) in [("include_modules", true), ("exclude_modules", false)] {
        if let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        {
            for (index, value) in indices.zip(values) {
                positioned.push((index, include, value.clone()));
            }
        }
    }
    positioned.sort_by_key(|(index, _, _)| *index);

    let mut edits: Vec<ModuleEdit> = Vec::new();
    for (_, include, name) in positioned {
        match (edits.last_mut(), include) {
            (Some(ModuleEdit::Include(names)), true) | (Some(ModuleEdit::Exclude(names)), false) => {
                names.push(name)
            }
            (_, true) => edits.push(ModuleEdit::Include(vec![name])),
            (_, false) => edits.push(ModuleEdit::Exclude(vec![name])),
        }
    }
    edits
}

impl ParsedSolve {
    /// Layer the parsed arguments over the config-file defaults.
    pub fn into_settings(self, config: &Config) -> Result<RunSettings, SwitchgearError> {
        let args = self.args;
        let mut settings = RunSettings::from_config(config);
        settings.module_edits = self.edits;
        settings.module_args = self.module_args;

        if args.module_list.is_some() {
            settings.module_list = args.module_list;
        }
        if let Some(dir) = args.inputs_dir {
            settings.inputs_dir = dir;
        }
        if let Some(dir) = args.outputs_dir {
            settings.outputs_dir = dir;
        }
        settings.iterate_list = args.iterate_list;
        if args.max_iter.is_some() {
            settings.max_iter = args.max_iter;
        }
        settings.scenario_name = args.scenario_name;

        if let Some(name) = args.solver {
            settings.solver.name = name;
        }
        let options_string = args
            .solver_options_string
            .or_else(|| config.solver.options_string.clone());
        if let Some(options) = options_string {
            settings.solver.options = parse_solver_options(&options)?;
        }
        settings.solver.keepfiles |= args.keepfiles;
        settings.solver.stream_output |= args.stream_output;
        if args.tempdir.is_some() {
            settings.solver.tempdir = args.tempdir;
        }

        settings.save_solution = args.save_solution;
        settings.reload_prior_solution = args.reload_prior_solution;
        settings.allow_missing_solution = args.allow_missing_solution;
        settings.module_options = args.set.into_iter().collect();
        Ok(settings)
    }

    /// Run log directory, when `--log-run` asks for one.
    pub fn run_log_dir(&self, config: &Config) -> Option<PathBuf> {
        if !self.args.log_run {
            return None;
        }
        Some(
            self.args
                .logs_dir
                .clone()
                .unwrap_or_else(|| config.paths.logs_dir.clone()),
        )
    }
}

// ---------------------------------------------------------------------------
// Options file
// ---------------------------------------------------------------------------

/// Tokens from `options.txt`: arguments may span several lines, and lines
/// starting with `#` are skipped. A missing file contributes nothing.
pub fn read_option_file(path: &Path) -> Result<Vec<String>, SwitchgearError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut tokens = Vec::new();
    for line in content.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let split = shlex::split(line).ok_or_else(|| {
            SwitchgearError::config(format!(
                "Cannot tokenize line in {}: {line}",
                path.display()
            ))
        })?;
        tokens.extend(split);
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// solve-scenarios manager flags
// ---------------------------------------------------------------------------

/// Flags consumed by `solve-scenarios` itself. Everything else is handed
/// to each scenario's `solve`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerArgs {
    pub scenarios: Vec<String>,
    pub scenario_list: Option<PathBuf>,
    pub scenario_queue: Option<PathBuf>,
    pub job_id: Option<String>,
}

impl ManagerArgs {
    /// `later` wins for single values; scenario names accumulate.
    pub fn merge(mut self, later: ManagerArgs) -> ManagerArgs {
        self.scenarios.extend(later.scenarios);
        self.scenario_list = later.scenario_list.or(self.scenario_list);
        self.scenario_queue = later.scenario_queue.or(self.scenario_queue);
        self.job_id = later.job_id.or(self.job_id);
        self
    }
}

/// Split `tokens` into manager flags and passthrough, keeping the
/// passthrough order untouched.
pub fn partition_manager_args(
    tokens: &[String],
) -> Result<(ManagerArgs, Vec<String>), SwitchgearError> {
    let mut manager = ManagerArgs::default();
    let mut passthrough = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (flag, inline) = match token.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (token, None),
        };

        match flag {
            "--scenario" | "--scenarios" => {
                let mut names = Vec::new();
                if let Some(value) = inline {
                    names.push(value);
                } else {
                    while i + 1 < tokens.len() && !tokens[i + 1].starts_with('-') {
                        i += 1;
                        names.push(tokens[i].clone());
                    }
                }
                if names.is_empty() {
                    return Err(SwitchgearError::config(format!(
                        "{flag} needs at least one scenario name"
                    )));
                }
                manager.scenarios.extend(names);
            }
            "--scenario-list" | "--scenario-queue" | "--job-id" => {
                let value = match inline {
                    Some(value) => value,
                    None => {
                        i += 1;
                        tokens.get(i).cloned().ok_or_else(|| {
                            SwitchgearError::config(format!("{flag} needs a value"))
                        })?
                    }
                };
                match flag {
                    "--scenario-list" => manager.scenario_list = Some(PathBuf::from(value)),
                    "--scenario-queue" => manager.scenario_queue = Some(PathBuf::from(value)),
                    _ => manager.job_id = Some(value),
                }
            }
            _ => passthrough.push(tokens[i].clone()),
        }
        i += 1;
    }
    Ok((manager, passthrough))
}

/// Logging flags as `solve` would read them, for setting up the process
/// logger before any scenario runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFlags {
    pub verbose: bool,
    pub quiet: bool,
    pub log_run: bool,
    pub logs_dir: Option<PathBuf>,
}

impl LogFlags {
    pub fn scan<'a>(tokens: impl IntoIterator<Item = &'a String>) -> Self {
        let mut flags = LogFlags::default();
        let mut iter = tokens.into_iter();
        while let Some(token) = iter.next() {
            match token.as_str() {
                "-v" | "--verbose" => {
                    flags.verbose = true;
                    flags.quiet = false;
                }
                "--quiet" => {
                    flags.quiet = true;
                    flags.verbose = false;
                }
                "--log-run" => flags.log_run = true,
                "--logs-dir" => flags.logs_dir = iter.next().map(PathBuf::from),
                other => {
                    if let Some(dir) = other.strip_prefix("--logs-dir=") {
                        flags.logs_dir = Some(PathBuf::from(dir));
                    }
                }
            }
        }
        flags
    }

    pub fn level(&self) -> &'static str {
        logger::level_for(self.verbose, self.quiet)
    }
}
