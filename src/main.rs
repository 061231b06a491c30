// src/main.rs — Switchgear entry point

use clap::Parser;

use switchgear::cli::{scenarios, solve, Cli, Commands};
use switchgear::infra::config::Config;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no switchgear.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match &cli.command {
        Commands::Solve { args } => solve::run_solve(&config, args),
        Commands::SolveScenarios { args } => scenarios::run_solve_scenarios(&config, args),
    }
}
