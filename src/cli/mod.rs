// src/cli/mod.rs — CLI definition (clap derive)

pub mod args;
pub mod scenarios;
pub mod solve;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "switchgear",
    about = "Compose, iterate and solve optimization models built from extension modules",
    version
)]
pub struct Cli {
    /// Config file path (default: ./switchgear.toml or $SWITCHGEAR_CONFIG)
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble and solve one model (`switchgear solve --help` lists the flags)
    #[command(disable_help_flag = true)]
    Solve {
        /// Arguments for the run, read after ./options.txt
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Work through the scenario list, coordinating with other workers
    #[command(disable_help_flag = true)]
    SolveScenarios {
        /// --scenario(s), --scenario-list, --scenario-queue, --job-id; the
        /// rest is passed to every scenario's solve
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}
