use std::path::PathBuf;
use strum_macros::Display;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "sqruff")]
#[command(about = "sqruff is a sql formatter and linter", long_about = None, version=env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Path to a configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Show parse errors.
    #[arg(long, global = true, default_value = "false")]
    pub parsing_errors: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(name = "lint", about = "Lint SQL files via passing a list of files")]
    Lint(LintArgs),
    #[command(name = "fix", about = "Fix SQL files via passing a list of files")]
    Fix(FixArgs),
}

#[derive(Debug, Parser)]
pub struct LintArgs {
    /// Files or directories to lint.
    pub paths: Vec<PathBuf>,
    #[arg(default_value_t, short, long)]
    pub format: Format,
}

#[derive(Debug, Parser)]
pub struct FixArgs {
    /// Files or directories to fix.
    pub paths: Vec<PathBuf>,
    /// Apply fixes without asking for confirmation.
    #[arg(short, long, default_value_t)]
    pub force: bool,
    /// The output format for the results.
    #[arg(default_value_t, short, long)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, ValueEnum, Display, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum Format {
    #[default]
    Human,
    Json,
}
