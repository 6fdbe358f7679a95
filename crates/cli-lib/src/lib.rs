use std::path::Path;
use std::sync::Arc;

use clap::Parser as _;
use commands::Format;
use sqruff_lib::core::linter::core::Linter;
use sqruff_lib::{Formatter, core::config::FluffConfig};

use crate::commands::{Cli, Commands};
use crate::formatters::OutputStreamFormatter;
use crate::formatters::json::JsonFormatter;

pub mod commands;
mod commands_fix;
mod commands_lint;
mod formatters;
mod ignore;
mod logger;

pub fn run_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let _ = logger::init();
    let cli = Cli::parse_from(args);
    let collect_parse_errors = cli.parsing_errors;

    let config: FluffConfig = if let Some(config) = cli.config.as_ref() {
        if !Path::new(config).is_file() {
            eprintln!("The specified config file '{config}' does not exist.");
            std::process::exit(1);
        };
        FluffConfig::from_file(Path::new(config))
    } else {
        // Load a base config from cwd ancestors. Per-file config resolution
        // happens inside the Linter during lint_paths.
        FluffConfig::from_root(None, false, None).unwrap()
    };

    let current_path = std::env::current_dir().unwrap();
    let ignore_file = ignore::IgnoreFile::new_from_root(&current_path).unwrap();
    let ignore_file = Arc::new(ignore_file);
    let ignorer = {
        let ignore_file = Arc::clone(&ignore_file);
        move |path: &Path| ignore_file.is_ignored(path)
    };

    match cli.command {
        Commands::Lint(args) => commands_lint::run_lint(args, config, ignorer, collect_parse_errors),
        Commands::Fix(args) => commands_fix::run_fix(args, config, ignorer, collect_parse_errors),
    }
}

pub(crate) fn linter(config: FluffConfig, format: Format, collect_parse_errors: bool) -> Linter {
    let formatter: Arc<dyn Formatter> = match format {
        Format::Human => {
            let output_stream = std::io::stderr().into();
            let formatter = OutputStreamFormatter::new(
                output_stream,
                config.get("nocolor", "core").as_bool().unwrap_or_default(),
                config.get("verbose", "core").as_int().unwrap_or_default(),
            );
            Arc::new(formatter)
        }
        Format::Json => Arc::new(JsonFormatter::default()),
    };

    Linter::new(config, Some(formatter), None, collect_parse_errors)
}

pub(crate) fn check_user_input() -> Option<bool> {
    eprint!("Are you sure you wish to attempt to fix these? [Y/n] ");
    let mut buf = String::new();
    std::io::stdin().read_line(&mut buf).ok()?;
    match buf.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
