use std::path::Path;

use crate::check_user_input;
use crate::commands::FixArgs;
use crate::linter;
use sqruff_lib::core::config::FluffConfig;

pub(crate) fn run_fix(
    args: FixArgs,
    config: FluffConfig,
    ignorer: impl Fn(&Path) -> bool + Send + Sync,
    collect_parse_errors: bool,
) -> i32 {
    let FixArgs { paths, force, format } = args;
    let mut linter = linter(config, format, collect_parse_errors);
    let result = linter.lint_paths(paths, true, &ignorer);

    let files: Vec<_> = result.paths.into_iter().flat_map(|dir| dir.files).collect();

    if files.iter().all(|file| file.violations().is_empty()) {
        println!("{} files processed, nothing to fix.", files.len());
        return 0;
    }

    if !force {
        match check_user_input() {
            Some(true) => eprintln!("Attempting fixes..."),
            Some(false) => return 0,
            None => {
                eprintln!("Invalid input, please enter 'Y' or 'N'");
                eprintln!("Aborting...");
                return 0;
            }
        }
    }

    let any_unfixable_errors = files.iter().any(|file| !file.get_violations(Some(false)).is_empty());
    let file_count = files.len();

    for file in files {
        let path = file.path().to_string();
        let write_buff = file.fix_string();
        std::fs::write(path, write_buff).unwrap();
    }

    linter.formatter().unwrap().completion_message(file_count);

    if any_unfixable_errors { 1 } else { 0 }
}
