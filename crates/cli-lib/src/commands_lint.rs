use std::path::Path;

use crate::commands::LintArgs;

pub(crate) fn run_lint(
    args: LintArgs,
    config: sqruff_lib::core::config::FluffConfig,
    ignorer: impl Fn(&Path) -> bool + Send + Sync,
    collect_parse_errors: bool,
) -> i32 {
    let LintArgs { paths, format } = args;

    let mut linter = crate::linter(config, format, collect_parse_errors);
    let result = linter.lint_paths(paths, false, &ignorer);

    let file_count = result.paths.iter().map(|dir| dir.files.len()).sum();
    let has_violations =
        result.paths.iter().any(|dir| dir.files.iter().any(|file| !file.violations().is_empty()));

    linter.formatter().unwrap().completion_message(file_count);

    has_violations as i32
}
