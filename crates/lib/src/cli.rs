use crate::core::linter::linted_file::LintedFile;

/// Sink for progress and result output during a lint/fix run. The linter
/// core only knows about this trait; concrete formatters (plain text,
/// JSON, ...) live with the command-line surface that picks one.
pub trait Formatter: Send + Sync {
    fn dispatch_parse_header(&self, _filename: String) {}

    fn dispatch_file_violations(&self, linted_file: &LintedFile);

    fn completion_message(&self, _count: usize) {}
}
