use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};
use smol_str::SmolStr;
use sqruff_lib_core::errors::{SQLBaseError, SQLFluffUserError, SQLLintError};
use sqruff_lib_core::helpers;
use sqruff_lib_core::lint_fix::LintFix;
use sqruff_lib_core::parser::segments::base::ErasedSegment;
use sqruff_lib_core::templaters::TemplatedFile;
use walkdir::WalkDir;

use super::linted_dir::LintedDir;
use crate::Formatter;
use crate::core::config::FluffConfig;
use crate::core::linter::common::{ParsedString, RenderedFile};
use crate::core::linter::linted_file::LintedFile;
use crate::core::linter::linting_result::LintingResult;
use crate::core::parser::{lexer, parser};
use crate::core::rules::noqa::IgnoreMask;
use crate::core::rules::{ErasedRule, LintPhase, RulePack};
use crate::rules::get_ruleset;
use crate::templaters::raw::RawTemplater;
use crate::templaters::{TEMPLATERS, Templater};

/// Orchestrates one file (or string) through render -> lex/parse -> fix
/// loop -> source reconstruction.
pub struct Linter {
    config: FluffConfig,
    formatter: Option<Arc<dyn Formatter>>,
    templater: &'static dyn Templater,
    rules: OnceLock<Vec<ErasedRule>>,
    include_parse_errors: bool,
}

impl Linter {
    pub fn new(
        config: FluffConfig,
        formatter: Option<Arc<dyn Formatter>>,
        templater: Option<&'static dyn Templater>,
        include_parse_errors: bool,
    ) -> Linter {
        let templater: &'static dyn Templater = match templater {
            Some(templater) => templater,
            None => Linter::get_templater(&config),
        };
        Linter { config, formatter, templater, rules: OnceLock::new(), include_parse_errors }
    }

    pub fn get_templater(config: &FluffConfig) -> &'static dyn Templater {
        let templater_name = config.get("templater", "core").as_string().map(str::to_owned);
        match templater_name {
            Some(name) => match TEMPLATERS.iter().find(|t| t.name() == name) {
                Some(t) => *t,
                None => panic!("Unknown templater: {}", name),
            },
            None => &RawTemplater,
        }
    }

    /// Lint a string directly, without touching the filesystem.
    pub fn lint_string_wrapped(&mut self, sql: &str, fix: bool) -> LintingResult {
        let filename = "<string input>".to_owned();

        let linted_path = LintedDir::new(filename.clone());
        linted_path.add(self.lint_string(sql, Some(filename), fix));

        let mut result = LintingResult::new();
        result.add(linted_path);
        result
    }

    pub fn parse_string(&self, sql: &str, filename: Option<String>) -> Result<ParsedString, SQLFluffUserError> {
        let f_name = filename.unwrap_or_else(|| "<string>".to_string());

        let rendered = self.render_string(sql, f_name.clone(), &self.config)?;

        if let Some(formatter) = &self.formatter {
            formatter.dispatch_parse_header(f_name.clone());
        }

        Ok(self.parse_rendered(rendered))
    }

    /// Lint a string.
    pub fn lint_string(&self, sql: &str, filename: Option<String>, fix: bool) -> LintedFile {
        let parsed = self.parse_string(sql, filename).unwrap();
        self.lint_parsed(parsed, fix)
    }

    /// `ignorer` returns true for paths that should be skipped.
    pub fn lint_paths(
        &mut self,
        mut paths: Vec<PathBuf>,
        fix: bool,
        ignorer: &(dyn Fn(&Path) -> bool + Send + Sync),
    ) -> LintingResult {
        let mut result = LintingResult::new();

        if paths.is_empty() {
            paths.push(std::env::current_dir().unwrap());
        }

        let mut expanded_paths = Vec::new();
        let mut expanded_path_to_linted_dir = AHashMap::default();

        for path in paths {
            let linted_dir = LintedDir::new(path.display().to_string());
            let key = result.add(linted_dir);

            let paths = if path.is_file() {
                vec![path.to_string_lossy().to_string()]
            } else {
                self.paths_from_path(path, None, None, None, None)
            };

            expanded_paths.reserve(paths.len());
            expanded_path_to_linted_dir.reserve(paths.len());

            for path in paths {
                expanded_paths.push(path.clone());
                expanded_path_to_linted_dir.insert(path, key);
            }
        }

        expanded_paths
            .par_iter()
            .filter(|path| !ignorer(Path::new(path)))
            .map(|path| {
                let rendered = self.render_file(path.clone());
                self.lint_rendered(rendered, fix)
            })
            .for_each(|linted_file| {
                let path = expanded_path_to_linted_dir[&linted_file.path];
                result.paths[path].add(linted_file);
            });

        result
    }

    pub fn get_rulepack(&self) -> RulePack {
        get_ruleset().get_rulepack(&self.config)
    }

    pub fn render_file(&self, fname: String) -> RenderedFile {
        let in_str = std::fs::read_to_string(&fname).unwrap();
        self.render_string(&in_str, fname, &self.config).unwrap()
    }

    pub fn lint_rendered(&self, rendered: RenderedFile, fix: bool) -> LintedFile {
        let parsed = self.parse_rendered(rendered);
        self.lint_parsed(parsed, fix)
    }

    pub fn lint_parsed(&self, parsed_string: ParsedString, fix: bool) -> LintedFile {
        let mut violations = parsed_string.violations;

        let (patches, ignore_mask, initial_linting_errors) =
            parsed_string.tree.map_or((Vec::new(), None, Vec::new()), |erased_segment| {
                let (tree, ignore_mask, initial_linting_errors) =
                    self.lint_fix_parsed(erased_segment, &parsed_string.templated_file, fix);
                let patches = tree.iter_patches(&parsed_string.templated_file);
                (patches, ignore_mask, initial_linting_errors)
            });
        violations.extend(initial_linting_errors.into_iter().map_into());

        let violations = violations
            .into_iter()
            .filter(|violation| ignore_mask.as_ref().is_none_or(|ignore_mask| !ignore_mask.is_masked(violation)))
            .collect();

        let linted_file = LintedFile {
            path: parsed_string.filename,
            patches,
            templated_file: parsed_string.templated_file,
            violations,
            ignore_mask,
        };

        if let Some(formatter) = &self.formatter {
            formatter.dispatch_file_violations(&linted_file);
        }

        linted_file
    }

    /// Run the rule set to a fixed point (or the runaway guard), applying
    /// fixes as it goes when `fix` is set.
    pub fn lint_fix_parsed(
        &self,
        mut tree: ErasedSegment,
        templated_file: &TemplatedFile,
        fix: bool,
    ) -> (ErasedSegment, Option<IgnoreMask>, Vec<SQLLintError>) {
        let mut initial_linting_errors = Vec::new();
        let phases: &[_] = if fix { &[LintPhase::Main, LintPhase::Post] } else { &[LintPhase::Main] };
        let mut previous_versions: AHashSet<SmolStr> = [tree.raw()].into_iter().collect();

        let loop_limit = if fix { 10 } else { 1 };

        let (ignore_mask, violations): (Option<IgnoreMask>, Vec<SQLBaseError>) = {
            let disable_noqa = self.config.get("disable_noqa", "core").as_bool().unwrap_or(false);
            if disable_noqa {
                (None, Vec::new())
            } else {
                let (ignore_mask, errors) = IgnoreMask::from_tree(&tree);
                (Some(ignore_mask), errors)
            }
        };
        initial_linting_errors.extend(violations.into_iter().map_into());

        for phase in phases {
            let all_rules = self.rules();
            let mut rules_this_phase = if phases.len() > 1 {
                all_rules.iter().filter(|rule| rule.lint_phase() == *phase).cloned().collect_vec()
            } else {
                all_rules.to_vec()
            };

            let loop_limit_for_phase = if *phase == LintPhase::Main { loop_limit } else { 2 };
            let mut last_fixes: Option<Vec<LintFix>> = None;
            let mut converged = !fix;

            for loop_ in 0..loop_limit_for_phase {
                let is_first_linter_pass = *phase == phases[0] && loop_ == 0;
                let mut changed = false;

                if is_first_linter_pass {
                    rules_this_phase = all_rules.to_vec();
                }

                for rule in &rules_this_phase {
                    if fix && !is_first_linter_pass && !rule.is_fix_compatible() {
                        continue;
                    }

                    let mut linting_errors = Vec::new();
                    crate::core::rules::crawl(rule, templated_file, tree.clone(), &self.config, &mut |result| {
                        if let Some(error) = result.to_linting_error(rule) {
                            linting_errors.push(error);
                        }
                    });

                    let linting_errors: Vec<SQLLintError> = linting_errors
                        .into_iter()
                        .filter(|error| {
                            !ignore_mask.as_ref().is_some_and(|ignore_mask| ignore_mask.is_masked(error))
                        })
                        .collect();

                    if is_first_linter_pass {
                        initial_linting_errors.extend(linting_errors.clone());
                    }

                    let fixes: Vec<LintFix> =
                        linting_errors.into_iter().flat_map(|linting_error| linting_error.fixes).collect();

                    if fix && !fixes.is_empty() {
                        if last_fixes.as_ref() == Some(&fixes) {
                            log::warn!(
                                "Fix for {} not applied, it would re-apply the same edit set.",
                                rule.code()
                            );
                            continue;
                        }

                        let (new_tree, residual) = tree.apply_fixes(fixes.clone());
                        if !residual.is_empty() {
                            log::warn!(
                                "{} fix(es) for {} could not be applied: anchor not found in the tree; discarding.",
                                residual.len(),
                                rule.code()
                            );
                        }

                        if previous_versions.insert(new_tree.raw()) {
                            tree = new_tree;
                            last_fixes = Some(fixes);
                            changed = true;
                        } else {
                            log::warn!(
                                "Fix for {} not applied, it would re-cause the same error.",
                                rule.code()
                            );
                        }
                    }
                }

                if fix && !changed {
                    converged = true;
                    break;
                }
            }

            if !converged {
                log::warn!(
                    "Loop limit of {loop_limit_for_phase} reached for phase {phase:?} without reaching a fixpoint; some fixes may not have been applied."
                );
            }
        }

        (tree, ignore_mask, initial_linting_errors)
    }

    /// Template the file.
    pub fn render_string(
        &self,
        sql: &str,
        filename: String,
        config: &FluffConfig,
    ) -> Result<RenderedFile, SQLFluffUserError> {
        let sql = Self::normalise_newlines(sql);

        match self.templater.process(sql.as_ref(), filename.as_str(), config, &self.formatter) {
            Ok(templated_file) => {
                Ok(RenderedFile { templated_file, templater_violations: vec![], filename, source_str: sql.to_string() })
            }
            Err(err) => Err(SQLFluffUserError::new(format!(
                "Failed to template file {} with error {:?}",
                filename, err
            ))),
        }
    }

    /// Lex and group a rendered file into a tree.
    pub fn parse_rendered(&self, rendered: RenderedFile) -> ParsedString {
        let mut violations: Vec<SQLBaseError> =
            rendered.templater_violations.clone().into_iter().map_into().collect_vec();

        let (tokens, lex_violations) = lexer::lex(&rendered.templated_file);
        violations.extend(lex_violations.into_iter().map(|e| {
            let mut base = SQLBaseError { fatal: true, description: e.message, ..Default::default() };
            base.set_position_marker(e.position_marker);
            base
        }));

        let tree = if tokens.is_empty() { None } else { Some(parser::parse(tokens)) };

        let _ = self.include_parse_errors; // this tree-builder never produces an unparsable section.

        ParsedString {
            tree,
            violations,
            templated_file: rendered.templated_file,
            filename: rendered.filename,
            source_str: rendered.source_str,
        }
    }

    /// Normalise newlines to unix-style line endings.
    fn normalise_newlines(string: &str) -> Cow<str> {
        lazy_regex::regex!("\r\n|\r").replace_all(string, "\n")
    }

    /// Return the set of sql file paths under a potentially ambiguous path,
    /// honouring `.sqlfluffignore` files in parent directories.
    fn paths_from_path(
        &self,
        path: PathBuf,
        ignore_file_name: Option<String>,
        ignore_non_existent_files: Option<bool>,
        ignore_files: Option<bool>,
        working_path: Option<String>,
    ) -> Vec<String> {
        let ignore_file_name = ignore_file_name.unwrap_or_else(|| String::from(".sqlfluffignore"));
        let ignore_non_existent_files = ignore_non_existent_files.unwrap_or(false);
        let ignore_files = ignore_files.unwrap_or(true);
        let _working_path =
            working_path.unwrap_or_else(|| std::env::current_dir().unwrap().display().to_string());

        let Ok(metadata) = std::fs::metadata(&path) else {
            if ignore_non_existent_files {
                return Vec::new();
            } else {
                panic!("Specified path does not exist. Check it/they exist(s): {:?}", path);
            }
        };

        let is_exact_file = metadata.is_file();

        let path_walk = if is_exact_file {
            let path = Path::new(&path);
            let dirpath = path.parent().unwrap().to_str().unwrap().to_string();
            let files = vec![path.file_name().unwrap().to_str().unwrap().to_string()];
            vec![(dirpath, files)]
        } else {
            WalkDir::new(&path)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| {
                    let dirpath = entry.path().parent().unwrap().to_str().unwrap().to_string();
                    let files = vec![entry.file_name().to_str().unwrap().to_string()];
                    (dirpath, files)
                })
                .collect_vec()
        };

        let mut buffer = Vec::new();
        let mut ignores = AHashMap::new();
        let sql_file_exts = self.config.sql_file_exts();

        for (dirpath, filenames) in path_walk {
            for fname in filenames {
                let fpath = Path::new(&dirpath).join(&fname);

                if ignore_files && fname == ignore_file_name {
                    let file = File::open(&fpath).unwrap();
                    let lines = BufReader::new(file).lines();
                    let spec = lines.map_while(Result::ok);
                    ignores.insert(dirpath.clone(), spec.collect::<Vec<String>>());
                    continue;
                }

                for ext in sql_file_exts {
                    if fname.to_lowercase().ends_with(ext) {
                        buffer.push(fpath.clone());
                    }
                }
            }
        }

        let mut filtered_buffer = AHashSet::new();
        for fpath in buffer {
            let npath = helpers::normalize(&fpath).to_str().unwrap().to_string();
            filtered_buffer.insert(npath);
        }

        let mut files = filtered_buffer.into_iter().collect_vec();
        files.sort();
        files
    }

    pub fn config(&self) -> &FluffConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FluffConfig {
        self.rules = OnceLock::new();
        &mut self.config
    }

    pub fn rules(&self) -> &[ErasedRule] {
        self.rules.get_or_init(|| self.get_rulepack().rules)
    }

    pub fn formatter(&self) -> Option<&Arc<dyn Formatter>> {
        self.formatter.as_ref()
    }

    pub fn formatter_mut(&mut self) -> Option<&mut Arc<dyn Formatter>> {
        self.formatter.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use sqruff_lib_core::helpers;

    use crate::core::config::FluffConfig;
    use crate::core::linter::core::Linter;

    fn normalise_paths(paths: Vec<String>) -> Vec<String> {
        paths.into_iter().map(|path| path.replace(['/', '\\'], ".")).collect()
    }

    #[test]
    fn test_linter_path_from_paths_file() {
        let lntr = Linter::new(FluffConfig::new(<_>::default(), None, None), None, None, false);
        let dir = tempdir::TempDir::new("sqruff-paths").unwrap();
        let file_path = dir.path().join("query.sql");
        std::fs::write(&file_path, "SELECT 1").unwrap();

        let paths = lntr.paths_from_path(file_path.clone(), None, None, None, None);
        assert_eq!(paths, vec![helpers::normalize(&file_path).to_str().unwrap().to_string()]);
    }

    #[test]
    fn test_linter_path_from_paths_exts() {
        let dir = tempdir::TempDir::new("sqruff-paths-exts").unwrap();
        std::fs::write(dir.path().join("a.sql"), "SELECT 1").unwrap();
        std::fs::write(dir.path().join("b.txt"), "SELECT 1").unwrap();

        let config = FluffConfig::new(<_>::default(), None, None).with_sql_file_exts(vec![".txt".into()]);
        let lntr = Linter::new(config, None, None, false);

        let paths = normalise_paths(lntr.paths_from_path(dir.path().to_path_buf(), None, None, None, None));
        assert!(paths.iter().any(|p| p.ends_with("b.txt")));
        assert!(!paths.iter().any(|p| p.ends_with("a.sql")));
    }

    #[test]
    fn test_linter_path_from_paths_nonexistent() {
        let lntr = Linter::new(FluffConfig::new(<_>::default(), None, None), None, None, false);
        let paths = lntr.paths_from_path("does/not/exist.sql".into(), None, Some(true), None, None);
        assert!(paths.is_empty());
    }

    #[test]
    fn test_linter_empty_file() {
        let linter = Linter::new(FluffConfig::new(<_>::default(), None, None), None, None, false);
        let parsed = linter.parse_string("", None).unwrap();

        assert!(parsed.violations.is_empty());
        assert!(parsed.tree.is_none());
    }

    #[test]
    fn test_linter_fix_double_space() {
        let linter = Linter::new(FluffConfig::new(<_>::default(), None, None), None, None, false);
        let result = linter.lint_string("SELECT  1", None, true);
        let fixed = result.fix_string();
        assert_eq!(fixed, "SELECT 1");
    }

    #[test]
    fn test_normalise_newlines() {
        let in_str = "SELECT\r\n foo\n FROM \r \n\r bar;";
        let out_str = "SELECT\n foo\n FROM \n \n\n bar;";

        assert_eq!(Linter::normalise_newlines(in_str), out_str);
    }
}
