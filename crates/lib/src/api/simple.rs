use std::sync::Arc;

use ahash::AHashMap;
use sqruff_lib_core::errors::{SQLBaseError, SQLFluffUserError};

use crate::Formatter;
use crate::core::config::FluffConfig;
use crate::core::linter::core::Linter;

/// Build a config for the simple API: start from whatever `.sqruff`/
/// `.sqlfluff` files surround the working directory, then layer an
/// explicit `rule_allowlist`/`rule_denylist` override on top.
pub fn get_simple_config(
    rules: Option<Vec<String>>,
    exclude_rules: Option<Vec<String>>,
    config_path: Option<String>,
) -> Result<FluffConfig, SQLFluffUserError> {
    let mut overrides = AHashMap::new();
    if let Some(rules) = rules {
        overrides.insert("rule_allowlist".to_owned(), rules.join(","));
    }
    if let Some(exclude_rules) = exclude_rules {
        overrides.insert("rule_denylist".to_owned(), exclude_rules.join(","));
    }
    FluffConfig::from_root(config_path, true, Some(overrides))
        .map_err(|err| SQLFluffUserError::new(format!("Error loading config: {:?}", err)))
}

/// Lint a SQL string, returning every surviving violation.
pub fn lint(
    sql: &str,
    rules: Option<Vec<String>>,
    exclude_rules: Option<Vec<String>>,
    config_path: Option<String>,
) -> Result<Vec<SQLBaseError>, SQLFluffUserError> {
    lint_with_formatter(sql, rules, exclude_rules, config_path, None)
}

pub fn lint_with_formatter(
    sql: &str,
    rules: Option<Vec<String>>,
    exclude_rules: Option<Vec<String>>,
    config_path: Option<String>,
    formatter: Option<Arc<dyn Formatter>>,
) -> Result<Vec<SQLBaseError>, SQLFluffUserError> {
    let cfg = get_simple_config(rules, exclude_rules, config_path)?;
    let linter = Linter::new(cfg, formatter, None, false);
    let linted_file = linter.lint_string(sql, None, false);
    Ok(linted_file.violations)
}

/// Lint and fix a SQL string, returning the fixed source.
pub fn fix(
    sql: &str,
    rules: Option<Vec<String>>,
    exclude_rules: Option<Vec<String>>,
    config_path: Option<String>,
) -> Result<String, SQLFluffUserError> {
    let cfg = get_simple_config(rules, exclude_rules, config_path)?;
    let linter = Linter::new(cfg, None, None, false);
    let linted_file = linter.lint_string(sql, None, true);
    Ok(linted_file.fix_string())
}

#[cfg(test)]
mod tests {
    use super::fix;

    const MY_BAD_QUERY: &str = "SeLEct  1";

    #[test]
    fn simple_api_fixes_double_space() {
        let sql = fix("SELECT  1", None, None, None).unwrap();
        assert_eq!(sql, "SELECT 1");
    }

    #[test]
    fn simple_api_restricts_to_named_rules() {
        let sql = fix(MY_BAD_QUERY, Some(vec!["L001".to_string()]), None, None).unwrap();
        assert_eq!(sql, "SeLEct 1");
    }

    #[test]
    fn simple_api_applies_capitalisation_rule() {
        let sql = fix(MY_BAD_QUERY, Some(vec!["CP01".to_string()]), None, None).unwrap();
        assert_eq!(sql, "SELECT  1");
    }
}
