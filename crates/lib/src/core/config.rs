use std::path::Path;
use std::str::FromStr;

use ahash::AHashMap;
use configparser::ini::Ini;
use sqruff_lib_core::value::Value;

pub use sqruff_lib_core::value::Value as ConfigValue;

/// Runtime configuration, structured the way `.sqruff`/`.sqlfluff` files
/// are: a tree of sections (`core`, `rules`, per-rule subsections) each
/// holding key/value pairs. Kept as a generic [`Value`] tree rather than
/// a typed struct so that rule-specific keys (unknown to the core) round
/// trip without every rule needing a hand-written deserializer.
#[derive(Debug, Clone)]
pub struct FluffConfig {
    sections: AHashMap<String, Value>,
    sql_file_exts: Vec<String>,
}

fn default_sections() -> AHashMap<String, Value> {
    let mut sections = AHashMap::new();
    sections.insert("core".to_string(), Value::Map(Default::default()));
    sections.insert("rules".to_string(), Value::Map(Default::default()));
    sections
}

impl Default for FluffConfig {
    fn default() -> Self {
        Self { sections: default_sections(), sql_file_exts: default_sql_file_exts() }
    }
}

fn default_sql_file_exts() -> Vec<String> {
    vec![".sql".to_string(), ".sql.j2".to_string(), ".dml".to_string(), ".ddl".to_string()]
}

/// Normalises the two accepted section-header spellings (`sqruff`/`sqlfluff`)
/// down to `core`, and strips the shared `sqruff:`/`sqlfluff:` prefix off
/// nested sections (e.g. `sqruff:rules:AL02` -> `rules:AL02`).
fn canonical_section(section: &str) -> String {
    match section {
        "sqruff" | "sqlfluff" => "core".to_string(),
        _ => {
            let rest =
                section.strip_prefix("sqruff:").or_else(|| section.strip_prefix("sqlfluff:"));
            rest.unwrap_or(section).to_string()
        }
    }
}

impl FluffConfig {
    pub fn new(
        configs: AHashMap<String, Value>,
        _extra_config_path: Option<String>,
        _overrides: Option<AHashMap<String, String>>,
    ) -> Self {
        let mut sections = default_sections();
        sections.extend(configs);
        Self { sections, sql_file_exts: default_sql_file_exts() }
    }

    /// Parse an ini-style `.sqruff` source (`[sqruff]`, `[sqruff:rules:CODE]`
    /// sections) into a config. Unrecognised keys are kept verbatim so
    /// rules can read their own configuration out of `rules:<code>`.
    pub fn from_source(source: &str, _config_path: Option<&Path>) -> Self {
        let mut ini = Ini::new_cs();
        let Ok(map) = ini.read(source.to_string()) else {
            return Self::default();
        };

        let mut sections = default_sections();
        for (section, values) in map {
            let path = canonical_section(&section);
            let mut inner = AHashMap::new();
            for (key, value) in values {
                let Some(value) = value else { continue };
                inner.insert(key, Value::from_str(&value).unwrap_or(Value::None));
            }

            let entry = sections.entry(path).or_insert_with(|| Value::Map(Default::default()));
            if let Value::Map(existing) = entry {
                existing.extend(inner);
            }
        }

        let mut config = Self { sections, sql_file_exts: default_sql_file_exts() };
        if let Some(exts) = config.get("sql_file_exts", "core").as_array() {
            config.sql_file_exts =
                exts.iter().filter_map(|v| v.as_string()).map(str::to_owned).collect();
        }
        config
    }

    pub fn with_sql_file_exts(mut self, exts: Vec<String>) -> Self {
        self.sql_file_exts = exts;
        self
    }

    pub fn sql_file_exts(&self) -> &[String] {
        &self.sql_file_exts
    }

    /// Look up a single key within a top-level section (`"core"`, `"rules"`, ...).
    pub fn get(&self, key: &str, section: &str) -> Value {
        self.sections.get(section).and_then(|s| s.get(key)).cloned().unwrap_or(Value::None)
    }

    /// Return a whole section (e.g. `"rules"`), or an empty map if absent.
    pub fn get_section(&self, section: &str) -> Value {
        self.sections.get(section).cloned().unwrap_or_else(|| Value::Map(Default::default()))
    }

    pub fn set(&mut self, key: &str, section: &str, value: Value) {
        let entry = self
            .sections
            .entry(section.to_string())
            .or_insert_with(|| Value::Map(Default::default()));
        if let Value::Map(map) = entry {
            map.insert(key.to_string(), value);
        }
    }

    /// Read a single `.sqruff`/`.sqlfluff` file from disk.
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(source) => Self::from_source(&source, Some(path)),
            Err(_) => Self::default(),
        }
    }

    /// Walk from the current directory up to the filesystem root, merging
    /// any `.sqruff`/`.sqlfluff` files found along the way (closest to the
    /// working directory wins), then apply an optional extra config file
    /// and a final set of ad hoc overrides.
    pub fn from_root(
        extra_config_path: Option<String>,
        ignore_local_config: bool,
        overrides: Option<AHashMap<String, String>>,
    ) -> Result<Self, String> {
        let mut config = Self::default();

        if !ignore_local_config {
            let cwd = std::env::current_dir().map_err(|err| err.to_string())?;
            let mut candidates = Vec::new();
            let mut dir = Some(cwd.as_path());
            while let Some(d) = dir {
                for name in [".sqruff", ".sqlfluff"] {
                    let candidate = d.join(name);
                    if candidate.is_file() {
                        candidates.push(candidate);
                    }
                }
                dir = d.parent();
            }
            for candidate in candidates.into_iter().rev() {
                let loaded = Self::from_file(&candidate);
                config.sections.extend(loaded.sections);
                config.sql_file_exts = loaded.sql_file_exts;
            }
        }

        if let Some(extra_config_path) = extra_config_path {
            let loaded = Self::from_file(Path::new(&extra_config_path));
            config.sections.extend(loaded.sections);
            config.sql_file_exts = loaded.sql_file_exts;
        }

        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                config.set(&key, "core", Value::from_str(&value).unwrap_or(Value::None));
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_source_core_section() {
        let config = FluffConfig::from_source(
            "[sqruff]\ndialect = ansi\nrules = AL02\n",
            None,
        );
        assert_eq!(config.get("dialect", "core").as_string(), Some("ansi"));
        assert_eq!(config.get("rules", "core").as_string(), Some("AL02"));
    }

    #[test]
    fn test_from_source_rule_subsection() {
        let config = FluffConfig::from_source(
            "[sqruff:rules:AL02]\nforbid_subquery_in = join\n",
            None,
        );
        let rules = config.get_section("rules");
        let al02 = rules.get("AL02").unwrap().as_map().unwrap();
        assert_eq!(al02.get("forbid_subquery_in").unwrap().as_string(), Some("join"));
    }

    #[test]
    fn test_default_has_no_rule_restriction() {
        let config = FluffConfig::default();
        assert!(config.get("rule_allowlist", "core").is_none_or_array_empty());
    }
}

trait ValueTestExt {
    fn is_none_or_array_empty(&self) -> bool;
}

impl ValueTestExt for Value {
    fn is_none_or_array_empty(&self) -> bool {
        self.is_none() || self.as_array().is_some_and(|a| a.is_empty())
    }
}
