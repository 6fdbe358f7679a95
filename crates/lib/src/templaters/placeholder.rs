use std::collections::HashMap;
use std::sync::Arc;

use fancy_regex::Regex;
use sqruff_lib_core::errors::SQLFluffUserError;
use sqruff_lib_core::templaters::{RawFileSlice, RawSliceKind, SliceKind, TemplatedFile, TemplatedFileSlice};

use crate::Formatter;
use crate::core::config::FluffConfig;
use crate::templaters::Templater;

/// Substitutes driver-style placeholders (`:name`, `%(name)s`, `?`, ...)
/// with sample values so the result can be lexed as plain SQL, keeping a
/// slice map back to the original placeholder text.
#[derive(Default)]
pub struct PlaceholderTemplater;

pub fn get_known_styles() -> HashMap<&'static str, Regex> {
    let mut m = HashMap::new();

    // e.g. WHERE bla = :name
    m.insert("colon", Regex::new(r"(?<![:\w\\]):(?P<param_name>\w+)(?!:)").unwrap());

    // e.g. WHERE bla = table:name - use with caution as more prone to false
    // positives
    m.insert("colon_nospaces", Regex::new(r"(?<!:):(?P<param_name>\w+)").unwrap());

    // e.g. WHERE bla = :2
    m.insert("numeric_colon", Regex::new(r"(?<![:\w\\]):(?P<param_name>\d+)").unwrap());

    // e.g. WHERE bla = %(name)s
    m.insert("pyformat", Regex::new(r"(?<![:\w\\])%\((?P<param_name>[\w_]+)\)s").unwrap());

    // e.g. WHERE bla = $name or WHERE bla = ${name}
    m.insert("dollar", Regex::new(r"(?<![:\w\\])\${?(?P<param_name>[\w_]+)}?").unwrap());

    // e.g. USE ${flyway:database}.schema_name;
    m.insert("flyway_var", Regex::new(r#"\${(?P<param_name>\w+[:\w_]+)}"#).unwrap());

    // e.g. WHERE bla = ?
    m.insert("question_mark", Regex::new(r"(?<![:\w\\])\?").unwrap());

    // e.g. WHERE bla = $3 or WHERE bla = ${3}
    m.insert("numeric_dollar", Regex::new(r"(?<![:\w\\])\${?(?P<param_name>[\d]+)}?").unwrap());

    // e.g. WHERE bla = %s
    m.insert("percent", Regex::new(r"(?<![:\w\\])%s").unwrap());

    // e.g. WHERE bla = &s or WHERE bla = &{s} or USE DATABASE {ENV}_MARKETING
    m.insert("ampersand", Regex::new(r"(?<!&)&{?(?P<param_name>[\w]+)}?").unwrap());

    m
}

const NO_PARAM_OR_STYLE: &str =
    "No param_regex nor param_style was provided to the placeholder templater.";

impl PlaceholderTemplater {
    fn derive_style(&self, config: &FluffConfig) -> Result<Regex, SQLFluffUserError> {
        let config = config
            .get("placeholder", "templater")
            .as_map()
            .ok_or(SQLFluffUserError::new(NO_PARAM_OR_STYLE.to_string()))?;
        match (config.get("param_regex"), config.get("param_style")) {
            (Some(_), Some(_)) => Err(SQLFluffUserError::new(
                "Both param_regex and param_style were provided to the placeholder templater."
                    .to_string(),
            )),
            (None, None) => Err(SQLFluffUserError::new(NO_PARAM_OR_STYLE.to_string())),
            (Some(param_regex), None) => {
                let param_regex = param_regex
                    .as_string()
                    .ok_or(SQLFluffUserError::new("Invalid param_regex for templater 'placeholder'".to_string()))?;
                let regex = Regex::new(param_regex)
                    .map_err(|e| SQLFluffUserError::new(format!("Invalid regex for param_regex: {}", e)))?;
                Ok(regex)
            }
            (None, Some(param_style)) => {
                let param_style = param_style
                    .as_string()
                    .ok_or(SQLFluffUserError::new("Invalid param_style for templater 'placeholder'".to_string()))?;
                let known_styles = get_known_styles();
                let regex = known_styles.get(param_style).ok_or_else(|| {
                    SQLFluffUserError::new(format!(
                        "Unknown param_style '{}' for templater 'placeholder'",
                        param_style
                    ))
                })?;
                Ok(regex.clone())
            }
        }
    }
}

impl Templater for PlaceholderTemplater {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn process(
        &self,
        in_str: &str,
        f_name: &str,
        config: &FluffConfig,
        _: &Option<Arc<dyn Formatter>>,
    ) -> Result<TemplatedFile, SQLFluffUserError> {
        let mut sliced_file = vec![];
        let mut raw_sliced = vec![];
        let mut last_pos_raw = 0usize;
        let mut last_pos_templated = 0;
        let mut out_str = String::new();

        // when the param has no name, use a 1-based index
        let mut param_counter = 1;
        let regex = self.derive_style(config)?;

        let template_config = config.get("placeholder", "templater").as_map();

        for cap in regex.captures_iter(in_str) {
            let cap = cap.unwrap();
            let span = cap.get(0).unwrap().range();

            let param_name = if let Some(name) = cap.name("param_name") {
                name.as_str().to_string()
            } else {
                let name = param_counter.to_string();
                param_counter += 1;
                name
            };

            let last_literal_length = span.start - last_pos_raw;
            let replacement = template_config
                .and_then(|config| config.get(&param_name))
                .map_or(Ok(param_name.clone()), |v| match (v.as_string(), v.as_int(), v.as_bool()) {
                    (Some(s), None, None) => Ok(s.to_string()),
                    (None, Some(i), None) => Ok(i.to_string()),
                    (None, None, Some(b)) => Ok(if b { "true".to_string() } else { "false".to_string() }),
                    _ => Err(SQLFluffUserError::new(format!(
                        "Invalid value for parameter replacement: {}",
                        param_name
                    ))),
                })?;

            // Add the literal before the placeholder to the slices.
            sliced_file.push(TemplatedFileSlice::new(
                SliceKind::Literal,
                last_pos_raw..span.start,
                last_pos_templated..last_pos_templated + last_literal_length,
            ));
            raw_sliced.push(RawFileSlice::new(
                in_str[last_pos_raw..span.start].to_string(),
                RawSliceKind::Literal,
                last_pos_raw,
                0,
            ));
            out_str.push_str(&in_str[last_pos_raw..span.start]);

            // Add the replacement itself.
            let start_template_pos = last_pos_templated + last_literal_length;
            sliced_file.push(TemplatedFileSlice::new(
                SliceKind::Templated,
                span.clone(),
                start_template_pos..start_template_pos + replacement.len(),
            ));
            raw_sliced.push(RawFileSlice::new(
                in_str[span.clone()].to_string(),
                RawSliceKind::Templated,
                span.start,
                0,
            ));
            out_str.push_str(&replacement);

            last_pos_raw = span.end;
            last_pos_templated = start_template_pos + replacement.len();
        }

        // Add the trailing literal, if any.
        if in_str.len() > last_pos_raw {
            sliced_file.push(TemplatedFileSlice::new(
                SliceKind::Literal,
                last_pos_raw..in_str.len(),
                last_pos_templated..last_pos_templated + (in_str.len() - last_pos_raw),
            ));
            raw_sliced.push(RawFileSlice::new(
                in_str[last_pos_raw..].to_string(),
                RawSliceKind::Literal,
                last_pos_raw,
                0,
            ));
            out_str.push_str(&in_str[last_pos_raw..]);
        }

        TemplatedFile::new(in_str.to_string(), f_name.to_string(), Some(out_str), sliced_file, raw_sliced)
            .map_err(|err| SQLFluffUserError::new(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templater_no_replacement() {
        let templater = PlaceholderTemplater;
        let in_str = "SELECT * FROM foo WHERE a = 1";
        let config = FluffConfig::from_source(
            "
[sqruff:templater:placeholder]
param_style = colon",
            None,
        );
        let out = templater.process(in_str, "test.sql", &config, &None).unwrap();
        assert_eq!(in_str, out.templated_str());
    }

    #[test]
    fn test_all_the_known_styles() {
        let cases: [(&str, &str, &str, Vec<(&str, &str)>); 2] = [
            (
                "WHERE userid = :user_id AND date > :start_date",
                "colon",
                "WHERE userid = 42 AND date > '2020-01-01'",
                vec![("user_id", "42"), ("start_date", "'2020-01-01'")],
            ),
            (
                "WHERE (city_id) IN %s AND date > %s",
                "percent",
                "WHERE (city_id) IN (1, 2, 3, 45) AND date > '2020-10-01'",
                vec![("1", "(1, 2, 3, 45)"), ("2", "'2020-10-01'")],
            ),
        ];

        for (in_str, param_style, expected_out, values) in cases {
            let config = FluffConfig::from_source(
                format!(
                    "\n[sqruff:templater:placeholder]\nparam_style = {}\n{}\n",
                    param_style,
                    values.iter().map(|(k, v)| format!("{} = {}", k, v)).collect::<Vec<_>>().join("\n")
                )
                .as_str(),
                None,
            );
            let templater = PlaceholderTemplater;
            let out = templater.process(in_str, "test.sql", &config, &None).unwrap();
            assert_eq!(expected_out, out.templated_str());
        }
    }

    #[test]
    fn test_templater_setup_none() {
        let config = FluffConfig::from_source("", None);
        let templater = PlaceholderTemplater;
        let out = templater.process("SELECT 2+2", "test.sql", &config, &None);

        assert!(out.is_err());
        assert_eq!(out.err().unwrap().value, NO_PARAM_OR_STYLE);
    }

    #[test]
    fn test_templater_setup_both_provided() {
        let config = FluffConfig::from_source(
            r#"
[sqruff:templater:placeholder]
param_regex = __(?P<param_name>[\w_]+)__
param_style = colon
            "#,
            None,
        );
        let templater = PlaceholderTemplater;
        let out = templater.process("SELECT 2+2", "test.sql", &config, &None);

        assert!(out.is_err());
        assert_eq!(
            out.err().unwrap().value,
            "Both param_regex and param_style were provided to the placeholder templater."
        );
    }

    #[test]
    fn test_templater_custom_regex() {
        let config = FluffConfig::from_source(
            "
[sqruff:templater:placeholder]
param_regex = __(?P<param_name>[\\w_]+)__
my_name = john
",
            None,
        );
        let templater = PlaceholderTemplater;
        let in_str = "SELECT bla FROM blob WHERE id = __my_name__";
        let out = templater.process(in_str, "test", &config, &None).unwrap();
        assert_eq!("SELECT bla FROM blob WHERE id = john", out.templated_str());
    }

    #[test]
    fn test_templater_styles_not_existing() {
        let config = FluffConfig::from_source(
            "
[sqruff:templater:placeholder]
param_style = unknown
            ",
            None,
        );
        let templater = PlaceholderTemplater;
        let out = templater.process("SELECT * FROM foo WHERE a = 1", "test.sql", &config, &None);

        assert!(out.is_err());
        assert_eq!(out.err().unwrap().value, "Unknown param_style 'unknown' for templater 'placeholder'");
    }
}
