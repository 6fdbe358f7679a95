use std::sync::Arc;

use sqruff_lib_core::errors::SQLFluffUserError;
use sqruff_lib_core::templaters::TemplatedFile;

use crate::Formatter;
use crate::core::config::FluffConfig;
use crate::templaters::Templater;

/// Templated output equals source verbatim — one literal slice covers the
/// whole file. The default when no templater is configured.
#[derive(Debug, Default)]
pub struct RawTemplater;

impl Templater for RawTemplater {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn process(
        &self,
        in_str: &str,
        f_name: &str,
        _config: &FluffConfig,
        _formatter: &Option<Arc<dyn Formatter>>,
    ) -> Result<TemplatedFile, SQLFluffUserError> {
        Ok(TemplatedFile::literal(in_str.to_string(), f_name.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_templater_raw() {
        let templater = RawTemplater;
        let in_str = "SELECT * FROM foo";

        let out = templater.process(in_str, "test.sql", &FluffConfig::default(), &None).unwrap();

        assert_eq!(out.templated_str(), in_str);
    }
}
