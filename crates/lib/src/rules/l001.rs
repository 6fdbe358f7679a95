use hashbrown::HashMap;
use sqruff_lib_core::lint_fix::LintFix;
use sqruff_lib_core::parser::segments::base::{ErasedSegment, SegmentKind};
use sqruff_lib_core::value::Value;

use crate::core::rules::context::RuleContext;
use crate::core::rules::crawlers::Crawler;
use crate::core::rules::{Erased, ErasedRule, LintResult, Rule, RuleGroups};

/// Collapse runs of more than one space or tab into a single space.
///
/// `SELECT  1` -> `SELECT 1`.
#[derive(Debug, Clone, Default)]
pub struct RuleL001;

impl Rule for RuleL001 {
    fn load_from_config(&self, _config: &HashMap<String, Value>) -> Result<ErasedRule, String> {
        Ok(RuleL001.erased())
    }

    fn name(&self) -> &'static str {
        "layout.spacing"
    }

    fn description(&self) -> &'static str {
        "Unnecessary trailing whitespace."
    }

    fn groups(&self) -> &'static [RuleGroups] {
        &[RuleGroups::Core, RuleGroups::Layout]
    }

    fn is_fix_compatible(&self) -> bool {
        true
    }

    fn eval(&self, context: &RuleContext) -> Vec<LintResult> {
        let raw = context.segment.raw();
        if raw.chars().all(|c| c == ' ') && raw.len() > 1 {
            let replacement =
                ErasedSegment::leaf(SegmentKind::Whitespace, "whitespace", " ", None);
            let fix = LintFix::replace(context.segment.clone(), vec![replacement], None);
            return vec![LintResult::new(
                Some(context.segment.clone()),
                vec![fix],
                Some("Unnecessary long whitespace.".to_string()),
            )];
        }
        Vec::new()
    }

    fn crawl_behaviour(&self) -> Crawler {
        Crawler::segment_seeker([SegmentKind::Whitespace].into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FluffConfig;
    use crate::core::rules::crawl;
    use sqruff_lib_core::templaters::TemplatedFile;

    #[test]
    fn test_l001_flags_double_space() {
        let templated_file: TemplatedFile = "SELECT  1".into();
        let (tokens, _) = crate::core::parser::lexer::lex(&templated_file);
        let tree = crate::core::parser::parser::parse(tokens);

        let config = FluffConfig::new(Default::default(), None, None);
        let rule = RuleL001.erased();

        let mut violations = Vec::new();
        crawl(&rule, &templated_file, tree, &config, &mut |result| {
            violations.push(result);
        });

        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_l001_single_space_is_clean() {
        let templated_file: TemplatedFile = "SELECT 1".into();
        let (tokens, _) = crate::core::parser::lexer::lex(&templated_file);
        let tree = crate::core::parser::parser::parse(tokens);

        let config = FluffConfig::new(Default::default(), None, None);
        let rule = RuleL001.erased();

        let mut violations = Vec::new();
        crawl(&rule, &templated_file, tree, &config, &mut |result| {
            violations.push(result);
        });

        assert!(violations.is_empty());
    }
}
