use hashbrown::HashMap;
use sqruff_lib_core::lint_fix::LintFix;
use sqruff_lib_core::parser::segments::base::{ErasedSegment, SegmentKind};
use sqruff_lib_core::value::Value;

use crate::core::rules::context::RuleContext;
use crate::core::rules::crawlers::Crawler;
use crate::core::rules::{Erased, ErasedRule, LintResult, Rule, RuleGroups};

/// Keywords should be consistently upper case.
#[derive(Debug, Clone, Default)]
pub struct RuleCp01;

impl Rule for RuleCp01 {
    fn load_from_config(&self, _config: &HashMap<String, Value>) -> Result<ErasedRule, String> {
        Ok(RuleCp01.erased())
    }

    fn name(&self) -> &'static str {
        "capitalisation.keywords"
    }

    fn description(&self) -> &'static str {
        "Inconsistent capitalisation of keywords."
    }

    fn groups(&self) -> &'static [RuleGroups] {
        &[RuleGroups::Core, RuleGroups::Capitalisation]
    }

    fn is_fix_compatible(&self) -> bool {
        true
    }

    fn eval(&self, context: &RuleContext) -> Vec<LintResult> {
        let raw = context.segment.raw();
        let upper = raw.to_uppercase();
        if raw.as_str() != upper {
            let replacement =
                ErasedSegment::leaf(SegmentKind::Keyword, context.segment.raw(), upper, None);
            let fix = LintFix::replace(context.segment.clone(), vec![replacement], None);
            return vec![LintResult::new(
                Some(context.segment.clone()),
                vec![fix],
                Some("Keywords must be upper case.".to_string()),
            )];
        }
        Vec::new()
    }

    fn crawl_behaviour(&self) -> Crawler {
        Crawler::segment_seeker([SegmentKind::Keyword].into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FluffConfig;
    use crate::core::rules::crawl;
    use sqruff_lib_core::templaters::TemplatedFile;

    #[test]
    fn test_cp01_flags_lowercase_keyword() {
        let templated_file: TemplatedFile = "select 1".into();
        let (tokens, _) = crate::core::parser::lexer::lex(&templated_file);
        let tree = crate::core::parser::parser::parse(tokens);

        let config = FluffConfig::new(Default::default(), None, None);
        let rule = RuleCp01.erased();

        let mut violations = Vec::new();
        crawl(&rule, &templated_file, tree, &config, &mut |result| {
            violations.push(result);
        });

        assert_eq!(violations.len(), 1);
    }
}
