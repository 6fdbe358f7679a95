pub mod cp01;
pub mod l001;

use sqruff_lib_core::helpers::IndexMap;

use crate::core::rules::{Erased, Rule, RuleManifest, RuleSet};
use cp01::RuleCp01;
use l001::RuleL001;

/// Build the set of rules known to this build. A real dialect-aware
/// linter would register dozens of these; this crate ships the handful
/// needed to exercise the fix loop end to end.
pub fn get_ruleset() -> RuleSet {
    let mut register = IndexMap::new();

    register.insert("L001", RuleManifest {
        code: "L001",
        name: RuleL001.name(),
        description: RuleL001.description(),
        groups: RuleL001.groups(),
        rule_class: RuleL001.erased(),
    });

    register.insert("CP01", RuleManifest {
        code: "CP01",
        name: RuleCp01.name(),
        description: RuleCp01.description(),
        groups: RuleCp01.groups(),
        rule_class: RuleCp01.erased(),
    });

    RuleSet { register }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FluffConfig;

    #[test]
    fn test_get_ruleset_builds_rulepack() {
        let config = FluffConfig::new(Default::default(), None, None);
        let rulepack = get_ruleset().get_rulepack(&config);
        assert_eq!(rulepack.rules().len(), 2);
    }
}
