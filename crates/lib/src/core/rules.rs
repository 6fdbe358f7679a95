pub mod context;
pub mod crawlers;
pub mod noqa;

use std::fmt::{self, Debug};
use std::ops::Deref;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use hashbrown::HashMap;
use itertools::chain;
use sqruff_lib_core::errors::{ErrorStructRule, SQLLintError};
use sqruff_lib_core::helpers::IndexMap;
use sqruff_lib_core::lint_fix::LintFix;
use sqruff_lib_core::parser::segments::base::ErasedSegment;
use sqruff_lib_core::templaters::TemplatedFile;
use sqruff_lib_core::value::Value;
use strum_macros::AsRefStr;

use crate::core::config::FluffConfig;
use crate::core::rules::context::RuleContext;
use crate::core::rules::crawlers::Crawler;

/// The outcome of evaluating a rule against one segment: an optional
/// violation (`anchor` + `description`) plus zero or more fixes that
/// would resolve it.
pub struct LintResult {
    pub anchor: Option<ErasedSegment>,
    pub fixes: Vec<LintFix>,
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Copy, Hash, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum RuleGroups {
    All,
    Core,
    Capitalisation,
    Convention,
    Layout,
    Structure,
}

impl LintResult {
    pub fn new(anchor: Option<ErasedSegment>, fixes: Vec<LintFix>, description: Option<String>) -> Self {
        LintResult { anchor, fixes, description }
    }

    pub fn to_linting_error(self, rule: &ErasedRule) -> Option<SQLLintError> {
        let anchor = self.anchor.clone()?;
        let description = self.description.as_deref().unwrap_or_else(|| rule.description());
        let is_fixable = rule.is_fix_compatible();

        let mut error = SQLLintError::new(description, anchor, is_fixable, self.fixes);
        error.rule = Some(ErrorStructRule { name: rule.name(), code: rule.code() });
        Some(error)
    }
}

impl Debug for LintResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.anchor {
            None => write!(f, "LintResult(<empty>)"),
            Some(anchor) => {
                let fix_coda =
                    if !self.fixes.is_empty() { format!("+{}F", self.fixes.len()) } else { String::new() };
                match &self.description {
                    Some(desc) => write!(f, "LintResult({desc}: {anchor:?}{fix_coda})"),
                    None => write!(f, "LintResult({anchor:?}{fix_coda})"),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintPhase {
    Main,
    Post,
}

/// A single linting rule: given a segment it has been asked to evaluate,
/// decide whether it's a violation and, if so, what fix(es) would resolve
/// it. Rules never mutate the tree directly — they describe the edit via
/// `LintFix` and the fix applier does the rest.
pub trait Rule: Debug + 'static + Send + Sync {
    fn load_from_config(&self, config: &HashMap<String, Value>) -> Result<ErasedRule, String>;

    fn lint_phase(&self) -> LintPhase {
        LintPhase::Main
    }

    fn name(&self) -> &'static str;

    fn config_ref(&self) -> &'static str {
        self.name()
    }

    fn description(&self) -> &'static str;

    /// All the groups this rule belongs to. There should be no duplicates.
    fn groups(&self) -> &'static [RuleGroups];

    fn code(&self) -> &'static str {
        let name = std::any::type_name::<Self>();
        name.split("::").last().unwrap().strip_prefix("Rule").unwrap_or(name)
    }

    fn eval(&self, context: &RuleContext) -> Vec<LintResult>;

    fn is_fix_compatible(&self) -> bool {
        false
    }

    fn crawl_behaviour(&self) -> Crawler;
}

/// Run one rule over a tree, filtering out any fix that would touch
/// templated source (those fixes get silently dropped on the next
/// render, so rules must never propose them).
pub fn crawl(
    rule: &ErasedRule,
    templated_file: &TemplatedFile,
    tree: ErasedSegment,
    config: &FluffConfig,
    on_violation: &mut impl FnMut(LintResult),
) {
    let mut root_context = RuleContext::new(config, tree);
    root_context.templated_file = Some(templated_file);

    rule.crawl_behaviour().crawl(&mut root_context, &mut |context| {
        for result in rule.eval(context) {
            if !result.fixes.iter().any(|fix| fix.has_template_conflicts(templated_file)) {
                on_violation(result);
            }
        }
    });
}

#[derive(Debug, Clone)]
pub struct ErasedRule {
    erased: Arc<dyn Rule>,
}

impl PartialEq for ErasedRule {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.erased, &other.erased)
    }
}

impl Deref for ErasedRule {
    type Target = dyn Rule;

    fn deref(&self) -> &Self::Target {
        self.erased.as_ref()
    }
}

pub trait Erased {
    type Erased;

    fn erased(self) -> Self::Erased;
}

impl<T: Rule> Erased for T {
    type Erased = ErasedRule;

    fn erased(self) -> Self::Erased {
        ErasedRule { erased: Arc::new(self) }
    }
}

pub struct RuleManifest {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub groups: &'static [RuleGroups],
    pub rule_class: ErasedRule,
}

#[derive(Clone)]
pub struct RulePack {
    pub(crate) rules: Vec<ErasedRule>,
}

impl RulePack {
    pub fn rules(&self) -> Vec<ErasedRule> {
        self.rules.clone()
    }
}

pub struct RuleSet {
    pub(crate) register: IndexMap<&'static str, RuleManifest>,
}

impl RuleSet {
    fn rule_reference_map(&self) -> AHashMap<&'static str, AHashSet<&'static str>> {
        let valid_codes: AHashSet<_> = self.register.keys().copied().collect();

        let reference_map: AHashMap<_, AHashSet<_>> =
            valid_codes.iter().map(|&code| (code, AHashSet::from([code]))).collect();

        let name_map = {
            let mut name_map = AHashMap::new();
            for manifest in self.register.values() {
                name_map.entry(manifest.name).or_insert_with(AHashSet::new).insert(manifest.code);
            }
            name_map
        };

        let name_collisions: AHashSet<_> = {
            let name_keys: AHashSet<_> = name_map.keys().copied().collect();
            name_keys.intersection(&valid_codes).copied().collect()
        };

        if !name_collisions.is_empty() {
            log::warn!(
                "The following defined rule names were found which collide with codes. Those \
                 names will not be available for selection: {name_collisions:?}",
            );
        }

        let reference_map: AHashMap<_, _> = chain(name_map, reference_map).collect();

        let mut group_map: AHashMap<_, AHashSet<&'static str>> = AHashMap::new();
        for manifest in self.register.values() {
            for group in manifest.groups {
                let group = group.as_ref();
                if let Some(codes) = reference_map.get(group) {
                    log::warn!(
                        "Rule {} defines group '{}' which is already defined as a name or code of \
                         {:?}. This group will not be available for use as a result of this \
                         collision.",
                        manifest.code,
                        group,
                        codes
                    );
                } else {
                    group_map.entry(group).or_insert_with(AHashSet::new).insert(manifest.code);
                }
            }
        }

        chain(group_map, reference_map).collect()
    }

    fn expand_rule_refs(
        &self,
        glob_list: Vec<String>,
        reference_map: &AHashMap<&'static str, AHashSet<&'static str>>,
    ) -> AHashSet<&'static str> {
        let mut expanded_rule_set = AHashSet::new();

        for r in glob_list {
            if let Some(codes) = reference_map.get(r.as_str()) {
                expanded_rule_set.extend(codes.clone());
            } else {
                log::warn!("Rule reference {r} not found in rule reference map, ignoring");
            }
        }

        expanded_rule_set
    }

    pub(crate) fn get_rulepack(&self, config: &FluffConfig) -> RulePack {
        let reference_map = self.rule_reference_map();
        let rules = config.get_section("rules");
        let keylist = self.register.keys();

        let allowlist: Vec<String> = match config.get("rule_allowlist", "core").as_array() {
            Some(array) => array.iter().filter_map(|it| it.as_string()).map(str::to_owned).collect(),
            None => self.register.keys().map(|it| it.to_string()).collect(),
        };

        let denylist: Vec<String> = match config.get("rule_denylist", "core").as_array() {
            Some(array) => array.iter().filter_map(|it| it.as_string()).map(str::to_owned).collect(),
            None => Vec::new(),
        };

        let expanded_allowlist = self.expand_rule_refs(allowlist, &reference_map);
        let expanded_denylist = self.expand_rule_refs(denylist, &reference_map);

        let keylist: Vec<_> = keylist
            .into_iter()
            .filter(|&&r| expanded_allowlist.contains(r) && !expanded_denylist.contains(r))
            .collect();

        let mut instantiated_rules = Vec::with_capacity(keylist.len());
        for code in keylist {
            let rule = self.register[code].rule_class.clone();
            let rule_config_ref = rule.config_ref();

            let tmp = HashMap::new();
            let specific_rule_config =
                rules.get(rule_config_ref).and_then(|section| section.as_map()).unwrap_or(&tmp);

            match rule.load_from_config(specific_rule_config) {
                Ok(rule) => instantiated_rules.push(rule),
                Err(err) => log::warn!("Rule {code} failed to load from config: {err}"),
            }
        }

        RulePack { rules: instantiated_rules }
    }
}
