use ahash::AHashSet;
use sqruff_lib_core::parser::segments::base::SegmentKind;

use crate::core::rules::context::RuleContext;

/// A strategy for walking the tree and deciding which segments a rule
/// should be invoked on.
pub enum Crawler {
    /// Visit only the root segment.
    RootOnly,
    /// Visit every segment (including descendants of a match) whose kind
    /// is in `kinds`.
    SegmentSeeker { kinds: AHashSet<SegmentKind>, allow_recurse: bool },
}

impl Crawler {
    pub fn root_only() -> Self {
        Crawler::RootOnly
    }

    pub fn segment_seeker(kinds: AHashSet<SegmentKind>) -> Self {
        Crawler::SegmentSeeker { kinds, allow_recurse: true }
    }

    pub fn disallow_recurse(mut self) -> Self {
        if let Crawler::SegmentSeeker { allow_recurse, .. } = &mut self {
            *allow_recurse = false;
        }
        self
    }

    pub fn crawl(&self, context: &mut RuleContext, on_match: &mut dyn FnMut(&RuleContext)) {
        match self {
            Crawler::RootOnly => on_match(context),
            Crawler::SegmentSeeker { kinds, allow_recurse } => {
                Self::crawl_seeker(kinds, *allow_recurse, context, on_match)
            }
        }
    }

    fn crawl_seeker(
        kinds: &AHashSet<SegmentKind>,
        allow_recurse: bool,
        context: &mut RuleContext,
        on_match: &mut dyn FnMut(&RuleContext),
    ) {
        let self_match = kinds.contains(&context.segment.kind());
        if self_match {
            on_match(context);
        }

        if context.segment.segments().is_empty() || (self_match && !allow_recurse) {
            return;
        }

        let parent = context.segment.clone();
        let children = parent.segments().to_vec();
        let saved_parent_stack = context.parent_stack.clone();

        context.parent_stack.push(parent);

        for (idx, child) in children.into_iter().enumerate() {
            context.segment = child;
            context.segment_idx = idx;
            Self::crawl_seeker(kinds, allow_recurse, context, on_match);
        }

        context.parent_stack = saved_parent_stack;
    }
}
