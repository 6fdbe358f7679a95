use ahash::AHashSet;

use crate::edit_type::EditType;
use crate::parser::segments::base::ErasedSegment;
use crate::templaters::{RawFileSlice, RawSliceKind, TemplatedFile};

/// A potential fix to a linting violation.
///
/// `anchor` identifies *where* the edit applies (by segment identity
/// within the tree it was derived from); `edit`/`source` are only
/// meaningful for `Replace`/`CreateBefore`/`CreateAfter`.
#[derive(Debug, Clone)]
pub struct LintFix {
    pub edit_type: EditType,
    pub anchor: ErasedSegment,
    pub edit: Vec<ErasedSegment>,
    /// Segments the replacement text was derived from, if any. Used to
    /// detect edits that would copy material out of a templated region.
    pub source: Vec<ErasedSegment>,
}

impl LintFix {
    fn new(
        edit_type: EditType,
        anchor: ErasedSegment,
        edit: Vec<ErasedSegment>,
        source: Option<Vec<ErasedSegment>>,
    ) -> Self {
        // Edit segments always carry Bare markers: position is assigned
        // during fix application, not by the rule proposing the edit.
        let edit = edit.into_iter().map(|seg| seg.with_bare_position()).collect();

        let source = source.map_or(Vec::new(), |source| {
            source
                .into_iter()
                .filter(|seg| seg.get_position_marker().is_some())
                .collect()
        });

        LintFix {
            edit_type,
            anchor,
            edit,
            source,
        }
    }

    pub fn create_before(anchor: ErasedSegment, edit_segments: Vec<ErasedSegment>) -> Self {
        Self::new(EditType::CreateBefore, anchor, edit_segments, None)
    }

    pub fn create_after(
        anchor: ErasedSegment,
        edit_segments: Vec<ErasedSegment>,
        source: Option<Vec<ErasedSegment>>,
    ) -> Self {
        Self::new(EditType::CreateAfter, anchor, edit_segments, source)
    }

    pub fn replace(
        anchor_segment: ErasedSegment,
        edit_segments: Vec<ErasedSegment>,
        source: Option<Vec<ErasedSegment>>,
    ) -> Self {
        Self::new(EditType::Replace, anchor_segment, edit_segments, source)
    }

    pub fn delete(anchor_segment: ErasedSegment) -> Self {
        Self::new(EditType::Delete, anchor_segment, Vec::new(), None)
    }

    /// A `Replace` whose only effect is a source-only text edit (the raw
    /// text is unchanged; only `source_fixes` differ), e.g. a case-folding
    /// fix that doesn't touch templated content.
    pub fn is_just_source_edit(&self) -> bool {
        self.edit_type == EditType::Replace && self.edit.len() == 1 && self.edit[0].raw() == self.anchor.raw()
    }

    fn raw_slices_spanning(&self, templated_file: &TemplatedFile, source_slice: std::ops::Range<usize>) -> AHashSet<RawFileSlice> {
        templated_file
            .raw_slices_spanning_source_slice(&source_slice)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Would applying this fix copy text out of (or write into) a
    /// templated source region? Rules must never do that: the fixed
    /// text would be silently discarded on the next render.
    pub fn has_template_conflicts(&self, templated_file: &TemplatedFile) -> bool {
        if self.is_just_source_edit() {
            return false;
        }

        let Some(anchor_marker) = self.anchor.get_position_marker() else {
            return false;
        };
        let Some(source_slice) = anchor_marker.source_slice() else {
            return false;
        };
        if source_slice.is_empty() {
            return false;
        }

        let touched = self.raw_slices_spanning(templated_file, source_slice);
        let any_templated = touched.iter().any(|s| s.kind == RawSliceKind::Templated);

        match self.edit_type {
            EditType::CreateBefore | EditType::CreateAfter => {
                !touched.is_empty() && touched.iter().all(|s| s.kind == RawSliceKind::Templated)
            }
            _ => any_templated,
        }
    }
}

impl PartialEq for LintFix {
    fn eq(&self, other: &Self) -> bool {
        if self.edit_type != other.edit_type {
            return false;
        }
        if self.anchor.id() != other.anchor.id() {
            return false;
        }
        if self.edit.len() != other.edit.len() {
            return false;
        }
        self.edit
            .iter()
            .zip(&other.edit)
            .all(|(a, b)| a.raw() == b.raw())
    }
}
