use std::ops::Range;

use smol_str::SmolStr;

use crate::edit_type::EditType;
use crate::lint_fix::LintFix;

/// A fix applied in place to a segment's raw text without moving its
/// position, e.g. a case-normalization edit. Recorded on the segment so
/// the Patch Deriver can surface it even when the segment's raw text
/// still matches the templated slice it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFix {
    pub edit: SmolStr,
    pub source_slice: Range<usize>,
    pub templated_slice: Range<usize>,
}

impl SourceFix {
    pub fn new(edit: SmolStr, source_slice: Range<usize>, templated_slice: Range<usize>) -> Self {
        SourceFix {
            edit,
            source_slice,
            templated_slice,
        }
    }
}

/// An edit patch in templated-string coordinates, as produced by the
/// Patch Deriver (see `ErasedSegment::iter_patches`).
#[derive(Debug, Clone)]
pub struct FixPatch {
    pub templated_slice: Range<usize>,
    pub fixed_raw: SmolStr,
    pub source_slice: Range<usize>,
    /// Number of placeholder-meta segments folded into this patch's
    /// insertion buffer. Computed for fidelity with the upstream design;
    /// the Source Reconstructor does not need it to resolve adjacency,
    /// since the untouchable-range sweep already does that.
    pub post_placeholder: usize,
}

impl FixPatch {
    pub fn new(
        templated_slice: Range<usize>,
        fixed_raw: SmolStr,
        source_slice: Range<usize>,
        post_placeholder: usize,
    ) -> Self {
        FixPatch {
            templated_slice,
            fixed_raw,
            source_slice,
            post_placeholder,
        }
    }

    /// Key used to deduplicate patches once lifted to source space:
    /// identical `(range, text)` pairs collapse, which happens when a
    /// templated loop maps several occurrences back to one source site.
    pub fn dedupe_tuple(&self) -> (Range<usize>, SmolStr) {
        (self.source_slice.clone(), self.fixed_raw.clone())
    }
}

/// All fixes proposed against a single anchor segment, gathered so the
/// Fix Applier can resolve `delete > edit > create` precedence and detect
/// invalid combinations in one place.
#[derive(Debug, Default)]
pub struct AnchorEditInfo {
    pub fixes: Vec<LintFix>,
}

impl AnchorEditInfo {
    pub fn add(&mut self, fix: LintFix) {
        self.fixes.push(fix);
    }

    pub fn delete_count(&self) -> usize {
        self.fixes.iter().filter(|f| f.edit_type == EditType::Delete).count()
    }

    pub fn replace_count(&self) -> usize {
        self.fixes.iter().filter(|f| f.edit_type == EditType::Replace).count()
    }

    pub fn creates_before(&self) -> impl Iterator<Item = &LintFix> {
        self.fixes.iter().filter(|f| f.edit_type == EditType::CreateBefore)
    }

    pub fn creates_after(&self) -> impl Iterator<Item = &LintFix> {
        self.fixes.iter().filter(|f| f.edit_type == EditType::CreateAfter)
    }

    pub fn replaces(&self) -> impl Iterator<Item = &LintFix> {
        self.fixes.iter().filter(|f| f.edit_type == EditType::Replace)
    }

    pub fn deletes(&self) -> impl Iterator<Item = &LintFix> {
        self.fixes.iter().filter(|f| f.edit_type == EditType::Delete)
    }
}
