use std::cell::OnceCell;
use std::fmt::Debug;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use ahash::AHashMap;
use smol_str::SmolStr;

use crate::lint_fix::LintFix;
use crate::parser::markers::PositionMarker;
use crate::parser::segments::fix::{AnchorEditInfo, FixPatch, SourceFix};
use crate::templaters::TemplatedFile;

/// The coarse shape of a segment. Dialect-specific grammars are out of
/// scope here; rules and the lexer/parser boundary only need to agree on
/// this much to drive the fix loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Root,
    Statement,
    Clause,
    Expression,
    Keyword,
    Identifier,
    Literal,
    Symbol,
    Comma,
    Whitespace,
    Newline,
    Comment,
    /// Zero-width structural marker (e.g. indent/dedent tracking) with no
    /// rendered text of its own.
    Meta,
    /// A templater-emitted placeholder standing in for templated content.
    Placeholder,
    /// A span the parser could not make sense of; preserved verbatim.
    Unparsable,
    /// Anything else a dialect wants to name for itself.
    Other,
}

impl SegmentKind {
    pub fn is_whitespace_like(self) -> bool {
        matches!(self, SegmentKind::Whitespace | SegmentKind::Newline)
    }
}

static NEXT_SEGMENT_ID: AtomicU32 = AtomicU32::new(1);

fn new_id() -> u32 {
    NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A node in the parsed tree.
///
/// Trees are immutable after construction: a fix never mutates a
/// `Segment` in place, it builds a new one. Unaffected subtrees are
/// reused verbatim (same `Rc`, same `id`), so `id` equality is a cheap,
/// reliable test for "this is literally the same segment instance the
/// caller saw before", independent of content equality.
#[derive(Debug)]
pub struct Segment {
    id: u32,
    kind: SegmentKind,
    name: SmolStr,
    leaf_raw: Option<SmolStr>,
    position_marker: Option<PositionMarker>,
    segments: Vec<ErasedSegment>,
    source_fixes: Vec<SourceFix>,
    raw_cache: OnceCell<SmolStr>,
}

/// A cheap handle to a `Segment`. Clone is an `Rc` bump, not a copy of
/// the tree.
#[derive(Debug, Clone)]
pub struct ErasedSegment(Rc<Segment>);

impl Deref for ErasedSegment {
    type Target = Segment;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Segment {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is(&self, kind: SegmentKind) -> bool {
        self.kind == kind
    }

    pub fn segments(&self) -> &[ErasedSegment] {
        &self.segments
    }

    pub fn is_leaf(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get_source_fixes(&self) -> &[SourceFix] {
        &self.source_fixes
    }

    pub(crate) fn position_marker(&self) -> Option<&PositionMarker> {
        self.position_marker.as_ref()
    }

    pub fn get_position_marker(&self) -> Option<PositionMarker> {
        self.position_marker.clone()
    }

    /// Raw source text this segment covers, in templated space. Computed
    /// once for branch segments and memoized; leaves carry it directly.
    pub fn raw(&self) -> SmolStr {
        if let Some(raw) = &self.leaf_raw {
            return raw.clone();
        }
        self.raw_cache
            .get_or_init(|| {
                let mut buf = String::new();
                for child in &self.segments {
                    buf.push_str(&child.raw());
                }
                SmolStr::from(buf)
            })
            .clone()
    }
}

impl ErasedSegment {
    pub fn leaf(
        kind: SegmentKind,
        name: impl Into<SmolStr>,
        raw: impl Into<SmolStr>,
        position_marker: Option<PositionMarker>,
    ) -> Self {
        ErasedSegment(Rc::new(Segment {
            id: new_id(),
            kind,
            name: name.into(),
            leaf_raw: Some(raw.into()),
            position_marker,
            segments: Vec::new(),
            source_fixes: Vec::new(),
            raw_cache: OnceCell::new(),
        }))
    }

    /// Build a container segment. If `position_marker` is `None`, it is
    /// derived from the span of `segments`' own markers.
    pub fn branch(
        kind: SegmentKind,
        name: impl Into<SmolStr>,
        segments: Vec<ErasedSegment>,
        position_marker: Option<PositionMarker>,
    ) -> Self {
        let position_marker = position_marker.or_else(|| {
            let markers: Vec<&PositionMarker> =
                segments.iter().filter_map(|s| s.position_marker()).collect();
            if markers.is_empty() {
                None
            } else {
                Some(PositionMarker::from_child_markers(markers.into_iter()))
            }
        });

        ErasedSegment(Rc::new(Segment {
            id: new_id(),
            kind,
            name: name.into(),
            leaf_raw: None,
            position_marker,
            segments,
            source_fixes: Vec::new(),
            raw_cache: OnceCell::new(),
        }))
    }

    /// A fresh copy of this segment with a Bare position marker and no
    /// children reused verbatim. Used to normalize segments a rule hands
    /// to a `LintFix` as edit material: their position is meaningless
    /// until fix application assigns one.
    pub fn with_bare_position(&self) -> ErasedSegment {
        let (line_no, line_pos) = self
            .position_marker
            .as_ref()
            .map(|m| m.working_loc())
            .unwrap_or((0, 0));

        ErasedSegment(Rc::new(Segment {
            id: new_id(),
            kind: self.kind,
            name: self.name.clone(),
            leaf_raw: self.leaf_raw.clone(),
            position_marker: Some(PositionMarker::bare(line_no, line_pos)),
            segments: self.segments.clone(),
            source_fixes: self.source_fixes.clone(),
            raw_cache: OnceCell::new(),
        }))
    }

    pub fn with_source_fixes(&self, source_fixes: Vec<SourceFix>) -> ErasedSegment {
        ErasedSegment(Rc::new(Segment {
            id: new_id(),
            kind: self.kind,
            name: self.name.clone(),
            leaf_raw: self.leaf_raw.clone(),
            position_marker: self.position_marker.clone(),
            segments: self.segments.clone(),
            source_fixes,
            raw_cache: OnceCell::new(),
        }))
    }

    /// Rebuild this segment over a new child list, recomputing its raw
    /// text and position span. Used when a descendant changed but this
    /// segment itself was not the fix's anchor.
    pub fn with_children(&self, segments: Vec<ErasedSegment>) -> ErasedSegment {
        let position_marker = {
            let markers: Vec<&PositionMarker> =
                segments.iter().filter_map(|s| s.position_marker()).collect();
            if markers.is_empty() {
                self.position_marker.clone()
            } else {
                Some(PositionMarker::from_child_markers(markers.into_iter()))
            }
        };

        ErasedSegment(Rc::new(Segment {
            id: new_id(),
            kind: self.kind,
            name: self.name.clone(),
            leaf_raw: None,
            position_marker,
            segments,
            source_fixes: self.source_fixes.clone(),
            raw_cache: OnceCell::new(),
        }))
    }

    /// All segments of `kind` in this subtree, `self` included, in
    /// document order.
    pub fn recursive_crawl(&self, kind: SegmentKind) -> Vec<ErasedSegment> {
        let mut out = Vec::new();
        self.recursive_crawl_into(kind, &mut out);
        out
    }

    fn recursive_crawl_into(&self, kind: SegmentKind, out: &mut Vec<ErasedSegment>) {
        if self.kind == kind {
            out.push(self.clone());
        }
        for child in &self.segments {
            child.recursive_crawl_into(kind, out);
        }
    }

    pub fn iter_unparsables(&self) -> Vec<ErasedSegment> {
        self.recursive_crawl(SegmentKind::Unparsable)
    }

    /// Apply a batch of proposed fixes, producing a new tree plus the
    /// subset of fixes whose anchor could not be located (e.g. it was
    /// already consumed by an earlier fix targeting an ancestor in the
    /// same batch).
    ///
    /// Where multiple fixes target the same anchor, `delete` takes
    /// precedence over `replace`, which takes precedence over
    /// `create_before`/`create_after` (insertions are additive and
    /// always apply alongside whichever of the other two wins).
    pub fn apply_fixes(&self, fixes: Vec<LintFix>) -> (ErasedSegment, Vec<LintFix>) {
        let mut by_anchor: AHashMap<u32, AnchorEditInfo> = AHashMap::default();
        for fix in &fixes {
            by_anchor.entry(fix.anchor.id()).or_default().add(fix.clone());
        }

        let mut found = ahash::AHashSet::default();
        let replacement = apply_fixes_rec(self, &by_anchor, &mut found);

        let new_root = match replacement {
            None => self.clone(),
            Some(mut segs) if segs.len() == 1 => segs.pop().unwrap(),
            Some(segs) => self.with_children(segs),
        };

        let residual = fixes
            .into_iter()
            .filter(|f| !found.contains(&f.anchor.id()))
            .collect();

        (new_root, residual)
    }

    /// Derive templated-space edit patches between this (fixed) tree and
    /// `templated_file`'s rendered text: a single left-to-right pass over
    /// the tree's leaves, diffing each leaf's raw text against the
    /// templated slice it claims, and folding runs of position-less
    /// (fix-inserted) leaves into a single point patch at the cursor.
    pub fn iter_patches(&self, templated_file: &TemplatedFile) -> Vec<FixPatch> {
        let mut leaves = Vec::new();
        collect_leaves(self, &mut leaves);

        let mut patches = Vec::new();
        let mut insert_buff = String::new();
        let mut templated_idx = 0usize;
        let mut source_idx = 0usize;
        let mut post_placeholder = 0usize;

        for leaf in &leaves {
            match leaf.position_marker() {
                None => {
                    insert_buff.push_str(&leaf.raw());
                    post_placeholder += 1;
                }
                Some(PositionMarker::Bare(_)) => {
                    insert_buff.push_str(&leaf.raw());
                    post_placeholder += 1;
                }
                Some(PositionMarker::Enriched(enriched)) => {
                    // A non-empty buffer means a run of fix-inserted (bare)
                    // leaves sits where `[templated_idx, enriched.templated_slice.start)`
                    // used to be: that whole gap, not just a zero-width
                    // point, has to be replaced by the buffered text, or the
                    // text it displaced survives untouched in the output.
                    if !insert_buff.is_empty() {
                        patches.push(FixPatch::new(
                            templated_idx..enriched.templated_slice.start,
                            SmolStr::from(insert_buff.as_str()),
                            source_idx..enriched.source_slice.start,
                            post_placeholder,
                        ));
                        insert_buff.clear();
                        post_placeholder = 0;
                    }

                    let templated_raw = templated_file
                        .templated_str()
                        .get(enriched.templated_slice.clone())
                        .unwrap_or("");

                    let changed = leaf.raw() != templated_raw || !leaf.get_source_fixes().is_empty();
                    if changed {
                        if templated_file.is_source_slice_literal(&enriched.source_slice) {
                            patches.push(FixPatch::new(
                                enriched.templated_slice.clone(),
                                leaf.raw(),
                                enriched.source_slice.clone(),
                                0,
                            ));
                        } else {
                            log::warn!(
                                "discarding fix for non-literal source slice {:?}: a rule edited templated content",
                                enriched.source_slice
                            );
                        }
                    }

                    templated_idx = enriched.templated_slice.end;
                    source_idx = enriched.source_slice.end;
                }
            }
        }

        if !insert_buff.is_empty() {
            let templated_end = templated_file.templated_str().len();
            let source_end = templated_file.source_str().len();
            patches.push(FixPatch::new(
                templated_idx..templated_end,
                SmolStr::from(insert_buff.as_str()),
                source_idx..source_end,
                post_placeholder,
            ));
        }

        patches
    }
}

fn collect_leaves(seg: &ErasedSegment, out: &mut Vec<ErasedSegment>) {
    if seg.is_leaf() {
        out.push(seg.clone());
        return;
    }
    for child in seg.segments() {
        collect_leaves(child, out);
    }
}

/// Returns `None` if `seg` and its whole subtree are untouched by `by_anchor`
/// (the caller should keep reusing the existing `ErasedSegment`), or
/// `Some(replacement)` with the sequence of segments that should stand in
/// `seg`'s place in its parent's child list (possibly empty, for a delete).
fn apply_fixes_rec(
    seg: &ErasedSegment,
    by_anchor: &AHashMap<u32, AnchorEditInfo>,
    found: &mut ahash::AHashSet<u32>,
) -> Option<Vec<ErasedSegment>> {
    let own_info = by_anchor.get(&seg.id());
    if own_info.is_some() {
        found.insert(seg.id());
    }

    let own_mutates = own_info.map_or(false, |i| i.delete_count() > 0 || i.replace_count() > 0);

    let rebuilt_self: Option<ErasedSegment> = if own_mutates || seg.is_leaf() {
        None
    } else {
        let mut children_changed = false;
        let mut new_children = Vec::with_capacity(seg.segments().len());
        for child in seg.segments() {
            match apply_fixes_rec(child, by_anchor, found) {
                Some(replacement) => {
                    children_changed = true;
                    new_children.extend(replacement);
                }
                None => new_children.push(child.clone()),
            }
        }
        if children_changed {
            Some(seg.with_children(new_children))
        } else {
            None
        }
    };

    let Some(info) = own_info else {
        return rebuilt_self.map(|s| vec![s]);
    };

    let mut result = Vec::new();
    for fix in info.creates_before() {
        result.extend(fix.edit.iter().cloned());
    }
    if info.delete_count() > 0 {
        // nothing: self is removed
    } else if let Some(replace_fix) = info.replaces().next() {
        result.extend(replace_fix.edit.iter().cloned());
    } else {
        result.push(rebuilt_self.unwrap_or_else(|| seg.clone()));
    }
    for fix in info.creates_after() {
        result.extend(fix.edit.iter().cloned());
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> TemplatedFile {
        TemplatedFile::from("SELECT  1")
    }

    fn leaf_at(kind: SegmentKind, raw: &str, start: usize) -> ErasedSegment {
        let file = file();
        let slice = start..(start + raw.len());
        ErasedSegment::leaf(
            kind,
            "word",
            raw,
            Some(PositionMarker::new(slice.clone(), slice, file, None, None)),
        )
    }

    #[test]
    fn test_base_raw_concatenates_children() {
        let ws = leaf_at(SegmentKind::Whitespace, "  ", 6);
        let kw = leaf_at(SegmentKind::Keyword, "SELECT", 0);
        let branch = ErasedSegment::branch(SegmentKind::Statement, "stmt", vec![kw, ws], None);
        assert_eq!(branch.raw(), "SELECT  ");
    }

    #[test]
    fn test_base_ids_are_unique_per_construction() {
        let a = leaf_at(SegmentKind::Keyword, "SELECT", 0);
        let b = leaf_at(SegmentKind::Keyword, "SELECT", 0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_base_with_children_rebuilds_raw_and_id() {
        let kw = leaf_at(SegmentKind::Keyword, "SELECT", 0);
        let branch = ErasedSegment::branch(SegmentKind::Statement, "stmt", vec![kw.clone()], None);
        let old_id = branch.id();
        let ws = leaf_at(SegmentKind::Whitespace, " ", 6);
        let rebuilt = branch.with_children(vec![kw, ws]);
        assert_ne!(rebuilt.id(), old_id);
        assert_eq!(rebuilt.raw(), "SELECT ");
    }

    #[test]
    fn test_base_apply_fixes_delete_removes_segment() {
        let kw = leaf_at(SegmentKind::Keyword, "SELECT", 0);
        let ws = leaf_at(SegmentKind::Whitespace, "  ", 6);
        let lit = leaf_at(SegmentKind::Literal, "1", 8);
        let root = ErasedSegment::branch(
            SegmentKind::Root,
            "root",
            vec![kw, ws.clone(), lit],
            None,
        );

        let fix = LintFix::delete(ws);
        let (new_root, residual) = root.apply_fixes(vec![fix]);
        assert!(residual.is_empty());
        assert_eq!(new_root.raw(), "SELECT1");
    }

    #[test]
    fn test_base_apply_fixes_replace_precedence_over_delete_loses() {
        // delete beats replace when both target the same anchor.
        let ws = leaf_at(SegmentKind::Whitespace, "  ", 6);
        let root = ErasedSegment::branch(SegmentKind::Root, "root", vec![ws.clone()], None);

        let replacement = ErasedSegment::leaf(SegmentKind::Whitespace, "ws", " ", None);
        let delete_fix = LintFix::delete(ws.clone());
        let replace_fix = LintFix::replace(ws, vec![replacement], None);

        let (new_root, residual) = root.apply_fixes(vec![replace_fix, delete_fix]);
        assert_eq!(residual.len(), 0);
        assert_eq!(new_root.raw(), "");
    }

    #[test]
    fn test_base_apply_fixes_residual_for_unknown_anchor() {
        let kw = leaf_at(SegmentKind::Keyword, "SELECT", 0);
        let stray = leaf_at(SegmentKind::Keyword, "FROM", 100);
        let root = ErasedSegment::branch(SegmentKind::Root, "root", vec![kw], None);

        let fix = LintFix::delete(stray);
        let (new_root, residual) = root.apply_fixes(vec![fix]);
        assert_eq!(residual.len(), 1);
        assert_eq!(new_root.raw(), "SELECT");
    }

    #[test]
    fn test_base_iter_patches_unmodified_tree_yields_no_patches() {
        let kw = leaf_at(SegmentKind::Keyword, "SELECT", 0);
        let ws = leaf_at(SegmentKind::Whitespace, " ", 6);
        let lit = leaf_at(SegmentKind::Literal, "1", 7);
        let root = ErasedSegment::branch(SegmentKind::Root, "root", vec![kw, ws, lit], None);

        let patches = root.iter_patches(&TemplatedFile::from("SELECT 1"));
        assert!(patches.is_empty());
    }

    #[test]
    fn test_base_iter_patches_detects_edit() {
        let templated = TemplatedFile::from("SELECT  1");
        let kw = ErasedSegment::leaf(
            SegmentKind::Keyword,
            "kw",
            "SELECT",
            Some(PositionMarker::new(0..6, 0..6, templated.clone(), None, None)),
        );
        // Fixed tree collapses the double space to one, but still claims
        // the original two-char templated slice.
        let ws = ErasedSegment::leaf(
            SegmentKind::Whitespace,
            "ws",
            " ",
            Some(PositionMarker::new(6..8, 6..8, templated.clone(), None, None)),
        );
        let lit = ErasedSegment::leaf(
            SegmentKind::Literal,
            "lit",
            "1",
            Some(PositionMarker::new(8..9, 8..9, templated.clone(), None, None)),
        );
        let root = ErasedSegment::branch(SegmentKind::Root, "root", vec![kw, ws, lit], None);

        let patches = root.iter_patches(&templated);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].fixed_raw, " ");
        assert_eq!(patches[0].source_slice, 6..8);
    }

    #[test]
    fn test_base_iter_patches_through_replace_fix_bare_marker() {
        // Goes through the real `LintFix::replace` -> `apply_fixes` path,
        // where the edit segment gets a Bare marker (`with_bare_position`)
        // rather than an Enriched one built by hand.
        let templated = TemplatedFile::from("SELECT  1");
        let kw = ErasedSegment::leaf(
            SegmentKind::Keyword,
            "kw",
            "SELECT",
            Some(PositionMarker::new(0..6, 0..6, templated.clone(), None, None)),
        );
        let ws = ErasedSegment::leaf(
            SegmentKind::Whitespace,
            "ws",
            "  ",
            Some(PositionMarker::new(6..8, 6..8, templated.clone(), None, None)),
        );
        let lit = ErasedSegment::leaf(
            SegmentKind::Literal,
            "lit",
            "1",
            Some(PositionMarker::new(8..9, 8..9, templated.clone(), None, None)),
        );
        let root = ErasedSegment::branch(SegmentKind::Root, "root", vec![kw, ws.clone(), lit], None);

        let replacement = ErasedSegment::leaf(SegmentKind::Whitespace, "ws", " ", None);
        let fix = LintFix::replace(ws, vec![replacement], None);
        let (fixed_root, residual) = root.apply_fixes(vec![fix]);
        assert!(residual.is_empty());

        let patches = fixed_root.iter_patches(&templated);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].templated_slice, 6..8);
        assert_eq!(patches[0].source_slice, 6..8);
        assert_eq!(patches[0].fixed_raw, " ");
    }
}
