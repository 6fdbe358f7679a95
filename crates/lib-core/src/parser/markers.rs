use std::ops::Range;

use crate::templaters::TemplatedFile;

/// The position of a segment, either anchored to the original template
/// coordinates or, for segments a fix synthesized, bare.
///
/// This is a genuine tagged union rather than two types related by
/// inheritance: code that cares about the distinction matches on the
/// variant instead of probing for "emptiness".
#[derive(Debug, Clone, PartialEq)]
pub enum PositionMarker {
    Enriched(EnrichedPositionMarker),
    Bare(BarePositionMarker),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPositionMarker {
    pub source_slice: Range<usize>,
    pub templated_slice: Range<usize>,
    pub templated_file: TemplatedFile,
    pub working_line_no: usize,
    pub working_line_pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BarePositionMarker {
    pub working_line_no: usize,
    pub working_line_pos: usize,
}

impl PositionMarker {
    pub fn new(
        source_slice: Range<usize>,
        templated_slice: Range<usize>,
        templated_file: TemplatedFile,
        working_line_no: Option<usize>,
        working_line_pos: Option<usize>,
    ) -> Self {
        let (working_line_no, working_line_pos) = match (working_line_no, working_line_pos) {
            (Some(no), Some(pos)) => (no, pos),
            _ => templated_file.get_line_pos_of_char_pos(templated_slice.start, true),
        };

        PositionMarker::Enriched(EnrichedPositionMarker {
            source_slice,
            templated_slice,
            templated_file,
            working_line_no,
            working_line_pos,
        })
    }

    /// A marker for a segment synthesized by a fix: no source/templated
    /// coordinates exist for it, only an inferred working location.
    pub fn bare(working_line_no: usize, working_line_pos: usize) -> Self {
        PositionMarker::Bare(BarePositionMarker {
            working_line_no,
            working_line_pos,
        })
    }

    /// True for markers synthesized by a fix rather than produced by the parse.
    pub fn is_point(&self) -> bool {
        matches!(self, PositionMarker::Bare(_))
    }

    pub fn as_enriched(&self) -> Option<&EnrichedPositionMarker> {
        match self {
            PositionMarker::Enriched(e) => Some(e),
            PositionMarker::Bare(_) => None,
        }
    }

    pub fn source_slice(&self) -> Option<Range<usize>> {
        self.as_enriched().map(|e| e.source_slice.clone())
    }

    pub fn templated_slice(&self) -> Option<Range<usize>> {
        self.as_enriched().map(|e| e.templated_slice.clone())
    }

    pub fn working_loc(&self) -> (usize, usize) {
        match self {
            PositionMarker::Enriched(e) => (e.working_line_no, e.working_line_pos),
            PositionMarker::Bare(b) => (b.working_line_no, b.working_line_pos),
        }
    }

    /// True iff the templated range is a verbatim copy of the matching
    /// source range, i.e. the segment lies outside any template expansion.
    pub fn is_literal(&self) -> bool {
        match self {
            PositionMarker::Enriched(e) => e.templated_file.is_source_slice_literal(&e.source_slice),
            PositionMarker::Bare(_) => false,
        }
    }

    /// Line/column in the *source* file, 1-indexed.
    pub fn source_position(&self) -> (usize, usize) {
        match self {
            PositionMarker::Enriched(e) => e
                .templated_file
                .get_line_pos_of_char_pos(e.source_slice.start, false),
            PositionMarker::Bare(_) => (0, 0),
        }
    }

    /// Combine the span of several child markers into one covering marker.
    ///
    /// If every child carries an Enriched marker against the same
    /// templated file, the result is Enriched and covers their combined
    /// span. Otherwise (no children, or any Bare child) the result is
    /// Bare, using the working location of the first child.
    pub fn from_child_markers<'a>(markers: impl Iterator<Item = &'a PositionMarker>) -> Self {
        let markers: Vec<&PositionMarker> = markers.collect();

        if markers.is_empty() {
            return PositionMarker::bare(0, 0);
        }

        let all_enriched = markers
            .iter()
            .all(|m| matches!(m, PositionMarker::Enriched(_)));

        if all_enriched {
            let enriched: Vec<&EnrichedPositionMarker> =
                markers.iter().map(|m| m.as_enriched().unwrap()).collect();

            let first_file = &enriched[0].templated_file;
            if enriched.iter().all(|e| e.templated_file == *first_file) {
                let source_start = enriched.iter().map(|e| e.source_slice.start).min().unwrap();
                let source_stop = enriched.iter().map(|e| e.source_slice.end).max().unwrap();
                let templated_start = enriched
                    .iter()
                    .map(|e| e.templated_slice.start)
                    .min()
                    .unwrap();
                let templated_stop = enriched.iter().map(|e| e.templated_slice.end).max().unwrap();

                return PositionMarker::new(
                    source_start..source_stop,
                    templated_start..templated_stop,
                    first_file.clone(),
                    None,
                    None,
                );
            }
        }

        let (line_no, line_pos) = markers[0].working_loc();
        PositionMarker::bare(line_no, line_pos)
    }

    /// Construct a zero-width marker sitting at the start of `self`.
    pub fn start_point_marker(&self) -> Self {
        match self {
            PositionMarker::Enriched(e) => PositionMarker::new(
                e.source_slice.start..e.source_slice.start,
                e.templated_slice.start..e.templated_slice.start,
                e.templated_file.clone(),
                Some(e.working_line_no),
                Some(e.working_line_pos),
            ),
            PositionMarker::Bare(b) => PositionMarker::bare(b.working_line_no, b.working_line_pos),
        }
    }

    /// Construct a zero-width marker sitting at the end of `self`.
    pub fn end_point_marker(&self) -> Self {
        match self {
            PositionMarker::Enriched(e) => {
                let (line_no, line_pos) = infer_next_position("", e.working_line_no, e.working_line_pos);
                PositionMarker::new(
                    e.source_slice.end..e.source_slice.end,
                    e.templated_slice.end..e.templated_slice.end,
                    e.templated_file.clone(),
                    Some(line_no),
                    Some(line_pos),
                )
            }
            PositionMarker::Bare(b) => PositionMarker::bare(b.working_line_no, b.working_line_pos),
        }
    }

    /// The working line/col a segment with raw text `raw` placed right
    /// after this marker would start at.
    pub fn working_loc_after(&self, raw: &str) -> (usize, usize) {
        let (line_no, line_pos) = self.working_loc();
        infer_next_position(raw, line_no, line_pos)
    }
}

impl PartialOrd for PositionMarker {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.working_loc().partial_cmp(&other.working_loc())
    }
}

/// Given a starting line/col and a run of raw text, compute the line/col
/// immediately after it (1-indexed lines, 1-indexed columns).
pub fn infer_next_position(raw: &str, line_no: usize, line_pos: usize) -> (usize, usize) {
    if raw.is_empty() {
        return (line_no, line_pos);
    }

    let newlines = raw.matches('\n').count();
    if newlines == 0 {
        (line_no, line_pos + raw.chars().count())
    } else {
        let after_last_newline = raw.rsplit('\n').next().unwrap_or("");
        (line_no + newlines, after_last_newline.chars().count() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> TemplatedFile {
        TemplatedFile::from("SELECT 1 FROM t")
    }

    #[test]
    fn test_markers_infer_next_position() {
        assert_eq!(infer_next_position("abc", 1, 1), (1, 4));
        assert_eq!(infer_next_position("abc\ndef", 1, 1), (2, 4));
        assert_eq!(infer_next_position("", 3, 5), (3, 5));
    }

    #[test]
    fn test_markers_bare_is_point() {
        let bare = PositionMarker::bare(1, 1);
        assert!(bare.is_point());
        assert!(!bare.is_literal());
    }

    #[test]
    fn test_markers_enriched_not_point() {
        let pm = PositionMarker::new(0..6, 0..6, file(), None, None);
        assert!(!pm.is_point());
    }

    #[test]
    fn test_markers_comparison() {
        let a = PositionMarker::bare(1, 1);
        let b = PositionMarker::bare(1, 5);
        assert!(a < b);
    }

    #[test]
    fn test_markers_from_child_markers_mixed_is_bare() {
        let enriched = PositionMarker::new(0..6, 0..6, file(), None, None);
        let bare = PositionMarker::bare(1, 7);
        let combined = PositionMarker::from_child_markers(vec![enriched, bare].iter());
        assert!(combined.is_point());
    }
}
