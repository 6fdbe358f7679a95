use std::ops::Range;
use std::sync::Arc;

use crate::errors::{SQLFluffSkipFile, SliceMapError};

/// The kind of a templated-space file slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceKind {
    /// A verbatim copy of the matching source range.
    Literal,
    /// Templated content: source and templated lengths may differ, and
    /// source coverage may repeat (loops) or vanish (removed blocks).
    Templated,
    /// Template control syntax (`{% if %}`, `{% endfor %}`, ...). Its
    /// source range is untouchable.
    Block,
}

/// One entry of the bidirectional source<->templated mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplatedFileSlice {
    pub kind: SliceKind,
    pub source_slice: Range<usize>,
    pub templated_slice: Range<usize>,
}

impl TemplatedFileSlice {
    pub fn new(kind: SliceKind, source_slice: Range<usize>, templated_slice: Range<usize>) -> Self {
        Self {
            kind,
            source_slice,
            templated_slice,
        }
    }
}

/// The kind of a source-space (pre-expansion) raw slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawSliceKind {
    Literal,
    Templated,
    Comment,
    BlockStart,
    BlockMid,
    BlockEnd,
}

/// A slice of the *original* (pre-expansion) source, as produced by the
/// templater while it scans template syntax. Used to decide which source
/// regions are literal (safe to treat as fixable) and which are
/// untouchable template control syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawFileSlice {
    pub raw: String,
    pub kind: RawSliceKind,
    pub source_idx: usize,
    /// Index grouping the slices belonging to the same `{% block %}...{% endblock %}`.
    pub block_idx: usize,
}

impl RawFileSlice {
    pub fn new(raw: String, kind: RawSliceKind, source_idx: usize, block_idx: usize) -> Self {
        Self {
            raw,
            kind,
            source_idx,
            block_idx,
        }
    }

    pub fn end_source_idx(&self) -> usize {
        self.source_idx + self.raw.len()
    }

    pub fn source_slice(&self) -> Range<usize> {
        self.source_idx..self.end_source_idx()
    }

    /// Block markers and comments are "source-only": present in the
    /// source but with no corresponding templated-space presence a fix
    /// could touch.
    pub fn is_source_only_slice(&self) -> bool {
        matches!(
            self.kind,
            RawSliceKind::Comment
                | RawSliceKind::BlockStart
                | RawSliceKind::BlockMid
                | RawSliceKind::BlockEnd
        )
    }
}

#[derive(Debug)]
struct TemplatedFileInner {
    source_str: String,
    f_name: String,
    templated_str: Option<String>,
    source_newlines: Vec<usize>,
    templated_newlines: Vec<usize>,
    raw_sliced: Vec<RawFileSlice>,
    sliced_file: Vec<TemplatedFileSlice>,
}

fn newline_positions(s: &str) -> Vec<usize> {
    s.char_indices().filter(|(_, c)| *c == '\n').map(|(i, _)| i).collect()
}

/// An immutable triple of (source string, templated string, slice map)
/// shared cheaply across the tree that was parsed from it.
#[derive(Debug, Clone)]
pub struct TemplatedFile {
    inner: Arc<TemplatedFileInner>,
}

impl PartialEq for TemplatedFile {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.source_str == other.inner.source_str
                && self.inner.templated_str == other.inner.templated_str)
    }
}

impl From<&str> for TemplatedFile {
    fn from(value: &str) -> Self {
        TemplatedFile::literal(value.to_string(), "<string>".to_string())
    }
}

impl From<String> for TemplatedFile {
    fn from(value: String) -> Self {
        TemplatedFile::literal(value, "<string>".to_string())
    }
}

impl TemplatedFile {
    /// Build a literal (untemplated) file: the templated string equals the
    /// source string verbatim, one literal slice covers everything.
    pub fn literal(source_str: String, f_name: String) -> Self {
        let len = source_str.len();
        let sliced_file = vec![TemplatedFileSlice::new(SliceKind::Literal, 0..len, 0..len)];
        let raw_sliced = vec![RawFileSlice::new(
            source_str.clone(),
            RawSliceKind::Literal,
            0,
            0,
        )];

        TemplatedFile::new(source_str, f_name, None, sliced_file, raw_sliced)
            .expect("a single literal slice is always internally consistent")
    }

    /// Construct a templated file given the computed slice maps. Fails if
    /// the templated slices don't tile `[0, len(templated))` contiguously
    /// and in order, or if a literal slice's source/templated lengths
    /// diverge.
    pub fn new(
        source_str: String,
        f_name: String,
        templated_str: Option<String>,
        sliced_file: Vec<TemplatedFileSlice>,
        raw_sliced: Vec<RawFileSlice>,
    ) -> Result<Self, SQLFluffSkipFile> {
        let templated_len = templated_str.as_deref().unwrap_or(&source_str).len();

        let mut expected_start = 0usize;
        for slice in &sliced_file {
            if slice.templated_slice.start != expected_start {
                return Err(SQLFluffSkipFile::new(format!(
                    "Templated slices are not contiguous: expected start {}, got {}",
                    expected_start, slice.templated_slice.start
                )));
            }
            if slice.templated_slice.end < slice.templated_slice.start {
                return Err(SQLFluffSkipFile::new(
                    "Templated slice has end before start".to_string(),
                ));
            }
            if slice.kind == SliceKind::Literal
                && slice.source_slice.len() != slice.templated_slice.len()
            {
                return Err(SQLFluffSkipFile::new(
                    "Literal slice source/templated lengths diverge".to_string(),
                ));
            }
            expected_start = slice.templated_slice.end;
        }
        if expected_start != templated_len {
            return Err(SQLFluffSkipFile::new(format!(
                "Templated slices cover {} of {} bytes",
                expected_start, templated_len
            )));
        }

        let source_newlines = newline_positions(&source_str);
        let templated_newlines = newline_positions(templated_str.as_deref().unwrap_or(&source_str));

        Ok(TemplatedFile {
            inner: Arc::new(TemplatedFileInner {
                source_str,
                f_name,
                templated_str,
                source_newlines,
                templated_newlines,
                raw_sliced,
                sliced_file,
            }),
        })
    }

    pub fn source_str(&self) -> &str {
        &self.inner.source_str
    }

    pub fn templated_str(&self) -> &str {
        self.inner.templated_str.as_deref().unwrap_or(&self.inner.source_str)
    }

    pub fn f_name(&self) -> &str {
        &self.inner.f_name
    }

    pub fn sliced_file(&self) -> &[TemplatedFileSlice] {
        &self.inner.sliced_file
    }

    pub fn raw_sliced(&self) -> &[RawFileSlice] {
        &self.inner.raw_sliced
    }

    /// Line/column (1-indexed) of a char offset, in either the source or
    /// templated string depending on `source`.
    pub fn get_line_pos_of_char_pos(&self, char_pos: usize, source: bool) -> (usize, usize) {
        let newlines = if source {
            &self.inner.source_newlines
        } else {
            &self.inner.templated_newlines
        };

        let idx = match newlines.binary_search(&char_pos) {
            Ok(i) => i,
            Err(i) => i,
        };

        let line_no = idx + 1;
        let line_start = if idx == 0 { 0 } else { newlines[idx - 1] + 1 };
        (line_no, char_pos - line_start + 1)
    }

    /// Map a templated-space half-open range into the source space.
    ///
    /// See the slice map invariants: endpoints inside `literal` slices
    /// shift by a constant offset; endpoints inside `templated`/`block`
    /// slices snap to the slice's whole source range; a range spanning
    /// multiple slices maps to the union of their source ranges.
    pub fn templated_slice_to_source_slice(
        &self,
        t_range: Range<usize>,
    ) -> Result<Range<usize>, SliceMapError> {
        let templated_len = self.templated_str().len();
        if t_range.start > templated_len || t_range.end > templated_len || t_range.start > t_range.end
        {
            return Err(SliceMapError {
                offset: t_range.end,
                len: templated_len,
            });
        }

        if self.inner.sliced_file.is_empty() {
            return Ok(t_range);
        }

        if t_range.start == t_range.end {
            let point = t_range.start;
            for slice in &self.inner.sliced_file {
                if slice.templated_slice.start <= point && point <= slice.templated_slice.end {
                    let s = map_endpoint(slice, point);
                    return Ok(s..s);
                }
            }
            if let Some(last) = self.inner.sliced_file.last() {
                return Ok(last.source_slice.end..last.source_slice.end);
            }
            return Ok(point..point);
        }

        let intersecting: Vec<&TemplatedFileSlice> = self
            .inner
            .sliced_file
            .iter()
            .filter(|s| s.templated_slice.start < t_range.end && s.templated_slice.end > t_range.start)
            .collect();

        if intersecting.is_empty() {
            return Err(SliceMapError {
                offset: t_range.end,
                len: templated_len,
            });
        }

        if intersecting.len() == 1 {
            let slice = intersecting[0];
            let start = map_endpoint(slice, t_range.start);
            let stop = map_endpoint(slice, t_range.end);
            return Ok(start.min(stop)..start.max(stop));
        }

        let s_start = intersecting.iter().map(|s| s.source_slice.start).min().unwrap();
        let s_stop = intersecting.iter().map(|s| s.source_slice.end).max().unwrap();
        Ok(s_start..s_stop)
    }

    /// Source ranges that must never be touched by a fix: template
    /// control syntax (`block` slices) and zero-length `templated`
    /// slices (content the template removed entirely), sorted and merged.
    pub fn untouchable_slices(&self) -> Vec<Range<usize>> {
        let mut ranges: Vec<Range<usize>> = self
            .inner
            .sliced_file
            .iter()
            .filter(|s| {
                s.kind == SliceKind::Block || (s.kind == SliceKind::Templated && s.templated_slice.is_empty())
            })
            .map(|s| s.source_slice.clone())
            .filter(|r| !r.is_empty())
            .collect();

        ranges.sort_by_key(|r| r.start);

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
        for range in ranges.drain(..) {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => {
                    last.end = last.end.max(range.end);
                }
                _ => merged.push(range),
            }
        }
        merged
    }

    /// True iff every raw slice overlapping `source_slice` is itself
    /// literal, i.e. the source range round-trips through the template
    /// unchanged.
    pub fn is_source_slice_literal(&self, source_slice: &Range<usize>) -> bool {
        let overlapping = self.raw_slices_spanning_source_slice(source_slice);
        if overlapping.is_empty() {
            return true;
        }
        overlapping.iter().all(|s| s.kind == RawSliceKind::Literal)
    }

    pub fn raw_slices_spanning_source_slice(&self, source_slice: &Range<usize>) -> Vec<&RawFileSlice> {
        self.inner
            .raw_sliced
            .iter()
            .filter(|s| {
                let end = s.end_source_idx();
                if source_slice.is_empty() {
                    s.source_idx <= source_slice.start && source_slice.start <= end
                } else {
                    s.source_idx < source_slice.end && end > source_slice.start
                }
            })
            .collect()
    }

    /// Raw slices holding template control syntax or comments: present
    /// in the source with nothing in templated space to anchor a fix to.
    pub fn source_only_slices(&self) -> Vec<&RawFileSlice> {
        self.inner
            .raw_sliced
            .iter()
            .filter(|s| s.is_source_only_slice())
            .collect()
    }
}

fn map_endpoint(slice: &TemplatedFileSlice, t_offset: usize) -> usize {
    match slice.kind {
        SliceKind::Literal => {
            let delta = t_offset.saturating_sub(slice.templated_slice.start);
            slice.source_slice.start + delta
        }
        SliceKind::Templated | SliceKind::Block => {
            if t_offset <= slice.templated_slice.start {
                slice.source_slice.start
            } else {
                slice.source_slice.end
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complex_file() -> TemplatedFile {
        // "SELECT {{col}} FROM t" -> "SELECT id FROM t"
        let source = "SELECT {{col}} FROM t".to_string();
        let templated = "SELECT id FROM t".to_string();

        let sliced_file = vec![
            TemplatedFileSlice::new(SliceKind::Literal, 0..7, 0..7),
            TemplatedFileSlice::new(SliceKind::Templated, 7..14, 7..9),
            TemplatedFileSlice::new(SliceKind::Literal, 14..21, 9..16),
        ];
        let raw_sliced = vec![
            RawFileSlice::new("SELECT ".to_string(), RawSliceKind::Literal, 0, 0),
            RawFileSlice::new("{{col}}".to_string(), RawSliceKind::Templated, 7, 0),
            RawFileSlice::new(" FROM t".to_string(), RawSliceKind::Literal, 14, 0),
        ];

        TemplatedFile::new(source, "test".to_string(), Some(templated), sliced_file, raw_sliced).unwrap()
    }

    #[test]
    fn test_templated_file_literal_round_trip() {
        let file = TemplatedFile::from("SELECT 1 FROM t");
        let source = file.templated_slice_to_source_slice(7..8).unwrap();
        assert_eq!(source, 7..8);
    }

    #[test]
    fn test_templated_file_templated_slice_to_source_slice_literal() {
        let file = complex_file();
        // "FROM" sits at templated offset 10..14, inside the trailing literal slice.
        assert_eq!(file.templated_slice_to_source_slice(10..14).unwrap(), 15..19);
    }

    #[test]
    fn test_templated_file_templated_slice_to_source_slice_templated() {
        let file = complex_file();
        // "id" sits at templated offset 7..9, fully inside the templated slice: snaps to {{col}}.
        assert_eq!(file.templated_slice_to_source_slice(7..9).unwrap(), 7..14);
    }

    #[test]
    fn test_templated_file_untouchable_is_empty_without_blocks() {
        let file = complex_file();
        assert!(file.untouchable_slices().is_empty());
    }

    #[test]
    fn test_templated_file_is_source_slice_literal() {
        let file = complex_file();
        assert!(file.is_source_slice_literal(&(0..7)));
        assert!(!file.is_source_slice_literal(&(7..14)));
    }

    #[test]
    fn test_templated_file_out_of_bounds_errors() {
        let file = TemplatedFile::from("abc");
        assert!(file.templated_slice_to_source_slice(0..10).is_err());
    }
}
