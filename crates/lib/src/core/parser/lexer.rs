use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;
use sqruff_lib_core::errors::SQLLexError;
use sqruff_lib_core::parser::markers::PositionMarker;
use sqruff_lib_core::parser::segments::base::{ErasedSegment, SegmentKind};
use sqruff_lib_core::templaters::TemplatedFile;

/// One lexical rule: a regex, tried in order, and the kind it produces.
/// Not a SQL grammar — just enough tokenisation that rules have something
/// to crawl. Dialect-specific keyword/operator sets are deliberately not
/// modelled here.
struct LexRule {
    pattern: &'static Regex,
    kind: SegmentKind,
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[ \t]+").unwrap());
static NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\r\n|\n)").unwrap());
static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^--[^\n]*").unwrap());
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^/\*.*?(\*/|$)").unwrap());
static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^'([^'\\]|\\.)*'").unwrap());
static QUOTED_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"([^"\\]|\\.)*""#).unwrap());
static NUMERIC_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?").unwrap());
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap());
static COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^,").unwrap());
static SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(<=|>=|<>|!=|[()=<>+\-*/.;:])").unwrap());

fn rules() -> Vec<LexRule> {
    vec![
        LexRule { pattern: &NEWLINE, kind: SegmentKind::Newline },
        LexRule { pattern: &WHITESPACE, kind: SegmentKind::Whitespace },
        LexRule { pattern: &LINE_COMMENT, kind: SegmentKind::Comment },
        LexRule { pattern: &BLOCK_COMMENT, kind: SegmentKind::Comment },
        LexRule { pattern: &STRING_LITERAL, kind: SegmentKind::Literal },
        LexRule { pattern: &QUOTED_IDENT, kind: SegmentKind::Identifier },
        LexRule { pattern: &NUMERIC_LITERAL, kind: SegmentKind::Literal },
        LexRule { pattern: &WORD, kind: SegmentKind::Keyword },
        LexRule { pattern: &COMMA, kind: SegmentKind::Comma },
        LexRule { pattern: &SYMBOL, kind: SegmentKind::Symbol },
    ]
}

/// Tokenise a templated file into leaf segments. Matching happens against
/// the templated string; each token's source span is recovered through
/// the slice map so downstream fixes land in the right place in the
/// original file.
pub fn lex(templated_file: &TemplatedFile) -> (Vec<ErasedSegment>, Vec<SQLLexError>) {
    let rule_set = rules();
    let content = templated_file.templated_str();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut pos = 0usize;

    while pos < content.len() {
        let remainder = &content[pos..];
        let matched = rule_set.iter().find_map(|rule| {
            rule.pattern.find(remainder).map(|m| (m.as_str(), rule.kind))
        });

        match matched {
            Some((text, kind)) => {
                let templated_slice = pos..pos + text.len();
                let position_marker = match templated_file.templated_slice_to_source_slice(templated_slice.clone())
                {
                    Ok(source_slice) => PositionMarker::new(
                        source_slice,
                        templated_slice.clone(),
                        templated_file.clone(),
                        None,
                        None,
                    ),
                    Err(_) => PositionMarker::bare(0, 0),
                };
                let name: SmolStr = match kind {
                    SegmentKind::Whitespace => "whitespace".into(),
                    SegmentKind::Newline => "newline".into(),
                    SegmentKind::Comment => "comment".into(),
                    SegmentKind::Literal => "literal".into(),
                    SegmentKind::Identifier => "identifier".into(),
                    SegmentKind::Keyword => "word".into(),
                    SegmentKind::Comma => "comma".into(),
                    SegmentKind::Symbol => "symbol".into(),
                    _ => "code".into(),
                };
                tokens.push(ErasedSegment::leaf(kind, name, text, Some(position_marker)));
                pos += text.len();
            }
            None => {
                // Unrecognised character: emit it as a one-char "Other" leaf
                // rather than aborting the whole file.
                let ch_len = remainder.chars().next().map(char::len_utf8).unwrap_or(1);
                let templated_slice = pos..pos + ch_len;
                let text = &remainder[..ch_len];
                let position_marker = match templated_file
                    .templated_slice_to_source_slice(templated_slice.clone())
                {
                    Ok(source_slice) => PositionMarker::new(
                        source_slice,
                        templated_slice.clone(),
                        templated_file.clone(),
                        None,
                        None,
                    ),
                    Err(_) => PositionMarker::bare(0, 0),
                };
                errors.push(SQLLexError::new(
                    format!("Unable to lex character: {text:?}"),
                    position_marker.clone(),
                ));
                tokens.push(ErasedSegment::leaf(SegmentKind::Other, "unknown", text, Some(position_marker)));
                pos += ch_len;
            }
        }
    }

    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_simple_select() {
        let templated_file: TemplatedFile = "SELECT 1, 2 FROM tbl;".into();
        let (tokens, errors) = lex(&templated_file);
        assert!(errors.is_empty());
        let raw: String = tokens.iter().map(|t| t.raw().to_string()).collect();
        assert_eq!(raw, "SELECT 1, 2 FROM tbl;");
        assert_eq!(tokens.first().unwrap().kind(), SegmentKind::Keyword);
        assert!(tokens.iter().any(|t| t.kind() == SegmentKind::Comma));
    }

    #[test]
    fn test_lex_comment_and_string() {
        let templated_file: TemplatedFile = "SELECT 'a' -- trailing\n".into();
        let (tokens, _) = lex(&templated_file);
        assert!(tokens.iter().any(|t| t.kind() == SegmentKind::Literal && t.raw() == "'a'"));
        assert!(tokens.iter().any(|t| t.kind() == SegmentKind::Comment));
    }
}
