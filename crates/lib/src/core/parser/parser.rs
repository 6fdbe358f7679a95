use sqruff_lib_core::parser::segments::base::{ErasedSegment, SegmentKind};

/// Group a flat token stream into a tree: statements split on top-level
/// `;` symbols, wrapped in a single `Root`. This is intentionally not a
/// grammar — no attempt is made to recognise clauses, expressions, or any
/// dialect-specific structure; rules that need finer-grained structure
/// crawl the token kinds directly.
pub fn parse(tokens: Vec<ErasedSegment>) -> ErasedSegment {
    let mut statements = Vec::new();
    let mut current = Vec::new();

    for token in tokens {
        let is_terminator = token.kind() == SegmentKind::Symbol && token.raw() == ";";
        current.push(token);
        if is_terminator {
            statements.push(ErasedSegment::branch(SegmentKind::Statement, "statement", current, None));
            current = Vec::new();
        }
    }

    if !current.is_empty() {
        statements.push(ErasedSegment::branch(SegmentKind::Statement, "statement", current, None));
    }

    ErasedSegment::branch(SegmentKind::Root, "file", statements, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::lexer::lex;
    use sqruff_lib_core::templaters::TemplatedFile;

    #[test]
    fn test_parse_splits_statements() {
        let templated_file: TemplatedFile = "SELECT 1; SELECT 2;".into();
        let (tokens, _) = lex(&templated_file);
        let tree = parse(tokens);
        assert_eq!(tree.kind(), SegmentKind::Root);
        let statements = tree.segments();
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| s.kind() == SegmentKind::Statement));
    }

    #[test]
    fn test_parse_trailing_statement_without_semicolon() {
        let templated_file: TemplatedFile = "SELECT 1".into();
        let (tokens, _) = lex(&templated_file);
        let tree = parse(tokens);
        assert_eq!(tree.segments().len(), 1);
    }
}
