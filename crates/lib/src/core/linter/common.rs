use sqruff_lib_core::errors::{SQLBaseError, SQLTemplaterError};
use sqruff_lib_core::parser::segments::base::ErasedSegment;
use sqruff_lib_core::templaters::TemplatedFile;

/// The result of templating one file: the slice map plus whatever the
/// templater itself flagged as a violation (e.g. a malformed placeholder).
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub templated_file: TemplatedFile,
    pub templater_violations: Vec<SQLTemplaterError>,
    pub filename: String,
    pub source_str: String,
}

/// The result of lexing and parsing a rendered file.
#[derive(Debug, Clone)]
pub struct ParsedString {
    pub tree: Option<ErasedSegment>,
    pub violations: Vec<SQLBaseError>,
    pub templated_file: TemplatedFile,
    pub filename: String,
    pub source_str: String,
}
