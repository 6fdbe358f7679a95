use std::fmt::Display;
use std::ops::{Deref, DerefMut, Range};

use fancy_regex::Regex;

use super::parser::segments::base::ErasedSegment;
use crate::helpers::Config;
use crate::lint_fix::LintFix;
use crate::parser::markers::PositionMarker;

type CheckTuple = (&'static str, usize, usize);

pub trait SqlError: Display {
    fn fixable(&self) -> bool;
    fn rule_code(&self) -> Option<&'static str>;
    fn identifier(&self) -> &'static str;
    /// Get a tuple representing this error. Mostly for testing.
    fn check_tuple(&self) -> CheckTuple;
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct SQLBaseError {
    pub fatal: bool,
    pub ignore: bool,
    pub warning: bool,
    pub line_no: usize,
    pub line_pos: usize,
    pub description: String,
    pub rule: Option<ErrorStructRule>,
    pub source_slice: Range<usize>,
    pub fixable: bool,
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct ErrorStructRule {
    pub name: &'static str,
    pub code: &'static str,
}

impl SQLBaseError {
    pub fn rule_code(&self) -> &'static str {
        self.rule.as_ref().map_or("????", |rule| rule.code)
    }

    pub fn set_position_marker(&mut self, position_marker: PositionMarker) {
        let (line_no, line_pos) = position_marker.source_position();

        self.line_no = line_no;
        self.line_pos = line_pos;

        if let Some(slice) = position_marker.source_slice() {
            self.source_slice = slice;
        }
    }

    pub fn desc(&self) -> &str {
        &self.description
    }

    pub fn check_tuple(&self) -> CheckTuple {
        (self.rule_code(), self.line_no, self.line_pos)
    }
}

impl Display for SQLBaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)
    }
}

impl SqlError for SQLBaseError {
    fn fixable(&self) -> bool {
        self.fixable
    }

    fn rule_code(&self) -> Option<&'static str> {
        self.rule.as_ref().map(|r| r.code)
    }

    fn identifier(&self) -> &'static str {
        "base"
    }

    fn check_tuple(&self) -> CheckTuple {
        SQLBaseError::check_tuple(self)
    }
}

#[derive(Debug, Clone)]
pub struct SQLLintError {
    base: SQLBaseError,
    pub fixes: Vec<LintFix>,
}

impl SQLLintError {
    pub fn new(description: &str, segment: ErasedSegment, fixable: bool, fixes: Vec<LintFix>) -> Self {
        Self {
            base: SQLBaseError::default().config(|this| {
                this.description = description.into();
                if let Some(marker) = segment.get_position_marker() {
                    this.set_position_marker(marker.clone());
                }
                this.fixable = fixable;
            }),
            fixes,
        }
    }
}

impl Deref for SQLLintError {
    type Target = SQLBaseError;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DerefMut for SQLLintError {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

impl From<SQLLintError> for SQLBaseError {
    fn from(value: SQLLintError) -> Self {
        value.base
    }
}

impl From<SQLBaseError> for SQLLintError {
    fn from(value: SQLBaseError) -> Self {
        Self {
            base: value,
            fixes: vec![],
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct SQLTemplaterError {
    pub message: String,
}

impl SQLTemplaterError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

impl Display for SQLTemplaterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SQLTemplaterError: {}", self.message)
    }
}

impl SqlError for SQLTemplaterError {
    fn fixable(&self) -> bool {
        false
    }

    fn rule_code(&self) -> Option<&'static str> {
        None
    }

    fn identifier(&self) -> &'static str {
        "templater"
    }

    fn check_tuple(&self) -> CheckTuple {
        ("TMP", 0, 0)
    }
}

impl From<SQLTemplaterError> for SQLBaseError {
    fn from(value: SQLTemplaterError) -> Self {
        Self::default().config(|this| {
            this.fatal = true;
            this.description = value.message;
        })
    }
}

/// An error which should be fed back to the user.
#[derive(Debug)]
pub struct SQLFluffUserError {
    pub value: String,
}

impl SQLFluffUserError {
    pub fn new(value: String) -> SQLFluffUserError {
        SQLFluffUserError { value }
    }
}

impl Display for SQLFluffUserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug)]
pub struct ValueError {
    pub value: String,
}

impl ValueError {
    pub fn new(value: String) -> ValueError {
        ValueError { value }
    }
}

#[derive(Debug)]
pub struct SQLParseError {
    pub description: String,
    pub segment: Option<ErasedSegment>,
}

impl SQLParseError {
    pub fn matches(&self, regexp: &str) -> bool {
        let value = &self.description;
        let regex = Regex::new(regexp).expect("Invalid regex pattern");

        if let Ok(true) = regex.is_match(value) {
            true
        } else {
            let msg = format!(
                "Regex pattern did not match.\nRegex: {:?}\nInput: {:?}",
                regexp, value
            );

            if regexp == value {
                panic!("{}\nDid you mean to escape the regex?", msg);
            } else {
                panic!("{}", msg);
            }
        }
    }
}

impl From<SQLParseError> for SQLBaseError {
    fn from(value: SQLParseError) -> Self {
        let (mut line_no, mut line_pos) = Default::default();

        let pos_marker = value
            .segment
            .as_ref()
            .and_then(|segment| segment.get_position_marker());

        if let Some(pos_marker) = pos_marker {
            (line_no, line_pos) = pos_marker.source_position();
        }

        Self::default().config(|this| {
            this.fatal = true;
            this.line_no = line_no;
            this.line_pos = line_pos;
            this.description = value.description;
            this.fixable = false;
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct SQLLexError {
    pub message: String,
    pub position_marker: PositionMarker,
}

impl SQLLexError {
    pub fn new(message: String, position_marker: PositionMarker) -> SQLLexError {
        SQLLexError {
            message,
            position_marker,
        }
    }
}

#[derive(Debug)]
pub struct SQLFluffSkipFile {
    pub value: String,
}

impl SQLFluffSkipFile {
    pub fn new(value: String) -> SQLFluffSkipFile {
        SQLFluffSkipFile { value }
    }
}

impl Display for SQLFluffSkipFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "skipping file: {}", self.value)
    }
}

/// The slice map was asked to resolve an offset outside the bounds of the
/// templated file. Per the design, this indicates a bug in an upstream
/// component (lexer/parser/rule), not a recoverable user-facing error.
#[derive(Debug, thiserror::Error)]
#[error("slice map overflow: offset {offset} out of bounds for templated length {len}")]
pub struct SliceMapError {
    pub offset: usize,
    pub len: usize,
}
