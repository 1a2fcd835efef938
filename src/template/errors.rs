//! Non-fatal render errors and their collector

use crate::template::Tag;
use std::fmt;
use thiserror::Error;

/// What went wrong with a tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderErrorKind {
    /// `{` without a closing `}` in the same paragraph
    UnterminatedTag,
    /// `}` without an opening `{`
    UnexpectedDelimiter,
    /// Section open without a matching close, or a stray close
    UnbalancedLoop,
    /// Tag with an empty or malformed name
    InvalidTag,
    /// `{@name}` value that is not well-formed markup
    InvalidRawXml,
    /// Name not found, reported only when missing fields are errors
    MissingField,
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenderErrorKind::UnterminatedTag => "unterminated tag",
            RenderErrorKind::UnexpectedDelimiter => "unexpected delimiter",
            RenderErrorKind::UnbalancedLoop => "unbalanced loop",
            RenderErrorKind::InvalidTag => "invalid tag",
            RenderErrorKind::InvalidRawXml => "invalid raw XML",
            RenderErrorKind::MissingField => "missing field",
        };
        f.write_str(s)
    }
}

/// Where an error was found
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// Part name, e.g. `/word/document.xml`
    pub part: String,
    /// Character offset into the part's paragraph text
    pub offset: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.part, self.offset)
    }
}

/// A problem found while rendering; the render still completes
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} '{tag}' at {location} near \"{context}\"")]
pub struct RenderError {
    pub kind: RenderErrorKind,
    /// Offending tag text as written in the template
    pub tag: String,
    /// Paragraph text surrounding the tag
    pub context: String,
    pub location: Location,
}

impl RenderError {
    pub fn new(
        kind: RenderErrorKind,
        tag: impl Into<String>,
        context: impl Into<String>,
        part: &str,
        offset: usize,
    ) -> Self {
        Self {
            kind,
            tag: tag.into(),
            context: context.into(),
            location: Location {
                part: part.to_string(),
                offset,
            },
        }
    }

    /// Error about an installed tag
    pub fn for_tag(kind: RenderErrorKind, tag: &Tag, part: &str) -> Self {
        Self::new(kind, tag.source.clone(), tag.context.clone(), part, tag.offset)
    }
}

/// Accumulates render errors for one part
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<RenderError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    pub fn record(&mut self, error: RenderError) {
        log::trace!("render error: {}", error);
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Take all errors in document order.
    ///
    /// Loop clones repeat their tags' offsets, so errors raised inside a
    /// loop stay grouped at the loop's position.
    pub fn drain(&mut self) -> Vec<RenderError> {
        let mut errors = std::mem::take(&mut self.errors);
        errors.sort_by_key(|e| e.location.offset);
        errors
    }
}
