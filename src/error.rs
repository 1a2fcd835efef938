//! Error types for docx-merge
//!
//! [`Error`] covers the fatal failures that stop a merge without producing
//! output. Problems found inside the template itself are collected as
//! [`RenderError`](crate::template::RenderError)s instead.

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(#[from] zip::result::ZipError),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Malformed markup in {part}: {message}")]
    MalformedMarkup { part: String, message: String },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid part URI: {0}")]
    InvalidPartUri(String),

    #[error("Missing attribute '{attr}' on element '{element}'")]
    MissingAttribute { element: String, attr: String },

    #[error("Invalid data record: {0}")]
    InvalidData(#[from] serde_json::Error),
}

impl Error {
    /// Build a `MalformedMarkup` error for the given part
    pub fn malformed(part: impl Into<String>, message: impl ToString) -> Self {
        Error::MalformedMarkup {
            part: part.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error means the input was not a usable package
    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            Error::CorruptArchive(_) | Error::PartNotFound(_) | Error::MalformedMarkup { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
