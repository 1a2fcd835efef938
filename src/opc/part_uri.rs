//! Part names inside an OPC package

use crate::error::{Error, Result};
use std::fmt;

/// Name of a part within an OPC package.
///
/// Part URIs are always absolute paths starting with '/'.
/// Example: `/word/document.xml`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartUri {
    path: String,
}

impl PartUri {
    /// Create a new PartUri from a string.
    ///
    /// The path will be normalized (leading '/' ensured, no trailing '/').
    pub fn new(path: &str) -> Result<Self> {
        let path = path.trim();

        if path.is_empty() {
            return Err(Error::InvalidPartUri("empty path".into()));
        }

        let normalized = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        let normalized = normalized.trim_end_matches('/').to_string();

        if normalized.is_empty() || normalized.contains("//") {
            return Err(Error::InvalidPartUri(format!(
                "invalid path '{}': empty segment",
                path
            )));
        }

        Ok(Self { path: normalized })
    }

    /// Wrap a constant that is already a normalized part name
    pub(crate) fn from_known(path: &'static str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    /// Build a part URI from a zip entry name (no leading '/')
    pub fn from_zip_name(name: &str) -> Result<Self> {
        Self::new(name)
    }

    /// Get the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The zip entry name for this part
    pub fn zip_name(&self) -> &str {
        &self.path[1..]
    }

    /// Get the file name portion
    pub fn file_name(&self) -> Option<&str> {
        self.path.rsplit('/').next()
    }

    /// Get the file extension
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        let (_, ext) = name.rsplit_once('.')?;
        (!ext.is_empty()).then_some(ext)
    }

    /// Get the parent directory, `None` for parts at the package root
    pub fn parent(&self) -> Option<&str> {
        let pos = self.path.rfind('/')?;
        (pos != 0).then(|| &self.path[..pos])
    }

    /// Resolve a relationship target relative to this part.
    ///
    /// For `/word/document.xml` and `../media/image1.png`, returns `/media/image1.png`
    pub fn resolve(&self, relative: &str) -> Result<PartUri> {
        if relative.starts_with('/') {
            return PartUri::new(relative);
        }

        let base_dir = self.parent().unwrap_or("");
        let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();

        for segment in relative.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }

        PartUri::new(&format!("/{}", segments.join("/")))
    }
}

impl fmt::Display for PartUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl std::str::FromStr for PartUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PartUri::new(s)
    }
}

/// Well-known part URIs
pub mod well_known {
    pub const CONTENT_TYPES: &str = "/[Content_Types].xml";
    pub const PACKAGE_RELS: &str = "/_rels/.rels";
}
