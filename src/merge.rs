//! Merge pipeline: template package in, rendered package out

use crate::error::{Error, Result};
use crate::opc::{Package, PartUri};
use crate::template::{self, ErrorCollector, RenderError};
use crate::xml::XmlDocument;
use serde_json::Value;

/// What a tag naming an absent field renders
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingFieldPolicy {
    /// Render nothing
    #[default]
    Empty,
    /// Render the error placeholder and record a `MissingField` error
    Error,
}

/// Merge options
#[derive(Clone, Debug)]
pub struct MergeOptions {
    pub missing_field: MissingFieldPolicy,
    /// Turn `\n` in values into line breaks
    pub linebreaks: bool,
    /// Also merge headers, footers, footnotes and endnotes
    pub include_headers_footers: bool,
    /// Text left in the document where a tag failed
    pub error_placeholder: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            missing_field: MissingFieldPolicy::Empty,
            linebreaks: true,
            include_headers_footers: true,
            error_placeholder: "#ERR#".to_string(),
        }
    }
}

impl MergeOptions {
    pub fn missing_field(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_field = policy;
        self
    }

    pub fn linebreaks(mut self, enabled: bool) -> Self {
        self.linebreaks = enabled;
        self
    }

    pub fn include_headers_footers(mut self, enabled: bool) -> Self {
        self.include_headers_footers = enabled;
        self
    }

    pub fn error_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.error_placeholder = placeholder.into();
        self
    }
}

/// Result of a merge
#[derive(Debug)]
pub struct MergeOutput {
    /// The rendered package
    pub bytes: Vec<u8>,
    /// Non-fatal errors, grouped by part in merge order
    pub errors: Vec<RenderError>,
}

impl MergeOutput {
    /// Whether the merge found no problems in the template
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Renders templates with a fixed set of options
#[derive(Clone, Debug, Default)]
pub struct Merger {
    options: MergeOptions,
}

impl Merger {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge `data` into the template package `template`
    pub fn render(&self, template: &[u8], data: &Value) -> Result<MergeOutput> {
        let mut package = Package::from_bytes(template)?;
        let main = package
            .main_document_uri()
            .ok_or_else(|| Error::PartNotFound("main document".to_string()))?;

        let uris = if self.options.include_headers_footers {
            package.template_part_uris()
        } else {
            vec![main]
        };

        let mut errors = Vec::new();
        for uri in &uris {
            errors.extend(self.render_part(&mut package, uri, data)?);
        }

        if !errors.is_empty() {
            log::warn!("merge finished with {} template error(s)", errors.len());
        }
        Ok(MergeOutput {
            bytes: package.to_bytes()?,
            errors,
        })
    }

    fn render_part(&self, package: &mut Package, uri: &PartUri, data: &Value) -> Result<Vec<RenderError>> {
        let source = std::str::from_utf8(package.part_data(uri)?)
            .map_err(|e| Error::malformed(uri.as_str(), e))?;
        let mut doc = XmlDocument::parse(source).map_err(|e| Error::malformed(uri.as_str(), e))?;

        let mut collector = ErrorCollector::new();
        let changed = template::render_part(&mut doc, data, uri.as_str(), &self.options, &mut collector);
        log::debug!(
            "{}: {} ({} error(s))",
            uri,
            if changed { "rendered" } else { "no tags" },
            collector.len()
        );

        if changed {
            let xml = doc.to_xml()?;
            package.replace_part(uri, xml.into_bytes())?;
        }
        Ok(collector.drain())
    }
}

/// Merge with default options
pub fn render(template: &[u8], data: &Value) -> Result<MergeOutput> {
    Merger::default().render(template, data)
}

/// Parse JSON text into a data record
pub fn parse_data(json: &str) -> Result<Value> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_options() {
        let options = MergeOptions::default();
        assert_eq!(options.missing_field, MissingFieldPolicy::Empty);
        assert!(options.linebreaks);
        assert!(options.include_headers_footers);
        assert_eq!(options.error_placeholder, "#ERR#");
    }

    #[test]
    fn test_builder() {
        let merger = Merger::new(
            MergeOptions::default()
                .missing_field(MissingFieldPolicy::Error)
                .linebreaks(false)
                .include_headers_footers(false)
                .error_placeholder("??"),
        );
        let options = merger.options();
        assert_eq!(options.missing_field, MissingFieldPolicy::Error);
        assert!(!options.linebreaks);
        assert!(!options.include_headers_footers);
        assert_eq!(options.error_placeholder, "??");
    }

    #[test]
    fn test_merger_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Merger>();
    }

    #[test]
    fn test_parse_data() {
        assert_eq!(parse_data(r#"{"a": [1, 2]}"#).unwrap(), json!({"a": [1, 2]}));
        assert!(matches!(parse_data("{oops"), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_not_a_zip() {
        let err = render(b"definitely not a zip", &json!({})).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)));
        assert!(err.is_template_error());
    }
}
