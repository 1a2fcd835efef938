//! Content Types handling for OPC packages
//!
//! Parses `[Content_Types].xml`. The part itself is passed through
//! untouched, so only lookup is needed here.

use crate::error::{Error, Result};
use crate::opc::PartUri;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// Content types definition for an OPC package
#[derive(Clone, Debug, Default)]
pub struct ContentTypes {
    /// Default extension mappings (extension -> content type)
    defaults: HashMap<String, String>,
    /// Override mappings (part URI -> content type)
    overrides: HashMap<PartUri, String>,
}

impl ContentTypes {
    /// Create an empty set of content types
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from XML string
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut ct = Self::default();

        loop {
            match reader.read_event()? {
                Event::Empty(e) | Event::Start(e) => match e.name().local_name().as_ref() {
                    b"Default" => {
                        let ext = get_attr(&e, "Extension")?;
                        let content_type = get_attr(&e, "ContentType")?;
                        ct.add_default(&ext, &content_type);
                    }
                    b"Override" => {
                        let part_name = get_attr(&e, "PartName")?;
                        let content_type = get_attr(&e, "ContentType")?;
                        ct.add_override(&PartUri::new(&part_name)?, &content_type);
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(ct)
    }

    /// Add a default extension mapping
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        self.defaults
            .insert(extension.to_lowercase(), content_type.to_string());
    }

    /// Add an override for a specific part
    pub fn add_override(&mut self, uri: &PartUri, content_type: &str) {
        self.overrides.insert(uri.clone(), content_type.to_string());
    }

    /// Get the content type for a part
    pub fn get(&self, uri: &PartUri) -> Option<&str> {
        if let Some(ct) = self.overrides.get(uri) {
            return Some(ct);
        }

        uri.extension()
            .and_then(|ext| self.defaults.get(&ext.to_lowercase()))
            .map(|s| s.as_str())
    }
}

/// Get an attribute value from an XML element
fn get_attr(element: &BytesStart, name: &str) -> Result<String> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    Err(Error::MissingAttribute {
        element: String::from_utf8_lossy(element.name().as_ref()).to_string(),
        attr: name.to_string(),
    })
}

// Well-known content types
pub const MAIN_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
pub const MAIN_TEMPLATE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml";
pub const MAIN_DOCUMENT_MACRO: &str = "application/vnd.ms-word.document.macroEnabled.main+xml";
pub const MAIN_TEMPLATE_MACRO: &str = "application/vnd.ms-word.template.macroEnabledTemplate.main+xml";
pub const HEADER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
pub const FOOTER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";
pub const FOOTNOTES: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footnotes+xml";
pub const ENDNOTES: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.endnotes+xml";

/// Content types of a document's main part
pub const MAIN_PART_TYPES: &[&str] = &[
    MAIN_DOCUMENT,
    MAIN_TEMPLATE,
    MAIN_DOCUMENT_MACRO,
    MAIN_TEMPLATE_MACRO,
];

/// Content types of secondary story parts that may hold tags
pub const STORY_PART_TYPES: &[&str] = &[HEADER, FOOTER, FOOTNOTES, ENDNOTES];
