//! Relationships handling for OPC packages
//!
//! Parses `.rels` parts. Relationship parts are copied verbatim when the
//! package is written, so there is no serializer.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Collection of relationships, in source order
#[derive(Clone, Debug, Default)]
pub struct Relationships {
    items: Vec<Relationship>,
}

/// A single relationship
#[derive(Clone, Debug)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative or absolute)
    pub target: String,
    /// Target mode
    pub target_mode: TargetMode,
}

/// Target mode for relationships
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetMode {
    /// Internal target (part within the package)
    #[default]
    Internal,
    /// External target (hyperlink, etc.)
    External,
}

impl Relationships {
    /// Create empty relationships
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from XML string
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Self::new();

        loop {
            match reader.read_event()? {
                Event::Empty(e) | Event::Start(e) => {
                    if e.name().local_name().as_ref() == b"Relationship" {
                        rels.items.push(parse_relationship(&e)?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(rels)
    }

    /// Get a relationship by ID
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Get a relationship by type (returns first match)
    pub fn by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.rel_type == rel_type)
    }

    /// Get all relationships of a given type
    pub fn all_by_type<'a>(&'a self, rel_type: &'a str) -> impl Iterator<Item = &'a Relationship> {
        self.items.iter().filter(move |r| r.rel_type == rel_type)
    }

    /// Iterate over all relationships
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parse a single Relationship element
fn parse_relationship(element: &BytesStart) -> Result<Relationship> {
    let mut id = None;
    let mut rel_type = None;
    let mut target = None;
    let mut target_mode = TargetMode::Internal;

    for attr in element.attributes() {
        let attr = attr?;
        let key = attr.key.local_name();
        let value = String::from_utf8_lossy(&attr.value).to_string();

        match key.as_ref() {
            b"Id" => id = Some(value),
            b"Type" => rel_type = Some(value),
            b"Target" => target = Some(value),
            b"TargetMode" => {
                if value == "External" {
                    target_mode = TargetMode::External;
                }
            }
            _ => {}
        }
    }

    let missing = |attr: &str| Error::MissingAttribute {
        element: "Relationship".into(),
        attr: attr.into(),
    };

    Ok(Relationship {
        id: id.ok_or_else(|| missing("Id"))?,
        rel_type: rel_type.ok_or_else(|| missing("Type"))?,
        target: target.ok_or_else(|| missing("Target"))?,
        target_mode,
    })
}

// Well-known relationship types
pub mod rel_types {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const HEADER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

        let rels = Relationships::from_xml(xml).unwrap();

        assert_eq!(rels.len(), 2);

        let r1 = rels.get("rId1").unwrap();
        assert_eq!(r1.target, "word/document.xml");
        assert_eq!(r1.target_mode, TargetMode::Internal);

        let r2 = rels.get("rId2").unwrap();
        assert_eq!(r2.target, "https://example.com");
        assert_eq!(r2.target_mode, TargetMode::External);

        let doc = rels.by_type(rel_types::OFFICE_DOCUMENT).unwrap();
        assert_eq!(doc.id, "rId1");
    }

    #[test]
    fn test_all_by_type_keeps_order() {
        let xml = r#"<Relationships>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header2.xml"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>
</Relationships>"#;

        let rels = Relationships::from_xml(xml).unwrap();
        let targets: Vec<_> = rels
            .all_by_type(rel_types::HEADER)
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(targets, vec!["header2.xml", "header1.xml"]);
    }

    #[test]
    fn test_missing_target() {
        let xml = r#"<Relationships><Relationship Id="rId1" Type="x"/></Relationships>"#;
        let err = Relationships::from_xml(xml).unwrap_err();
        assert!(matches!(err, Error::MissingAttribute { ref attr, .. } if attr == "Target"));
    }
}
