//! Source-preserving XML element tree
//!
//! Every parsed node remembers the exact text it was read from, so writing
//! an untouched tree reproduces the input byte for byte. Only nodes that
//! were created or edited are regenerated through quick-xml's writer.

use crate::error::Result;
use crate::template::Tag;
use quick_xml::escape::{partial_escape, unescape};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::Write;
use thiserror::Error;

/// Error raised when markup cannot be parsed into a tree
#[derive(Debug, Clone, Error)]
#[error("{message} (at byte {position})")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    fn new(message: impl ToString, position: usize) -> Self {
        Self {
            message: message.to_string(),
            position,
        }
    }
}

/// A parsed XML part
#[derive(Clone, Debug, Default)]
pub struct XmlDocument {
    /// Top-level nodes: declaration, root element, surrounding whitespace
    pub nodes: Vec<XmlNode>,
}

/// A node of the tree
#[derive(Clone, Debug)]
pub enum XmlNode {
    /// Element with children
    Element(XmlElement),
    /// Character data
    Text(XmlText),
    /// Declaration, comment, CDATA, processing instruction or doctype,
    /// kept verbatim
    Markup(String),
    /// Template tag installed by the merge engine
    Tag(Tag),
}

/// Element node
#[derive(Clone, Debug)]
pub struct XmlElement {
    /// Qualified name (with prefix, e.g. "w:p")
    name: String,
    /// Attributes as (name, unescaped value) pairs, in source order
    attributes: Vec<(String, String)>,
    /// Child nodes
    pub children: Vec<XmlNode>,
    /// Exact source of the start tag, dropped once attributes change
    start: Option<String>,
    /// Exact source of the end tag
    end: Option<String>,
    /// Whether this was written as `<name/>`
    self_closing: bool,
}

/// Text node
#[derive(Clone, Debug, Default)]
pub struct XmlText {
    text: String,
    /// Escaped source text; `None` once the text was edited
    raw: Option<String>,
}

impl XmlDocument {
    /// Parse a complete part
    pub fn parse(src: &str) -> std::result::Result<Self, ParseError> {
        Ok(Self {
            nodes: parse_nodes(src)?,
        })
    }

    /// Parse a balanced markup fragment, which may have several roots
    pub fn parse_fragment(src: &str) -> std::result::Result<Vec<XmlNode>, ParseError> {
        parse_nodes(src)
    }

    /// Serialize the tree
    pub fn to_xml(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        // Every node is built from &str input or escaped strings.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the tree to a writer
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        for node in &self.nodes {
            node.write_to(out)?;
        }
        Ok(())
    }
}

fn parse_nodes(src: &str) -> std::result::Result<Vec<XmlNode>, ParseError> {
    let mut reader = Reader::from_str(src);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut top = Vec::new();
    let mut cursor = 0;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ParseError::new(e, reader.error_position() as usize))?;
        let mut end = reader.buffer_position() as usize;
        // The reader may already have consumed the '<' that ends a text run.
        if matches!(event, Event::Text(_)) && src.as_bytes().get(end.wrapping_sub(1)) == Some(&b'<') {
            end -= 1;
        }
        let start = cursor;
        let raw = &src[start..end];
        cursor = end;

        let node = match event {
            Event::Start(e) => {
                let element = XmlElement::from_source(&e, raw, false)
                    .map_err(|msg| ParseError::new(msg, start))?;
                stack.push(element);
                continue;
            }
            Event::Empty(e) => XmlNode::Element(
                XmlElement::from_source(&e, raw, true).map_err(|msg| ParseError::new(msg, start))?,
            ),
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| ParseError::new("unexpected end tag", start))?;
                element.end = Some(raw.to_string());
                XmlNode::Element(element)
            }
            Event::Text(_) => {
                let text = unescape(raw).map_err(|e| ParseError::new(e, start))?;
                XmlNode::Text(XmlText {
                    text: text.into_owned(),
                    raw: Some(raw.to_string()),
                })
            }
            Event::Eof => break,
            _ => XmlNode::Markup(raw.to_string()),
        };

        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => top.push(node),
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::new(
            format!("unclosed element <{}>", open.name),
            src.len(),
        ));
    }

    Ok(top)
}

impl XmlNode {
    /// Get as element
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get as mutable element
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this is an element with the given local name
    pub fn is_element(&self, local: &str) -> bool {
        self.as_element().is_some_and(|e| e.local_name() == local)
    }

    /// Write node to a writer
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        match self {
            XmlNode::Element(e) => e.write_to(out),
            XmlNode::Text(t) => {
                match &t.raw {
                    Some(raw) => out.write_all(raw.as_bytes())?,
                    None => out.write_all(partial_escape(&t.text).as_bytes())?,
                }
                Ok(())
            }
            XmlNode::Markup(raw) => {
                out.write_all(raw.as_bytes())?;
                Ok(())
            }
            XmlNode::Tag(tag) => {
                out.write_all(partial_escape(&tag.source).as_bytes())?;
                Ok(())
            }
        }
    }
}

impl XmlElement {
    /// Create a new, empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            start: None,
            end: None,
            self_closing: true,
        }
    }

    fn from_source(
        e: &BytesStart,
        raw: &str,
        self_closing: bool,
    ) -> std::result::Result<Self, String> {
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value.into_owned(),
            ));
        }

        Ok(Self {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
            start: Some(raw.to_string()),
            end: None,
            self_closing,
        })
    }

    /// Qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without namespace prefix
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Namespace prefix including the colon, e.g. "w:"
    pub fn prefix(&self) -> &str {
        self.name
            .rfind(':')
            .map_or("", |i| &self.name[..=i])
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, regenerating the start tag if it changes
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) if v == value => return,
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
        self.start = None;
    }

    /// Property elements (`w:rPr`, `w:pPr`, `w:tcPr`, ...) describe their
    /// parent rather than holding content
    pub fn is_property(&self) -> bool {
        self.local_name().ends_with("Pr")
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.children, &mut text);
        text
    }

    /// Copy of this element without its children
    pub fn shallow_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
            start: self.start.clone(),
            end: self.end.clone(),
            self_closing: self.self_closing,
        }
    }

    /// Write element to a writer
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.self_closing && self.children.is_empty() {
            match &self.start {
                Some(raw) => out.write_all(raw.as_bytes())?,
                None => Writer::new(&mut *out).write_event(Event::Empty(self.start_tag()))?,
            }
            return Ok(());
        }

        match &self.start {
            Some(raw) if !self.self_closing => out.write_all(raw.as_bytes())?,
            _ => Writer::new(&mut *out).write_event(Event::Start(self.start_tag()))?,
        }

        for child in &self.children {
            child.write_to(out)?;
        }

        match &self.end {
            Some(raw) => out.write_all(raw.as_bytes())?,
            None => Writer::new(&mut *out)
                .write_event(Event::End(BytesEnd::new(self.name.as_str())))?,
        }

        Ok(())
    }

    fn start_tag(&self) -> BytesStart<'_> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        start
    }
}

fn collect_text(nodes: &[XmlNode], out: &mut String) {
    for node in nodes {
        match node {
            XmlNode::Text(t) => out.push_str(&t.text),
            XmlNode::Element(e) => collect_text(&e.children, out),
            XmlNode::Tag(tag) => out.push_str(&tag.source),
            XmlNode::Markup(_) => {}
        }
    }
}

impl XmlText {
    /// Create a new text node
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw: None,
        }
    }

    /// Decoded text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.raw = None;
    }
}

/// Node at `path`, where each entry indexes into a children list
pub fn node_at<'a>(nodes: &'a [XmlNode], path: &[usize]) -> Option<&'a XmlNode> {
    let (&first, rest) = path.split_first()?;
    rest.iter().try_fold(nodes.get(first)?, |node, &i| {
        node.as_element()?.children.get(i)
    })
}

/// Mutable node at `path`
pub fn node_at_mut<'a>(nodes: &'a mut [XmlNode], path: &[usize]) -> Option<&'a mut XmlNode> {
    let (&first, rest) = path.split_first()?;
    rest.iter().try_fold(nodes.get_mut(first)?, |node, &i| {
        node.as_element_mut()?.children.get_mut(i)
    })
}

/// Children list of the element at `path`; the empty path is `nodes` itself
pub fn children_at_mut<'a>(
    nodes: &'a mut Vec<XmlNode>,
    path: &[usize],
) -> Option<&'a mut Vec<XmlNode>> {
    if path.is_empty() {
        return Some(nodes);
    }
    node_at_mut(nodes, path)
        .and_then(XmlNode::as_element_mut)
        .map(|e| &mut e.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
xmlns:r='http://schemas.openxmlformats.org/officeDocument/2006/relationships'>\n  \
<w:body>\n    <!-- note -->\n    <w:p w:rsidR=\"00A1\"><w:pPr><w:jc w:val=\"center\" /></w:pPr>\
<w:r><w:t xml:space=\"preserve\">Tom &amp; Jerry &#x263A; </w:t></w:r><w:r><w:tab/></w:r></w:p>\n    \
<w:sectPr/>\n  </w:body >\n</w:document>\n";

    #[test]
    fn test_roundtrip_is_byte_identical() {
        let doc = XmlDocument::parse(DOC).unwrap();
        assert_eq!(doc.to_xml().unwrap(), DOC);
    }

    #[test]
    fn test_text_is_decoded() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let root = doc
            .nodes
            .iter()
            .find_map(XmlNode::as_element)
            .unwrap();
        assert_eq!(root.local_name(), "document");
        assert_eq!(root.prefix(), "w:");
        assert!(root.text_content().contains("Tom & Jerry \u{263A} "));
    }

    #[test]
    fn test_node_paths() {
        let doc = XmlDocument::parse("<a><b>x</b><c><d/></c></a>").unwrap();
        assert!(node_at(&doc.nodes, &[0, 1, 0]).unwrap().is_element("d"));
        assert!(node_at(&doc.nodes, &[0, 2]).is_none());
        assert!(node_at(&doc.nodes, &[]).is_none());
    }

    #[test]
    fn test_edited_text_is_escaped() {
        let mut doc = XmlDocument::parse("<w:t>old</w:t>").unwrap();
        if let Some(XmlNode::Text(t)) = node_at_mut(&mut doc.nodes, &[0, 0]) {
            t.set_text("a < b & c");
        }
        assert_eq!(doc.to_xml().unwrap(), "<w:t>a &lt; b &amp; c</w:t>");
    }

    #[test]
    fn test_set_attribute_regenerates_start_tag_only() {
        let mut doc = XmlDocument::parse("<w:r><w:t  a='1'>x</w:t ></w:r>").unwrap();
        let t = node_at_mut(&mut doc.nodes, &[0, 0])
            .and_then(XmlNode::as_element_mut)
            .unwrap();
        t.set_attribute("a", "1");
        assert_eq!(doc.to_xml().unwrap(), "<w:r><w:t  a='1'>x</w:t ></w:r>");

        let t = node_at_mut(&mut doc.nodes, &[0, 0])
            .and_then(XmlNode::as_element_mut)
            .unwrap();
        t.set_attribute("xml:space", "preserve");
        assert_eq!(
            doc.to_xml().unwrap(),
            "<w:r><w:t a=\"1\" xml:space=\"preserve\">x</w:t ></w:r>"
        );
    }

    #[test]
    fn test_self_closing_element_gains_children() {
        let mut doc = XmlDocument::parse("<w:r><w:t/></w:r>").unwrap();
        let t = node_at_mut(&mut doc.nodes, &[0, 0])
            .and_then(XmlNode::as_element_mut)
            .unwrap();
        t.children.push(XmlNode::Text(XmlText::new("hi")));
        assert_eq!(doc.to_xml().unwrap(), "<w:r><w:t>hi</w:t></w:r>");
    }

    #[test]
    fn test_new_element_is_self_closing() {
        let doc = XmlDocument {
            nodes: vec![XmlNode::Element(XmlElement::new("w:br"))],
        };
        assert_eq!(doc.to_xml().unwrap(), "<w:br/>");
    }

    #[test]
    fn test_malformed_markup() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
        assert!(XmlDocument::parse("<a><b>").is_err());
        assert!(XmlDocument::parse("<a>&bogus;</a>").is_err());
    }

    #[test]
    fn test_fragment_with_several_roots() {
        let nodes = XmlDocument::parse_fragment("<w:p/><w:p><w:r/></w:p>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.is_element("p")));
    }
}
