//! Helpers shared by the integration tests: in-memory template packages

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Builds a minimal DOCX package around some body markup
pub struct DocxBuilder {
    body: String,
    header: Option<String>,
    footer: Option<String>,
    extra: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            header: None,
            footer: None,
            extra: Vec::new(),
        }
    }

    /// Body made of one paragraph per line of text
    pub fn paragraphs(lines: &[&str]) -> Self {
        let body: String = lines.iter().map(|line| paragraph(line)).collect();
        Self::new(&body)
    }

    pub fn header(mut self, content: &str) -> Self {
        self.header = Some(content.to_string());
        self
    }

    pub fn footer(mut self, content: &str) -> Self {
        self.footer = Some(content.to_string());
        self
    }

    /// Add an untouched part such as an image
    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.extra.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut content_types = CONTENT_TYPES_HEAD.to_string();
        if self.header.is_some() {
            content_types.push_str(r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#);
        }
        if self.footer.is_some() {
            content_types.push_str(r#"<Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/>"#);
        }
        content_types.push_str("</Types>");

        let mut parts: Vec<(&str, Vec<u8>, CompressionMethod)> = vec![
            ("[Content_Types].xml", content_types.into_bytes(), CompressionMethod::Deflated),
            ("_rels/.rels", PACKAGE_RELS.as_bytes().to_vec(), CompressionMethod::Deflated),
            ("word/document.xml", document_xml(&self.body).into_bytes(), CompressionMethod::Deflated),
        ];
        if let Some(header) = &self.header {
            parts.push(("word/header1.xml", story_xml("hdr", header).into_bytes(), CompressionMethod::Deflated));
        }
        if let Some(footer) = &self.footer {
            parts.push(("word/footer1.xml", story_xml("ftr", footer).into_bytes(), CompressionMethod::Deflated));
        }
        for (name, data) in &self.extra {
            parts.push((name.as_str(), data.clone(), CompressionMethod::Stored));
        }

        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            for (name, data, method) in parts {
                zip.start_file(name, SimpleFileOptions::default().compression_method(method))
                    .unwrap();
                zip.write_all(&data).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }
}

/// A paragraph with a single run of text
pub fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", text)
}

pub fn document_xml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<w:document xmlns:w=\"{}\"><w:body>{}<w:sectPr/></w:body></w:document>",
        W_NS, body
    )
}

fn story_xml(root: &str, content: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<w:{root} xmlns:w=\"{}\">{}</w:{root}>",
        W_NS,
        content,
        root = root
    )
}

/// Read one entry of a package as text
pub fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}

/// Compression method of one entry
pub fn compression_of(bytes: &[u8], name: &str) -> CompressionMethod {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let method = archive.by_name(name).unwrap().compression();
    method
}

/// Entry names in archive order
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Visible text of a part: `w:t` contents, with paragraphs separated by
/// newlines and breaks shown as `|`
pub fn visible_text(xml: &str) -> String {
    let doc = docx_merge::xml::XmlDocument::parse(xml).unwrap();
    let mut out = String::new();
    collect(&doc.nodes, &mut out, false);
    out.trim().to_string()
}

fn collect(nodes: &[docx_merge::xml::XmlNode], out: &mut String, in_text: bool) {
    use docx_merge::xml::XmlNode;
    for node in nodes {
        match node {
            XmlNode::Text(t) if in_text => out.push_str(t.text()),
            XmlNode::Element(e) => match e.local_name() {
                "t" => collect(&e.children, out, true),
                "br" => out.push('|'),
                "p" => {
                    collect(&e.children, out, false);
                    out.push('\n');
                }
                _ => collect(&e.children, out, false),
            },
            _ => {}
        }
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
