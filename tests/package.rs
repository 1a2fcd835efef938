//! Integration tests: opening and rewriting template packages

mod common;

use common::{compression_of, entry_names, init_logging, paragraph, read_part, DocxBuilder};
use docx_merge::opc::{rel_types, Package};
use docx_merge::PartUri;
use pretty_assertions::assert_eq;

#[test]
fn test_open_built_package() {
    init_logging();
    let bytes = DocxBuilder::paragraphs(&["Hello, World!"])
        .header(&paragraph("head"))
        .footer(&paragraph("foot"))
        .build();

    let pkg = Package::from_bytes(&bytes).expect("Failed to open DOCX");

    let doc_rel = pkg.relationships().by_type(rel_types::OFFICE_DOCUMENT);
    assert_eq!(doc_rel.map(|r| r.target.as_str()), Some("word/document.xml"));

    let main = pkg.main_document_uri().expect("Main document part missing");
    assert_eq!(main.as_str(), "/word/document.xml");
    assert!(pkg.part_data(&main).unwrap().starts_with(b"<?xml"));

    let stories: Vec<_> = pkg.story_part_uris().iter().map(|u| u.to_string()).collect();
    assert_eq!(stories, vec!["/word/header1.xml", "/word/footer1.xml"]);
}

#[test]
fn test_unmodified_package_roundtrip() {
    init_logging();
    let bytes = DocxBuilder::paragraphs(&["unchanged"]).build();
    let pkg = Package::from_bytes(&bytes).unwrap();

    assert!(!pkg.is_modified());
    assert_eq!(pkg.to_bytes().unwrap(), bytes);
}

#[test]
fn test_replace_part_rewrites_archive() {
    init_logging();
    let bytes = DocxBuilder::paragraphs(&["old"])
        .file("word/media/image1.png", b"binary")
        .build();
    let mut pkg = Package::from_bytes(&bytes).unwrap();
    let uri = PartUri::new("/word/document.xml").unwrap();

    let same = pkg.part_data(&uri).unwrap().to_vec();
    pkg.replace_part(&uri, same).unwrap();
    assert!(!pkg.is_modified());

    pkg.replace_part(&uri, b"<w:document/>".to_vec()).unwrap();
    assert!(pkg.is_modified());

    let saved = pkg.to_bytes().unwrap();
    assert_eq!(entry_names(&saved), entry_names(&bytes));
    assert_eq!(read_part(&saved, "word/document.xml"), "<w:document/>");
    assert_eq!(read_part(&saved, "[Content_Types].xml"), read_part(&bytes, "[Content_Types].xml"));
    assert_eq!(
        compression_of(&saved, "word/media/image1.png"),
        zip::CompressionMethod::Stored
    );

    let missing = PartUri::new("/word/missing.xml").unwrap();
    assert!(pkg.replace_part(&missing, Vec::new()).is_err());
}
