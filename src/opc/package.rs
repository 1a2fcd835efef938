//! OPC Package implementation
//!
//! Handles reading and writing DOCX files as ZIP packages. Parts are kept as
//! raw bytes in archive order; only the parts a caller replaces are ever
//! rewritten.

use crate::error::{Error, Result};
use crate::opc::content_types::{MAIN_PART_TYPES, STORY_PART_TYPES};
use crate::opc::part_uri::well_known;
use crate::opc::relationships::rel_types;
use crate::opc::{ContentTypes, Part, PartUri, Relationships};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

/// An OPC package (ZIP-based container for DOCX)
#[derive(Debug)]
pub struct Package {
    /// Archive bytes the package was read from
    source: Vec<u8>,
    /// All parts, in archive order
    parts: Vec<Part>,
    /// Part URI -> index into `parts`
    index: HashMap<PartUri, usize>,
    /// Explicit directory entries
    directories: Vec<String>,
    /// Content types ([Content_Types].xml)
    content_types: ContentTypes,
    /// Package-level relationships (/_rels/.rels)
    relationships: Relationships,
}

impl Package {
    /// Open a package from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut package = Self {
            source: bytes.to_vec(),
            parts: Vec::with_capacity(archive.len()),
            index: HashMap::new(),
            directories: Vec::new(),
            content_types: ContentTypes::new(),
            relationships: Relationships::new(),
        };

        package.read_parts(&mut archive)?;
        package.content_types = package.read_view(well_known::CONTENT_TYPES, ContentTypes::from_xml)?;
        package.relationships = package.read_view(well_known::PACKAGE_RELS, Relationships::from_xml)?;

        log::debug!(
            "opened package: {} parts, {} directories",
            package.parts.len(),
            package.directories.len()
        );
        Ok(package)
    }

    /// Save the package to bytes.
    ///
    /// An unmodified package yields exactly the bytes it was opened from.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if !self.is_modified() {
            return Ok(self.source.clone());
        }

        let mut buf = Vec::with_capacity(self.source.len());
        self.write_to(Cursor::new(&mut buf))?;
        Ok(buf)
    }

    /// Write the package to a writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);

        for dir in &self.directories {
            zip.add_directory(dir.as_str(), SimpleFileOptions::default())?;
        }

        for part in &self.parts {
            let options = SimpleFileOptions::default().compression_method(part.compression());
            zip.start_file(part.uri().zip_name(), options)?;
            zip.write_all(part.data())?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Whether any part was replaced with different data
    pub fn is_modified(&self) -> bool {
        self.parts.iter().any(Part::is_modified)
    }

    /// Get a part by URI
    pub fn part(&self, uri: &PartUri) -> Option<&Part> {
        self.index.get(uri).map(|&i| &self.parts[i])
    }

    /// Get the data of a part, failing with `PartNotFound`
    pub fn part_data(&self, uri: &PartUri) -> Result<&[u8]> {
        self.part(uri)
            .map(Part::data)
            .ok_or_else(|| Error::PartNotFound(uri.to_string()))
    }

    /// Replace the data of an existing part
    pub fn replace_part(&mut self, uri: &PartUri, data: Vec<u8>) -> Result<()> {
        let i = *self
            .index
            .get(uri)
            .ok_or_else(|| Error::PartNotFound(uri.to_string()))?;
        self.parts[i].set_data(data);
        Ok(())
    }

    /// Get all parts, in archive order
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    /// Get all part URIs, in archive order
    pub fn part_uris(&self) -> impl Iterator<Item = &PartUri> {
        self.parts.iter().map(Part::uri)
    }

    /// Get content types
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Get package-level relationships
    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    /// Content type of a part, if declared
    pub fn content_type(&self, uri: &PartUri) -> Option<&str> {
        self.content_types.get(uri)
    }

    /// URI of the main document part.
    ///
    /// Follows the package `officeDocument` relationship, falling back to
    /// the first part declared with a main-document content type.
    pub fn main_document_uri(&self) -> Option<PartUri> {
        let by_rel = self
            .relationships
            .by_type(rel_types::OFFICE_DOCUMENT)
            .and_then(|rel| package_root().resolve(&rel.target).ok())
            .filter(|uri| self.index.contains_key(uri));

        by_rel.or_else(|| {
            self.part_uris()
                .find(|uri| {
                    self.content_type(uri)
                        .is_some_and(|ct| MAIN_PART_TYPES.contains(&ct))
                })
                .cloned()
        })
    }

    /// URIs of headers, footers, footnotes and endnotes, in archive order
    pub fn story_part_uris(&self) -> Vec<PartUri> {
        self.part_uris()
            .filter(|uri| {
                self.content_type(uri)
                    .is_some_and(|ct| STORY_PART_TYPES.contains(&ct))
            })
            .cloned()
            .collect()
    }

    /// Parts that may hold tags: the main document first, then the story
    /// parts in archive order
    pub fn template_part_uris(&self) -> Vec<PartUri> {
        let mut uris: Vec<PartUri> = self.main_document_uri().into_iter().collect();
        uris.extend(self.story_part_uris());
        uris
    }

    // === Private methods ===

    fn read_parts<R: Read + Seek>(&mut self, archive: &mut ZipArchive<R>) -> Result<()> {
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            if file.is_dir() {
                self.directories.push(name);
                continue;
            }

            let uri = PartUri::from_zip_name(&name)?;
            if self.index.contains_key(&uri) {
                log::warn!("duplicate zip entry {}, keeping the first", uri);
                continue;
            }

            let compression = file.compression();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;

            self.index.insert(uri.clone(), self.parts.len());
            self.parts.push(Part::new(uri, data).with_compression(compression));
        }

        Ok(())
    }

    /// Parse an optional XML part into a lookup view
    fn read_view<T: Default>(&self, path: &str, parse: fn(&str) -> Result<T>) -> Result<T> {
        let uri = PartUri::new(path)?;
        let Some(part) = self.part(&uri) else {
            return Ok(T::default());
        };

        let xml = part
            .data_as_str()
            .map_err(|e| Error::malformed(path, e))?;
        parse(xml).map_err(|e| match e {
            Error::Xml(e) => Error::malformed(path, e),
            other => other,
        })
    }
}

/// Part at the package root; package relationship targets resolve against it
fn package_root() -> PartUri {
    PartUri::from_known(well_known::CONTENT_TYPES)
}
