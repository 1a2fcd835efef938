//! Part representation for OPC packages

use crate::opc::PartUri;
use zip::CompressionMethod;

/// A part within an OPC package, i.e. one zip entry
#[derive(Clone, Debug)]
pub struct Part {
    /// Part URI
    uri: PartUri,
    /// Part data
    data: Vec<u8>,
    /// Compression method of the source entry
    compression: CompressionMethod,
    /// Whether this part has been modified
    modified: bool,
}

impl Part {
    /// Create a new part
    pub fn new(uri: PartUri, data: Vec<u8>) -> Self {
        Self {
            uri,
            data,
            compression: CompressionMethod::Deflated,
            modified: false,
        }
    }

    /// Set the compression method used when writing this part
    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    /// Get the part URI
    pub fn uri(&self) -> &PartUri {
        &self.uri
    }

    /// Get the raw data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get data as UTF-8 string
    pub fn data_as_str(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.data)
    }

    /// Replace the data; identical data leaves the part unmodified
    pub fn set_data(&mut self, data: Vec<u8>) {
        if data != self.data {
            self.data = data;
            self.modified = true;
        }
    }

    /// Compression method to write this part with
    pub fn compression(&self) -> CompressionMethod {
        match self.compression {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        }
    }

    /// Check if the part has been modified
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_data_tracks_modification() {
        let uri = PartUri::new("/word/document.xml").unwrap();
        let mut part = Part::new(uri, b"<a/>".to_vec());

        part.set_data(b"<a/>".to_vec());
        assert!(!part.is_modified());

        part.set_data(b"<b/>".to_vec());
        assert!(part.is_modified());
        assert_eq!(part.data_as_str().unwrap(), "<b/>");
    }

    #[test]
    fn test_compression_fallback() {
        let uri = PartUri::new("/word/media/image1.png").unwrap();
        let stored = Part::new(uri.clone(), Vec::new()).with_compression(CompressionMethod::Stored);
        assert_eq!(stored.compression(), CompressionMethod::Stored);

        let fresh = Part::new(uri, Vec::new());
        assert_eq!(fresh.compression(), CompressionMethod::Deflated);
    }
}
