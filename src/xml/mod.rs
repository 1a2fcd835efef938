//! XML element tree with byte-exact round-trip support

mod tree;

pub use tree::{
    children_at_mut, node_at, node_at_mut, ParseError, XmlDocument, XmlElement, XmlNode, XmlText,
};

/// Local names of WordprocessingML elements the merge engine relies on
pub mod names {
    /// Paragraph
    pub const PARAGRAPH: &str = "p";
    /// Run
    pub const RUN: &str = "r";
    /// Run text
    pub const TEXT: &str = "t";
    /// Line break
    pub const BREAK: &str = "br";
    /// Table row
    pub const TABLE_ROW: &str = "tr";
    /// Table cell
    pub const TABLE_CELL: &str = "tc";
}
