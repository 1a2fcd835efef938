//! Template engine: tag scanning, scope resolution and tree expansion

mod errors;
pub mod expander;
pub mod scanner;
mod scope;
mod tag;

pub use errors::{ErrorCollector, Location, RenderError, RenderErrorKind};
pub use scope::{is_falsy, iterations, stringify, Scope};
pub use tag::{parse_tag, Tag, TagKind, CLOSE, OPEN};

use crate::merge::MergeOptions;
use crate::xml::XmlDocument;
use serde_json::Value;

/// Render the tags of one parsed part against `data`.
///
/// Returns false when the part holds no tags, in which case the tree was
/// not touched. Errors from malformed tags are added to `errors` either
/// way.
pub fn render_part(
    doc: &mut XmlDocument,
    data: &Value,
    part: &str,
    options: &MergeOptions,
    errors: &mut ErrorCollector,
) -> bool {
    let scanned = scanner::scan(&doc.nodes, part);
    for error in scanned.errors {
        errors.record(error);
    }
    if scanned.spans.is_empty() {
        return false;
    }

    expander::install(&mut doc.nodes, scanned.spans, &options.error_placeholder);
    let mut scope = Scope::new(data);
    expander::Expander::new(options, part, errors).expand(&mut doc.nodes, &mut scope);
    expander::ensure_cell_paragraphs(&mut doc.nodes);
    true
}
