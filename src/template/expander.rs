//! Tag installation and expansion
//!
//! Installation swaps the text covered by each scanned span for a single
//! [`XmlNode::Tag`], so later edits never deal with run boundaries again.
//! Expansion then resolves installed tags one at a time in document order
//! until none are left. Every handler removes or replaces the tag it was
//! given.

use crate::merge::{MergeOptions, MissingFieldPolicy};
use crate::template::errors::{ErrorCollector, RenderError, RenderErrorKind};
use crate::template::scanner::{Fragment, TagSpan};
use crate::template::scope::{is_falsy, iterations, stringify, Scope};
use crate::template::tag::{Tag, TagKind};
use crate::xml::{
    children_at_mut, names, node_at, node_at_mut, XmlDocument, XmlElement, XmlNode, XmlText,
};
use serde_json::Value;

/// Elements that mark positions rather than hold content
const MARKERS: &[&str] = &[
    "bookmarkStart",
    "bookmarkEnd",
    "proofErr",
    "lastRenderedPageBreak",
    "permStart",
    "permEnd",
    "commentRangeStart",
    "commentRangeEnd",
];

/// Elements that only count as content through their children
const CONTAINERS: &[&str] = &[
    "p",
    "r",
    "t",
    "hyperlink",
    "smartTag",
    "sdt",
    "sdtContent",
    "ins",
    "fldSimple",
    "customXml",
];

/// Replace the text of every span with its tag node, or with the error
/// placeholder when the span did not parse.
///
/// Spans must be in document order; they are applied back to front so
/// earlier paths stay valid.
pub fn install(nodes: &mut Vec<XmlNode>, spans: Vec<TagSpan>, placeholder: &str) {
    for span in spans.into_iter().rev() {
        let mut fragments = span.fragments.into_iter();
        let Some(first) = fragments.next() else {
            continue;
        };

        for fragment in fragments {
            if let Some(XmlNode::Text(t)) = node_at_mut(nodes, &fragment.path) {
                let mut text = t.text().to_string();
                text.replace_range(fragment.start..fragment.end, "");
                t.set_text(text);
            }
            preserve_space(nodes, &fragment.path);
        }

        let replacement = match span.tag {
            Some(tag) => XmlNode::Tag(tag),
            None => XmlNode::Text(XmlText::new(placeholder)),
        };
        split_text_node(nodes, &first, replacement);
        preserve_space(nodes, &first.path);
    }
}

/// Put `replacement` in place of the fragment's range, keeping the text on
/// either side as separate nodes
fn split_text_node(nodes: &mut Vec<XmlNode>, fragment: &Fragment, replacement: XmlNode) {
    let Some((&index, parent)) = fragment.path.split_last() else {
        return;
    };
    let Some(siblings) = children_at_mut(nodes, parent) else {
        return;
    };
    let Some(XmlNode::Text(t)) = siblings.get(index) else {
        return;
    };

    let before = t.text()[..fragment.start].to_string();
    let after = t.text()[fragment.end..].to_string();

    let mut pieces = Vec::with_capacity(3);
    if !before.is_empty() {
        pieces.push(XmlNode::Text(XmlText::new(before)));
    }
    pieces.push(replacement);
    if !after.is_empty() {
        pieces.push(XmlNode::Text(XmlText::new(after)));
    }
    siblings.splice(index..=index, pieces);
}

/// Edited run text may now start or end with spaces
fn preserve_space(nodes: &mut [XmlNode], text_path: &[usize]) {
    let Some((_, parent)) = text_path.split_last() else {
        return;
    };
    if let Some(XmlNode::Element(t)) = node_at_mut(nodes, parent) {
        if t.local_name() == names::TEXT {
            t.set_attribute("xml:space", "preserve");
        }
    }
}

/// Resolves installed tags against a scope
pub struct Expander<'a> {
    options: &'a MergeOptions,
    part: &'a str,
    errors: &'a mut ErrorCollector,
}

/// Nodes lifted out of the tree for a section, and where its output goes
struct Block {
    container: Vec<usize>,
    index: usize,
    nodes: Vec<XmlNode>,
}

impl<'a> Expander<'a> {
    pub fn new(options: &'a MergeOptions, part: &'a str, errors: &'a mut ErrorCollector) -> Self {
        Self {
            options,
            part,
            errors,
        }
    }

    /// Expand every tag in `nodes`
    pub fn expand<'d>(&mut self, nodes: &mut Vec<XmlNode>, scope: &mut Scope<'d>) {
        while let Some(path) = first_tag(nodes) {
            let Some(XmlNode::Tag(tag)) = node_at(nodes, &path) else {
                break;
            };
            let tag = tag.clone();
            log::trace!("{}: expanding {} at depth {}", self.part, tag.source, scope.depth());

            match tag.kind {
                TagKind::Scalar => self.expand_scalar(nodes, &path, &tag, scope),
                TagKind::Raw => self.expand_raw(nodes, &path, &tag, scope),
                TagKind::LoopOpen | TagKind::Inverted => {
                    self.expand_section(nodes, &path, &tag, scope)
                }
                TagKind::LoopClose => self.fail(nodes, &path, &tag, RenderErrorKind::UnbalancedLoop),
            }
        }
    }

    /// Record an error and leave the placeholder where the tag was
    fn fail(&mut self, nodes: &mut Vec<XmlNode>, path: &[usize], tag: &Tag, kind: RenderErrorKind) {
        log::debug!("{}: {} {}", self.part, kind, tag.source);
        self.errors.record(RenderError::for_tag(kind, tag, self.part));
        let placeholder = XmlText::new(self.options.error_placeholder.as_str());
        replace_node(nodes, path, vec![XmlNode::Text(placeholder)]);
    }

    fn missing_is_error(&self) -> bool {
        self.options.missing_field == MissingFieldPolicy::Error
    }

    fn expand_scalar(&mut self, nodes: &mut Vec<XmlNode>, path: &[usize], tag: &Tag, scope: &Scope) {
        let text = match scope.lookup(&tag.name) {
            Some(value) => stringify(value),
            None if self.missing_is_error() => {
                return self.fail(nodes, path, tag, RenderErrorKind::MissingField);
            }
            None => String::new(),
        };

        if self.options.linebreaks && text.contains('\n') && split_lines(nodes, path, &text) {
            return;
        }
        replace_node(nodes, path, vec![XmlNode::Text(XmlText::new(text))]);
    }

    /// `{@name}` replaces its whole paragraph with the value's markup
    fn expand_raw(&mut self, nodes: &mut Vec<XmlNode>, path: &[usize], tag: &Tag, scope: &Scope) {
        let markup = match scope.lookup(&tag.name) {
            Some(Value::Null) => String::new(),
            Some(value) => stringify(value),
            None if self.missing_is_error() => {
                return self.fail(nodes, path, tag, RenderErrorKind::MissingField);
            }
            None => String::new(),
        };

        let fragment = match XmlDocument::parse_fragment(&markup) {
            Ok(fragment) => fragment,
            Err(e) => {
                log::warn!("{}: raw value for '{}' is not markup: {}", self.part, tag.name, e);
                return self.fail(nodes, path, tag, RenderErrorKind::InvalidRawXml);
            }
        };

        let target = enclosing(nodes, path, names::PARAGRAPH).unwrap_or_else(|| path.to_vec());
        replace_node(nodes, &target, fragment);
    }

    fn expand_section<'d>(
        &mut self,
        nodes: &mut Vec<XmlNode>,
        open: &[usize],
        tag: &Tag,
        scope: &mut Scope<'d>,
    ) {
        let Some(close) = find_matching_close(nodes, open, &tag.name) else {
            return self.fail(nodes, open, tag, RenderErrorKind::UnbalancedLoop);
        };

        let value = scope.lookup(&tag.name);
        if value.is_none() && self.missing_is_error() {
            self.errors
                .record(RenderError::for_tag(RenderErrorKind::MissingField, tag, self.part));
        }
        let items: Vec<Option<&'d Value>> = match tag.kind {
            TagKind::Inverted if is_falsy(value) => vec![None],
            TagKind::Inverted => Vec::new(),
            _ => iterations(value).into_iter().map(Some).collect(),
        };

        let Some(block) = extract_block(nodes, open, &close) else {
            return self.fail(nodes, open, tag, RenderErrorKind::UnbalancedLoop);
        };
        log::debug!(
            "{}: section '{}' renders {} time(s)",
            self.part,
            tag.name,
            items.len()
        );

        let mut rendered = Vec::new();
        for &item in &items {
            let mut copy = block.nodes.clone();
            if let Some(value) = item {
                scope.push(value);
            }
            self.expand(&mut copy, scope);
            if item.is_some() {
                scope.pop();
            }
            rendered.append(&mut copy);
        }

        if let Some(siblings) = children_at_mut(nodes, &block.container) {
            siblings.splice(block.index..block.index, rendered);
        }
    }
}

/// Path of the first tag in document order
fn first_tag(nodes: &[XmlNode]) -> Option<Vec<usize>> {
    for (i, node) in nodes.iter().enumerate() {
        match node {
            XmlNode::Tag(_) => return Some(vec![i]),
            XmlNode::Element(e) => {
                if let Some(mut rest) = first_tag(&e.children) {
                    rest.insert(0, i);
                    return Some(rest);
                }
            }
            _ => {}
        }
    }
    None
}

fn collect_tags<'n>(nodes: &'n [XmlNode], path: &mut Vec<usize>, out: &mut Vec<(Vec<usize>, &'n Tag)>) {
    for (i, node) in nodes.iter().enumerate() {
        path.push(i);
        match node {
            XmlNode::Tag(tag) => out.push((path.clone(), tag)),
            XmlNode::Element(e) => collect_tags(&e.children, path, out),
            _ => {}
        }
        path.pop();
    }
}

/// The `{/name}` closing the section opened at `open`, skipping over
/// nested sections of the same name
fn find_matching_close(nodes: &[XmlNode], open: &[usize], name: &str) -> Option<Vec<usize>> {
    let mut tags = Vec::new();
    collect_tags(nodes, &mut Vec::new(), &mut tags);

    let mut depth = 0usize;
    for (path, tag) in tags.into_iter().skip_while(|(p, _)| p.as_slice() != open).skip(1) {
        if tag.name != name {
            continue;
        }
        match tag.kind {
            kind if kind.opens_section() => depth += 1,
            TagKind::LoopClose if depth == 0 => return Some(path),
            TagKind::LoopClose => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Lift the content between two section tags out of the tree.
///
/// Tags in different cells of one row repeat the row. Tags whose paths
/// cross a row repeat whole siblings. Otherwise the ancestors of both
/// tags are split at the tags, and halves left without content are
/// dropped, so a tag alone in its paragraph takes the paragraph with it.
fn extract_block(nodes: &mut Vec<XmlNode>, open: &[usize], close: &[usize]) -> Option<Block> {
    let shared = open.iter().zip(close).take_while(|(a, b)| a == b).count();
    let lca = &open[..shared];
    let (a, b) = (*open.get(shared)?, *close.get(shared)?);

    if shared > 0 && node_at(nodes, lca).is_some_and(|n| n.is_element(names::TABLE_ROW)) {
        remove_node(nodes, close);
        remove_node(nodes, open);
        let (&row, container) = lca.split_last()?;
        let siblings = children_at_mut(nodes, container)?;
        return Some(Block {
            container: container.to_vec(),
            index: row,
            nodes: siblings.drain(row..=row).collect(),
        });
    }

    if crosses_row(nodes, open, shared) || crosses_row(nodes, close, shared) {
        remove_node(nodes, close);
        remove_node(nodes, open);
        let siblings = children_at_mut(nodes, lca)?;
        return Some(Block {
            container: lca.to_vec(),
            index: a,
            nodes: siblings.drain(a..=b).collect(),
        });
    }

    let siblings = children_at_mut(nodes, lca)?;
    if b >= siblings.len() {
        return None;
    }
    let mut tail = siblings.split_off(b + 1);
    let b_node = siblings.pop()?;
    let middle = siblings.split_off(a + 1);
    let a_node = siblings.pop()?;

    let (a_left, a_right) = split_node(a_node, &open[shared + 1..]);
    let (b_left, b_right) = split_node(b_node, &close[shared + 1..]);

    siblings.extend(a_left);
    let index = siblings.len();
    siblings.extend(b_right);
    siblings.append(&mut tail);

    let mut block = Vec::with_capacity(middle.len() + 2);
    block.extend(a_right);
    block.extend(middle);
    block.extend(b_left);

    Some(Block {
        container: lca.to_vec(),
        index,
        nodes: block,
    })
}

/// Whether any ancestor of `path` below depth `shared` is a table row
fn crosses_row(nodes: &[XmlNode], path: &[usize], shared: usize) -> bool {
    (shared + 1..path.len())
        .any(|len| node_at(nodes, &path[..len]).is_some_and(|n| n.is_element(names::TABLE_ROW)))
}

/// Split `node` around the descendant at `path`, which is dropped.
///
/// The right half keeps copies of the properties of every split element.
fn split_node(node: XmlNode, path: &[usize]) -> (Option<XmlNode>, Option<XmlNode>) {
    let Some((&index, rest)) = path.split_first() else {
        return (None, None);
    };
    let mut element = match node {
        XmlNode::Element(e) => e,
        other => return (Some(other), None),
    };

    let mut after = element
        .children
        .split_off((index + 1).min(element.children.len()));
    let target = if index < element.children.len() {
        element.children.pop()
    } else {
        None
    };
    let (inner_left, inner_right) = target.map_or((None, None), |t| split_node(t, rest));

    let mut right = element.shallow_clone();
    right.children = element
        .children
        .iter()
        .filter(|c| c.as_element().is_some_and(XmlElement::is_property))
        .cloned()
        .collect();
    right.children.extend(inner_right);
    right.children.append(&mut after);

    let mut left = element;
    left.children.extend(inner_left);

    (keep_if_content(left), keep_if_content(right))
}

fn keep_if_content(element: XmlElement) -> Option<XmlNode> {
    let node = XmlNode::Element(element);
    has_content(&node, false).then_some(node)
}

/// Whether a node renders anything
fn has_content(node: &XmlNode, in_text: bool) -> bool {
    match node {
        XmlNode::Tag(_) => true,
        XmlNode::Markup(_) => false,
        XmlNode::Text(t) if in_text => !t.text().is_empty(),
        XmlNode::Text(t) => !t.text().trim().is_empty(),
        XmlNode::Element(e) => {
            let local = e.local_name();
            if e.is_property() || MARKERS.contains(&local) {
                false
            } else if CONTAINERS.contains(&local) {
                let in_text = local == names::TEXT;
                e.children.iter().any(|c| has_content(c, in_text))
            } else {
                true
            }
        }
    }
}

/// Replace a tag whose value has line breaks with runs of text separated
/// by `<w:br/>`. Returns false when the tag is not inside run text.
fn split_lines(nodes: &mut Vec<XmlNode>, path: &[usize], text: &str) -> bool {
    let Some((&tag_index, text_path)) = path.split_last() else {
        return false;
    };
    let Some((&text_index, run_path)) = text_path.split_last() else {
        return false;
    };
    let Some(siblings) = children_at_mut(nodes, run_path) else {
        return false;
    };
    let Some(XmlNode::Element(t)) = siblings.get_mut(text_index) else {
        return false;
    };
    if t.local_name() != names::TEXT || tag_index >= t.children.len() {
        return false;
    }

    let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
    let mut after = t.children.split_off(tag_index + 1);
    t.children.pop();
    t.children
        .push(XmlNode::Text(XmlText::new(lines.next().unwrap_or_default())));

    let template = t.shallow_clone();
    let break_name = format!("{}{}", t.prefix(), names::BREAK);
    let mut inserted = Vec::new();
    for line in lines {
        inserted.push(XmlNode::Element(XmlElement::new(break_name.as_str())));
        let mut next = template.shallow_clone();
        next.children.push(XmlNode::Text(XmlText::new(line)));
        inserted.push(XmlNode::Element(next));
    }

    if let Some(XmlNode::Element(last)) = inserted.last_mut() {
        last.children.append(&mut after);
    }
    t.children.append(&mut after);
    siblings.splice(text_index + 1..text_index + 1, inserted);
    true
}

/// Deepest ancestor of `path` with the given local name
fn enclosing(nodes: &[XmlNode], path: &[usize], local: &str) -> Option<Vec<usize>> {
    (1..path.len())
        .rev()
        .map(|len| &path[..len])
        .find(|p| node_at(nodes, p).is_some_and(|n| n.is_element(local)))
        .map(<[usize]>::to_vec)
}

fn replace_node(nodes: &mut Vec<XmlNode>, path: &[usize], replacement: Vec<XmlNode>) {
    let Some((&index, parent)) = path.split_last() else {
        return;
    };
    if let Some(siblings) = children_at_mut(nodes, parent) {
        if index < siblings.len() {
            siblings.splice(index..=index, replacement);
        }
    }
}

fn remove_node(nodes: &mut Vec<XmlNode>, path: &[usize]) {
    replace_node(nodes, path, Vec::new());
}

/// Give every table cell left without a paragraph an empty one
pub fn ensure_cell_paragraphs(nodes: &mut [XmlNode]) {
    for node in nodes {
        if let XmlNode::Element(e) = node {
            ensure_cell_paragraphs(&mut e.children);
            if e.local_name() == names::TABLE_CELL
                && !e.children.iter().any(|c| c.is_element(names::PARAGRAPH))
            {
                let paragraph = XmlElement::new(format!("{}{}", e.prefix(), names::PARAGRAPH));
                e.children.push(XmlNode::Element(paragraph));
            }
        }
    }
}
