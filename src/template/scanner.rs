//! Tag scanner
//!
//! Word splits text into runs wherever formatting, spell-check state or
//! revision ids change, so a tag typed as `{name}` may end up spread over
//! several `w:t` elements. The scanner concatenates the text of a paragraph
//! into one logical string, remembers where each piece came from, finds the
//! delimiters in the logical string and maps every tag back to the text
//! nodes it covers. It only reads the tree.

use crate::template::errors::{RenderError, RenderErrorKind};
use crate::template::tag::{parse_tag, Tag, CLOSE, OPEN};
use crate::xml::{names, XmlNode};

/// Characters of surrounding text kept in error context snippets
const CONTEXT_CHARS: usize = 20;

/// Part of a tag inside one text node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    /// Path to the text node
    pub path: Vec<usize>,
    /// Byte range within the node's decoded text
    pub start: usize,
    pub end: usize,
}

/// A delimited span found in paragraph text
#[derive(Clone, Debug)]
pub struct TagSpan {
    /// Covered text, in document order
    pub fragments: Vec<Fragment>,
    /// The parsed tag, `None` when the span is malformed and must be
    /// replaced by the error placeholder
    pub tag: Option<Tag>,
}

/// Everything found in one part
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Spans sorted in document order
    pub spans: Vec<TagSpan>,
    pub errors: Vec<RenderError>,
}

/// Text node contributing to a paragraph's logical text
struct Segment<'a> {
    path: Vec<usize>,
    text: &'a str,
}

/// Find all tags in the paragraphs of `nodes`
pub fn scan(nodes: &[XmlNode], part: &str) -> ScanResult {
    let mut paragraphs = Vec::new();
    collect_paragraphs(nodes, &mut Vec::new(), None, false, &mut paragraphs);

    let mut result = ScanResult::default();
    let mut offset = 0;
    for segments in &paragraphs {
        offset += scan_paragraph(segments, offset, part, &mut result);
    }

    result
        .spans
        .sort_by(|a, b| a.fragments[0].path.cmp(&b.fragments[0].path));
    log::debug!(
        "{}: {} paragraphs, {} tag spans, {} scan errors",
        part,
        paragraphs.len(),
        result.spans.len(),
        result.errors.len()
    );
    result
}

/// Gather the `w:t` text of every paragraph. Paragraphs nested in text
/// boxes get their own entry.
fn collect_paragraphs<'a>(
    nodes: &'a [XmlNode],
    path: &mut Vec<usize>,
    paragraph: Option<(usize, &'a str)>,
    in_text: bool,
    out: &mut Vec<Vec<Segment<'a>>>,
) {
    for (i, node) in nodes.iter().enumerate() {
        path.push(i);
        match node {
            XmlNode::Element(e) if e.local_name() == names::PARAGRAPH => {
                out.push(Vec::new());
                let current = (out.len() - 1, e.prefix());
                collect_paragraphs(&e.children, path, Some(current), false, out);
            }
            XmlNode::Element(e) => {
                let is_text = paragraph
                    .is_some_and(|(_, prefix)| e.local_name() == names::TEXT && e.prefix() == prefix);
                collect_paragraphs(&e.children, path, paragraph, is_text, out);
            }
            XmlNode::Text(t) if in_text => {
                if let Some((index, _)) = paragraph {
                    out[index].push(Segment {
                        path: path.clone(),
                        text: t.text(),
                    });
                }
            }
            _ => {}
        }
        path.pop();
    }
}

/// Scan one paragraph; returns its length in characters
fn scan_paragraph(segments: &[Segment], base: usize, part: &str, result: &mut ScanResult) -> usize {
    let mut logical = String::new();
    let mut starts = Vec::with_capacity(segments.len());
    for segment in segments {
        starts.push(logical.len());
        logical.push_str(segment.text);
    }

    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    for (i, c) in logical.char_indices() {
        if c == OPEN {
            if let Some(start) = open.replace(i) {
                spans.push((start, i, false));
            }
        } else if c == CLOSE {
            match open.take() {
                Some(start) => spans.push((start, i + c.len_utf8(), true)),
                None => result.errors.push(RenderError::new(
                    RenderErrorKind::UnexpectedDelimiter,
                    CLOSE.to_string(),
                    context_snippet(&logical, i, i + c.len_utf8()),
                    part,
                    base + logical[..i].chars().count(),
                )),
            }
        }
    }
    if let Some(start) = open {
        spans.push((start, logical.len(), false));
    }

    for (start, end, terminated) in spans {
        let source = &logical[start..end];
        let offset = base + logical[..start].chars().count();
        let context = context_snippet(&logical, start, end);

        let parsed = if terminated {
            parse_tag(&logical[start + 1..end - 1])
        } else {
            None
        };

        let tag = match parsed {
            Some((kind, name)) => Some(Tag {
                kind,
                name: name.to_string(),
                source: source.to_string(),
                offset,
                context,
            }),
            None => {
                let kind = if terminated {
                    RenderErrorKind::InvalidTag
                } else {
                    RenderErrorKind::UnterminatedTag
                };
                result
                    .errors
                    .push(RenderError::new(kind, source, context, part, offset));
                None
            }
        };

        result.spans.push(TagSpan {
            fragments: map_fragments(segments, &starts, start, end),
            tag,
        });
    }

    logical.chars().count()
}

/// Map a logical byte range back onto the text nodes it covers
fn map_fragments(segments: &[Segment], starts: &[usize], start: usize, end: usize) -> Vec<Fragment> {
    segments
        .iter()
        .zip(starts)
        .filter_map(|(segment, &seg_start)| {
            let seg_end = seg_start + segment.text.len();
            let from = start.max(seg_start);
            let to = end.min(seg_end);
            (from < to).then(|| Fragment {
                path: segment.path.clone(),
                start: from - seg_start,
                end: to - seg_start,
            })
        })
        .collect()
}

fn context_snippet(text: &str, start: usize, end: usize) -> String {
    let before: Vec<char> = text[..start].chars().rev().take(CONTEXT_CHARS).collect();
    let mut snippet: String = before.into_iter().rev().collect();
    snippet.push_str(&text[start..end]);
    snippet.extend(text[end..].chars().take(CONTEXT_CHARS));
    snippet
}
