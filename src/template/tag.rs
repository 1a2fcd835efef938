//! Tag syntax: `{name}`, `{#name}`, `{/name}`, `{^name}`, `{@name}`

/// Opening delimiter
pub const OPEN: char = '{';
/// Closing delimiter
pub const CLOSE: char = '}';

/// Kind of a tag, selected by the prefix after the opening delimiter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    /// `{name}`: escaped value
    Scalar,
    /// `{#name}`: start of a repeating section
    LoopOpen,
    /// `{/name}`: end of a section
    LoopClose,
    /// `{^name}`: start of a section rendered only for falsy values
    Inverted,
    /// `{@name}`: unescaped markup replacing the enclosing paragraph
    Raw,
}

impl TagKind {
    /// Whether the tag opens a section closed by `{/name}`
    pub fn opens_section(self) -> bool {
        matches!(self, TagKind::LoopOpen | TagKind::Inverted)
    }
}

/// A recognized tag
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub kind: TagKind,
    /// Dotted lookup path, or `.` for the current scope value
    pub name: String,
    /// Tag text as written, delimiters included
    pub source: String,
    /// Character offset into the part's paragraph text
    pub offset: usize,
    /// Paragraph text surrounding the tag
    pub context: String,
}

/// Split the text between delimiters into kind and name.
///
/// Returns `None` when the name is empty or contains whitespace or
/// delimiters.
pub fn parse_tag(inner: &str) -> Option<(TagKind, &str)> {
    let inner = inner.trim();
    let (kind, name) = match inner.chars().next()? {
        '#' => (TagKind::LoopOpen, &inner[1..]),
        '/' => (TagKind::LoopClose, &inner[1..]),
        '^' => (TagKind::Inverted, &inner[1..]),
        '@' => (TagKind::Raw, &inner[1..]),
        _ => (TagKind::Scalar, inner),
    };
    let name = name.trim();

    let valid = !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c == OPEN || c == CLOSE);
    valid.then_some((kind, name))
}
