use thiserror::Error;

/// Failures of tree mutations on a [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The handle points at a node that was released from its document.
    #[error("node is no longer part of its document")]
    StaleNode,
    /// The two handles belong to different documents.
    #[error("node belongs to a different document")]
    ForeignNode,
    /// The insertion would make a node its own ancestor, or move the body.
    #[error("insertion would break the document hierarchy")]
    Hierarchy,
}

/// Failures while parsing markup. Offsets are byte offsets into the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unexpected end of markup at byte {0}")]
    UnexpectedEof(usize),
    #[error("malformed tag at byte {0}")]
    MalformedTag(usize),
    #[error("closing tag </{found}> at byte {at} does not match <{expected}>")]
    Mismatched {
        expected: String,
        found: String,
        at: usize,
    },
    #[error("closing tag </{found}> at byte {at} has no open element")]
    UnmatchedClose { found: String, at: usize },
    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// Failures while compiling a [`Template`](crate::Template).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error("template must have exactly one top-level element, found {found}")]
    TopLevel { found: usize },
}
