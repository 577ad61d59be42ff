//! Block/inline syntax tree model.
//!
//! The tree is a flat, ordered forest of top-level blocks; outline nesting is
//! derived from heading levels by the symbol index, never from block nesting.
//! Every node carries a byte [`Span`] into the source it was parsed from.

use serde::Serialize;

use crate::span::Span;

/// Admonition paragraph variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdmonitionVariant {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AdmonitionVariant {
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "NOTE" => Some(Self::Note),
            "TIP" => Some(Self::Tip),
            "IMPORTANT" => Some(Self::Important),
            "WARNING" => Some(Self::Warning),
            "CAUTION" => Some(Self::Caution),
            _ => None,
        }
    }
}

/// Delimited (fenced) block flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FenceKind {
    /// `----` listing/source block; contents are verbatim.
    Listing,
    /// `....` literal block; contents are verbatim.
    Literal,
    /// `====` example block.
    Example,
    /// `|===` table block.
    Table,
    /// `////` comment block.
    Comment,
}

impl FenceKind {
    /// Whether contents are verbatim (no inline markup, no completion).
    #[must_use]
    pub fn is_verbatim(&self) -> bool {
        matches!(self, Self::Listing | Self::Literal | Self::Comment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    /// `= Title` through `====== Title`; level counts the markers (1-6).
    Heading { level: u8 },
    Paragraph,
    Admonition { variant: AdmonitionVariant },
    UnorderedList,
    OrderedList,
    /// Fenced block. `terminated` is false when the closing fence is missing
    /// and the block was recovered to end-of-document.
    Fenced { kind: FenceKind, terminated: bool },
    /// Standalone `[[id]]` anchor line.
    AnchorLine { id: String },
    /// `[style,attrs]` block attribute list line.
    AttributeList,
    /// `:name: value` document attribute entry.
    AttributeEntry { name: String },
    /// `//` line comment run.
    LineComment,
    /// `'''` thematic break.
    ThematicBreak,
}

/// Inline span kinds within leaf prose blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InlineKind {
    Strong,
    Emphasis,
    Monospace,
    /// `<<target>>`, `<<target,label>>` or `xref:target[label]`.
    CrossReference { target: String },
    /// `{name}` attribute reference.
    AttributeReference { name: String },
    /// Inline `[[id]]` anchor.
    Anchor { id: String },
    /// `link:target[label]` or a bare URL.
    Link { target: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inline {
    pub kind: InlineKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    pub span: Span,
    /// Inline spans, in document order. Empty for verbatim blocks.
    pub inlines: Vec<Inline>,
}

impl Block {
    #[must_use]
    pub fn shifted(&self, delta: isize) -> Self {
        Self {
            kind: self.kind.clone(),
            span: self.span.shifted(delta),
            inlines: self
                .inlines
                .iter()
                .map(|inline| Inline {
                    kind: inline.kind.clone(),
                    span: inline.span.shifted(delta),
                })
                .collect(),
        }
    }

    /// The innermost inline at a byte offset, if any.
    #[must_use]
    pub fn inline_at(&self, offset: usize) -> Option<&Inline> {
        self.inlines.iter().find(|inline| inline.span.touches(offset))
    }
}

/// Ordered forest of top-level blocks for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyntaxTree {
    pub blocks: Vec<Block>,
}

impl SyntaxTree {
    /// The block whose span contains (or touches the end of) `offset`.
    #[must_use]
    pub fn block_at(&self, offset: usize) -> Option<&Block> {
        self.blocks.iter().find(|block| block.span.touches(offset))
    }

    /// All cross-reference inlines in document order.
    pub fn cross_references(&self) -> impl Iterator<Item = (&str, Span)> {
        self.blocks.iter().flat_map(|block| {
            block.inlines.iter().filter_map(|inline| match &inline.kind {
                InlineKind::CrossReference { target } => Some((target.as_str(), inline.span)),
                InlineKind::Strong
                | InlineKind::Emphasis
                | InlineKind::Monospace
                | InlineKind::AttributeReference { .. }
                | InlineKind::Anchor { .. }
                | InlineKind::Link { .. } => None,
            })
        })
    }
}

/// Diagnostic severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// Stable category tag carried by every diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Syntax,
    Style,
    UnresolvedReference,
    DuplicateAnchor,
}

impl DiagnosticCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Style => "style",
            Self::UnresolvedReference => "unresolved-reference",
            Self::DuplicateAnchor => "duplicate-anchor",
        }
    }
}

/// A diagnostic produced by the parser or the symbol index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub span: Span,
    pub severity: Severity,
    pub category: DiagnosticCategory,
    pub message: String,
    /// For duplicate anchors, the span of the first definition.
    pub related: Option<Span>,
}

impl ParseDiagnostic {
    #[must_use]
    pub fn shifted(&self, delta: isize) -> Self {
        Self {
            span: self.span.shifted(delta),
            related: self.related.map(|span| span.shifted(delta)),
            ..self.clone()
        }
    }
}
