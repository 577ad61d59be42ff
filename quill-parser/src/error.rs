use crate::span::Span;

/// Errors raised by the text buffer when an edit cannot be applied.
///
/// A rejected edit never mutates the buffer; the document stays at its
/// prior, consistent version.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("position {line}:{character} is outside the document")]
    PositionOutOfBounds { line: u32, character: u32 },

    #[error("byte offset {offset} is outside the document (length {len})")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("byte offset {0} is not on a character boundary")]
    NotACharBoundary(usize),

    #[error("edit range {0:?} overlaps a preceding edit in the same batch")]
    OverlappingEdits(Span),

    #[error("edit range start {start} is after end {end}")]
    InvertedRange { start: usize, end: usize },
}
