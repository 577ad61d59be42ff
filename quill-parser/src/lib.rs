//! quill-parser: the document-analysis core for `Quill` markup.
//!
//! Turns a mutable, incrementally-edited text buffer into a block/inline
//! syntax tree, a symbol index (outline + anchors), and diagnostics, with
//! re-parsing bounded to the blocks an edit touched. Protocol concerns live
//! in `quill-lsp`; this crate is synchronous and self-contained.

pub mod buffer;
pub mod error;
pub mod parser;
pub mod span;
pub mod symbols;
pub mod tree;

pub use buffer::{AppliedEdit, Change, ChangedRegion, Position, Snapshot, TextBuffer};
pub use error::BufferError;
pub use parser::{parse, reparse, style_diagnostics, ParseResult};
pub use span::Span;
pub use symbols::{generate_heading_id, OutlineNode, Symbol, SymbolIndex, SymbolKind};
pub use tree::{
    AdmonitionVariant, Block, BlockKind, DiagnosticCategory, FenceKind, Inline, InlineKind,
    ParseDiagnostic, Severity, SyntaxTree,
};
