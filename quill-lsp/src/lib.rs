//! quill-lsp library
//!
//! The LSP surface over `quill-parser`: per-document state with debounced,
//! version-monotonic diagnostics, plus completion, hover, outline,
//! definition, and references.

pub mod backend;
pub mod capabilities;
pub mod config;
pub mod convert;
pub mod state;

pub use backend::Backend;
pub use capabilities::diagnostics::DiagnosticProvider;
pub use state::Workspace;
