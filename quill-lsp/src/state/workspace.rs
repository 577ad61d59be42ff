//! Workspace-level state: one serialized processing line per open document.
//!
//! Documents live in a `DashMap`; taking an entry mutably serializes edits
//! and analysis swaps per document while documents stay independent of each
//! other. Read paths clone the `Arc`'d analysis out and compute without
//! holding the lock.

use std::sync::Arc;

use dashmap::DashMap;
use quill_parser::{BufferError, Change, Symbol};
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Url;

use crate::state::document::{Analysis, DocumentState};

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum WorkspaceError {
    #[error("document not open: {0}")]
    DocumentNotOpen(Url),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// All open documents, keyed by URI.
#[derive(Default)]
pub struct Workspace {
    documents: DashMap<Url, DocumentState>,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or re-open) a document; performs the initial full parse.
    pub fn open(&self, uri: Url, text: String, version: i32) -> Arc<Analysis> {
        let state = DocumentState::new(text, version);
        let analysis = state.analysis();
        if let Some(previous) = self.documents.insert(uri, state) {
            previous.cancel_pending();
        }
        analysis
    }

    /// Apply an edit batch to an open document.
    pub fn change(
        &self,
        uri: &Url,
        changes: &[Change],
        version: i32,
    ) -> Result<(Arc<Analysis>, CancellationToken), WorkspaceError> {
        let mut entry = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| WorkspaceError::DocumentNotOpen(uri.clone()))?;
        Ok(entry.apply(changes, version)?)
    }

    /// Discard all state for a document. No state survives the close.
    pub fn close(&self, uri: &Url) {
        if let Some((_, state)) = self.documents.remove(uri) {
            state.cancel_pending();
        }
    }

    /// Current analysis snapshot for read requests.
    #[must_use]
    pub fn analysis(&self, uri: &Url) -> Option<Arc<Analysis>> {
        self.documents.get(uri).map(|entry| entry.analysis())
    }

    /// Version-monotonic publish gate; see [`DocumentState::try_mark_published`].
    pub fn try_mark_published(&self, uri: &Url, version: i32) -> bool {
        self.documents
            .get_mut(uri)
            .is_some_and(|mut entry| entry.try_mark_published(version))
    }

    /// Publish gate for forced validation; see
    /// [`DocumentState::mark_published_if_current`].
    pub fn mark_published_if_current(&self, uri: &Url, version: i32) -> bool {
        self.documents
            .get_mut(uri)
            .is_some_and(|mut entry| entry.mark_published_if_current(version))
    }

    /// Cancel any pending debounced work for a document without editing it.
    pub fn cancel_pending(&self, uri: &Url) {
        if let Some(entry) = self.documents.get(uri) {
            entry.cancel_pending();
        }
    }

    /// Embedding interface: document outline symbols, outside the protocol
    /// loop (e.g. for an outline side panel).
    #[must_use]
    pub fn symbols(&self, uri: &Url) -> Option<Vec<Symbol>> {
        self.analysis(uri)
            .map(|analysis| analysis.symbols.symbols().to_vec())
    }

    /// Embedding interface: resolve an anchor identifier to its definition.
    #[must_use]
    pub fn resolve(&self, uri: &Url, id: &str) -> Option<Symbol> {
        self.analysis(uri)
            .and_then(|analysis| analysis.symbols.resolve(id).cloned())
    }
}
