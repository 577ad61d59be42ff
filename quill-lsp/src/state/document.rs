//! Per-document state: buffer plus version-tagged derived analysis.

use std::sync::Arc;

use quill_parser::{
    parse, reparse, BufferError, Change, ParseResult, Snapshot, SymbolIndex, TextBuffer,
};
use tokio_util::sync::CancellationToken;

/// Everything derived from one buffer snapshot, swapped atomically as a unit
/// so readers never observe a torn mix of old tree and new text.
#[derive(Debug)]
pub struct Analysis {
    /// Buffer version this analysis was computed from.
    pub version: i32,
    /// The exact text the tree and symbols were derived from.
    pub snapshot: Snapshot,
    pub parse: ParseResult,
    pub symbols: SymbolIndex,
}

impl Analysis {
    fn compute(snapshot: Snapshot, parse: ParseResult) -> Arc<Self> {
        let symbols = SymbolIndex::build(&parse.tree, snapshot.text());
        Arc::new(Self {
            version: snapshot.version(),
            snapshot,
            parse,
            symbols,
        })
    }
}

/// One open document: the buffer, its current analysis, and the publish /
/// cancellation bookkeeping for the diagnostic pipeline.
#[derive(Debug)]
pub struct DocumentState {
    buffer: TextBuffer,
    analysis: Arc<Analysis>,
    /// Version of the last diagnostic set actually published.
    last_published: Option<i32>,
    /// Cancels in-flight debounced diagnostic passes; regenerated per edit.
    pending: CancellationToken,
}

impl DocumentState {
    /// Create from full text; performs the initial full parse.
    #[must_use]
    pub fn new(text: String, version: i32) -> Self {
        let buffer = TextBuffer::new(text, version);
        let snapshot = buffer.snapshot();
        let analysis = Analysis::compute(snapshot, parse(buffer.text()));
        Self {
            buffer,
            analysis,
            last_published: None,
            pending: CancellationToken::new(),
        }
    }

    /// Apply an edit batch and re-derive the analysis incrementally.
    ///
    /// Returns the new analysis plus a fresh cancellation token for the
    /// debounced diagnostic pass; the previous token is cancelled so any
    /// in-flight pass for an older version exits silently.
    pub fn apply(
        &mut self,
        changes: &[Change],
        version: i32,
    ) -> Result<(Arc<Analysis>, CancellationToken), BufferError> {
        let applied = self.buffer.apply(changes, version)?;
        let snapshot = self.buffer.snapshot();
        let result = reparse(
            &self.analysis.parse,
            snapshot.text(),
            applied.region.as_ref(),
        );
        self.analysis = Analysis::compute(snapshot, result);

        self.pending.cancel();
        self.pending = CancellationToken::new();
        Ok((Arc::clone(&self.analysis), self.pending.clone()))
    }

    #[must_use]
    pub fn analysis(&self) -> Arc<Analysis> {
        Arc::clone(&self.analysis)
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.buffer.version()
    }

    /// Record a publish for `version` if it is still current and newer than
    /// anything already published. Called under the document's entry lock
    /// immediately before the publish goes out, which is what keeps
    /// diagnostics version-monotonic.
    pub fn try_mark_published(&mut self, version: i32) -> bool {
        if version != self.buffer.version() {
            return false;
        }
        if self.last_published.is_some_and(|last| last >= version) {
            return false;
        }
        self.last_published = Some(version);
        true
    }

    /// Publish gate for the force-validate path: records a publish for
    /// `version` only while it is still the buffer's current version. Unlike
    /// [`Self::try_mark_published`] it admits re-publishing the current
    /// version, but it refuses a superseded one, so a forced pass that lost
    /// a race with a newer edit is discarded like any other stale pass.
    pub fn mark_published_if_current(&mut self, version: i32) -> bool {
        if version != self.buffer.version() {
            return false;
        }
        self.last_published = Some(version);
        true
    }

    /// Cancel any in-flight diagnostic pass (used on close).
    pub fn cancel_pending(&self) {
        self.pending.cancel();
    }
}
