//! Diagnostics: merge every diagnostic source for a document version into one
//! position-ordered set.
//!
//! Sources are the parser's syntax errors, structural style checks, symbol
//! index duplicates, unresolved cross-references, and any registered
//! [`DiagnosticProvider`]s. The whole set is published wholesale per version;
//! there is no partial update.

use quill_parser::{style_diagnostics, ParseDiagnostic};
use tower_lsp::lsp_types::{Diagnostic, Url};

use crate::config::Config;
use crate::convert::diagnostic_to_lsp;
use crate::state::Analysis;

/// A secondary diagnostics source registered on the backend, e.g. a spelling
/// or link checker. `check` runs on the diagnostic task's snapshot; it must
/// not block on I/O.
pub trait DiagnosticProvider: Send + Sync {
    /// Stable provider name, used in logs.
    fn name(&self) -> &'static str;

    fn check(&self, analysis: &Analysis) -> Vec<ParseDiagnostic>;
}

/// Compute the full diagnostic set for one analysis snapshot.
#[must_use]
pub fn collect(
    analysis: &Analysis,
    config: &Config,
    providers: &[Box<dyn DiagnosticProvider>],
    uri: &Url,
) -> Vec<Diagnostic> {
    let tree = &analysis.parse.tree;
    let mut merged: Vec<ParseDiagnostic> = analysis.parse.errors.clone();
    if config.style_checks {
        merged.extend(style_diagnostics(tree));
    }
    merged.extend_from_slice(analysis.symbols.duplicate_diagnostics());
    merged.extend(analysis.symbols.unresolved_references(tree));
    for provider in providers {
        let extra = provider.check(analysis);
        tracing::debug!(
            provider = provider.name(),
            count = extra.len(),
            "secondary diagnostics"
        );
        merged.extend(extra);
    }

    merged.sort_by_key(|diag| (diag.span.start, diag.span.end, diag.severity));
    merged
        .iter()
        .map(|diag| diagnostic_to_lsp(&analysis.snapshot, uri, diag))
        .collect()
}
