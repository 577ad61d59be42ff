//! Find-references for anchors and cross-references.

use quill_parser::Position as CorePosition;
use tower_lsp::lsp_types::{Location, Position, Url};

use crate::capabilities::definition::anchor_id_at;
use crate::convert::span_to_range;
use crate::state::Analysis;

/// Every location referring to the anchor under the cursor: the definition
/// plus all cross-references targeting it, in document order.
#[must_use]
pub fn find_references(
    analysis: &Analysis,
    uri: &Url,
    position: Position,
    include_declaration: bool,
) -> Vec<Location> {
    let offset = analysis
        .snapshot
        .clamped_offset(CorePosition::new(position.line, position.character));
    let Some(id) = anchor_id_at(analysis, offset) else {
        return vec![];
    };
    let definition_span = analysis.symbols.resolve(&id).map(|symbol| symbol.span);
    analysis
        .symbols
        .find_references(&analysis.parse.tree, &id)
        .into_iter()
        .filter(|span| include_declaration || Some(*span) != definition_span)
        .map(|span| Location {
            uri: uri.clone(),
            range: span_to_range(&analysis.snapshot, span),
        })
        .collect()
}
