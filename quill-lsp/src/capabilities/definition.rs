//! Go-to-definition for cross-reference targets.

use quill_parser::{generate_heading_id, BlockKind, InlineKind, Position as CorePosition};
use tower_lsp::lsp_types::{Location, Position, Url};

use crate::convert::span_to_range;
use crate::state::Analysis;

/// The anchor id the cursor is on, if any: a cross-reference target, an
/// inline or standalone anchor, or a heading (through its id).
#[must_use]
pub fn anchor_id_at(analysis: &Analysis, offset: usize) -> Option<String> {
    let block = analysis.parse.tree.block_at(offset)?;
    if let Some(inline) = block.inline_at(offset) {
        match &inline.kind {
            InlineKind::CrossReference { target } => return Some(target.clone()),
            InlineKind::Anchor { id } => return Some(id.clone()),
            InlineKind::Strong
            | InlineKind::Emphasis
            | InlineKind::Monospace
            | InlineKind::AttributeReference { .. }
            | InlineKind::Link { .. } => {}
        }
    }
    match &block.kind {
        BlockKind::AnchorLine { id } => Some(id.clone()),
        BlockKind::Heading { .. } => {
            let start = block.span.start;
            let symbol = analysis
                .symbols
                .symbols()
                .iter()
                .find(|s| s.span.start == start)?;
            match &symbol.id {
                Some(id) => Some(id.clone()),
                // An explicit anchor above the heading owns the id; its
                // symbol carries the same name.
                None => analysis
                    .symbols
                    .symbols()
                    .iter()
                    .find(|s| s.name == symbol.name && s.id.is_some())
                    .and_then(|s| s.id.clone())
                    .or_else(|| {
                        let id = generate_heading_id(&symbol.name);
                        analysis.symbols.resolve(&id).map(|_| id)
                    }),
            }
        }
        _ => None,
    }
}

/// Resolve the cross-reference under the cursor to its definition.
#[must_use]
pub fn goto_definition(analysis: &Analysis, uri: &Url, position: Position) -> Option<Location> {
    let offset = analysis
        .snapshot
        .clamped_offset(CorePosition::new(position.line, position.character));
    let block = analysis.parse.tree.block_at(offset)?;
    let inline = block.inline_at(offset)?;
    let InlineKind::CrossReference { target } = &inline.kind else {
        return None;
    };
    let symbol = analysis.symbols.resolve(target)?;
    Some(Location {
        uri: uri.clone(),
        range: span_to_range(&analysis.snapshot, symbol.span),
    })
}
