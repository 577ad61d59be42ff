//! Hover: describe the cross-reference or anchor under the cursor.

use quill_parser::{InlineKind, Position as CorePosition, SymbolKind};
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};

use crate::convert::span_to_range;
use crate::state::Analysis;

#[must_use]
pub fn hover(analysis: &Analysis, position: Position) -> Option<Hover> {
    let offset = analysis
        .snapshot
        .clamped_offset(CorePosition::new(position.line, position.character));
    let block = analysis.parse.tree.block_at(offset)?;
    let inline = block.inline_at(offset)?;

    let markdown = match &inline.kind {
        InlineKind::CrossReference { target } => match analysis.symbols.resolve(target) {
            Some(symbol) => {
                let what = match symbol.kind {
                    SymbolKind::Section(level) => format!("section (level {level})"),
                    SymbolKind::Anchor => "anchor".to_string(),
                };
                format!("**{}** ({what})\n\nTarget: `{target}`", symbol.name)
            }
            None => format!("Unresolved cross-reference: `{target}`"),
        },
        InlineKind::Anchor { id } => {
            let count = analysis
                .parse
                .tree
                .cross_references()
                .filter(|(target, _)| target == id)
                .count();
            format!("Anchor `{id}`, referenced {count} time(s) in this document")
        }
        InlineKind::AttributeReference { name } => format!("Attribute reference: `{name}`"),
        InlineKind::Strong
        | InlineKind::Emphasis
        | InlineKind::Monospace
        | InlineKind::Link { .. } => return None,
    };

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: markdown,
        }),
        range: Some(span_to_range(&analysis.snapshot, inline.span)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_lsp::lsp_types::Url;

    use crate::state::Workspace;

    use super::*;

    fn analysis_of(text: &str) -> std::sync::Arc<Analysis> {
        let workspace = Workspace::new();
        let uri = Url::parse("file:///doc.adoc").unwrap();
        workspace.open(uri, text.to_string(), 1)
    }

    fn markdown(hover: &Hover) -> &str {
        match &hover.contents {
            HoverContents::Markup(content) => &content.value,
            HoverContents::Scalar(_) | HoverContents::Array(_) => "",
        }
    }

    #[test]
    fn resolved_xref_names_its_target_section() {
        let analysis = analysis_of("See <<sec>>.\n\n[[sec]]\n== The Section\n");
        let hover = hover(
            &analysis,
            Position {
                line: 0,
                character: 7,
            },
        )
        .unwrap();
        let text = markdown(&hover);
        assert!(text.contains("The Section"));
        assert!(text.contains("`sec`"));
    }

    #[test]
    fn unresolved_xref_says_so() {
        let analysis = analysis_of("See <<ghost>>.\n");
        let hover = hover(
            &analysis,
            Position {
                line: 0,
                character: 7,
            },
        )
        .unwrap();
        assert!(markdown(&hover).contains("Unresolved"));
    }

    #[test]
    fn plain_prose_has_no_hover() {
        let analysis = analysis_of("Just a paragraph.\n");
        assert!(hover(
            &analysis,
            Position {
                line: 0,
                character: 5,
            },
        )
        .is_none());
    }
}
