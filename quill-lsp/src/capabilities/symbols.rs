//! Document symbols: the heading outline as nested LSP symbols.

use quill_parser::{OutlineNode, SymbolKind as CoreKind};
use tower_lsp::lsp_types::{DocumentSymbol, SymbolKind};

use crate::convert::span_to_range;
use crate::state::Analysis;

/// Document outline as nested symbols, derived purely from heading levels.
#[must_use]
pub fn document_symbols(analysis: &Analysis) -> Vec<DocumentSymbol> {
    analysis
        .symbols
        .outline()
        .iter()
        .map(|node| node_to_symbol(analysis, node))
        .collect()
}

fn node_to_symbol(analysis: &Analysis, node: &OutlineNode) -> DocumentSymbol {
    let symbol = &analysis.symbols.symbols()[node.symbol];
    let level = match symbol.kind {
        CoreKind::Section(level) => level,
        CoreKind::Anchor => 0,
    };
    let children: Vec<DocumentSymbol> = node
        .children
        .iter()
        .map(|child| node_to_symbol(analysis, child))
        .collect();
    let range = span_to_range(&analysis.snapshot, symbol.span);

    #[allow(deprecated)] // deprecated field but required by the type
    DocumentSymbol {
        name: symbol.name.clone(),
        kind: heading_level_to_symbol_kind(level),
        range,
        selection_range: range,
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
        detail: Some(format!("Level {level}")),
        tags: Some(vec![]),
        deprecated: None,
    }
}

/// Map heading levels to symbol kinds for visual hierarchy.
const fn heading_level_to_symbol_kind(level: u8) -> SymbolKind {
    match level {
        1 => SymbolKind::FILE,     // = Document title
        2 => SymbolKind::MODULE,   // == Section
        3 => SymbolKind::CLASS,    // === Subsection
        4 => SymbolKind::METHOD,   // ==== Sub-subsection
        5 => SymbolKind::FUNCTION, // =====
        _ => SymbolKind::VARIABLE, // Deeper levels
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use tower_lsp::lsp_types::Url;

    use crate::state::Workspace;

    use super::*;

    #[test]
    fn outline_nests_by_heading_level() {
        let content = "= Document Title\n\n== Section One\n\nSome content.\n\n== Section Two\n\n=== Subsection\n\nMore content.\n";
        let workspace = Workspace::new();
        let uri = Url::parse("file:///doc.adoc").unwrap();
        let analysis = workspace.open(uri, content.to_string(), 1);

        let symbols = document_symbols(&analysis);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Document Title");
        assert_eq!(symbols[0].kind, SymbolKind::FILE);

        let sections = symbols[0].children.as_ref().unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "Section One");
        assert_eq!(sections[1].name, "Section Two");

        let subsections = sections[1].children.as_ref().unwrap();
        assert_eq!(subsections.len(), 1);
        assert_eq!(subsections[0].name, "Subsection");
        assert_eq!(subsections[0].range.start.line, 8);
    }

    #[test]
    fn anchors_do_not_appear_in_the_outline() {
        let content = "[[top]]\n== Only Section\n\nProse with [[inline]] anchor.\n";
        let workspace = Workspace::new();
        let uri = Url::parse("file:///doc.adoc").unwrap();
        let analysis = workspace.open(uri, content.to_string(), 1);

        let symbols = document_symbols(&analysis);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Only Section");
        assert!(symbols[0].children.is_none());
    }
}
