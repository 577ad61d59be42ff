//! Completion: context-sensitive suggestions at the cursor.
//!
//! The context is classified from the line text before the cursor; results
//! are ranked deterministically (exact-prefix matches, then kind, then
//! label) with no frequency or recency input, so the same document and
//! cursor always produce the same list.

use quill_parser::{BlockKind, Position as CorePosition, Symbol, SymbolKind};
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemLabelDetails, Position,
};

use crate::state::Analysis;

/// Built-in document attributes the dialect understands.
const BUILTIN_ATTRIBUTES: &[(&str, &str)] = &[
    ("author", "Document author name"),
    ("description", "Document description"),
    ("doctitle", "Document title"),
    ("icons", "Icon rendering mode"),
    ("imagesdir", "Base directory for images"),
    ("keywords", "Document keywords"),
    ("revdate", "Revision date"),
    ("revnumber", "Revision number"),
    ("sectnums", "Enable section numbering"),
    ("source-highlighter", "Source code highlighter"),
    ("toc", "Table of contents placement"),
    ("toclevels", "Section levels shown in the TOC"),
];

/// Block keywords offered at the start of a line.
const BLOCK_KEYWORDS: &[(&str, &str)] = &[
    ("CAUTION: ", "Caution admonition"),
    ("IMPORTANT: ", "Important admonition"),
    ("NOTE: ", "Note admonition"),
    ("TIP: ", "Tip admonition"),
    ("WARNING: ", "Warning admonition"),
];

/// Block styles offered inside a `[...]` attribute list.
const BLOCK_STYLES: &[&str] = &[
    "example", "literal", "quote", "sidebar", "source", "verse",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// After `<<` or `xref:`, before the closer.
    CrossReference { prefix: String },
    /// After `{`, before the closing `}`.
    AttributeReference { prefix: String },
    /// `:name` at the start of a line.
    AttributeEntry { prefix: String },
    /// Inside a `[...]` attribute list at the start of a line.
    BlockStyle { prefix: String },
    /// Start of a line, typing a block keyword.
    BlockKeyword { prefix: String },
    None,
}

/// Compute ranked completions at `position`.
#[must_use]
pub fn completions(analysis: &Analysis, position: Position) -> Vec<CompletionItem> {
    let offset = analysis
        .snapshot
        .clamped_offset(CorePosition::new(position.line, position.character));
    // No completion inside verbatim content.
    if let Some(block) = analysis.parse.tree.block_at(offset) {
        if let BlockKind::Fenced { kind, .. } = &block.kind {
            if kind.is_verbatim() {
                return vec![];
            }
        }
    }

    let line_start = analysis
        .snapshot
        .clamped_offset(CorePosition::new(position.line, 0));
    let Some(before_cursor) = analysis.snapshot.text().get(line_start..offset) else {
        return vec![];
    };

    let mut items = match classify(before_cursor) {
        CompletionContext::CrossReference { prefix } => anchor_items(analysis, &prefix),
        CompletionContext::AttributeReference { prefix }
        | CompletionContext::AttributeEntry { prefix } => attribute_items(analysis, &prefix),
        CompletionContext::BlockStyle { prefix } => style_items(&prefix),
        CompletionContext::BlockKeyword { prefix } => keyword_items(&prefix),
        CompletionContext::None => vec![],
    };
    rank(&mut items);
    items
}

/// Classify the completion context from the line text before the cursor.
#[must_use]
pub fn classify(before_cursor: &str) -> CompletionContext {
    if let Some(at) = before_cursor.rfind("<<") {
        let prefix = &before_cursor[at + 2..];
        if !prefix.contains(">>") {
            return CompletionContext::CrossReference {
                prefix: prefix.to_string(),
            };
        }
    }
    if let Some(at) = before_cursor.rfind("xref:") {
        let prefix = &before_cursor[at + 5..];
        if !prefix.contains('[') {
            return CompletionContext::CrossReference {
                prefix: prefix.to_string(),
            };
        }
    }
    if let Some(at) = before_cursor.rfind('{') {
        let prefix = &before_cursor[at + 1..];
        if !prefix.contains('}') {
            return CompletionContext::AttributeReference {
                prefix: prefix.to_string(),
            };
        }
    }
    if let Some(prefix) = before_cursor.strip_prefix(':') {
        if !prefix.contains(':') {
            return CompletionContext::AttributeEntry {
                prefix: prefix.to_string(),
            };
        }
    }
    if let Some(prefix) = before_cursor.strip_prefix('[') {
        if !prefix.contains(']') && !prefix.starts_with('[') {
            return CompletionContext::BlockStyle {
                prefix: prefix.to_string(),
            };
        }
    }
    if !before_cursor.is_empty()
        && before_cursor.chars().all(|c| c.is_ascii_uppercase())
    {
        return CompletionContext::BlockKeyword {
            prefix: before_cursor.to_string(),
        };
    }
    CompletionContext::None
}

/// Kind priority for ranking; lower sorts first.
fn kind_rank(kind: CompletionItemKind) -> u8 {
    if kind == CompletionItemKind::KEYWORD {
        0
    } else if kind == CompletionItemKind::PROPERTY || kind == CompletionItemKind::VARIABLE {
        1
    } else if kind == CompletionItemKind::REFERENCE {
        2
    } else {
        3
    }
}

fn rank(items: &mut [CompletionItem]) {
    items.sort_by(|a, b| {
        let ka = a.kind.map_or(3, kind_rank);
        let kb = b.kind.map_or(3, kind_rank);
        ka.cmp(&kb).then_with(|| a.label.cmp(&b.label))
    });
    for (i, item) in items.iter_mut().enumerate() {
        item.sort_text = Some(format!("{i:04}"));
    }
}

fn referable_id(symbol: &Symbol) -> Option<&str> {
    match symbol.kind {
        SymbolKind::Anchor | SymbolKind::Section(_) => symbol.id.as_deref(),
    }
}

fn anchor_items(analysis: &Analysis, prefix: &str) -> Vec<CompletionItem> {
    let mut items: Vec<CompletionItem> = analysis
        .symbols
        .symbols()
        .iter()
        .filter_map(referable_id)
        .filter(|id| id.starts_with(prefix))
        .map(|id| CompletionItem {
            label: id.to_string(),
            kind: Some(CompletionItemKind::REFERENCE),
            label_details: Some(CompletionItemLabelDetails {
                detail: Some(" anchor".to_string()),
                description: None,
            }),
            ..Default::default()
        })
        .collect();
    // A generated heading id and an explicit anchor can coincide.
    items.sort_by(|a, b| a.label.cmp(&b.label));
    items.dedup_by(|a, b| a.label == b.label);
    items
}

fn attribute_items(analysis: &Analysis, prefix: &str) -> Vec<CompletionItem> {
    let mut items: Vec<CompletionItem> = analysis
        .parse
        .tree
        .blocks
        .iter()
        .filter_map(|block| match &block.kind {
            BlockKind::AttributeEntry { name } if name.starts_with(prefix) => {
                Some(CompletionItem {
                    label: name.clone(),
                    kind: Some(CompletionItemKind::VARIABLE),
                    label_details: Some(CompletionItemLabelDetails {
                        detail: Some(" document".to_string()),
                        description: None,
                    }),
                    ..Default::default()
                })
            }
            _ => None,
        })
        .collect();
    for (name, detail) in BUILTIN_ATTRIBUTES {
        if name.starts_with(prefix) && !items.iter().any(|item| item.label == *name) {
            items.push(CompletionItem {
                label: (*name).to_string(),
                kind: Some(CompletionItemKind::PROPERTY),
                detail: Some((*detail).to_string()),
                ..Default::default()
            });
        }
    }
    items
}

fn style_items(prefix: &str) -> Vec<CompletionItem> {
    BLOCK_STYLES
        .iter()
        .filter(|style| style.starts_with(prefix))
        .map(|style| CompletionItem {
            label: (*style).to_string(),
            kind: Some(CompletionItemKind::ENUM_MEMBER),
            ..Default::default()
        })
        .collect()
}

fn keyword_items(prefix: &str) -> Vec<CompletionItem> {
    BLOCK_KEYWORDS
        .iter()
        .filter(|(keyword, _)| keyword.starts_with(prefix))
        .map(|(keyword, detail)| CompletionItem {
            label: keyword.trim_end().to_string(),
            insert_text: Some((*keyword).to_string()),
            kind: Some(CompletionItemKind::KEYWORD),
            detail: Some((*detail).to_string()),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use tower_lsp::lsp_types::Url;

    use crate::state::Workspace;

    use super::*;

    fn analysis_of(text: &str) -> std::sync::Arc<Analysis> {
        let workspace = Workspace::new();
        let uri = Url::parse("file:///doc.adoc").unwrap();
        workspace.open(uri, text.to_string(), 1)
    }

    #[test]
    fn classifies_cursor_contexts() {
        assert_eq!(
            classify("See <<my-sec"),
            CompletionContext::CrossReference {
                prefix: "my-sec".to_string()
            }
        );
        assert_eq!(
            classify("See xref:tar"),
            CompletionContext::CrossReference {
                prefix: "tar".to_string()
            }
        );
        assert_eq!(
            classify("The {doc"),
            CompletionContext::AttributeReference {
                prefix: "doc".to_string()
            }
        );
        assert_eq!(
            classify(":toc"),
            CompletionContext::AttributeEntry {
                prefix: "toc".to_string()
            }
        );
        assert_eq!(
            classify("[sou"),
            CompletionContext::BlockStyle {
                prefix: "sou".to_string()
            }
        );
        assert_eq!(
            classify("NOT"),
            CompletionContext::BlockKeyword {
                prefix: "NOT".to_string()
            }
        );
        // Closed constructs offer nothing.
        assert_eq!(classify("See <<done>> and"), CompletionContext::None);
        assert_eq!(classify("The {attr} and"), CompletionContext::None);
        // `[[` opens an anchor, not an attribute list.
        assert_eq!(classify("[[an"), CompletionContext::None);
    }

    #[test]
    fn cross_reference_lists_anchors_and_generated_ids() {
        let analysis = analysis_of("[[first]]\n== First\n\n== Second One\n\nSee <<\n");
        let items = completions(
            &analysis,
            Position {
                line: 5,
                character: 6,
            },
        );
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["_second_one", "first"]);
    }

    #[test]
    fn verbatim_blocks_suppress_completion() {
        let analysis = analysis_of("----\nSee <<\n----\n");
        let items = completions(
            &analysis,
            Position {
                line: 1,
                character: 6,
            },
        );
        assert!(items.is_empty());
    }

    #[test]
    fn attribute_reference_merges_document_and_builtin() {
        let analysis = analysis_of(":project: Quill\n\nThe {\n");
        let items = completions(
            &analysis,
            Position {
                line: 2,
                character: 5,
            },
        );
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"project"));
        assert!(labels.contains(&"toc"));
        // Document attributes rank with built-ins by kind, then label.
        let project_at = labels.iter().position(|l| *l == "project").unwrap();
        let toc_at = labels.iter().position(|l| *l == "toc").unwrap();
        assert!(project_at < toc_at);
    }

    #[test]
    fn keyword_items_insert_trailing_colon() {
        let analysis = analysis_of("NOT\n");
        let items = completions(
            &analysis,
            Position {
                line: 0,
                character: 3,
            },
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "NOTE:");
        assert_eq!(items[0].insert_text.as_deref(), Some("NOTE: "));
    }

    #[test]
    fn ranking_is_deterministic() {
        let analysis = analysis_of("== Alpha\n\n== Beta\n\nSee <<\n");
        let first = completions(
            &analysis,
            Position {
                line: 4,
                character: 6,
            },
        );
        let second = completions(
            &analysis,
            Position {
                line: 4,
                character: 6,
            },
        );
        assert_eq!(first, second);
        let labels: Vec<&str> = first.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["_alpha", "_beta"]);
    }
}
