//! Symbol index: document outline, anchors, and reference resolution.
//!
//! Built in one walk over the block forest. Anchor identifiers are unique per
//! document; the first definition wins for resolution and every later one is
//! reported as a duplicate-anchor diagnostic pointing back at the first.

use std::collections::HashMap;

use serde::Serialize;

use crate::span::Span;
use crate::tree::{
    Block, BlockKind, DiagnosticCategory, InlineKind, ParseDiagnostic, Severity, SyntaxTree,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    /// Section heading; carries the heading level (1-6).
    Section(u8),
    /// Anchor / cross-reference target.
    Anchor,
}

/// One outline or anchor entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Display name: heading title, or the anchor id.
    pub name: String,
    /// Defining range.
    pub span: Span,
    /// Unique identifier used for reference resolution, if any.
    pub id: Option<String>,
}

/// One node of the nested document outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    /// Index into [`SymbolIndex::symbols`].
    pub symbol: usize,
    pub children: Vec<OutlineNode>,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    symbols: Vec<Symbol>,
    by_id: HashMap<String, usize>,
    duplicates: Vec<ParseDiagnostic>,
}

/// Generated id for a heading title, `_lowercased_underscored` style.
#[must_use]
pub fn generate_heading_id(title: &str) -> String {
    let mut id = String::with_capacity(title.len() + 1);
    id.push('_');
    for c in title.chars() {
        if c.is_alphanumeric() {
            id.extend(c.to_lowercase());
        } else if !id.ends_with('_') {
            id.push('_');
        }
    }
    let trimmed = id.trim_end_matches('_');
    if trimmed.len() > 1 {
        trimmed.to_string()
    } else {
        id
    }
}

fn heading_title(block: &Block, text: &str) -> String {
    let Some(line) = text.get(block.span.start..block.span.end) else {
        return String::new();
    };
    line.trim_start_matches('=').trim().to_string()
}

impl SymbolIndex {
    /// Build the index from a tree and the text it was parsed from.
    #[must_use]
    pub fn build(tree: &SyntaxTree, text: &str) -> Self {
        let mut index = Self::default();
        // A standalone `[[id]]` line immediately above a heading names that
        // heading; the anchor's own line stays the defining range.
        let mut pending_anchor: Option<usize> = None;

        for block in &tree.blocks {
            match &block.kind {
                BlockKind::AnchorLine { id } => {
                    let symbol = index.insert(Symbol {
                        kind: SymbolKind::Anchor,
                        name: id.clone(),
                        span: block.span,
                        id: Some(id.clone()),
                    });
                    pending_anchor = symbol;
                }
                BlockKind::Heading { level } => {
                    let title = heading_title(block, text);
                    if let Some(anchor_idx) = pending_anchor.take() {
                        // The explicit anchor already owns the id; the
                        // section symbol carries only the outline entry.
                        index.symbols[anchor_idx].name = title.clone();
                        index.insert(Symbol {
                            kind: SymbolKind::Section(*level),
                            name: title,
                            span: block.span,
                            id: None,
                        });
                    } else {
                        let id = generate_heading_id(&title);
                        index.insert(Symbol {
                            kind: SymbolKind::Section(*level),
                            name: title,
                            span: block.span,
                            id: Some(id),
                        });
                    }
                }
                BlockKind::Paragraph
                | BlockKind::Admonition { .. }
                | BlockKind::UnorderedList
                | BlockKind::OrderedList
                | BlockKind::Fenced { .. } => {
                    pending_anchor = None;
                    for inline in &block.inlines {
                        if let InlineKind::Anchor { id } = &inline.kind {
                            index.insert(Symbol {
                                kind: SymbolKind::Anchor,
                                name: id.clone(),
                                span: inline.span,
                                id: Some(id.clone()),
                            });
                        }
                    }
                }
                BlockKind::AttributeEntry { .. }
                | BlockKind::AttributeList
                | BlockKind::LineComment
                | BlockKind::ThematicBreak => {
                    // Metadata lines between an anchor and its heading do not
                    // break the association; anything else does.
                    if !matches!(
                        block.kind,
                        BlockKind::AttributeList | BlockKind::LineComment
                    ) {
                        pending_anchor = None;
                    }
                }
            }
        }
        index
    }

    /// Insert a symbol, registering its id first-wins. Returns the symbol's
    /// index if it now owns its id (or has none).
    fn insert(&mut self, symbol: Symbol) -> Option<usize> {
        let idx = self.symbols.len();
        let mut owns_id = true;
        if let Some(id) = symbol.id.clone() {
            if let Some(&existing) = self.by_id.get(&id) {
                owns_id = false;
                self.duplicates.push(ParseDiagnostic {
                    span: symbol.span,
                    severity: Severity::Warning,
                    category: DiagnosticCategory::DuplicateAnchor,
                    message: format!("duplicate anchor id '{id}'"),
                    related: Some(self.symbols[existing].span),
                });
            } else {
                self.by_id.insert(id, idx);
            }
        }
        self.symbols.push(symbol);
        owns_id.then_some(idx)
    }

    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Duplicate-anchor diagnostics, in document order.
    #[must_use]
    pub fn duplicate_diagnostics(&self) -> &[ParseDiagnostic] {
        &self.duplicates
    }

    /// Resolve an anchor identifier to its (first) defining symbol.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Option<&Symbol> {
        self.by_id.get(id).map(|idx| &self.symbols[*idx])
    }

    /// Every span referring to `id`: all cross-reference inlines plus the
    /// definition itself, in document order.
    #[must_use]
    pub fn find_references(&self, tree: &SyntaxTree, id: &str) -> Vec<Span> {
        let mut spans: Vec<Span> = self
            .resolve(id)
            .map(|symbol| symbol.span)
            .into_iter()
            .collect();
        spans.extend(
            tree.cross_references()
                .filter(|(target, _)| *target == id)
                .map(|(_, span)| span),
        );
        spans.sort_by_key(|span| span.start);
        spans
    }

    /// Diagnostics for cross-references whose target is not defined.
    #[must_use]
    pub fn unresolved_references(&self, tree: &SyntaxTree) -> Vec<ParseDiagnostic> {
        tree.cross_references()
            .filter(|(target, _)| self.resolve(target).is_none())
            .map(|(target, span)| ParseDiagnostic {
                span,
                severity: Severity::Warning,
                category: DiagnosticCategory::UnresolvedReference,
                message: format!("unresolved cross-reference: target '{target}' not found"),
                related: None,
            })
            .collect()
    }

    /// Nested outline derived purely from heading levels.
    #[must_use]
    pub fn outline(&self) -> Vec<OutlineNode> {
        let mut roots = Vec::new();
        // Stack of (level, path of child indices into the forest).
        let mut stack: Vec<(u8, usize)> = Vec::new();

        fn node_at<'a>(roots: &'a mut Vec<OutlineNode>, path: &[(u8, usize)]) -> &'a mut Vec<OutlineNode> {
            let mut current = roots;
            for (_, idx) in path {
                current = &mut current[*idx].children;
            }
            current
        }

        for (idx, symbol) in self.symbols.iter().enumerate() {
            let SymbolKind::Section(level) = symbol.kind else {
                continue;
            };
            while stack.last().is_some_and(|(open, _)| *open >= level) {
                stack.pop();
            }
            let siblings = node_at(&mut roots, &stack);
            siblings.push(OutlineNode {
                symbol: idx,
                children: Vec::new(),
            });
            let child_idx = siblings.len() - 1;
            stack.push((level, child_idx));
        }
        roots
    }
}
