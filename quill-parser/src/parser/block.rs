//! Line classification and block assembly.
//!
//! The lexer works line-wise: every source line gets a [`LineClass`], then the
//! assembler folds runs of lines into blocks. Block spans always start at a
//! line start and end at the content end of their last line, so a reparse
//! window can be cut at any block boundary.

use crate::span::Span;
use crate::tree::{
    AdmonitionVariant, Block, BlockKind, DiagnosticCategory, FenceKind, ParseDiagnostic, Severity,
    SyntaxTree,
};

use super::inline::scan_inlines;

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// Byte offset of the line start, relative to the parsed slice.
    start: usize,
    /// Line content without its terminator.
    text: &'a str,
}

impl Line<'_> {
    fn content_end(&self) -> usize {
        self.start + self.text.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LineClass {
    Blank,
    Heading { level: u8 },
    Fence(FenceKind),
    AnchorOnly { id: String },
    AttributeEntry { name: String },
    AttributeList,
    UnorderedItem,
    OrderedItem,
    LineComment,
    ThematicBreak,
    Admonition(AdmonitionVariant),
    Text,
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for segment in text.split_inclusive('\n') {
        let content = segment
            .strip_suffix('\n')
            .map_or(segment, |rest| rest.strip_suffix('\r').unwrap_or(rest));
        lines.push(Line {
            start,
            text: content,
        });
        start += segment.len();
    }
    if text.ends_with('\n') {
        lines.push(Line { start, text: "" });
    }
    lines
}

fn is_run_of(text: &str, marker: char, min: usize) -> bool {
    text.len() >= min && text.chars().all(|c| c == marker)
}

fn is_anchor_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn classify(raw: &str) -> LineClass {
    let text = raw.trim_end();
    if text.trim().is_empty() {
        return LineClass::Blank;
    }

    if text.starts_with("//") {
        if is_run_of(text, '/', 4) {
            return LineClass::Fence(FenceKind::Comment);
        }
        return LineClass::LineComment;
    }

    if text.starts_with('=') {
        let level = text.chars().take_while(|c| *c == '=').count();
        let rest = &text[level..];
        if (1..=6).contains(&level) && rest.starts_with(' ') && !rest.trim().is_empty() {
            return LineClass::Heading { level: level as u8 };
        }
        if is_run_of(text, '=', 4) {
            return LineClass::Fence(FenceKind::Example);
        }
        return LineClass::Text;
    }

    if text.starts_with("----") && is_run_of(text, '-', 4) {
        return LineClass::Fence(FenceKind::Listing);
    }
    if text.starts_with("....") && is_run_of(text, '.', 4) {
        return LineClass::Fence(FenceKind::Literal);
    }
    if let Some(rest) = text.strip_prefix("|===") {
        if rest.chars().all(|c| c == '=') {
            return LineClass::Fence(FenceKind::Table);
        }
    }
    if is_run_of(text, '\'', 3) {
        return LineClass::ThematicBreak;
    }

    if let Some(inner) = text.strip_prefix("[[").and_then(|t| t.strip_suffix("]]")) {
        if is_anchor_id(inner) {
            return LineClass::AnchorOnly {
                id: inner.to_string(),
            };
        }
    }
    if text.starts_with('[') && text.ends_with(']') && text.len() >= 2 {
        return LineClass::AttributeList;
    }

    if let Some(rest) = text.strip_prefix(':') {
        let name = rest.strip_prefix('!').unwrap_or(rest);
        if let Some(colon) = name.find(':') {
            let candidate = &name[..colon];
            let valid = !candidate.is_empty()
                && candidate
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
            let after = &name[colon + 1..];
            if valid && (after.is_empty() || after.starts_with(' ')) {
                return LineClass::AttributeEntry {
                    name: candidate.to_string(),
                };
            }
        }
    }

    let markers = text.chars().take_while(|c| *c == '*').count();
    if markers >= 1 && text[markers..].starts_with(' ') {
        return LineClass::UnorderedItem;
    }
    if text.starts_with("- ") {
        return LineClass::UnorderedItem;
    }
    let dots = text.chars().take_while(|c| *c == '.').count();
    if dots >= 1 && text[dots..].starts_with(' ') {
        return LineClass::OrderedItem;
    }
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits >= 1 && text[digits..].starts_with(". ") {
        return LineClass::OrderedItem;
    }

    if let Some(colon) = text.find(':') {
        if let Some(variant) = AdmonitionVariant::from_keyword(&text[..colon]) {
            if text[colon + 1..].starts_with(' ') {
                return LineClass::Admonition(variant);
            }
        }
    }

    LineClass::Text
}

/// Parse a slice of source into top-level blocks.
///
/// `base` is added to every span so a reparse window produces spans in
/// document coordinates.
pub(crate) fn parse_blocks(text: &str, base: usize) -> (Vec<Block>, Vec<ParseDiagnostic>) {
    let lines = split_lines(text);
    let classes: Vec<LineClass> = lines.iter().map(|line| classify(line.text)).collect();
    let mut blocks = Vec::new();
    let mut errors = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        match &classes[i] {
            LineClass::Blank => i += 1,
            LineClass::Heading { level } => {
                let span = Span::new(base + line.start, base + line.content_end());
                let inlines = scan_inlines(line.text, base + line.start);
                blocks.push(Block {
                    kind: BlockKind::Heading { level: *level },
                    span,
                    inlines,
                });
                i += 1;
            }
            LineClass::Fence(kind) => {
                let kind = *kind;
                let open = line;
                let close = (i + 1..lines.len()).find(|j| classes[*j] == LineClass::Fence(kind));
                let (last, terminated) = match close {
                    Some(j) => (j, true),
                    None => (lines.len() - 1, false),
                };
                let span = Span::new(base + open.start, base + lines[last].content_end());
                if !terminated {
                    errors.push(ParseDiagnostic {
                        span: Span::new(base + open.start, base + open.content_end()),
                        severity: Severity::Error,
                        category: DiagnosticCategory::Syntax,
                        message: format!(
                            "unclosed {} block (missing closing delimiter)",
                            fence_name(kind)
                        ),
                        related: None,
                    });
                }
                let inlines = if kind.is_verbatim() || !terminated {
                    Vec::new()
                } else {
                    // Interior of example/table blocks still carries markup.
                    let interior_start = lines[i + 1].start;
                    let interior_end = lines[last.saturating_sub(1)].content_end();
                    if interior_start < interior_end {
                        scan_inlines(&text[interior_start..interior_end], base + interior_start)
                    } else {
                        Vec::new()
                    }
                };
                blocks.push(Block {
                    kind: BlockKind::Fenced { kind, terminated },
                    span,
                    inlines,
                });
                i = match close {
                    Some(j) => j + 1,
                    None => lines.len(),
                };
            }
            LineClass::AnchorOnly { id } => {
                blocks.push(Block {
                    kind: BlockKind::AnchorLine { id: id.clone() },
                    span: Span::new(base + line.start, base + line.content_end()),
                    inlines: Vec::new(),
                });
                i += 1;
            }
            LineClass::AttributeEntry { name } => {
                blocks.push(Block {
                    kind: BlockKind::AttributeEntry { name: name.clone() },
                    span: Span::new(base + line.start, base + line.content_end()),
                    inlines: Vec::new(),
                });
                i += 1;
            }
            LineClass::AttributeList => {
                blocks.push(Block {
                    kind: BlockKind::AttributeList,
                    span: Span::new(base + line.start, base + line.content_end()),
                    inlines: Vec::new(),
                });
                i += 1;
            }
            LineClass::LineComment => {
                let end = run_end(&classes, i, |class| *class == LineClass::LineComment);
                blocks.push(Block {
                    kind: BlockKind::LineComment,
                    span: Span::new(base + line.start, base + lines[end - 1].content_end()),
                    inlines: Vec::new(),
                });
                i = end;
            }
            LineClass::ThematicBreak => {
                blocks.push(Block {
                    kind: BlockKind::ThematicBreak,
                    span: Span::new(base + line.start, base + line.content_end()),
                    inlines: Vec::new(),
                });
                i += 1;
            }
            LineClass::UnorderedItem | LineClass::OrderedItem => {
                let ordered = classes[i] == LineClass::OrderedItem;
                let end = run_end(&classes, i, |class| {
                    matches!(
                        class,
                        LineClass::UnorderedItem | LineClass::OrderedItem | LineClass::Text
                    )
                });
                let span = Span::new(base + line.start, base + lines[end - 1].content_end());
                let inlines = scan_inlines(&text[line.start..lines[end - 1].content_end()],
                    base + line.start);
                blocks.push(Block {
                    kind: if ordered {
                        BlockKind::OrderedList
                    } else {
                        BlockKind::UnorderedList
                    },
                    span,
                    inlines,
                });
                i = end;
            }
            LineClass::Admonition(variant) => {
                let variant = *variant;
                let end = run_end(&classes, i + 1, |class| *class == LineClass::Text).max(i + 1);
                let span = Span::new(base + line.start, base + lines[end - 1].content_end());
                let inlines = scan_inlines(
                    &text[line.start..lines[end - 1].content_end()],
                    base + line.start,
                );
                blocks.push(Block {
                    kind: BlockKind::Admonition { variant },
                    span,
                    inlines,
                });
                i = end;
            }
            LineClass::Text => {
                let end = run_end(&classes, i, |class| *class == LineClass::Text);
                let span = Span::new(base + line.start, base + lines[end - 1].content_end());
                let inlines = scan_inlines(
                    &text[line.start..lines[end - 1].content_end()],
                    base + line.start,
                );
                blocks.push(Block {
                    kind: BlockKind::Paragraph,
                    span,
                    inlines,
                });
                i = end;
            }
        }
    }

    (blocks, errors)
}

/// End (exclusive) of the run of lines starting at `from` matching `pred`.
fn run_end(classes: &[LineClass], from: usize, pred: impl Fn(&LineClass) -> bool) -> usize {
    let mut end = from;
    while end < classes.len() && pred(&classes[end]) {
        end += 1;
    }
    end
}

fn fence_name(kind: FenceKind) -> &'static str {
    match kind {
        FenceKind::Listing => "listing",
        FenceKind::Literal => "literal",
        FenceKind::Example => "example",
        FenceKind::Table => "table",
        FenceKind::Comment => "comment",
    }
}

/// Flag headings that skip more than one level below their nearest open
/// ancestor. Structural acceptance is unaffected; this is a style check and
/// runs over the whole tree so a reparse window cannot leave stale results
/// in untouched sections.
#[must_use]
pub fn style_diagnostics(tree: &SyntaxTree) -> Vec<ParseDiagnostic> {
    let mut open: Vec<u8> = Vec::new();
    let mut diagnostics = Vec::new();
    for block in &tree.blocks {
        let BlockKind::Heading { level } = block.kind else {
            continue;
        };
        while open.last().is_some_and(|ancestor| *ancestor >= level) {
            open.pop();
        }
        if let Some(ancestor) = open.last().copied() {
            if level > ancestor + 1 {
                diagnostics.push(ParseDiagnostic {
                    span: block.span,
                    severity: Severity::Warning,
                    category: DiagnosticCategory::Style,
                    message: format!(
                        "section level {level} skips levels under its level {ancestor} parent"
                    ),
                    related: None,
                });
            }
        }
        open.push(level);
    }
    diagnostics
}
