//! Inline span scanner for prose blocks.
//!
//! Runs over a block's source slice and emits non-overlapping, left-to-right
//! spans for cross-references, anchors, attribute references, links, and the
//! basic text markup pairs. Pair markers are constrained to a single line.

use crate::span::Span;
use crate::tree::{Inline, InlineKind};

/// Scan one block's text for inline spans. `base` offsets all spans into
/// document coordinates.
pub(crate) fn scan_inlines(text: &str, base: usize) -> Vec<Inline> {
    let bytes = text.as_bytes();
    let mut inlines = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' {
            // Escape suppresses any markup meaning of the next character.
            i += 2;
            continue;
        }

        if let Some(inline) = match bytes[i] {
            b'<' if text[i..].starts_with("<<") => scan_angle_xref(text, i),
            b'x' if text[i..].starts_with("xref:") => {
                scan_macro(text, i, "xref:").map(|(target, end)| Inline {
                    kind: InlineKind::CrossReference { target },
                    span: Span::new(i, end),
                })
            }
            b'l' if text[i..].starts_with("link:") => {
                scan_macro(text, i, "link:").map(|(target, end)| Inline {
                    kind: InlineKind::Link { target },
                    span: Span::new(i, end),
                })
            }
            b'h' if text[i..].starts_with("http://") || text[i..].starts_with("https://") => {
                Some(scan_bare_url(text, i))
            }
            b'[' if text[i..].starts_with("[[") => scan_inline_anchor(text, i),
            b'{' => scan_attribute_reference(text, i),
            b'*' => scan_pair(text, i, '*', InlineKind::Strong),
            b'_' => scan_pair(text, i, '_', InlineKind::Emphasis),
            b'`' => scan_pair(text, i, '`', InlineKind::Monospace),
            _ => None,
        } {
            let end = inline.span.end;
            inlines.push(Inline {
                kind: inline.kind,
                span: inline.span.shifted(base as isize),
            });
            i = end;
            continue;
        }

        // Advance one whole character, not one byte.
        i += text[i..].chars().next().map_or(1, char::len_utf8);
    }

    inlines
}

fn line_rest(text: &str, from: usize) -> &str {
    let rest = &text[from..];
    match rest.find('\n') {
        Some(nl) => &rest[..nl],
        None => rest,
    }
}

fn is_target_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '#')
}

/// `<<target>>` or `<<target,label>>`.
fn scan_angle_xref(text: &str, start: usize) -> Option<Inline> {
    let rest = line_rest(text, start + 2);
    let close = rest.find(">>")?;
    let inner = &rest[..close];
    let target = inner.split(',').next().unwrap_or(inner).trim();
    if target.is_empty() || !target.chars().all(is_target_char) {
        return None;
    }
    Some(Inline {
        kind: InlineKind::CrossReference {
            target: target.to_string(),
        },
        span: Span::new(start, start + 2 + close + 2),
    })
}

/// `name:target[attrs]` inline macro; returns the target and the end offset.
fn scan_macro(text: &str, start: usize, prefix: &str) -> Option<(String, usize)> {
    let body_start = start + prefix.len();
    let rest = line_rest(text, body_start);
    let open = rest.find('[')?;
    let close = rest[open..].find(']')? + open;
    let target = rest[..open].trim();
    if target.is_empty() {
        return None;
    }
    Some((target.to_string(), body_start + close + 1))
}

fn scan_bare_url(text: &str, start: usize) -> Inline {
    let rest = line_rest(text, start);
    let len = rest
        .find(|c: char| c.is_whitespace() || matches!(c, ']' | '>'))
        .unwrap_or(rest.len());
    Inline {
        kind: InlineKind::Link {
            target: rest[..len].to_string(),
        },
        span: Span::new(start, start + len),
    }
}

/// Inline `[[id]]` anchor.
fn scan_inline_anchor(text: &str, start: usize) -> Option<Inline> {
    let rest = line_rest(text, start + 2);
    let close = rest.find("]]")?;
    let id = &rest[..close];
    if id.is_empty() || !id.chars().all(is_target_char) {
        return None;
    }
    Some(Inline {
        kind: InlineKind::Anchor { id: id.to_string() },
        span: Span::new(start, start + 2 + close + 2),
    })
}

/// `{name}` attribute reference.
fn scan_attribute_reference(text: &str, start: usize) -> Option<Inline> {
    let rest = line_rest(text, start + 1);
    let close = rest.find('}')?;
    let name = &rest[..close];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if !valid {
        return None;
    }
    Some(Inline {
        kind: InlineKind::AttributeReference {
            name: name.to_string(),
        },
        span: Span::new(start, start + 1 + close + 1),
    })
}

/// A constrained formatting pair: marker, non-space content, marker, all on
/// one line.
fn scan_pair(text: &str, start: usize, marker: char, kind: InlineKind) -> Option<Inline> {
    let rest = line_rest(text, start + 1);
    let close = rest.find(marker)?;
    let content = &rest[..close];
    if content.is_empty()
        || content.starts_with(char::is_whitespace)
        || content.ends_with(char::is_whitespace)
    {
        return None;
    }
    Some(Inline {
        kind,
        span: Span::new(start, start + 1 + close + 1),
    })
}
