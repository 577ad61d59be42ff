//! Full and incremental parsing.
//!
//! A full parse lexes the whole text. An incremental reparse cuts a window
//! out of the previous tree: the union of all top-level blocks touching the
//! changed region, extended backward over single-newline gaps (a paragraph
//! can absorb its neighbor when the line between them changes) and forward by
//! one trailing block (absorbing merges after a deleted blank line). Only the
//! window is re-lexed; the prefix is reused as-is and the suffix is shifted
//! by the edit's byte delta. Whenever the window cannot be shown to end on a
//! stable boundary, the reparse falls back to a full parse, so the result is
//! always syntax-equivalent to parsing from scratch.

mod block;
mod inline;

pub use block::style_diagnostics;

use crate::buffer::ChangedRegion;
use crate::span::Span;
use crate::tree::{BlockKind, ParseDiagnostic, SyntaxTree};

/// A parsed tree plus its structural syntax errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub tree: SyntaxTree,
    pub errors: Vec<ParseDiagnostic>,
}

/// Parse a whole document from scratch.
#[must_use]
pub fn parse(text: &str) -> ParseResult {
    let (blocks, errors) = block::parse_blocks(text, 0);
    ParseResult {
        tree: SyntaxTree { blocks },
        errors,
    }
}

/// Re-parse after an edit, reusing the previous result where possible.
///
/// `region` is the merged changed region reported by the buffer; `None`
/// (full-text replacement) forces a full parse.
#[must_use]
pub fn reparse(prev: &ParseResult, text: &str, region: Option<&ChangedRegion>) -> ParseResult {
    let Some(region) = region else {
        return parse(text);
    };
    match try_reparse(prev, text, region) {
        Some(result) => result,
        None => {
            tracing::debug!("incremental window rejected; falling back to full parse");
            parse(text)
        }
    }
}

/// A block kind whose last line can absorb a following plain-text line.
fn is_continuable(kind: &BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::Paragraph
            | BlockKind::Admonition { .. }
            | BlockKind::UnorderedList
            | BlockKind::OrderedList
    )
}

fn try_reparse(prev: &ParseResult, text: &str, region: &ChangedRegion) -> Option<ParseResult> {
    let blocks = &prev.tree.blocks;
    if blocks.is_empty() {
        return None;
    }
    let delta = region.delta();
    let old = region.old;

    // Blocks touching the changed region, counting adjacency through the
    // newline that separates a block from the edit.
    let mut first = blocks
        .iter()
        .position(|b| b.span.end + 1 >= old.start && b.span.start <= old.end + 1)?;
    let mut last = blocks
        .len()
        .checked_sub(1)
        .and_then(|hi| {
            (first..=hi)
                .take_while(|i| blocks[*i].span.start <= old.end + 1)
                .last()
        })?;

    // Extend backward while only a single newline separates the window from
    // the preceding block; a changed first line can merge into it. Gap bytes
    // before `old.start` are identical in the new text, so inspecting them
    // with old-coordinate spans is sound; a gap the edit reached into is
    // included unconditionally.
    while first > 0 {
        let gap_start = blocks[first - 1].span.end;
        let gap_end = blocks[first].span.start;
        if old.start >= gap_end && text[gap_start..gap_end].matches('\n').count() >= 2 {
            break;
        }
        first -= 1;
    }
    // One trailing block absorbs forward merges.
    last = (last + 1).min(blocks.len() - 1);

    // Window start is the first window block's line start, or the start of
    // the edited line when the edit began in inter-block whitespace. Both
    // offsets lie in the unchanged prefix, so old and new coordinates agree.
    let mut window_start = blocks[first].span.start;
    if old.start < window_start {
        window_start = text[..old.start].rfind('\n').map_or(0, |nl| nl + 1);
    }

    let suffix_start_idx = last + 1;
    let window_end_old = if suffix_start_idx >= blocks.len() {
        // No suffix: the window runs to end-of-document.
        return Some(splice(prev, text, first, suffix_start_idx, window_start, text.len(), delta, old));
    } else {
        blocks[last].span.end.max(old.end)
    };
    let window_end_new = window_end_old.checked_add_signed(delta)?;
    if window_end_new > text.len() || !text.is_char_boundary(window_end_new) {
        return None;
    }
    // The window must fully contain the change.
    if old.start < window_start || old.end > window_end_old {
        return None;
    }

    let result = splice(
        prev,
        text,
        first,
        suffix_start_idx,
        window_start,
        window_end_new,
        delta,
        old,
    );

    // Reject windows whose last block could swallow or merge with the
    // suffix: an unterminated fence runs to end-of-document, and a
    // continuable block separated from the suffix by a single newline would
    // have absorbed its first line in a full parse.
    let region_last = result
        .tree
        .blocks
        .get(suffix_blocks_start(&result, prev, suffix_start_idx).checked_sub(1)?);
    if let Some(block) = region_last {
        if matches!(block.kind, BlockKind::Fenced { terminated: false, .. }) {
            return None;
        }
        let suffix_new_start = prev.tree.blocks[suffix_start_idx]
            .span
            .start
            .checked_add_signed(delta)?;
        if is_continuable(&block.kind) && suffix_new_start.saturating_sub(block.span.end) < 2 {
            return None;
        }
    }

    Some(result)
}

/// Index into the spliced block list where the shifted suffix begins.
fn suffix_blocks_start(result: &ParseResult, prev: &ParseResult, suffix_start_idx: usize) -> usize {
    result.tree.blocks.len() - (prev.tree.blocks.len() - suffix_start_idx)
}

#[allow(clippy::too_many_arguments)]
fn splice(
    prev: &ParseResult,
    text: &str,
    first: usize,
    suffix_start_idx: usize,
    window_start: usize,
    window_end_new: usize,
    delta: isize,
    old: Span,
) -> ParseResult {
    let window_end_old = window_end_new.saturating_add_signed(-delta);
    let (region_blocks, region_errors) =
        block::parse_blocks(&text[window_start..window_end_new], window_start);

    let mut blocks = Vec::with_capacity(prev.tree.blocks.len() + region_blocks.len());
    blocks.extend(prev.tree.blocks[..first].iter().cloned());
    blocks.extend(region_blocks);
    blocks.extend(
        prev.tree.blocks[suffix_start_idx.min(prev.tree.blocks.len())..]
            .iter()
            .map(|b| b.shifted(delta)),
    );

    let mut errors: Vec<ParseDiagnostic> = Vec::new();
    for error in &prev.errors {
        if error.span.end < window_start && error.span.end < old.start {
            errors.push(error.clone());
        } else if error.span.start >= window_end_old {
            errors.push(error.shifted(delta));
        }
        // Errors inside the window are replaced by the region's own.
    }
    errors.extend(region_errors);
    errors.sort_by_key(|e| (e.span.start, e.span.end));

    ParseResult {
        tree: SyntaxTree { blocks },
        errors,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::buffer::{Change, Position, TextBuffer};

    use super::*;

    /// Apply one ranged edit and reparse incrementally; return both the
    /// incremental and from-scratch results for comparison.
    fn edit_and_reparse(
        text: &str,
        start: (u32, u32),
        end: (u32, u32),
        replacement: &str,
    ) -> (ParseResult, ParseResult, String) {
        let mut buffer = TextBuffer::new(text.to_string(), 1);
        let prev = parse(buffer.text());
        let applied = buffer
            .apply(
                &[Change {
                    range: Some((
                        Position::new(start.0, start.1),
                        Position::new(end.0, end.1),
                    )),
                    text: replacement.to_string(),
                }],
                2,
            )
            .unwrap();
        let incremental = reparse(&prev, buffer.text(), applied.region.as_ref());
        let full = parse(buffer.text());
        (incremental, full, buffer.text().to_string())
    }

    fn assert_equivalent(incremental: &ParseResult, full: &ParseResult) {
        assert_eq!(incremental.tree, full.tree);
        assert_eq!(incremental.errors, full.errors);
    }

    const DOC: &str = "= Title\n\n== Sec A\n\nAlpha paragraph text.\n\n[[sec-b]]\n== Sec B\n\nBeta paragraph.\n";

    #[test]
    fn insert_inside_paragraph_matches_full_parse() {
        let (incremental, full, _) = edit_and_reparse(DOC, (4, 5), (4, 5), "X");
        assert_equivalent(&incremental, &full);
    }

    #[test]
    fn insert_inside_paragraph_keeps_sibling_spans_stable() {
        let mut buffer = TextBuffer::new(DOC.to_string(), 1);
        let prev = parse(buffer.text());
        let applied = buffer
            .apply(
                &[Change {
                    range: Some((Position::new(4, 5), Position::new(4, 5))),
                    text: "XYZ".to_string(),
                }],
                2,
            )
            .unwrap();
        let next = reparse(&prev, buffer.text(), applied.region.as_ref());

        // Blocks before the edited paragraph keep their exact spans.
        assert_eq!(next.tree.blocks[0], prev.tree.blocks[0]);
        assert_eq!(next.tree.blocks[1], prev.tree.blocks[1]);
        // Blocks after it keep their kinds and shift by the insertion length.
        let shifted: Vec<_> = prev.tree.blocks[3..].iter().map(|b| b.shifted(3)).collect();
        assert_eq!(&next.tree.blocks[3..], shifted.as_slice());
    }

    #[test]
    fn deleting_blank_line_merges_paragraphs() {
        let text = "para one\n\npara two\n";
        // Delete the blank separator (the newline ending line 0).
        let (incremental, full, new_text) = edit_and_reparse(text, (0, 8), (1, 0), "");
        assert_eq!(new_text, "para one\npara two\n");
        assert_equivalent(&incremental, &full);
        assert_eq!(incremental.tree.blocks.len(), 1);
    }

    #[test]
    fn splitting_a_paragraph_adds_a_block() {
        let text = "line one line two\n\nafter\n";
        let (incremental, full, _) = edit_and_reparse(text, (0, 8), (0, 9), "\n\n");
        assert_equivalent(&incremental, &full);
        assert_eq!(incremental.tree.blocks.len(), 3);
    }

    #[test]
    fn opening_a_fence_swallows_to_end_of_document() {
        let text = "alpha\n\nbeta\n\ngamma\n";
        let (incremental, full, _) = edit_and_reparse(text, (2, 0), (2, 0), "----\n");
        assert_equivalent(&incremental, &full);
        // Exactly one diagnostic for the unterminated fence, no cascade.
        assert_eq!(incremental.errors.len(), 1);
    }

    #[test]
    fn closing_a_fence_restores_following_blocks() {
        let text = "----\ncode\n\nplain after\n";
        let (incremental, full, _) = edit_and_reparse(text, (1, 4), (1, 4), "\n----");
        assert_equivalent(&incremental, &full);
        assert!(incremental.errors.is_empty());
    }

    #[test]
    fn edit_in_heading_matches_full_parse() {
        let (incremental, full, _) = edit_and_reparse(DOC, (2, 7), (2, 8), "Z");
        assert_equivalent(&incremental, &full);
    }

    #[test]
    fn demoting_heading_to_text_merges_with_neighbor() {
        let text = "prose before\n== Head\nprose after\n";
        let (incremental, full, _) = edit_and_reparse(text, (1, 0), (1, 3), "");
        assert_equivalent(&incremental, &full);
        assert_eq!(incremental.tree.blocks.len(), 1);
    }

    #[test]
    fn append_at_end_of_document() {
        let (incremental, full, _) = edit_and_reparse(DOC, (10, 0), (10, 0), "\nNew tail paragraph.\n");
        assert_equivalent(&incremental, &full);
    }

    #[test]
    fn edit_before_first_block() {
        let text = "\n\nfirst\n";
        let (incremental, full, _) = edit_and_reparse(text, (0, 0), (0, 0), "intro\n");
        assert_equivalent(&incremental, &full);
    }

    #[test]
    fn multi_edit_batch_reparses_merged_region() {
        let mut buffer = TextBuffer::new(DOC.to_string(), 1);
        let prev = parse(buffer.text());
        let applied = buffer
            .apply(
                &[
                    Change {
                        range: Some((Position::new(4, 0), Position::new(4, 5))),
                        text: "Gamma".to_string(),
                    },
                    Change {
                        range: Some((Position::new(9, 0), Position::new(9, 4))),
                        text: "Delta".to_string(),
                    },
                ],
                2,
            )
            .unwrap();
        let incremental = reparse(&prev, buffer.text(), applied.region.as_ref());
        assert_equivalent(&incremental, &parse(buffer.text()));
    }

    #[test]
    fn full_replacement_reparses_from_scratch() {
        let prev = parse(DOC);
        let result = reparse(&prev, "totally new\n", None);
        assert_eq!(result, parse("totally new\n"));
    }

    #[test]
    fn unterminated_fence_error_survives_unrelated_edit() {
        let text = "----\nnever closed\n";
        let mut buffer = TextBuffer::new(text.to_string(), 1);
        let prev = parse(buffer.text());
        assert_eq!(prev.errors.len(), 1);
        let applied = buffer
            .apply(
                &[Change {
                    range: Some((Position::new(1, 0), Position::new(1, 0))),
                    text: "still ".to_string(),
                }],
                2,
            )
            .unwrap();
        let incremental = reparse(&prev, buffer.text(), applied.region.as_ref());
        assert_equivalent(&incremental, &parse(buffer.text()));
        assert_eq!(incremental.errors.len(), 1);
    }
}
