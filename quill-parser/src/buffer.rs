//! Versioned, line-addressable text storage for one document.
//!
//! Positions on the protocol boundary are (line, character) pairs counted in
//! UTF-16 code units; everything past the buffer speaks byte offsets. The
//! buffer owns the conversions in both directions and reports each accepted
//! edit batch as one merged [`ChangedRegion`] so the parser can re-lex only
//! the affected blocks.

use std::sync::Arc;

use serde::Serialize;

use crate::error::BufferError;
use crate::span::Span;

/// A protocol position: zero-based line, UTF-16 character offset within it.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[must_use]
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// One edit in a `didChange` batch. `range: None` replaces the whole text.
#[derive(Debug, Clone)]
pub struct Change {
    pub range: Option<(Position, Position)>,
    pub text: String,
}

/// The byte region affected by an accepted edit batch.
///
/// Bytes outside `old` (in the previous text) and outside `new` (in the
/// current text) are identical; the suffix is shifted by
/// `new.len() - old.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangedRegion {
    /// Replaced span in the previous text.
    pub old: Span,
    /// Replacement span in the current text.
    pub new: Span,
}

impl ChangedRegion {
    /// Signed byte growth of the document.
    #[must_use]
    pub fn delta(&self) -> isize {
        self.new.len() as isize - self.old.len() as isize
    }
}

/// Outcome of [`TextBuffer::apply`].
#[derive(Debug, Clone)]
pub struct AppliedEdit {
    /// Buffer version after the edit.
    pub version: i32,
    /// Merged changed region, `None` after a full-text replacement.
    pub region: Option<ChangedRegion>,
}

/// Mutable, versioned text for one open document.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    text: String,
    line_starts: Vec<usize>,
    version: i32,
}

/// Immutable, versioned view of the buffer, safe to read while later edits
/// proceed on the buffer itself.
#[derive(Debug, Clone)]
pub struct Snapshot {
    text: Arc<str>,
    line_starts: Arc<[usize]>,
    version: i32,
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

/// End offset of a line's content, excluding its `\n` / `\r\n` terminator.
fn line_content_end(text: &str, line_starts: &[usize], line: usize) -> usize {
    let mut end = match line_starts.get(line + 1) {
        Some(next) => next - 1,
        None => return text.len(),
    };
    if end > 0 && text.as_bytes().get(end - 1) == Some(&b'\r') {
        end -= 1;
    }
    end
}

fn offset_to_position_in(
    text: &str,
    line_starts: &[usize],
    offset: usize,
) -> Result<Position, BufferError> {
    if offset > text.len() {
        return Err(BufferError::OffsetOutOfBounds {
            offset,
            len: text.len(),
        });
    }
    if !text.is_char_boundary(offset) {
        return Err(BufferError::NotACharBoundary(offset));
    }
    let line = line_starts.partition_point(|start| *start <= offset) - 1;
    let start = line_starts[line];
    let character: usize = text[start..offset].chars().map(char::len_utf16).sum();
    Ok(Position {
        line: line as u32,
        character: character as u32,
    })
}

fn position_to_offset_in(
    text: &str,
    line_starts: &[usize],
    position: Position,
    clamp: bool,
) -> Result<usize, BufferError> {
    let out_of_bounds = BufferError::PositionOutOfBounds {
        line: position.line,
        character: position.character,
    };
    let line = position.line as usize;
    let Some(&line_start) = line_starts.get(line) else {
        if clamp {
            return Ok(text.len());
        }
        return Err(out_of_bounds);
    };
    let line_end = line_content_end(text, line_starts, line);

    let mut units = 0usize;
    let target = position.character as usize;
    for (byte_idx, ch) in text[line_start..line_end].char_indices() {
        if units >= target {
            // A target landing between the two units of a surrogate pair is
            // not representable; it snaps to the next character boundary.
            return Ok(line_start + byte_idx);
        }
        units += ch.len_utf16();
    }
    if units >= target || clamp {
        Ok(line_end)
    } else {
        Err(out_of_bounds)
    }
}

impl TextBuffer {
    /// Create a buffer from the full document text at a given version.
    #[must_use]
    pub fn new(text: String, version: i32) -> Self {
        let line_starts = compute_line_starts(&text);
        Self {
            text,
            line_starts,
            version,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Immutable view of the current text and version.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            text: Arc::from(self.text.as_str()),
            line_starts: Arc::from(self.line_starts.as_slice()),
            version: self.version,
        }
    }

    pub fn offset_to_position(&self, offset: usize) -> Result<Position, BufferError> {
        offset_to_position_in(&self.text, &self.line_starts, offset)
    }

    pub fn position_to_offset(&self, position: Position) -> Result<usize, BufferError> {
        position_to_offset_in(&self.text, &self.line_starts, position, false)
    }

    /// Apply one edit batch; exactly one version step per accepted call.
    ///
    /// Ranged edits are validated against the pre-edit text and must not
    /// overlap. On any validation error the buffer is left untouched.
    pub fn apply(
        &mut self,
        changes: &[Change],
        new_version: i32,
    ) -> Result<AppliedEdit, BufferError> {
        if changes.iter().any(|change| change.range.is_none()) {
            // A full-text change supersedes everything else in the batch.
            let full = changes
                .iter()
                .rev()
                .find(|change| change.range.is_none())
                .map(|change| change.text.clone())
                .unwrap_or_default();
            if changes.len() > 1 {
                tracing::warn!("edit batch mixes full and ranged changes; applying full text");
            }
            self.text = full;
            self.line_starts = compute_line_starts(&self.text);
            self.version = new_version;
            return Ok(AppliedEdit {
                version: new_version,
                region: None,
            });
        }

        // Resolve all ranges against the pre-edit text before mutating.
        let mut edits: Vec<(Span, &str)> = Vec::with_capacity(changes.len());
        for change in changes {
            let Some((start_pos, end_pos)) = change.range else {
                continue;
            };
            let start = self.position_to_offset(start_pos)?;
            let end = self.position_to_offset(end_pos)?;
            if start > end {
                return Err(BufferError::InvertedRange { start, end });
            }
            edits.push((Span::new(start, end), change.text.as_str()));
        }
        edits.sort_by_key(|(span, _)| (span.start, span.end));
        for pair in edits.windows(2) {
            if pair[0].0.end > pair[1].0.start {
                return Err(BufferError::OverlappingEdits(pair[1].0));
            }
        }

        let region = if edits.is_empty() {
            None
        } else {
            let old = Span::new(edits[0].0.start, edits[edits.len() - 1].0.end);
            let delta: isize = edits
                .iter()
                .map(|(span, text)| text.len() as isize - span.len() as isize)
                .sum();
            let new = Span::new(old.start, old.end.saturating_add_signed(delta));
            Some(ChangedRegion { old, new })
        };

        // Back-to-front so earlier offsets stay valid while splicing.
        for (span, text) in edits.iter().rev() {
            self.text.replace_range(span.start..span.end, text);
        }
        self.line_starts = compute_line_starts(&self.text);
        self.version = new_version;
        Ok(AppliedEdit {
            version: new_version,
            region,
        })
    }
}

impl Snapshot {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Content of one line, without its terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line)?;
        let end = line_content_end(&self.text, &self.line_starts, line);
        self.text.get(start..end)
    }

    pub fn offset_to_position(&self, offset: usize) -> Result<Position, BufferError> {
        offset_to_position_in(&self.text, &self.line_starts, offset)
    }

    pub fn position_to_offset(&self, position: Position) -> Result<usize, BufferError> {
        position_to_offset_in(&self.text, &self.line_starts, position, false)
    }

    /// Like [`Snapshot::position_to_offset`] but clamps past-end positions to
    /// the nearest valid offset, the way read requests from editors expect.
    #[must_use]
    pub fn clamped_offset(&self, position: Position) -> usize {
        position_to_offset_in(&self.text, &self.line_starts, position, true)
            .unwrap_or_else(|_| self.text.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    fn ranged(start: Position, end: Position, text: &str) -> Change {
        Change {
            range: Some((start, end)),
            text: text.to_string(),
        }
    }

    #[test]
    fn position_offset_round_trip() {
        let buffer = TextBuffer::new("= Title\n\nSome héllo 𝄞 text\n".to_string(), 1);
        // 𝄞 is one codepoint, two UTF-16 units, four UTF-8 bytes.
        for offset in (0..buffer.text().len()).filter(|o| buffer.text().is_char_boundary(*o)) {
            let position = buffer.offset_to_position(offset).unwrap();
            assert_eq!(buffer.position_to_offset(position).unwrap(), offset);
        }
    }

    #[test]
    fn utf16_column_counts_surrogate_pairs() {
        let buffer = TextBuffer::new("a𝄞b".to_string(), 1);
        // "a" = 1 unit, "𝄞" = 2 units, so "b" starts at character 3.
        assert_eq!(buffer.position_to_offset(pos(0, 3)).unwrap(), 5);
        assert_eq!(buffer.offset_to_position(5).unwrap(), pos(0, 3));
    }

    #[test]
    fn apply_single_insert_reports_region() {
        let mut buffer = TextBuffer::new("hello world".to_string(), 1);
        let applied = buffer
            .apply(&[ranged(pos(0, 5), pos(0, 5), ", dear")], 2)
            .unwrap();
        assert_eq!(buffer.text(), "hello, dear world");
        assert_eq!(applied.version, 2);
        let region = applied.region.unwrap();
        assert_eq!(region.old, Span::new(5, 5));
        assert_eq!(region.new, Span::new(5, 11));
        assert_eq!(region.delta(), 6);
    }

    #[test]
    fn apply_batch_merges_region_and_bumps_version_once() {
        let mut buffer = TextBuffer::new("aaa bbb ccc\n".to_string(), 3);
        let applied = buffer
            .apply(
                &[
                    ranged(pos(0, 8), pos(0, 11), "CC"),
                    ranged(pos(0, 0), pos(0, 3), "A"),
                ],
                4,
            )
            .unwrap();
        assert_eq!(buffer.text(), "A bbb CC\n");
        assert_eq!(buffer.version(), 4);
        let region = applied.region.unwrap();
        assert_eq!(region.old, Span::new(0, 11));
        assert_eq!(region.delta(), -3);
    }

    #[test]
    fn overlapping_edits_rejected_without_mutation() {
        let mut buffer = TextBuffer::new("abcdef".to_string(), 1);
        let err = buffer
            .apply(
                &[
                    ranged(pos(0, 0), pos(0, 3), "x"),
                    ranged(pos(0, 2), pos(0, 5), "y"),
                ],
                2,
            )
            .unwrap_err();
        assert!(matches!(err, BufferError::OverlappingEdits(_)));
        assert_eq!(buffer.text(), "abcdef");
        assert_eq!(buffer.version(), 1);
    }

    #[test]
    fn out_of_bounds_position_rejected() {
        let mut buffer = TextBuffer::new("ab\ncd".to_string(), 1);
        let err = buffer
            .apply(&[ranged(pos(5, 0), pos(5, 1), "x")], 2)
            .unwrap_err();
        assert!(matches!(err, BufferError::PositionOutOfBounds { .. }));
        assert_eq!(buffer.version(), 1);
    }

    #[test]
    fn full_replacement_clears_region() {
        let mut buffer = TextBuffer::new("old".to_string(), 1);
        let applied = buffer
            .apply(
                &[Change {
                    range: None,
                    text: "brand new".to_string(),
                }],
                2,
            )
            .unwrap();
        assert_eq!(buffer.text(), "brand new");
        assert!(applied.region.is_none());
    }

    #[test]
    fn deleting_a_newline_spans_lines() {
        let mut buffer = TextBuffer::new("ab\ncd\n".to_string(), 1);
        buffer
            .apply(&[ranged(pos(0, 2), pos(1, 0), "")], 2)
            .unwrap();
        assert_eq!(buffer.text(), "abcd\n");
        assert_eq!(buffer.line_count(), 2);
    }

    #[test]
    fn snapshot_is_stable_across_edits() {
        let mut buffer = TextBuffer::new("one\ntwo\n".to_string(), 1);
        let snapshot = buffer.snapshot();
        buffer
            .apply(&[ranged(pos(0, 0), pos(0, 3), "three")], 2)
            .unwrap();
        assert_eq!(snapshot.text(), "one\ntwo\n");
        assert_eq!(snapshot.version(), 1);
        assert_eq!(buffer.version(), 2);
    }

    #[test]
    fn clamped_offset_handles_past_end_positions() {
        let buffer = TextBuffer::new("ab\ncd".to_string(), 1);
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.clamped_offset(pos(0, 99)), 2);
        assert_eq!(snapshot.clamped_offset(pos(9, 0)), 5);
    }

    #[test]
    fn line_text_strips_terminators() {
        let buffer = TextBuffer::new("ab\r\ncd\n".to_string(), 1);
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.line_text(0), Some("ab"));
        assert_eq!(snapshot.line_text(1), Some("cd"));
        assert_eq!(snapshot.line_text(2), Some(""));
    }
}
