use serde::Serialize;

/// A half-open byte range into the source text.
///
/// Byte offsets are the canonical coordinates throughout the analysis core;
/// conversion to line/character positions happens at the buffer boundary.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check whether a byte offset falls within the span.
    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Inclusive containment, so a cursor sitting at the very end of a
    /// token still counts as "on" it.
    #[must_use]
    pub fn touches(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }

    /// Shift both offsets by a signed byte delta, saturating at zero.
    #[must_use]
    pub fn shifted(&self, delta: isize) -> Self {
        Self {
            start: self.start.saturating_add_signed(delta),
            end: self.end.saturating_add_signed(delta),
        }
    }
}
