//! Type conversions between quill-parser and LSP types.

use quill_parser::{Change, ParseDiagnostic, Position as CorePosition, Severity, Snapshot, Span};
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location, NumberOrString,
    Position, Range, TextDocumentContentChangeEvent, Url,
};

#[must_use]
pub fn core_position(position: Position) -> CorePosition {
    CorePosition {
        line: position.line,
        character: position.character,
    }
}

#[must_use]
pub fn lsp_position(position: CorePosition) -> Position {
    Position {
        line: position.line,
        character: position.character,
    }
}

/// Convert a byte span to an LSP range against a snapshot of the text it was
/// computed from. Out-of-range spans collapse to the document end rather
/// than panicking; they indicate a stale span and are harmless to render.
#[must_use]
pub fn span_to_range(snapshot: &Snapshot, span: Span) -> Range {
    let end_of_doc = || {
        lsp_position(
            snapshot
                .offset_to_position(snapshot.text().len())
                .unwrap_or_default(),
        )
    };
    Range {
        start: snapshot
            .offset_to_position(span.start)
            .map_or_else(|_| end_of_doc(), lsp_position),
        end: snapshot
            .offset_to_position(span.end)
            .map_or_else(|_| end_of_doc(), lsp_position),
    }
}

/// Convert an LSP incremental change event into a buffer edit. An event with
/// no range is a full-document replacement.
#[must_use]
pub fn content_change(event: &TextDocumentContentChangeEvent) -> Change {
    Change {
        range: event
            .range
            .map(|range| (core_position(range.start), core_position(range.end))),
        text: event.text.clone(),
    }
}

#[must_use]
pub fn severity_to_lsp(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

/// Convert a parser diagnostic to an LSP diagnostic. The stable category tag
/// travels in `code`; the source is always `"quill"`.
#[must_use]
pub fn diagnostic_to_lsp(snapshot: &Snapshot, uri: &Url, diag: &ParseDiagnostic) -> Diagnostic {
    Diagnostic {
        range: span_to_range(snapshot, diag.span),
        severity: Some(severity_to_lsp(diag.severity)),
        code: Some(NumberOrString::String(diag.category.as_str().to_string())),
        source: Some("quill".to_string()),
        message: diag.message.clone(),
        related_information: diag.related.map(|first| {
            vec![DiagnosticRelatedInformation {
                location: Location {
                    uri: uri.clone(),
                    range: span_to_range(snapshot, first),
                },
                message: "first definition is here".to_string(),
            }]
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quill_parser::TextBuffer;

    use super::*;

    #[test]
    fn span_to_range_uses_utf16_columns() {
        let buffer = TextBuffer::new("a𝄞b\nnext\n".to_string(), 1);
        let snapshot = buffer.snapshot();
        // "b" occupies bytes 5..6 but UTF-16 characters 3..4.
        let range = span_to_range(&snapshot, Span::new(5, 6));
        assert_eq!(range.start, Position::new(0, 3));
        assert_eq!(range.end, Position::new(0, 4));
    }

    #[test]
    fn span_crossing_lines() {
        let buffer = TextBuffer::new("one\ntwo\n".to_string(), 1);
        let snapshot = buffer.snapshot();
        let range = span_to_range(&snapshot, Span::new(2, 6));
        assert_eq!(range.start, Position::new(0, 2));
        assert_eq!(range.end, Position::new(1, 2));
    }
}
