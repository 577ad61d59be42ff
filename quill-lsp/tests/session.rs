//! Session-level scenarios: open/edit/close flows through the workspace,
//! the capabilities that read from it, and the debounce/cancellation
//! contract the backend builds on.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use quill_lsp::capabilities::{definition, diagnostics, symbols};
use quill_lsp::config::Config;
use quill_lsp::state::Workspace;
use quill_parser::{Change, Position as CorePosition};
use tower_lsp::lsp_types::{NumberOrString, Position, Url};

fn uri() -> Url {
    Url::parse("file:///notes.adoc").unwrap()
}

fn edit(start: (u32, u32), end: (u32, u32), text: &str) -> Change {
    Change {
        range: Some((
            CorePosition::new(start.0, start.1),
            CorePosition::new(end.0, end.1),
        )),
        text: text.to_string(),
    }
}

#[test]
fn outline_and_definition_resolve_across_sections() {
    let workspace = Workspace::new();
    let uri = uri();
    let text = "= Notes\n\n== Intro\n\nSee <<details>> for more.\n\n[[details]]\n== Details\n\nBody.\n";
    let analysis = workspace.open(uri.clone(), text.to_string(), 1);

    let outline = symbols::document_symbols(&analysis);
    assert_eq!(outline.len(), 1);
    let sections = outline[0].children.as_ref().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].name, "Intro");
    assert_eq!(sections[1].name, "Details");

    // From inside `<<details>>` on line 4.
    let location = definition::goto_definition(
        &analysis,
        &uri,
        Position {
            line: 4,
            character: 8,
        },
    )
    .unwrap();
    assert_eq!(location.uri, uri);
    assert_eq!(location.range.start.line, 6);
}

#[test]
fn deleting_an_anchor_yields_one_unresolved_diagnostic() {
    let workspace = Workspace::new();
    let uri = uri();
    let text = "= Notes\n\nSee <<details>>.\n\n[[details]]\n== Details\n";
    let analysis = workspace.open(uri.clone(), text.to_string(), 1);
    assert!(diagnostics::collect(&analysis, &Config::default(), &[], &uri).is_empty());

    // Delete the `[[details]]` line.
    let (analysis, _) = workspace
        .change(&uri, &[edit((4, 0), (5, 0), "")], 2)
        .unwrap();
    let published = diagnostics::collect(&analysis, &Config::default(), &[], &uri);
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].code,
        Some(NumberOrString::String("unresolved-reference".to_string()))
    );
    assert_eq!(published[0].range.start.line, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn superseded_edit_publishes_nothing() {
    let workspace = std::sync::Arc::new(Workspace::new());
    let uri = uri();
    workspace.open(uri.clone(), "= Notes\n".to_string(), 1);

    let (first_analysis, first_token) = workspace
        .change(&uri, &[edit((0, 7), (0, 7), " a")], 2)
        .unwrap();
    // A second edit lands inside the quiet period and supersedes version 2.
    let (second_analysis, _) = workspace
        .change(&uri, &[edit((0, 9), (0, 9), "b")], 3)
        .unwrap();

    // The debounced worker for version 2, as the backend runs it: its token
    // was cancelled by the later edit, so it exits before publishing.
    let worker_workspace = std::sync::Arc::clone(&workspace);
    let worker_uri = uri.clone();
    let worker = tokio::spawn(async move {
        tokio::select! {
            () = first_token.cancelled() => return None,
            () = tokio::time::sleep(Duration::from_millis(50)) => {}
        }
        worker_workspace
            .try_mark_published(&worker_uri, first_analysis.version)
            .then_some(first_analysis.version)
    });

    assert_eq!(worker.await.unwrap(), None);
    // Only the superseding version may publish.
    assert!(workspace.try_mark_published(&uri, second_analysis.version));
}

#[test]
fn published_versions_never_regress() {
    let workspace = Workspace::new();
    let uri = uri();
    workspace.open(uri.clone(), "= Notes\n".to_string(), 1);
    workspace
        .change(&uri, &[edit((0, 7), (0, 7), " a")], 2)
        .unwrap();
    workspace
        .change(&uri, &[edit((0, 9), (0, 9), "b")], 3)
        .unwrap();

    // A straggler pass for version 2 loses to the current version 3.
    assert!(!workspace.try_mark_published(&uri, 2));
    assert!(workspace.try_mark_published(&uri, 3));
    assert!(!workspace.try_mark_published(&uri, 2));
}

#[test]
fn forced_validation_discards_superseded_analysis() {
    let workspace = Workspace::new();
    let uri = uri();
    workspace.open(uri.clone(), "= Notes\n".to_string(), 1);

    // A force-validate request captures the analysis at version 1, then an
    // edit lands (and publishes) before the forced pass reaches its gate.
    let stale = workspace.analysis(&uri).unwrap();
    let (current, _) = workspace
        .change(&uri, &[edit((0, 7), (0, 7), " a")], 2)
        .unwrap();
    assert!(workspace.try_mark_published(&uri, current.version));

    // The forced pass must not publish version 1 after version 2 went out.
    assert!(!workspace.mark_published_if_current(&uri, stale.version));
    // Forcing against the current version is a plain re-publish.
    assert!(workspace.mark_published_if_current(&uri, current.version));
}

#[test]
fn close_discards_all_state() {
    let workspace = Workspace::new();
    let uri = uri();
    workspace.open(uri.clone(), "= Notes\n".to_string(), 1);
    workspace.close(&uri);
    assert!(workspace.analysis(&uri).is_none());

    // Re-opening starts a fresh publish history.
    workspace.open(uri.clone(), "= Notes\n".to_string(), 1);
    assert!(workspace.try_mark_published(&uri, 1));
}
