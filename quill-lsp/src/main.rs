//! quill-lsp: Language Server Protocol implementation for `Quill` markup
//!
//! Speaks LSP over stdio. Features:
//! - Diagnostics (syntax, style, unresolved references, duplicate anchors)
//! - Completion (cross-reference targets, attributes, block keywords)
//! - Document symbols (section outline), hover, go-to-definition, references

use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use quill_lsp::Backend;

#[tokio::main]
async fn main() {
    // Logs go to stderr since stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("starting quill-lsp server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
