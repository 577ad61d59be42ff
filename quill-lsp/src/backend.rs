//! LSP backend: the `LanguageServer` implementation tying the workspace,
//! capabilities, and debounced diagnostics together.
//!
//! Edits are applied and reparsed synchronously in `did_change`; the
//! diagnostic pass runs on its own task after a quiet period and is
//! discarded unpublished whenever a newer edit supersedes it. Read requests
//! serve from the analysis snapshot current at arrival.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DocumentSymbolParams,
    DocumentSymbolResponse, ExecuteCommandOptions, ExecuteCommandParams, GotoDefinitionParams,
    GotoDefinitionResponse, Hover, HoverParams, HoverProviderCapability, InitializeParams,
    InitializeResult, InitializedParams, Location, OneOf, ReferenceParams, ServerCapabilities,
    ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind, Url,
};
use tower_lsp::{Client, LanguageServer};

use crate::capabilities::diagnostics::{self, DiagnosticProvider};
use crate::capabilities::{completion, definition, hover, references, symbols};
use crate::config::Config;
use crate::convert::content_change;
use crate::state::{Analysis, Workspace};

pub const FORCE_VALIDATE_COMMAND: &str = "quill.forceValidate";

pub struct Backend {
    client: Client,
    workspace: Arc<Workspace>,
    config: RwLock<Config>,
    providers: Arc<Vec<Box<dyn DiagnosticProvider>>>,
}

impl Backend {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_providers(client, Vec::new())
    }

    /// Build a backend with secondary diagnostics sources registered.
    #[must_use]
    pub fn with_providers(client: Client, providers: Vec<Box<dyn DiagnosticProvider>>) -> Self {
        Self {
            client,
            workspace: Arc::new(Workspace::new()),
            config: RwLock::new(Config::default()),
            providers: Arc::new(providers),
        }
    }

    /// Compute and publish diagnostics for `analysis` now, subject to the
    /// version-monotonic gate.
    async fn publish(&self, uri: Url, analysis: &Analysis) {
        let config = self.config.read().await.clone();
        let diagnostics = diagnostics::collect(analysis, &config, &self.providers, &uri);
        if self.workspace.try_mark_published(&uri, analysis.version) {
            self.client
                .publish_diagnostics(uri, diagnostics, Some(analysis.version))
                .await;
        }
    }

    /// Schedule a debounced diagnostic pass for `analysis`. The task exits
    /// silently if a newer edit cancels it during the quiet period.
    fn schedule_diagnostics(
        &self,
        uri: Url,
        analysis: Arc<Analysis>,
        token: tokio_util::sync::CancellationToken,
        debounce: Duration,
        config: Config,
    ) {
        let workspace = Arc::clone(&self.workspace);
        let providers = Arc::clone(&self.providers);
        let client = self.client.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(debounce) => {}
            }
            let diagnostics = diagnostics::collect(&analysis, &config, &providers, &uri);
            if token.is_cancelled() {
                return;
            }
            if workspace.try_mark_published(&uri, analysis.version) {
                // Marked under the entry lock, sent after it; versions are
                // monotonic at the mark. A send delayed past the next edit's
                // whole debounce window could still arrive out of order, but
                // that requires this task to stall between mark and send for
                // longer than the debounce interval.
                client
                    .publish_diagnostics(uri, diagnostics, Some(analysis.version))
                    .await;
            } else {
                tracing::debug!(%uri, version = analysis.version, "stale diagnostics discarded");
            }
        });
    }

    /// `quill.forceValidate`: validate synchronously, bypassing the debounce.
    async fn force_validate(&self, uri: Url) {
        let Some(analysis) = self.workspace.analysis(&uri) else {
            tracing::warn!(%uri, "force-validate for a document that is not open");
            return;
        };
        self.workspace.cancel_pending(&uri);
        let config = self.config.read().await.clone();
        let diagnostics = diagnostics::collect(&analysis, &config, &self.providers, &uri);
        // An edit may have superseded `analysis` across the awaits above; the
        // gate re-checks currency under the entry lock. Re-publishing the
        // still-current version is allowed (the set is identical), a stale
        // one is discarded like any other superseded pass.
        if self.workspace.mark_published_if_current(&uri, analysis.version) {
            self.client
                .publish_diagnostics(uri, diagnostics, Some(analysis.version))
                .await;
        } else {
            tracing::debug!(%uri, version = analysis.version, "stale force-validate discarded");
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let config = Config::from_initialization_options(params.initialization_options.as_ref());
        tracing::info!(debounce_ms = config.debounce_ms, "initializing quill-lsp");
        *self.config.write().await = config;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![
                        "<".to_string(),
                        "{".to_string(),
                        ":".to_string(),
                        "[".to_string(),
                    ]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![FORCE_VALIDATE_COMMAND.to_string()],
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "quill-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("quill-lsp initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutting down quill-lsp");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!(%uri, "document opened");

        let analysis = self.workspace.open(
            uri.clone(),
            params.text_document.text,
            params.text_document.version,
        );
        // Open validates immediately; the debounce applies to edits only.
        self.publish(uri, &analysis).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        let changes: Vec<_> = params.content_changes.iter().map(content_change).collect();

        let (analysis, token) = match self.workspace.change(&uri, &changes, version) {
            Ok(applied) => applied,
            Err(error) => {
                tracing::warn!(%uri, version, "edit rejected: {error}");
                return;
            }
        };

        let config = self.config.read().await.clone();
        let debounce = Duration::from_millis(config.debounce_ms);
        self.schedule_diagnostics(uri, analysis, token, debounce, config);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!(%uri, "document closed");

        self.workspace.close(&uri);
        // Clear published diagnostics; no state survives the close.
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let response = self.workspace.analysis(&uri).map(|analysis| {
            CompletionResponse::Array(completion::completions(&analysis, position))
        });
        Ok(response)
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        Ok(self
            .workspace
            .analysis(&uri)
            .and_then(|analysis| hover::hover(&analysis, position)))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;

        Ok(self
            .workspace
            .analysis(&uri)
            .map(|analysis| DocumentSymbolResponse::Nested(symbols::document_symbols(&analysis))))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        Ok(self.workspace.analysis(&uri).and_then(|analysis| {
            definition::goto_definition(&analysis, &uri, position)
                .map(GotoDefinitionResponse::Scalar)
        }))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let include_declaration = params.context.include_declaration;

        Ok(self.workspace.analysis(&uri).map(|analysis| {
            references::find_references(&analysis, &uri, position, include_declaration)
        }))
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        if params.command == FORCE_VALIDATE_COMMAND {
            for argument in &params.arguments {
                if let Some(uri) = argument.as_str().and_then(|raw| Url::parse(raw).ok()) {
                    self.force_validate(uri).await;
                }
            }
        } else {
            tracing::warn!(command = %params.command, "unknown command");
        }
        Ok(None)
    }
}
