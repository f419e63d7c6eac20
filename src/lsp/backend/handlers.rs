//! LSP protocol handler implementations
//!
//! This module contains the `tower_lsp::LanguageServer` trait implementation
//! for the Nix backend:
//! - Lifecycle handlers (initialize, initialized, shutdown)
//! - Document lifecycle (did_open, did_change, did_close)
//! - Completion and completion item resolution

use std::sync::Arc;

use tower_lsp::{LanguageServer, jsonrpc};
use tower_lsp::lsp_types::{
    CompletionItem, CompletionOptions, CompletionParams, CompletionResponse,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    InitializeParams, InitializeResult, InitializedParams, MessageType, ServerCapabilities,
    ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind,
};
use tower_lsp::jsonrpc::Result as LspResult;

use tracing::{debug, error, info, warn};

use super::state::NixBackend;
use crate::lsp::document::LspDocument;
use crate::lsp::features::completion;

#[tower_lsp::async_trait]
impl LanguageServer for NixBackend {
    /// Handles the LSP initialize request, advertising completion with lazy resolution.
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("Received initialize: {:?}", params.client_info);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::INCREMENTAL)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    resolve_provider: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    /// Handles the LSP initialized notification.
    async fn initialized(&self, params: InitializedParams) {
        info!("Initialized: {:?}", params);
        let packages = if self.index.is_some() { "enabled" } else { "disabled" };
        self.client
            .log_message(
                MessageType::INFO,
                format!("Server initialized, package completion {}", packages),
            )
            .await;
    }

    /// Handles the LSP shutdown request.
    async fn shutdown(&self) -> jsonrpc::Result<()> {
        info!("Received shutdown request");
        self.stop_evaluator().await;
        Ok(())
    }

    /// Handles opening a text document and analyzing it.
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        info!("Opening document: URI={}, version={}", params.text_document.uri, params.text_document.version);
        let uri = params.text_document.uri;
        let document = LspDocument::new(
            &params.text_document.text,
            params.text_document.version,
            self.analyzer.as_ref(),
        );
        self.documents_by_uri.insert(uri, Arc::new(document));
    }

    /// Handles changes to a text document, applying incremental updates and re-analyzing.
    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        debug!("textDocument/didChange: {:?}", params.text_document);
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        match self.document(&uri) {
            Some(document) => {
                if let Err(e) = document
                    .apply(&params.content_changes, version, self.analyzer.as_ref())
                    .await
                {
                    warn!("Failed to apply changes to document with URI={}: {}", uri, e);
                    self.client
                        .log_message(MessageType::WARNING, format!("Ignored edit of {}: {}", uri, e))
                        .await;
                }
            }
            None => warn!("Failed to find document with URI={}", uri),
        }
    }

    /// Handles closing a text document, removing it from state.
    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        info!("textDocument/didClose: {}", params.text_document.uri);
        if self.documents_by_uri.remove(&params.text_document.uri).is_none() {
            warn!("Failed to find document with URI={}", params.text_document.uri);
        }
    }

    /// Completes local names and, where applicable, package attributes.
    async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        debug!("Completion request at {}:{:?}", uri, position);

        let Some(document) = self.document(&uri) else {
            debug!("Document not found: {}", uri);
            return Ok(None);
        };
        let analysis = document.analysis().await;

        // Runs on the worker pool, so a request waiting on the evaluator does
        // not hold up the connection task.
        let index = self.index.clone();
        let config = self.config.clone();
        let task = tokio::spawn(async move {
            completion::complete(analysis.as_ref(), position, index.as_deref(), &config).await
        });

        match task.await {
            Ok(Ok(list)) => Ok(Some(CompletionResponse::List(list))),
            Ok(Err(e)) => {
                warn!("Completion at {}:{:?} failed: {}", uri, position, e);
                Err(jsonrpc::Error::invalid_params(e.to_string()))
            }
            Err(e) => {
                error!("Completion task at {}:{:?} failed: {}", uri, position, e);
                Err(jsonrpc::Error::internal_error())
            }
        }
    }

    /// Fills in package documentation and version for a selected item.
    async fn completion_resolve(&self, item: CompletionItem) -> LspResult<CompletionItem> {
        let index = self.index.clone();
        let config = self.config.clone();
        let task = tokio::spawn(async move { completion::resolve(item, index.as_deref(), &config).await });

        match task.await {
            Ok(outcome) => {
                if let Some(e) = outcome.error {
                    warn!("Failed to resolve completion item {:?}: {}", outcome.item.label, e);
                }
                Ok(outcome.item)
            }
            Err(e) => {
                error!("Completion resolve task failed: {}", e);
                Err(jsonrpc::Error::internal_error())
            }
        }
    }
}
