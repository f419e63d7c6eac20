//! Shared helpers for backend integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tower_lsp::lsp_types::{
    CompletionList, CompletionParams, CompletionResponse, DidOpenTextDocumentParams, PartialResultParams,
    Position, TextDocumentIdentifier, TextDocumentItem, TextDocumentPositionParams, Url, WorkDoneProgressParams,
};
use tower_lsp::{ClientSocket, LanguageServer, LspService, jsonrpc};

use nix_language_server::analysis::textual::TextualAnalyzer;
use nix_language_server::config::CompletionConfig;
use nix_language_server::error::IndexError;
use nix_language_server::index::{AttrPath, AttrPathCompleteParams, AttrSetClient, EvaluatorClient, PackageDescription, Reply};
use nix_language_server::lsp::backend::NixBackend;

/// Package index answering every request with the same canned values.
pub struct StaticIndex {
    pub names: Vec<String>,
    pub info: Result<PackageDescription, IndexError>,
}

impl StaticIndex {
    pub fn new(names: &[&str], info: PackageDescription) -> Self {
        StaticIndex {
            names: names.iter().map(|s| s.to_string()).collect(),
            info: Ok(info),
        }
    }
}

impl AttrSetClient for StaticIndex {
    fn attrpath_complete(&self, _params: AttrPathCompleteParams, reply: Reply<Vec<String>>) {
        reply(Ok(self.names.clone()));
    }

    fn attrpath_info(&self, _path: AttrPath, reply: Reply<PackageDescription>) {
        reply(self.info.clone());
    }
}

/// A backend under test, with the socket kept alive for its lifetime.
pub struct TestServer {
    pub service: LspService<NixBackend>,
    _socket: ClientSocket,
}

impl TestServer {
    pub fn new(config: CompletionConfig, index: Option<Arc<dyn AttrSetClient>>) -> Self {
        let (service, socket) = LspService::new(|client| {
            NixBackend::new(client, config, Arc::new(TextualAnalyzer::new()), index, None)
        });
        TestServer { service, _socket: socket }
    }

    pub fn backend(&self) -> &NixBackend {
        self.service.inner()
    }

    pub async fn open(&self, path: &str, text: &str) -> Url {
        let uri = Url::parse(&format!("file://{}", path)).unwrap();
        self.backend()
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.clone(),
                    language_id: "nix".to_string(),
                    version: 1,
                    text: text.to_string(),
                },
            })
            .await;
        uri
    }

    pub async fn completion(&self, uri: &Url, position: Position) -> jsonrpc::Result<Option<CompletionResponse>> {
        self.backend()
            .completion(CompletionParams {
                text_document_position: TextDocumentPositionParams {
                    text_document: TextDocumentIdentifier { uri: uri.clone() },
                    position,
                },
                work_done_progress_params: WorkDoneProgressParams::default(),
                partial_result_params: PartialResultParams::default(),
                context: None,
            })
            .await
    }

    /// Completion that must succeed with a list.
    pub async fn completion_list(&self, uri: &Url, position: Position) -> CompletionList {
        match self.completion(uri, position).await {
            Ok(Some(CompletionResponse::List(list))) => list,
            other => panic!("Expected a completion list, got {:?}", other),
        }
    }
}

pub fn labels(list: &CompletionList) -> Vec<&str> {
    list.items.iter().map(|item| item.label.as_str()).collect()
}

pub fn config(max_items: usize, timeout: Option<Duration>) -> CompletionConfig {
    CompletionConfig {
        max_items,
        remote_timeout: timeout,
    }
}

async fn read_frame<R: AsyncBufReadExt + AsyncReadExt + Unpin>(reader: &mut R) -> Option<Value> {
    let mut length = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            length = value.trim().parse::<usize>().ok();
        }
    }
    let mut body = vec![0; length?];
    reader.read_exact(&mut body).await.ok()?;
    serde_json::from_slice(&body).ok()
}

/// Connects an [`EvaluatorClient`] to an in-process evaluator.
///
/// `respond` maps `(method, params)` to the reply's `result`; `None` leaves the request unanswered.
pub fn fake_evaluator<F>(respond: F) -> EvaluatorClient
where
    F: Fn(&str, &Value) -> Option<Value> + Send + 'static,
{
    let (client_side, evaluator_side) = tokio::io::duplex(64 * 1024);
    let (client_read, client_write) = tokio::io::split(client_side);
    let (eval_read, mut eval_write) = tokio::io::split(evaluator_side);

    tokio::spawn(async move {
        let mut reader = BufReader::new(eval_read);
        while let Some(request) = read_frame(&mut reader).await {
            let method = request["method"].as_str().unwrap_or_default();
            let Some(result) = respond(method, &request["params"]) else {
                continue;
            };
            let body = json!({"jsonrpc": "2.0", "id": request["id"], "result": result}).to_string();
            let frame = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
            if eval_write.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    EvaluatorClient::new(BufReader::new(client_read), client_write)
}
