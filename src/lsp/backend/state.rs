//! Backend state management
//!
//! This module defines the NixBackend struct, which holds the open documents,
//! the analyzer that rebuilds their analyses, and the package index connection.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::process::Child;
use tokio::sync::Mutex;
use tower_lsp::Client;
use tower_lsp::lsp_types::Url;

use crate::analysis::Analyzer;
use crate::config::CompletionConfig;
use crate::index::AttrSetClient;
use crate::lsp::document::LspDocument;

/// The Nix language server backend, managing state and handling LSP requests.
pub struct NixBackend {
    pub(super) client: Client,
    pub(super) documents_by_uri: DashMap<Url, Arc<LspDocument>>,
    pub(super) analyzer: Arc<dyn Analyzer>,
    /// Package index; `None` disables package completion.
    pub(super) index: Option<Arc<dyn AttrSetClient>>,
    /// Evaluator process behind `index`, killed on shutdown.
    pub(super) evaluator: Mutex<Option<Child>>,
    pub(super) config: CompletionConfig,
}
