use std::sync::Arc;

use dashmap::DashMap;
use tokio::process::Child;
use tokio::sync::Mutex;
use tower_lsp::Client;
use tower_lsp::lsp_types::Url;
use tracing::{info, warn};

use crate::analysis::Analyzer;
use crate::analysis::textual::TextualAnalyzer;
use crate::config::{CompletionConfig, Config};
use crate::index::{spawn_evaluator, AttrSetClient};
use crate::lsp::document::LspDocument;

mod handlers;
mod state;

pub use state::NixBackend;

impl NixBackend {
    /// Creates a backend over an already connected package index.
    ///
    /// `evaluator` is the process serving `index`, if the backend owns it.
    pub fn new(
        client: Client,
        config: CompletionConfig,
        analyzer: Arc<dyn Analyzer>,
        index: Option<Arc<dyn AttrSetClient>>,
        evaluator: Option<Child>,
    ) -> Self {
        NixBackend {
            client,
            documents_by_uri: DashMap::new(),
            analyzer,
            index,
            evaluator: Mutex::new(evaluator),
            config,
        }
    }

    /// Creates a backend with the textual analyzer, launching the evaluator if one is configured.
    ///
    /// A failed launch is logged and leaves package completion disabled.
    pub fn from_config(client: Client, config: Config) -> Self {
        let request_timeout = config.completion.remote_timeout;
        let spawned = config
            .evaluator
            .as_ref()
            .map(|evaluator| spawn_evaluator(evaluator, request_timeout));
        let (index, evaluator) = match spawned {
            Some(Ok((index, child))) => {
                info!("Package evaluator started with pid {:?}", child.id());
                (Some(Arc::new(index) as Arc<dyn AttrSetClient>), Some(child))
            }
            Some(Err(e)) => {
                warn!("Failed to start package evaluator, package completion disabled: {:#}", e);
                (None, None)
            }
            None => {
                info!("No package evaluator configured, package completion disabled");
                (None, None)
            }
        };
        Self::new(client, config.completion, Arc::new(TextualAnalyzer::new()), index, evaluator)
    }

    /// Returns the open document for `uri`.
    pub(crate) fn document(&self, uri: &Url) -> Option<Arc<LspDocument>> {
        self.documents_by_uri.get(uri).map(|r| r.value().clone())
    }

    /// Stops the evaluator process, if running.
    async fn stop_evaluator(&self) {
        if let Some(mut child) = self.evaluator.lock().await.take() {
            match child.kill().await {
                Ok(()) => info!("Package evaluator stopped"),
                Err(e) => warn!("Failed to stop package evaluator: {}", e),
            }
        }
    }
}
