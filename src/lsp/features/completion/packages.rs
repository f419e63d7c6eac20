//! Completion of names from the package index
//!
//! The package set is evaluated in a separate process, which caches its own
//! results, so nothing here is cached. Names are listed cheaply during
//! completion; documentation and version are fetched per item on resolve.

use std::ops::ControlFlow;
use std::time::Duration;

use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, Documentation, MarkupContent, MarkupKind};
use tracing::{debug, warn};

use super::budget::{CompletionSink, Flow};
use super::token::ResumeToken;
use crate::error::IndexError;
use crate::index::bridge;
use crate::index::{AttrSetClient, AttrPathCompleteParams, PackageDescription};

/// Shown as detail when the index reports no version.
pub const UNKNOWN_VERSION: &str = "?";

pub struct PackageCompletionProvider<'a> {
    client: &'a dyn AttrSetClient,
    timeout: Option<Duration>,
}

impl<'a> PackageCompletionProvider<'a> {
    pub fn new(client: &'a dyn AttrSetClient, timeout: Option<Duration>) -> Self {
        PackageCompletionProvider { client, timeout }
    }

    /// Asks the index for the names under `query.scope` and appends those
    /// starting with `query.prefix` to `sink`.
    ///
    /// Index failures are logged and yield no items.
    pub async fn complete_packages(&self, query: AttrPathCompleteParams, sink: &mut CompletionSink) -> Flow {
        let request = query.clone();
        let names = match bridge::call(self.timeout, |reply| self.client.attrpath_complete(request, reply)).await {
            Ok(names) => names,
            Err(e) => {
                warn!("Package index completion for {:?} failed: {}", query.scope, e);
                return ControlFlow::Continue(());
            }
        };
        debug!("Package index offered {} names under {:?}", names.len(), query.scope);

        for name in names {
            // The index is expected to filter already.
            if !name.starts_with(&query.prefix) {
                continue;
            }
            let token = ResumeToken::new(&query, name.as_str());
            let item = CompletionItem {
                label: name,
                kind: Some(CompletionItemKind::FIELD),
                data: Some(token.encode()),
                ..Default::default()
            };
            if let ControlFlow::Break(exceeded) = sink.push(item) {
                return ControlFlow::Break(exceeded);
            }
        }
        ControlFlow::Continue(())
    }

    /// Fetches metadata of the package named by `token` and fills the
    /// documentation and detail of `item`.
    pub async fn resolve_package(&self, token: &ResumeToken, item: &mut CompletionItem) -> Result<(), IndexError> {
        let path = token.attr_path();
        let desc = bridge::call(self.timeout, |reply| self.client.attrpath_info(path, reply)).await?;
        describe(&desc, item);
        Ok(())
    }
}

/// Formats package metadata into an item's documentation and detail.
pub fn describe(desc: &PackageDescription, item: &mut CompletionItem) {
    item.documentation = Some(Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value: format!(
            "{}\n\n{}",
            desc.description.as_deref().unwrap_or_default(),
            desc.long_description.as_deref().unwrap_or_default()
        ),
    }));
    item.detail = Some(desc.version.clone().unwrap_or_else(|| UNKNOWN_VERSION.to_string()));
}
