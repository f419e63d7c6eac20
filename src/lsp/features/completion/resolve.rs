//! Completion item resolution
//!
//! Only package items carry a resumption token; everything else passes
//! through untouched.

use tower_lsp::lsp_types::CompletionItem;

use super::packages::PackageCompletionProvider;
use super::token::ResumeToken;
use crate::config::CompletionConfig;
use crate::error::ResolveError;
use crate::index::AttrSetClient;

/// The item to return to the editor, and why it was not enriched if it wasn't.
#[derive(Debug)]
pub struct ResolveOutcome {
    pub item: CompletionItem,
    pub error: Option<ResolveError>,
}

impl ResolveOutcome {
    fn unchanged(item: CompletionItem) -> Self {
        ResolveOutcome { item, error: None }
    }

    fn failed(item: CompletionItem, error: impl Into<ResolveError>) -> Self {
        ResolveOutcome {
            item,
            error: Some(error.into()),
        }
    }
}

/// Fills documentation and version of a package item from the index.
///
/// On any failure the item comes back exactly as received.
pub async fn resolve(
    item: CompletionItem,
    index: Option<&dyn AttrSetClient>,
    config: &CompletionConfig,
) -> ResolveOutcome {
    let token = match item.data.as_ref() {
        None | Some(serde_json::Value::Null) => return ResolveOutcome::unchanged(item),
        Some(data) => match ResumeToken::decode(data) {
            Ok(token) => token,
            Err(e) => return ResolveOutcome::failed(item, e),
        },
    };
    let Some(client) = index else {
        return ResolveOutcome::failed(item, ResolveError::NoIndex);
    };

    let mut resolved = item.clone();
    match PackageCompletionProvider::new(client, config.remote_timeout)
        .resolve_package(&token, &mut resolved)
        .await
    {
        Ok(()) => ResolveOutcome::unchanged(resolved),
        Err(e) => ResolveOutcome::failed(item, e),
    }
}
