//! Assembly of one completion response
//!
//! Local names are collected first, then, when the cursor sits where package
//! names are valid, one package index query is made. Both stages fill the same
//! bounded sink; whichever stage hits the bound ends the assembly and marks the
//! response incomplete.

use std::ops::ControlFlow;
use std::sync::Arc;

use tower_lsp::lsp_types::{CompletionList, Position};
use tracing::debug;

use super::budget::{CompletionSink, Flow};
use super::local;
use super::packages::PackageCompletionProvider;
use crate::analysis::{Analysis, EnvNode, Node};
use crate::config::CompletionConfig;
use crate::error::CompletionError;
use crate::index::{AttrSetClient, AttrPathCompleteParams};

/// Computes the completion list at `position`.
///
/// Fails only when the position maps to no node. Package index failures
/// degrade to local-only results.
pub async fn complete(
    analysis: &dyn Analysis,
    position: Position,
    index: Option<&dyn AttrSetClient>,
    config: &CompletionConfig,
) -> Result<CompletionList, CompletionError> {
    let node = analysis.node_at(position).ok_or(CompletionError::NodeNotFound)?;
    let env = analysis.enclosing_scope(&node);

    let mut sink = CompletionSink::new(config.max_items);
    let flow = assemble(analysis, &node, env.as_ref(), index, config, &mut sink).await;
    let is_incomplete = flow.is_break();

    debug!(
        "Completion at {:?} with prefix {:?}: {} items, incomplete: {}",
        position,
        node.completion_prefix(),
        sink.len(),
        is_incomplete
    );
    Ok(CompletionList {
        is_incomplete,
        items: sink.into_items(),
    })
}

async fn assemble(
    analysis: &dyn Analysis,
    node: &Node,
    env: Option<&Arc<EnvNode>>,
    index: Option<&dyn AttrSetClient>,
    config: &CompletionConfig,
    sink: &mut CompletionSink,
) -> Flow {
    let prefix = node.completion_prefix();
    if let ControlFlow::Break(exceeded) = local::collect(env.map(|e| e.as_ref()), prefix, sink) {
        return ControlFlow::Break(exceeded);
    }

    let Some(scope) = analysis.package_scope(node, env) else {
        return ControlFlow::Continue(());
    };
    let Some(client) = index else {
        debug!("No package index configured, skipping package names under {:?}", scope);
        return ControlFlow::Continue(());
    };

    let query = AttrPathCompleteParams {
        scope,
        prefix: prefix.to_string(),
    };
    PackageCompletionProvider::new(client, config.remote_timeout)
        .complete_packages(query, sink)
        .await
}
