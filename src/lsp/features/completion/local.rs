//! Completion of lexically visible names
//!
//! Walks the environment chain from the cursor's innermost frame outward and
//! offers every definition whose name starts with the typed prefix.

use std::ops::ControlFlow;

use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind};

use super::budget::{CompletionSink, Flow};
use crate::analysis::{Definition, EnvNode};

/// Prefix of names internal to the language implementation.
pub const INTERNAL_NAME_PREFIX: &str = "__";

fn item_kind(def: &Definition) -> CompletionItemKind {
    if def.is_builtin {
        CompletionItemKind::KEYWORD
    } else {
        CompletionItemKind::VARIABLE
    }
}

/// Whether a binding called `name` is offered for `prefix`.
pub fn is_candidate(name: &str, prefix: &str) -> bool {
    !name.starts_with(INTERNAL_NAME_PREFIX) && name.starts_with(prefix)
}

/// Collects definitions of `env` and all its ancestors into `sink`.
///
/// Ancestors are emitted first, so the innermost frame's names end up last.
/// Shadowed names are not deduplicated: both the outer and the inner binding
/// are offered.
pub fn collect(env: Option<&EnvNode>, prefix: &str, sink: &mut CompletionSink) -> Flow {
    let Some(env) = env else {
        return ControlFlow::Continue(());
    };
    if let ControlFlow::Break(exceeded) = collect(env.parent().map(|p| p.as_ref()), prefix, sink) {
        return ControlFlow::Break(exceeded);
    }

    for (name, def) in env.defs() {
        if !is_candidate(name, prefix) {
            continue;
        }
        let item = CompletionItem {
            label: name.to_string(),
            kind: Some(item_kind(def)),
            ..Default::default()
        };
        if let ControlFlow::Break(exceeded) = sink.push(item) {
            return ControlFlow::Break(exceeded);
        }
    }
    ControlFlow::Continue(())
}
