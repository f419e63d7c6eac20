//! In-memory analysis and package index for completion tests

use std::sync::{Arc, Mutex};

use tower_lsp::lsp_types::{Position, Range};

use crate::analysis::{Analysis, EnvNode, Node, NodeKind};
use crate::error::IndexError;
use crate::index::{AttrPath, AttrPathCompleteParams, AttrSetClient, PackageDescription, Reply};

/// Analysis answering every position with the same node and scope.
pub(crate) struct MockAnalysis {
    pub(crate) node: Option<Node>,
    pub(crate) env: Option<Arc<EnvNode>>,
    pub(crate) package_scope: Option<Vec<String>>,
}

impl MockAnalysis {
    /// Chain `{outer: {a}, inner: {ab, b}}` with the cursor on identifier `prefix`.
    pub(crate) fn outer_inner(prefix: &str) -> Self {
        let outer = Arc::new(EnvNode::with_names(None, ["a"]));
        let inner = Arc::new(EnvNode::with_names(Some(outer), ["ab", "b"]));
        let kind = if prefix.is_empty() {
            NodeKind::Other
        } else {
            NodeKind::Identifier(prefix.to_string())
        };
        MockAnalysis {
            node: Some(Node::new(kind, Range::new(Position::new(0, 0), Position::new(0, 0)))),
            env: Some(inner),
            package_scope: None,
        }
    }

    pub(crate) fn in_package_scope(mut self, scope: &[&str]) -> Self {
        self.package_scope = Some(scope.iter().map(|s| s.to_string()).collect());
        self
    }
}

impl Analysis for MockAnalysis {
    fn node_at(&self, _position: Position) -> Option<Node> {
        self.node.clone()
    }

    fn enclosing_scope(&self, _node: &Node) -> Option<Arc<EnvNode>> {
        self.env.clone()
    }

    fn package_scope(&self, _node: &Node, _env: Option<&Arc<EnvNode>>) -> Option<Vec<String>> {
        self.package_scope.clone()
    }
}

/// Package index replying synchronously with canned results and recording requests.
pub(crate) struct MockIndex {
    names: Result<Vec<String>, IndexError>,
    info: Result<PackageDescription, IndexError>,
    complete_calls: Mutex<Vec<AttrPathCompleteParams>>,
    info_calls: Mutex<Vec<AttrPath>>,
}

impl MockIndex {
    pub(crate) fn with_names<const N: usize>(names: [&str; N]) -> Self {
        MockIndex {
            names: Ok(names.iter().map(|s| s.to_string()).collect()),
            info: Ok(PackageDescription::default()),
            complete_calls: Mutex::new(Vec::new()),
            info_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_info(desc: PackageDescription) -> Self {
        MockIndex {
            info: Ok(desc),
            ..Self::with_names([])
        }
    }

    pub(crate) fn failing(error: IndexError) -> Self {
        MockIndex {
            names: Err(error.clone()),
            info: Err(error),
            ..Self::with_names([])
        }
    }

    pub(crate) fn complete_calls(&self) -> Vec<AttrPathCompleteParams> {
        self.complete_calls.lock().unwrap().clone()
    }

    pub(crate) fn info_calls(&self) -> Vec<AttrPath> {
        self.info_calls.lock().unwrap().clone()
    }
}

impl AttrSetClient for MockIndex {
    fn attrpath_complete(&self, params: AttrPathCompleteParams, reply: Reply<Vec<String>>) {
        self.complete_calls.lock().unwrap().push(params);
        reply(self.names.clone());
    }

    fn attrpath_info(&self, path: AttrPath, reply: Reply<PackageDescription>) {
        self.info_calls.lock().unwrap().push(path);
        reply(self.info.clone());
    }
}
