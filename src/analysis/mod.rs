//! Interfaces to the upstream static analysis
//!
//! Completion consumes three queries from the analysis of a document:
//! - which syntax node sits at a cursor position
//! - which environment frame encloses that node
//! - whether names at that node come from the package index, and under which attribute path
//!
//! The [`Analysis`] trait is the seam where a real parser-backed analysis plugs in.
//! [`textual::TextualAnalyzer`] is the line-oriented implementation used by the server binary.

pub mod env;
pub mod textual;

use std::sync::Arc;

use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range};

pub use env::{Definition, EnvNode};

/// Converts an LSP position (UTF-16 code units within the line) to a char index in `text`.
///
/// Returns `None` past the last line or past the end of the line's content.
/// A column inside a surrogate pair maps to the char it splits.
pub fn position_to_char(text: &Rope, position: Position) -> Option<usize> {
    let line_idx = position.line as usize;
    if line_idx >= text.len_lines() {
        return None;
    }
    let line = text.line(line_idx);
    let mut content_len = line.len_chars();
    while content_len > 0 && matches!(line.char(content_len - 1), '\n' | '\r') {
        content_len -= 1;
    }

    let line_start = text.line_to_char(line_idx);
    let target = text.char_to_utf16_cu(line_start) + position.character as usize;
    if target > text.char_to_utf16_cu(line_start + content_len) {
        return None;
    }
    Some(text.utf16_cu_to_char(target))
}

/// Kind of the node found under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A variable reference, e.g. `fo|` in `foo`.
    Identifier(String),
    /// The attribute being typed in a select expression.
    ///
    /// `path` holds the already-typed segments, e.g. `pkgs.python3Packages.req|`
    /// has `path = ["pkgs", "python3Packages"]` and `name = "req"`.
    AttrName { path: Vec<String>, name: String },
    /// Anything else (whitespace, punctuation, literals).
    Other,
}

/// A syntax node resolved from a cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: Range,
}

impl Node {
    pub fn new(kind: NodeKind, range: Range) -> Self {
        Node { kind, range }
    }

    /// The partial name being completed at this node. Empty accepts every name.
    pub fn completion_prefix(&self) -> &str {
        match &self.kind {
            NodeKind::Identifier(name) => name,
            NodeKind::AttrName { name, .. } => name,
            NodeKind::Other => "",
        }
    }
}

/// Analysis result of one document snapshot.
///
/// Implementations are immutable once built, so a single analysis can serve any
/// number of concurrent completion requests.
pub trait Analysis: Send + Sync {
    /// The node at `position`, or `None` if the position maps to no content.
    fn node_at(&self, position: Position) -> Option<Node>;

    /// The innermost environment frame visible from `node`.
    fn enclosing_scope(&self, node: &Node) -> Option<Arc<EnvNode>>;

    /// The attribute path in the package index to query for `node`, if the
    /// node's names are provided by the package index.
    fn package_scope(&self, node: &Node, env: Option<&Arc<EnvNode>>) -> Option<Vec<String>>;
}

/// Builds an [`Analysis`] from document text.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Arc<dyn Analysis>;
}
