//! Line-oriented analysis of Nix documents
//!
//! This analysis does not build a syntax tree. It scans the token stream for
//! binding sites (`name =`, `inherit a b;`, lambda arguments and formals) to
//! build a document frame on top of the builtin frame, and extracts the
//! identifier or attribute path under the cursor from the text itself.

use std::sync::Arc;

use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range};
use tracing::trace;

use super::{Analysis, Analyzer, EnvNode, Node, NodeKind, position_to_char};

/// Global names of the Nix language. Names starting with `__` are reachable
/// but internal, and are hidden from completion.
pub const NIX_BUILTINS: &[&str] = &[
    "__add",
    "__currentSystem",
    "__currentTime",
    "__nixPath",
    "__storeDir",
    "abort",
    "baseNameOf",
    "break",
    "builtins",
    "derivation",
    "derivationStrict",
    "dirOf",
    "false",
    "fetchGit",
    "fetchMercurial",
    "fetchTarball",
    "fetchTree",
    "fromTOML",
    "import",
    "isNull",
    "map",
    "null",
    "placeholder",
    "removeAttrs",
    "scopedImport",
    "throw",
    "toString",
    "true",
];

const KEYWORDS: &[&str] = &[
    "assert", "else", "if", "in", "inherit", "let", "or", "rec", "then", "with",
];

/// Root attribute under which the package index is exposed.
const PACKAGE_ROOT: &str = "pkgs";

/// Creates [`TextualAnalysis`] values sharing one builtin frame.
#[derive(Debug, Clone)]
pub struct TextualAnalyzer {
    builtins: Arc<EnvNode>,
}

impl TextualAnalyzer {
    pub fn new() -> Self {
        TextualAnalyzer {
            builtins: Arc::new(EnvNode::builtins(NIX_BUILTINS.iter().copied())),
        }
    }
}

impl Default for TextualAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for TextualAnalyzer {
    fn analyze(&self, text: &str) -> Arc<dyn Analysis> {
        Arc::new(TextualAnalysis::new(text, self.builtins.clone()))
    }
}

/// Analysis of one document snapshot.
#[derive(Debug)]
pub struct TextualAnalysis {
    text: Rope,
    env: Arc<EnvNode>,
    with_packages: bool,
}

impl TextualAnalysis {
    pub fn new(text: &str, builtins: Arc<EnvNode>) -> Self {
        let tokens = tokenize(text);
        let bindings = collect_bindings(&tokens);
        let with_packages = has_with_packages(&tokens);
        trace!(
            "Textual analysis: {} bindings, with {}: {}",
            bindings.len(),
            PACKAGE_ROOT,
            with_packages
        );
        TextualAnalysis {
            text: Rope::from_str(text),
            env: Arc::new(EnvNode::with_names(Some(builtins), bindings)),
            with_packages,
        }
    }

    /// The document frame (parent: builtins).
    pub fn env(&self) -> &Arc<EnvNode> {
        &self.env
    }
}

impl Analysis for TextualAnalysis {
    fn node_at(&self, position: Position) -> Option<Node> {
        let cursor = position_to_char(&self.text, position)?;
        let line_start = self.text.line_to_char(position.line as usize);
        let line: Vec<char> = self.text.slice(line_start..cursor).chars().collect();
        let column = line.len();

        // Walk backward over the attribute path ending at the cursor.
        let mut start = column;
        while start > 0 && (is_identifier_char(line[start - 1]) || line[start - 1] == '.') {
            start -= 1;
        }
        let typed: String = line[start..column].iter().collect();
        let segments: Vec<&str> = typed.split('.').collect();
        let name = segments.last().copied().unwrap_or_default();

        // Identifier chars are ASCII, one UTF-16 unit each.
        let name_start = position.character - name.chars().count() as u32;
        let range = Range::new(Position::new(position.line, name_start), position);

        let starts_like_identifier = typed
            .chars()
            .next()
            .is_some_and(is_identifier_start);
        let kind = if !starts_like_identifier {
            NodeKind::Other
        } else if segments.len() > 1 {
            NodeKind::AttrName {
                path: segments[..segments.len() - 1]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                name: name.to_string(),
            }
        } else {
            NodeKind::Identifier(name.to_string())
        };
        Some(Node::new(kind, range))
    }

    fn enclosing_scope(&self, _node: &Node) -> Option<Arc<EnvNode>> {
        Some(self.env.clone())
    }

    fn package_scope(&self, node: &Node, _env: Option<&Arc<EnvNode>>) -> Option<Vec<String>> {
        match &node.kind {
            NodeKind::AttrName { path, .. } => match path.split_first() {
                Some((root, rest)) if root == PACKAGE_ROOT => Some(rest.to_vec()),
                _ => None,
            },
            NodeKind::Identifier(_) | NodeKind::Other if self.with_packages => Some(Vec::new()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Punct(char),
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '\'' || c == '-'
}

/// Splits text into identifiers and punctuation, dropping whitespace,
/// comments, numbers and string literals.
fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            '\'' if chars.get(i + 1) == Some(&'\'') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '\'' && chars.get(i + 1) == Some(&'\'')) {
                    i += 1;
                }
                i += 2;
            }
            c if is_identifier_start(c) => {
                let start = i;
                while i < chars.len() && is_identifier_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
            }
            c if c.is_whitespace() => i += 1,
            c => {
                tokens.push(Token::Punct(c));
                i += 1;
            }
        }
    }

    tokens
}

fn ident(token: Option<&Token>) -> Option<&str> {
    match token {
        Some(Token::Ident(name)) if !KEYWORDS.contains(&name.as_str()) => Some(name),
        _ => None,
    }
}

fn punct(token: Option<&Token>) -> Option<char> {
    match token {
        Some(Token::Punct(c)) => Some(*c),
        _ => None,
    }
}

/// Names bound anywhere in the document, in order of first appearance.
fn collect_bindings(tokens: &[Token]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };

    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == Token::Ident("inherit".to_string()) {
            i += 1;
            let mut depth = 0usize;
            while i < tokens.len() && punct(tokens.get(i)) != Some(';') {
                match &tokens[i] {
                    Token::Punct('(') => depth += 1,
                    Token::Punct(')') => depth = depth.saturating_sub(1),
                    Token::Ident(name) if depth == 0 => push(name),
                    _ => {}
                }
                i += 1;
            }
            continue;
        }

        if let Some(name) = ident(tokens.get(i)) {
            let prev = i.checked_sub(1).and_then(|p| punct(tokens.get(p)));
            let next = punct(tokens.get(i + 1));
            let after_next = punct(tokens.get(i + 2));
            let binds = match next {
                // `a = ...`, but not `a == b` and not the tail of `x.a = ...`
                Some('=') => after_next != Some('=') && prev != Some('.'),
                // lambda argument `a: ...`, but not the scheme of `https://...`
                Some(':') => !is_uri_scheme(tokens, i),
                // formals `{ a, b ? 1, ... }`, but not `cfg ? enable`
                Some('?') => matches!(prev, Some('{') | Some(',')),
                Some(',') | Some('}') => matches!(prev, Some('{') | Some(',')),
                // `a.b.c = ...` binds `a`
                Some('.') if prev != Some('.') => binds_attr_path(tokens, i),
                _ => false,
            };
            if binds {
                push(name);
            }
        }
        i += 1;
    }

    names
}

/// Whether the dotted path starting at `tokens[start]` is the left side of `=`.
fn binds_attr_path(tokens: &[Token], start: usize) -> bool {
    let mut i = start + 1;
    while punct(tokens.get(i)) == Some('.') && matches!(tokens.get(i + 1), Some(Token::Ident(_))) {
        i += 2;
    }
    punct(tokens.get(i)) == Some('=') && punct(tokens.get(i + 1)) != Some('=')
}

/// Whether `tokens[i]` is followed by `://`, as in a bare URI literal.
fn is_uri_scheme(tokens: &[Token], i: usize) -> bool {
    punct(tokens.get(i + 2)) == Some('/') && punct(tokens.get(i + 3)) == Some('/')
}

fn has_with_packages(tokens: &[Token]) -> bool {
    tokens.windows(3).any(|w| {
        w[0] == Token::Ident("with".to_string())
            && w[1] == Token::Ident(PACKAGE_ROOT.to_string())
            && w[2] == Token::Punct(';')
    })
}
