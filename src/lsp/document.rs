use std::sync::Arc;

use ropey::Rope;
use tokio::sync::RwLock;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent};

use crate::analysis::{Analysis, Analyzer, position_to_char};
use crate::error::DocumentError;

/// Converts an LSP position to a char index in the Rope.
fn position_to_char_index(position: &Position, text: &Rope) -> Result<usize, DocumentError> {
    position_to_char(text, *position).ok_or(DocumentError::OutOfRange {
        line: position.line,
        character: position.character,
    })
}

/// Mutable state of an open document.
pub struct LspDocumentState {
    pub text: Rope,
    pub version: i32,
    /// Analysis of `text` at `version`.
    pub analysis: Arc<dyn Analysis>,
}

impl LspDocumentState {
    pub fn new(text: &str, version: i32, analyzer: &dyn Analyzer) -> Self {
        LspDocumentState {
            text: Rope::from_str(text),
            version,
            analysis: analyzer.analyze(text),
        }
    }

    /// Applies a list of content changes and re-analyzes the result.
    ///
    /// Changes are applied in order; a change without a range replaces the whole text.
    /// Nothing is modified unless every change applies.
    pub fn apply(
        &mut self,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
        analyzer: &dyn Analyzer,
    ) -> Result<(), DocumentError> {
        if version <= self.version {
            return Err(DocumentError::StaleVersion {
                version,
                current: self.version,
            });
        }
        let mut text = self.text.clone();
        for change in changes {
            if let Some(range) = change.range {
                let start = position_to_char_index(&range.start, &text)?;
                let end = position_to_char_index(&range.end, &text)?.max(start);
                text.remove(start..end);
                text.insert(start, &change.text);
            } else {
                text = Rope::from_str(&change.text);
            }
        }
        self.analysis = analyzer.analyze(&text.to_string());
        self.text = text;
        self.version = version;
        Ok(())
    }
}

/// An open document shared between request handlers.
pub struct LspDocument {
    pub state: RwLock<LspDocumentState>,
}

impl LspDocument {
    pub fn new(text: &str, version: i32, analyzer: &dyn Analyzer) -> Self {
        LspDocument {
            state: RwLock::new(LspDocumentState::new(text, version, analyzer)),
        }
    }

    /// Returns the analysis of the current text.
    pub async fn analysis(&self) -> Arc<dyn Analysis> {
        self.state.read().await.analysis.clone()
    }

    /// Applies changes to the document, updating text and analysis.
    pub async fn apply(
        &self,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
        analyzer: &dyn Analyzer,
    ) -> Result<(), DocumentError> {
        self.state.write().await.apply(changes, version, analyzer)
    }
}
