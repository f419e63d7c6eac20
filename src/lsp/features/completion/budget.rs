use std::ops::ControlFlow;

use tower_lsp::lsp_types::CompletionItem;

/// Marker returned when the response is full.
///
/// This is expected control flow rather than an error: the orchestrator turns
/// it into `is_incomplete = true` and the editor re-queries with a longer prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExceeded;

/// Result of pushing into a [`CompletionSink`].
pub type Flow = ControlFlow<BudgetExceeded>;

/// Bounded collection of completion items shared by every provider of one request.
#[derive(Debug)]
pub struct CompletionSink {
    items: Vec<CompletionItem>,
    limit: usize,
}

impl CompletionSink {
    pub fn new(limit: usize) -> Self {
        CompletionSink {
            items: Vec::new(),
            limit,
        }
    }

    /// Appends `item`, or refuses it once `limit` items are held.
    pub fn push(&mut self, item: CompletionItem) -> Flow {
        if self.items.len() >= self.limit {
            return ControlFlow::Break(BudgetExceeded);
        }
        self.items.push(item);
        ControlFlow::Continue(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[CompletionItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<CompletionItem> {
        self.items
    }
}
