//! LSP features served by the backend

pub mod completion;
