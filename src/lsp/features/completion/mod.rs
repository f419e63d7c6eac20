//! Code completion of names in scope and of package attributes
//!
//! This module provides:
//! - Local completion from the environment chain around the cursor
//! - Package completion from the external package index
//! - A single item budget shared by both sources
//! - Lazy resolution of package documentation via resumption tokens

pub mod budget;
pub mod complete;
pub mod local;
pub mod packages;
pub mod resolve;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use budget::{BudgetExceeded, CompletionSink, Flow};
pub use complete::complete;
pub use packages::PackageCompletionProvider;
pub use resolve::{resolve, ResolveOutcome};
pub use token::ResumeToken;
