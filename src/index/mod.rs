//! Package index access
//!
//! - `protocol`: request and reply shapes of the evaluator
//! - `transport`: framed JSON-RPC I/O loop with correlation ids
//! - `client`: callback-style [`AttrSetClient`] and its JSON-RPC implementation
//! - `bridge`: turns one callback request into an awaited value
//! - `process`: launching the evaluator as a child process

pub mod bridge;
pub mod client;
pub mod process;
pub mod protocol;
mod transport;

pub use client::{AttrSetClient, EvaluatorClient, Reply};
pub use process::spawn_evaluator;
pub use protocol::{AttrPath, AttrPathCompleteParams, PackageDescription};
