//! One-shot bridge from callback style to an awaited value
//!
//! Completion assembly is written as straight-line code, while the evaluator
//! client reports through callbacks. [`call`] issues exactly one callback-style
//! request and suspends the calling task, not a thread, until the reply
//! arrives or the timeout expires.

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::warn;

use super::client::Reply;
use crate::error::IndexError;

/// Issues one request through `issue` and waits for its reply.
///
/// `issue` receives the reply callback and must hand it to the client. A
/// callback dropped without being invoked counts as an unavailable index; a
/// reply arriving after the timeout is discarded.
pub async fn call<T, F>(timeout: Option<Duration>, issue: F) -> Result<T, IndexError>
where
    T: Send + 'static,
    F: FnOnce(Reply<T>),
{
    let (ready_tx, ready_rx) = oneshot::channel();
    issue(Box::new(move |resp| {
        // The waiter is gone after a timeout.
        let _ = ready_tx.send(resp);
    }));

    let received = match timeout {
        Some(limit) => match tokio::time::timeout(limit, ready_rx).await {
            Ok(received) => received,
            Err(_) => {
                warn!("Package index request timed out after {:?}", limit);
                return Err(IndexError::TimedOut(limit));
            }
        },
        None => ready_rx.await,
    };

    received.unwrap_or_else(|_| Err(IndexError::Unavailable("reply callback dropped".to_string())))
}
