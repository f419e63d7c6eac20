//! Client of the package-index evaluator
//!
//! Evaluating the package set is expensive, so it happens in a separate
//! process. [`AttrSetClient`] is the callback-style interface the completion
//! engine talks to; [`EvaluatorClient`] implements it over a JSON-RPC channel.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::debug;

use super::protocol::{
    ATTRPATH_COMPLETE, ATTRPATH_INFO, AttrPath, AttrPathCompleteParams, AttrPathCompleteResponse,
    PackageDescription,
};
use super::transport::{Outbound, RawReply, run_io};
use crate::error::IndexError;

/// Callback receiving the reply of one evaluator request. It may run on any thread.
pub type Reply<T> = Box<dyn FnOnce(Result<T, IndexError>) + Send + 'static>;

/// Asynchronous operations against the package index.
///
/// Both methods return immediately after enqueueing the request; `reply` is
/// invoked exactly once, when the evaluator answers or the request fails.
/// Implementations must accept concurrent calls from any number of tasks.
pub trait AttrSetClient: Send + Sync {
    /// Lists attribute names under `params.scope` starting with `params.prefix`.
    fn attrpath_complete(&self, params: AttrPathCompleteParams, reply: Reply<AttrPathCompleteResponse>);

    /// Fetches package metadata of the attribute at `path`.
    fn attrpath_info(&self, path: AttrPath, reply: Reply<PackageDescription>);
}

/// JSON-RPC client multiplexing requests from all workers over one channel.
#[derive(Debug, Clone)]
pub struct EvaluatorClient {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl EvaluatorClient {
    /// Starts the I/O task on the current tokio runtime.
    ///
    /// `reader` carries the evaluator's replies, `writer` its requests.
    /// Unanswered requests are kept until the evaluator exits.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::with_request_timeout(reader, writer, None)
    }

    /// Like [`EvaluatorClient::new`], but requests unanswered after `timeout`
    /// fail with [`IndexError::TimedOut`] and are forgotten.
    pub fn with_request_timeout<R, W>(reader: R, writer: W, timeout: Option<Duration>) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_io(reader, writer, outbound_rx, timeout));
        EvaluatorClient { outbound }
    }

    fn call<P, T>(&self, method: &'static str, params: &P, reply: Reply<T>)
    where
        P: serde::Serialize,
        T: DeserializeOwned + 'static,
    {
        let params = match serde_json::to_value(params) {
            Ok(params) => params,
            Err(e) => {
                reply(Err(IndexError::MalformedReply(format!("unserializable params: {}", e))));
                return;
            }
        };
        debug!("Evaluator request {}: {}", method, params);

        let out = Outbound {
            method,
            params,
            reply: decode_reply(reply),
        };
        if let Err(mpsc::error::SendError(out)) = self.outbound.send(out) {
            (out.reply)(Err(IndexError::Unavailable("evaluator connection closed".to_string())));
        }
    }
}

impl AttrSetClient for EvaluatorClient {
    fn attrpath_complete(&self, params: AttrPathCompleteParams, reply: Reply<AttrPathCompleteResponse>) {
        self.call(ATTRPATH_COMPLETE, &params, reply);
    }

    fn attrpath_info(&self, path: AttrPath, reply: Reply<PackageDescription>) {
        self.call(ATTRPATH_INFO, &path, reply);
    }
}

fn decode_reply<T>(reply: Reply<T>) -> RawReply
where
    T: DeserializeOwned + 'static,
{
    Box::new(move |raw: Result<Value, IndexError>| {
        let typed = raw.and_then(|value| {
            serde_json::from_value(value).map_err(|e| IndexError::MalformedReply(e.to_string()))
        });
        reply(typed);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::transport::read_message;
    use serde_json::json;
    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio::sync::oneshot;

    /// Connects a client to an in-memory evaluator driven by `respond`, which
    /// maps `(method, params)` to the raw JSON-RPC reply body (without id).
    fn fake_evaluator<F>(respond: F) -> EvaluatorClient
    where
        F: Fn(&str, &Value) -> Value + Send + 'static,
    {
        let (client_side, evaluator_side) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (eval_read, mut eval_write) = tokio::io::split(evaluator_side);

        tokio::spawn(async move {
            let mut reader = BufReader::new(eval_read);
            let mut buf = String::new();
            while let Ok(Some(msg)) = read_message(&mut reader, &mut buf).await {
                let method = msg["method"].as_str().unwrap_or_default().to_string();
                let mut body = respond(&method, &msg["params"]);
                body["jsonrpc"] = json!("2.0");
                body["id"] = msg["id"].clone();
                let text = body.to_string();
                let frame = format!("Content-Length: {}\r\n\r\n{}", text.len(), text);
                if eval_write.write_all(frame.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        EvaluatorClient::new(BufReader::new(client_read), client_write)
    }

    async fn complete(client: &EvaluatorClient, scope: &[&str], prefix: &str) -> Result<Vec<String>, IndexError> {
        let (tx, rx) = oneshot::channel();
        client.attrpath_complete(
            AttrPathCompleteParams {
                scope: scope.iter().map(|s| s.to_string()).collect(),
                prefix: prefix.to_string(),
            },
            Box::new(move |resp| {
                let _ = tx.send(resp);
            }),
        );
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_complete_routes_reply() {
        let client = fake_evaluator(|method, params| {
            assert_eq!(method, ATTRPATH_COMPLETE);
            let prefix = params["Prefix"].as_str().unwrap().to_string();
            json!({"result": [format!("{}llo", prefix), format!("{}lp", prefix)]})
        });

        let names = complete(&client, &[], "he").await.unwrap();
        assert_eq!(names, vec!["hello", "help"]);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_correlated() {
        let client = fake_evaluator(|_, params| json!({"result": [params["Prefix"].clone()]}));

        let (a, b, c) = tokio::join!(
            complete(&client, &[], "a"),
            complete(&client, &[], "b"),
            complete(&client, &["x"], "c"),
        );
        assert_eq!(a.unwrap(), vec!["a"]);
        assert_eq!(b.unwrap(), vec!["b"]);
        assert_eq!(c.unwrap(), vec!["c"]);
    }

    #[tokio::test]
    async fn test_info_decodes_description() {
        let client = fake_evaluator(|method, params| {
            assert_eq!(method, ATTRPATH_INFO);
            assert_eq!(params, &json!(["hello"]));
            json!({"result": {"Version": "2.12.1", "Description": "greeting"}})
        });

        let (tx, rx) = oneshot::channel();
        client.attrpath_info(
            vec!["hello".to_string()],
            Box::new(move |resp| {
                let _ = tx.send(resp);
            }),
        );
        let desc = rx.await.unwrap().unwrap();
        assert_eq!(desc.version.as_deref(), Some("2.12.1"));
        assert_eq!(desc.description.as_deref(), Some("greeting"));
    }

    #[tokio::test]
    async fn test_remote_error_and_malformed_reply() {
        let client = fake_evaluator(|_, params| match params["Prefix"].as_str() {
            Some("err") => json!({"error": {"code": -32603, "message": "eval failed"}}),
            _ => json!({"result": {"not": "a list"}}),
        });

        assert_eq!(
            complete(&client, &[], "err").await,
            Err(IndexError::Remote {
                code: -32603,
                message: "eval failed".to_string()
            })
        );
        assert!(matches!(
            complete(&client, &[], "x").await,
            Err(IndexError::MalformedReply(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_evaluator_fails_requests() {
        let (client_side, evaluator_side) = tokio::io::duplex(1024);
        drop(evaluator_side);
        let (client_read, client_write) = tokio::io::split(client_side);
        let client = EvaluatorClient::new(BufReader::new(client_read), client_write);

        assert!(matches!(
            complete(&client, &[], "a").await,
            Err(IndexError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_evaluator_exit_fails_in_flight_request() {
        let (client_side, evaluator_side) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (eval_read, eval_write) = tokio::io::split(evaluator_side);
        let client = EvaluatorClient::new(BufReader::new(client_read), client_write);

        let (received_tx, received_rx) = oneshot::channel();
        tokio::spawn(async move {
            let mut reader = BufReader::new(eval_read);
            let mut buf = String::new();
            let msg = read_message(&mut reader, &mut buf).await;
            let _ = received_tx.send(msg.map(|m| m.is_some()).unwrap_or(false));
            drop(reader);
            drop(eval_write);
        });

        let pending = complete(&client, &["pkgs"], "he");
        let (result, received) = tokio::join!(pending, received_rx);
        assert!(received.unwrap());
        assert!(matches!(result, Err(IndexError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_silent_evaluator_requests_expire() {
        let (client_side, evaluator_side) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client_side);
        let timeout = Duration::from_millis(50);
        let client = EvaluatorClient::with_request_timeout(BufReader::new(client_read), client_write, Some(timeout));

        // Replies that never come: each callback still fires once, from the sweep.
        let (a, b) = tokio::join!(complete(&client, &[], "a"), complete(&client, &[], "b"));
        assert_eq!(a, Err(IndexError::TimedOut(timeout)));
        assert_eq!(b, Err(IndexError::TimedOut(timeout)));

        // The connection stays usable after expiry.
        assert_eq!(
            complete(&client, &[], "c").await,
            Err(IndexError::TimedOut(timeout))
        );
        drop(evaluator_side);
    }
}
