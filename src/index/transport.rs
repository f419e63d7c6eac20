//! I/O loop of the evaluator connection
//!
//! One task owns both halves of the channel. Requests are written in the order
//! they were enqueued and tagged with a fresh id; replies are routed back to
//! the pending callback with the same id, in whatever order they arrive.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use super::protocol::{RpcRequest, RpcResponse};
use crate::error::IndexError;

/// Callback receiving the raw `result` of one request.
pub(crate) type RawReply = Box<dyn FnOnce(Result<Value, IndexError>) + Send + 'static>;

/// Upper bound on one evaluator message body.
pub(crate) const MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// A request waiting to be written to the evaluator.
pub(crate) struct Outbound {
    pub(crate) method: &'static str,
    pub(crate) params: Value,
    pub(crate) reply: RawReply,
}

/// A request written to the evaluator and waiting for its reply.
struct Pending {
    reply: RawReply,
    sent_at: Instant,
}

/// Runs until the evaluator closes its output, a read or write fails, or every
/// client handle is dropped. Pending callbacks are failed on exit.
///
/// With a `request_ttl`, requests unanswered for that long are failed with
/// [`IndexError::TimedOut`] and forgotten; a late reply is then ignored.
pub(crate) async fn run_io<R, W>(
    reader: R,
    mut writer: W,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    request_ttl: Option<Duration>,
) where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let request_ttl = request_ttl.filter(|ttl| !ttl.is_zero());
    let mut pending: HashMap<u64, Pending> = HashMap::new();
    let mut next_id: u64 = 0;
    // Only ticks when `request_ttl` is set.
    let mut sweep = tokio::time::interval(request_ttl.unwrap_or(Duration::from_secs(3600)));

    // Reading a frame is not cancel safe, so it gets its own task.
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let read_task = tokio::spawn(read_loop(reader, inbound_tx));

    let reason = loop {
        tokio::select! {
            out = outbound_rx.recv() => {
                let Some(out) = out else {
                    break "client dropped".to_string();
                };
                next_id += 1;
                let id = next_id;
                match write_request(&mut writer, id, out.method, &out.params).await {
                    Ok(()) => {
                        trace!("Sent {} request id={}", out.method, id);
                        pending.insert(
                            id,
                            Pending {
                                reply: out.reply,
                                sent_at: Instant::now(),
                            },
                        );
                    }
                    Err(e) => {
                        error!("Failed to write to package evaluator: {}", e);
                        (out.reply)(Err(IndexError::Unavailable(e.to_string())));
                        break format!("write failed: {}", e);
                    }
                }
            }

            result = inbound_rx.recv() => {
                match result {
                    Some(Ok(Some(msg))) => route_reply(msg, &mut pending),
                    Some(Ok(None)) | None => {
                        info!("Package evaluator closed its output");
                        break "evaluator exited".to_string();
                    }
                    Some(Err(e)) => {
                        error!("Error reading from package evaluator: {}", e);
                        break e.to_string();
                    }
                }
            }

            _ = sweep.tick(), if request_ttl.is_some() => {
                if let Some(ttl) = request_ttl {
                    expire_stale(&mut pending, ttl);
                }
            }
        }
    };
    read_task.abort();

    if !pending.is_empty() {
        warn!("Failing {} pending evaluator requests: {}", pending.len(), reason);
    }
    for (_, entry) in pending {
        (entry.reply)(Err(IndexError::Unavailable(reason.clone())));
    }
    outbound_rx.close();
    while let Ok(out) = outbound_rx.try_recv() {
        (out.reply)(Err(IndexError::Unavailable(reason.clone())));
    }
}

async fn read_loop<R>(mut reader: R, inbound_tx: mpsc::UnboundedSender<std::io::Result<Option<Value>>>)
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = String::new();
    loop {
        let result = read_message(&mut reader, &mut buf).await;
        let done = !matches!(result, Ok(Some(_)));
        if inbound_tx.send(result).is_err() || done {
            break;
        }
    }
}

/// Fails and drops every request older than `ttl`.
fn expire_stale(pending: &mut HashMap<u64, Pending>, ttl: Duration) {
    let now = Instant::now();
    let expired: Vec<u64> = pending
        .iter()
        .filter(|(_, entry)| now.duration_since(entry.sent_at) >= ttl)
        .map(|(id, _)| *id)
        .collect();
    for id in expired {
        if let Some(entry) = pending.remove(&id) {
            debug!("Dropping evaluator request id={} after {:?} without reply", id, ttl);
            (entry.reply)(Err(IndexError::TimedOut(ttl)));
        }
    }
}

fn route_reply(msg: Value, pending: &mut HashMap<u64, Pending>) {
    let resp: RpcResponse = match serde_json::from_value(msg) {
        Ok(resp) => resp,
        Err(e) => {
            warn!("Ignoring undecodable message from package evaluator: {}", e);
            return;
        }
    };

    let Some(id) = resp.id else {
        debug!("Ignoring evaluator notification {:?}", resp.method);
        return;
    };
    let Some(entry) = pending.remove(&id) else {
        warn!("Reply for unknown or expired request id={} from package evaluator", id);
        return;
    };

    let result = match resp.error {
        Some(err) => Err(IndexError::Remote {
            code: err.code,
            message: err.message,
        }),
        None => Ok(resp.result.unwrap_or(Value::Null)),
    };
    (entry.reply)(result);
}

/// Writes one `Content-Length` framed JSON-RPC request.
pub(crate) async fn write_request<W>(
    writer: &mut W,
    id: u64,
    method: &str,
    params: &Value,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(&RpcRequest::new(id, method, params))?;
    let msg = format!("Content-Length: {}\r\n\r\n{}", json.len(), json);
    writer.write_all(msg.as_bytes()).await?;
    writer.flush().await
}

/// Reads one `Content-Length` framed JSON message. `Ok(None)` on EOF.
pub(crate) async fn read_message<R>(reader: &mut R, buf: &mut String) -> std::io::Result<Option<Value>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    loop {
        buf.clear();
        let bytes_read = reader.read_line(buf).await?;
        if bytes_read == 0 {
            return Ok(None);
        }

        let line = buf.trim();
        if line.is_empty() {
            break;
        }

        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok();
            }
        }
    }

    let length = content_length.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "missing Content-Length")
    })?;

    if length > MAX_MESSAGE_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Content-Length {} exceeds {} bytes", length, MAX_MESSAGE_LEN),
        ));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;

    let json: Value = serde_json::from_slice(&body)?;
    Ok(Some(json))
}
