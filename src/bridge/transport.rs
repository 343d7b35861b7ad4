//! Newline-delimited JSON transport for the bridge.
//!
//! Requests:  `{"id": 7, "channel": "ai.assistant/calendar", "method": "getEvents", "arguments": {...}}`
//! Replies:   `{"status": "success", "id": 7, "result": ...}`
//!            `{"status": "error", "id": 7, "code": "INVALID_ARGS", "message": "..."}`
//!            `{"status": "not_implemented", "id": 7}`
//! Events:    `{"event": "end", "channel": "ai.assistant/speech", "payload": {...}}`

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

use super::{Bridge, BridgeEvent, MethodCall, MethodResult, PendingReply};
use crate::error::ErrorCode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub channel: String,
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Success {
        id: Option<u64>,
        result: Value,
    },
    Error {
        id: Option<u64>,
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    NotImplemented {
        id: Option<u64>,
    },
}

impl Reply {
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Success { id, .. } | Self::Error { id, .. } | Self::NotImplemented { id } => *id,
        }
    }

    /// Converts a resolved result. A still-pending result is reported as an internal error.
    pub fn from_result(id: Option<u64>, result: MethodResult) -> Self {
        match result {
            MethodResult::Success(result) => Self::Success { id, result },
            MethodResult::Error(e) => Self::Error {
                id,
                code: e.code,
                message: e.message,
                details: e.details,
            },
            MethodResult::NotImplemented => Self::NotImplemented { id },
            MethodResult::Pending(_) => Self::Error {
                id,
                code: ErrorCode::InternalError,
                message: "reply was not resolved".to_string(),
                details: None,
            },
        }
    }
}

async fn write_line<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_string(message).context("Failed to encode bridge message")?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .context("Failed to write bridge message")?;
    writer.flush().await.context("Failed to flush bridge output")?;
    Ok(())
}

fn parse_request(line: &[u8]) -> Result<Request, Reply> {
    serde_json::from_slice(line).map_err(|e| {
        warn!("Rejecting malformed bridge request: {}", e);
        Reply::Error {
            id: None,
            code: ErrorCode::InvalidArgs,
            message: format!("Failed to parse request: {}", e),
            details: None,
        }
    })
}

/// Runs a pending reply on its own task so a panicking handler still answers.
fn spawn_pending(id: u64, future: PendingReply, replies: mpsc::UnboundedSender<Reply>) {
    tokio::spawn(async move {
        let reply = match tokio::spawn(async move { future.await.resolve().await }).await {
            Ok(result) => Reply::from_result(Some(id), result),
            Err(e) => {
                error!("Pending reply for request {} failed: {}", id, e);
                Reply::Error {
                    id: Some(id),
                    code: ErrorCode::InternalError,
                    message: "handler failed before replying".to_string(),
                    details: None,
                }
            }
        };
        let _ = replies.send(reply);
    });
}

/// Serves `bridge` over a line-oriented reader/writer pair.
///
/// Handlers run in request order. Pending replies are awaited on spawned tasks
/// and written as they complete, interleaved with `events`. Returns on EOF once
/// every pending reply has been written, or when `shutdown` fires.
pub async fn serve<R, W>(
    bridge: Arc<Bridge>,
    mut reader: R,
    mut writer: W,
    mut events: UnboundedReceiver<BridgeEvent>,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // Raw bytes: a line that is not UTF-8 is a malformed request, not a broken stream.
    let mut line = Vec::new();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Reply>();
    let mut outstanding = 0usize;
    let mut reading = true;
    let mut events_open = true;

    info!("Bridge serving channels: {}", bridge.channels().join(", "));

    loop {
        if !reading && outstanding == 0 {
            break;
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received, stopping bridge transport");
                return Ok(());
            }
            read = reader.read_until(b'\n', &mut line), if reading => {
                if read.context("Failed to read bridge input")? == 0 {
                    debug!("Bridge input closed, {} replies outstanding", outstanding);
                    reading = false;
                    continue;
                }
                let raw = std::mem::take(&mut line);
                if raw.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }

                let request = match parse_request(&raw) {
                    Ok(request) => request,
                    Err(reply) => {
                        write_line(&mut writer, &reply).await?;
                        continue;
                    }
                };

                let id = request.id;
                let call = MethodCall::new(request.method, request.arguments);
                match bridge.dispatch(&request.channel, call).await {
                    MethodResult::Pending(future) => {
                        outstanding += 1;
                        spawn_pending(id, future, reply_tx.clone());
                    }
                    result => write_line(&mut writer, &Reply::from_result(Some(id), result)).await?,
                }
            }
            Some(reply) = reply_rx.recv() => {
                outstanding = outstanding.saturating_sub(1);
                debug!("Deferred reply for request {:?} ready", reply.id());
                write_line(&mut writer, &reply).await?;
            }
            event = events.recv(), if events_open => {
                match event {
                    Some(event) => write_line(&mut writer, &event).await?,
                    None => events_open = false,
                }
            }
        }
    }

    while let Ok(event) = events.try_recv() {
        write_line(&mut writer, &event).await?;
    }

    info!("Bridge transport stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_wire_shape() {
        let reply = Reply::Error {
            id: Some(3),
            code: ErrorCode::InvalidArgs,
            message: "Invalid arguments".to_string(),
            details: None,
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            value,
            json!({"status": "error", "id": 3, "code": "INVALID_ARGS", "message": "Invalid arguments"})
        );

        let value = serde_json::to_value(Reply::NotImplemented { id: Some(4) }).unwrap();
        assert_eq!(value, json!({"status": "not_implemented", "id": 4}));
    }

    #[test]
    fn test_request_arguments_default_to_null() {
        let request: Request =
            serde_json::from_str(r#"{"id": 1, "channel": "c", "method": "isSpeaking"}"#).unwrap();
        assert_eq!(request.arguments, Value::Null);
    }

    #[test]
    fn test_non_utf8_line_is_invalid_args() {
        let reply = parse_request(b"\xff\xfe\n").unwrap_err();
        assert!(matches!(reply, Reply::Error { id: None, code: ErrorCode::InvalidArgs, .. }));

        let request = parse_request(b"{\"id\": 9, \"channel\": \"c\", \"method\": \"m\"}\r\n").unwrap();
        assert_eq!(request.id, 9);
    }

    #[test]
    fn test_reply_id_covers_every_status() {
        assert_eq!(Reply::from_result(Some(2), MethodResult::empty()).id(), Some(2));
        assert_eq!(Reply::from_result(Some(3), MethodResult::NotImplemented).id(), Some(3));
        assert_eq!(Reply::from_result(None, crate::error::AppError::store("x").into()).id(), None);
    }

    #[test]
    fn test_unresolved_result_is_internal_error() {
        let reply = Reply::from_result(Some(1), MethodResult::pending(async { MethodResult::empty() }));
        assert!(matches!(reply, Reply::Error { code: ErrorCode::InternalError, .. }));
    }
}
