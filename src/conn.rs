use std::borrow::Cow;
use std::time::Duration;

use async_tungstenite::tokio::{connect_async, ConnectStream};
use async_tungstenite::tungstenite::Message as WsMessage;
use async_tungstenite::WebSocketStream;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::time::{timeout_at, Instant};

use chromaudit_cdp::target::SessionId;
use chromaudit_types::{CallId, Command, Message, MethodCall};

use crate::error::{AuditError, Result};

/// How long to wait for the result of a single call before handing back a
/// [`CallOutcome::Timeout`].
pub const RESULT_TIMEOUT: Duration = Duration::from_secs(2);

/// What came back for a specific call id.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The `result` payload of the matching response.
    Result(serde_json::Value),
    /// The browser answered with an error envelope.
    Error(chromaudit_types::Error),
    /// No matching response arrived in time. Recoverable.
    Timeout,
    /// The channel closed while waiting. The caller decides whether this
    /// run can still produce anything useful.
    Closed,
}

/// Exchanges the messages with the websocket.
///
/// One instance multiplexes every attached target; calls carry an optional
/// session id and responses are correlated by integer id.
pub struct Connection {
    /// The websocket to the chromium instance.
    ws: WebSocketStream<ConnectStream>,
    /// The identifier for the next command.
    next_id: usize,
    /// Set once the stream has terminated; `drain` afterwards is fatal to
    /// the event loop.
    closed: bool,
}

impl Connection {
    pub async fn connect(debug_ws_url: impl AsRef<str>) -> Result<Self> {
        let (ws, _) = connect_async(debug_ws_url.as_ref()).await?;
        Ok(Self {
            ws,
            next_id: 0,
            closed: false,
        })
    }

    fn next_call_id(&mut self) -> CallId {
        let id = CallId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Serialize and transmit one call, returning the id assigned to it.
    pub async fn send(
        &mut self,
        method: Cow<'static, str>,
        session_id: Option<&SessionId>,
        params: serde_json::Value,
    ) -> Result<CallId> {
        let id = self.next_call_id();
        let call = MethodCall {
            id,
            session_id: session_id.map(|s| s.as_ref().to_string()),
            method,
            params,
        };
        tracing::debug!(method = %call.method, %id, "submit command");
        let msg = serde_json::to_string(&call)?;
        self.ws.send(WsMessage::text(msg)).await?;
        Ok(id)
    }

    /// Block until the response for `id` arrives, times out, or the channel
    /// closes.
    ///
    /// Every unrelated envelope observed while waiting is handed back so the
    /// caller can forward it to the event loop instead of dropping it.
    pub async fn wait_result(
        &mut self,
        id: CallId,
        timeout: Duration,
    ) -> Result<(CallOutcome, Vec<Message>)> {
        let deadline = Instant::now() + timeout;
        let mut pending = Vec::new();
        loop {
            let msg = match timeout_at(deadline, self.ws.next()).await {
                Err(_) => return Ok((CallOutcome::Timeout, pending)),
                Ok(None) => {
                    self.closed = true;
                    return Ok((CallOutcome::Closed, pending));
                }
                Ok(Some(msg)) => msg?,
            };
            match Self::decode(msg) {
                Some(Message::Response(resp)) if resp.id == id => {
                    if let Some(err) = resp.error {
                        return Ok((CallOutcome::Error(err), pending));
                    }
                    let result = resp.result.unwrap_or_default();
                    return Ok((CallOutcome::Result(result), pending));
                }
                Some(other) => pending.push(other),
                None => {}
            }
        }
    }

    /// Send a typed command and wait for its typed response. Timeout and
    /// closure surface as errors; use [`Connection::send`] +
    /// [`Connection::wait_result`] where they need to be tolerated.
    pub async fn execute<T: Command>(
        &mut self,
        cmd: T,
        session_id: Option<&SessionId>,
    ) -> Result<(T::Response, Vec<Message>)> {
        let method = cmd.identifier();
        let params = serde_json::to_value(cmd)?;
        let id = self.send(method, session_id, params).await?;
        let (outcome, pending) = self.wait_result(id, RESULT_TIMEOUT).await?;
        match outcome {
            CallOutcome::Result(value) => Ok((serde_json::from_value(value)?, pending)),
            CallOutcome::Error(err) => Err(err.into()),
            CallOutcome::Timeout => Err(AuditError::ResultTimeout(id)),
            CallOutcome::Closed => Err(AuditError::NoResponse(id)),
        }
    }

    /// Wait for the next envelope. `None` means the channel has closed.
    pub async fn recv(&mut self) -> Option<Result<Message>> {
        loop {
            match self.ws.next().await {
                None => {
                    self.closed = true;
                    return None;
                }
                Some(Err(err)) => {
                    self.closed = true;
                    return Some(Err(err.into()));
                }
                Some(Ok(msg)) => {
                    if let Some(msg) = Self::decode(msg) {
                        return Some(Ok(msg));
                    }
                }
            }
        }
    }

    /// Return every envelope currently buffered without blocking.
    pub fn drain(&mut self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        while let Some(item) = self.ws.next().now_or_never() {
            match item {
                None => {
                    self.closed = true;
                    break;
                }
                Some(Err(err)) => {
                    self.closed = true;
                    return Err(err.into());
                }
                Some(Ok(msg)) => {
                    if let Some(msg) = Self::decode(msg) {
                        messages.push(msg);
                    }
                }
            }
        }
        Ok(messages)
    }

    pub async fn close(&mut self) {
        let _ = self.ws.close(None).await;
        self.closed = true;
    }

    /// Turn a raw websocket frame into an envelope. Control frames and
    /// binary payloads carry nothing we audit, and a single undecodable
    /// envelope is logged and skipped rather than taking the loop down.
    fn decode(msg: WsMessage) -> Option<Message> {
        match msg {
            WsMessage::Text(text) => match serde_json::from_str::<Message>(text.as_str()) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    tracing::error!(%err, raw = %text, "failed to decode envelope");
                    None
                }
            },
            _ => None,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("next_id", &self.next_id)
            .field("closed", &self.closed)
            .finish()
    }
}
