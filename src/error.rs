use std::io;

use async_tungstenite::tungstenite;
use thiserror::Error;

use chromaudit_types::CallId;

pub type Result<T, E = AuditError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("{0}")]
    Ws(#[from] tungstenite::Error),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Csv(#[from] csv::Error),
    /// An `error` envelope answering one of our calls.
    #[error("{0}")]
    Chrome(#[from] chromaudit_types::Error),
    #[error("received no response for {0}")]
    NoResponse(CallId),
    /// Recoverable; the caller decides whether to retry or move on.
    #[error("timed out waiting for the result of {0}")]
    ResultTimeout(CallId),
    #[error("browser unreachable after {0} connection attempts")]
    BrowserUnreachable(u64),
    #[error("malformed version handshake: missing webSocketDebuggerUrl")]
    MalformedHandshake,
    /// An event referenced an entity our invariants say must exist. Either
    /// the browser changed its event ordering contract or we have a bug;
    /// both warrant a crash with context rather than silent corruption.
    #[error("protocol anomaly: {0}")]
    ProtocolAnomaly(String),
}

impl AuditError {
    pub fn anomaly(msg: impl Into<String>) -> Self {
        AuditError::ProtocolAnomaly(msg.into())
    }
}
