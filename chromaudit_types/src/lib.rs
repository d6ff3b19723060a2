use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A method call sent by the client.
#[derive(Serialize, Debug, PartialEq)]
pub struct MethodCall {
    /// Identifier for this method call.
    ///
    /// [`MethodCall`] ids must be unique for the lifetime of the connection.
    pub id: CallId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub method: Cow<'static, str>,
    pub params: serde_json::Value,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(usize);

impl CallId {
    pub fn new(id: usize) -> Self {
        CallId(id)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

/// A command is a request sent over the wire that is answered with a typed
/// response.
pub trait Command: serde::ser::Serialize + Method {
    type Response: serde::de::DeserializeOwned + fmt::Debug;
}

pub trait Method {
    /// The whole string identifier for this method, like `Page.enable`.
    fn identifier(&self) -> Cow<'static, str>;
}

/// An event pushed by the browser: `{method, params, sessionId?}`.
///
/// With flattened sessions the session id sits at the top level of the
/// envelope, next to `method`.
#[derive(Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct EventMessage {
    pub method: String,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A response to a [`MethodCall`].
#[derive(Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct Response {
    /// Numeric identifier matching the originating [`MethodCall`].
    pub id: CallId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The response payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The reason why the [`MethodCall`] failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

/// Any inbound envelope: a response to one of our calls, or a pushed event.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Message {
    Response(Response),
    Event(EventMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_call_omits_absent_session() {
        let call = MethodCall {
            id: CallId::new(1),
            session_id: None,
            method: "Page.enable".into(),
            params: serde_json::json!({}),
        };
        let json = serde_json::to_string(&call).unwrap();
        assert!(!json.contains("sessionId"));

        let call = MethodCall {
            session_id: Some("ABC".to_string()),
            ..call
        };
        let json = serde_json::to_string(&call).unwrap();
        assert!(json.contains("\"sessionId\":\"ABC\""));
    }

    #[test]
    fn message_splits_responses_and_events() {
        let msg: Message =
            serde_json::from_str(r#"{"id":7,"result":{"sessionId":"S1"}}"#).unwrap();
        match msg {
            Message::Response(resp) => {
                assert_eq!(resp.id, CallId::new(7));
                assert!(resp.error.is_none());
            }
            Message::Event(_) => panic!("expected a response"),
        }

        let msg: Message = serde_json::from_str(
            r#"{"method":"Page.frameAttached","sessionId":"S1","params":{"frameId":"F1","parentFrameId":"F0"}}"#,
        )
        .unwrap();
        match msg {
            Message::Event(ev) => {
                assert_eq!(ev.method, "Page.frameAttached");
                assert_eq!(ev.session_id.as_deref(), Some("S1"));
            }
            Message::Response(_) => panic!("expected an event"),
        }
    }

    #[test]
    fn error_response_deserializes() {
        let msg: Message = serde_json::from_str(
            r#"{"id":3,"error":{"code":-32000,"message":"No target with given id found"}}"#,
        )
        .unwrap();
        match msg {
            Message::Response(resp) => {
                let err = resp.error.unwrap();
                assert_eq!(err.code, -32000);
            }
            Message::Event(_) => panic!("expected a response"),
        }
    }
}
