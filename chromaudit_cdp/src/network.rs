use serde::{Deserialize, Serialize};

use chromaudit_types::{Command, Method};

use crate::page::FrameId;
use crate::runtime::StackTrace;

/// Unique loader identifier.
///
/// Identifies one document load inside a frame; a cross-document navigation
/// allocates a fresh loader id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoaderId(String);

impl LoaderId {
    pub fn new(id: impl Into<String>) -> Self {
        LoaderId(id.into())
    }
}

impl AsRef<str> for LoaderId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for LoaderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        RequestId(id.into())
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Request / response headers as keys / values of JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers(serde_json::Value);

impl Headers {
    pub fn new(val: serde_json::Value) -> Self {
        Headers(val)
    }

    /// Case-insensitive header lookup, header names are not normalized by
    /// the protocol.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.0.as_object().and_then(|map| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .and_then(|(_, v)| v.as_str())
        })
    }
}

/// Enables network tracking, network events will now be delivered to the
/// client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnableParams {}

impl EnableParams {
    pub const IDENTIFIER: &'static str = "Network.enable";
}

impl Method for EnableParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnableReturns {}

impl Command for EnableParams {
    type Response = EnableReturns;
}

/// HTTP request data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_fragment: Option<String>,
    pub method: String,
    #[serde(default)]
    pub headers: Headers,
}

/// HTTP response data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub url: String,
    pub status: i64,
    #[serde(default)]
    pub headers: Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "remoteIPAddress", skip_serializing_if = "Option::is_none")]
    pub remote_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<i64>,
}

/// Information about the request initiator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiator {
    /// Type of this initiator: `parser`, `script`, `preload`,
    /// `SignedExchange` or `other`.
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<StackTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestWillBeSent {
    pub request_id: RequestId,
    pub loader_id: LoaderId,
    #[serde(rename = "documentURL")]
    pub document_url: String,
    pub request: Request,
    pub timestamp: f64,
    pub wall_time: f64,
    pub initiator: Initiator,
    /// Type of this resource, e.g. `Document` or `Script`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
    #[serde(default)]
    pub has_user_gesture: bool,
}

impl EventRequestWillBeSent {
    pub const IDENTIFIER: &'static str = "Network.requestWillBeSent";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponseReceived {
    pub request_id: RequestId,
    pub loader_id: LoaderId,
    pub timestamp: f64,
    pub r#type: String,
    pub response: Response,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
}

impl EventResponseReceived {
    pub const IDENTIFIER: &'static str = "Network.responseReceived";
}
