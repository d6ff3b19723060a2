use serde::{Deserialize, Serialize};

use chromaudit_types::{Command, Method};

/// Unique target identifier.
/// [TargetID](https://chromedevtools.github.io/devtools-protocol/tot/Target/#type-TargetID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        TargetId(id.into())
    }
}

impl AsRef<str> for TargetId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier of an attached debugging session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: TargetId,
    pub r#type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub attached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opener_id: Option<TargetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}

/// Attaches to the browser target, only uses flat sessionId mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachToBrowserTargetParams {}

impl AttachToBrowserTargetParams {
    pub const IDENTIFIER: &'static str = "Target.attachToBrowserTarget";
}

impl Method for AttachToBrowserTargetParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToBrowserTargetReturns {
    pub session_id: SessionId,
}

impl Command for AttachToBrowserTargetParams {
    type Response = AttachToBrowserTargetReturns;
}

/// Retrieves a list of available targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetTargetsParams {}

impl GetTargetsParams {
    pub const IDENTIFIER: &'static str = "Target.getTargets";
}

impl Method for GetTargetsParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsReturns {
    pub target_infos: Vec<TargetInfo>,
}

impl Command for GetTargetsParams {
    type Response = GetTargetsReturns;
}

/// Attaches to the target with given id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetParams {
    pub target_id: TargetId,
    /// Enables "flat" access to the session via specifying sessionId
    /// attribute in the commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

impl AttachToTargetParams {
    pub const IDENTIFIER: &'static str = "Target.attachToTarget";

    pub fn new(target_id: TargetId) -> Self {
        Self {
            target_id,
            flatten: Some(true),
        }
    }
}

impl Method for AttachToTargetParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetReturns {
    /// Id assigned to the session.
    pub session_id: SessionId,
}

impl Command for AttachToTargetParams {
    type Response = AttachToTargetReturns;
}

/// Controls whether to discover available targets and crash/close events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDiscoverTargetsParams {
    pub discover: bool,
}

impl SetDiscoverTargetsParams {
    pub const IDENTIFIER: &'static str = "Target.setDiscoverTargets";

    pub fn new(discover: bool) -> Self {
        Self { discover }
    }
}

impl Method for SetDiscoverTargetsParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetDiscoverTargetsReturns {}

impl Command for SetDiscoverTargetsParams {
    type Response = SetDiscoverTargetsReturns;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAutoAttachParams {
    pub auto_attach: bool,
    pub wait_for_debugger_on_start: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_open: Option<bool>,
}

impl SetAutoAttachParams {
    pub const IDENTIFIER: &'static str = "Target.setAutoAttach";
}

impl Method for SetAutoAttachParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetAutoAttachReturns {}

impl Command for SetAutoAttachParams {
    type Response = SetAutoAttachReturns;
}

/// Issued when a possible inspection target is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetCreated {
    pub target_info: TargetInfo,
}

impl EventTargetCreated {
    pub const IDENTIFIER: &'static str = "Target.targetCreated";
}

/// Issued when an attachment session is established with a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttachedToTarget {
    pub session_id: SessionId,
    pub target_info: TargetInfo,
    #[serde(default)]
    pub waiting_for_debugger: bool,
}

impl EventAttachedToTarget {
    pub const IDENTIFIER: &'static str = "Target.attachedToTarget";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetInfoChanged {
    pub target_info: TargetInfo,
}

impl EventTargetInfoChanged {
    pub const IDENTIFIER: &'static str = "Target.targetInfoChanged";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_created_event_deserializes() {
        let ev: EventTargetCreated = serde_json::from_str(
            r#"{"targetInfo":{"targetId":"T1","type":"page","title":"New Tab","url":"chrome://newtab/","attached":false,"browserContextId":"B1"}}"#,
        )
        .unwrap();
        assert_eq!(ev.target_info.r#type, "page");
        assert!(!ev.target_info.attached);
        assert!(ev.target_info.opener_id.is_none());
    }

    #[test]
    fn attach_params_flatten_serializes() {
        let params = AttachToTargetParams::new(TargetId::new("T1"));
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"targetId":"T1","flatten":true}"#);
    }
}
