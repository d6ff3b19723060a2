use serde::{Deserialize, Serialize};

use chromaudit_types::{Command, Method};

use crate::network::LoaderId;
use crate::runtime::StackTrace;

/// Unique frame identifier.
/// [FrameId](https://chromedevtools.github.io/devtools-protocol/tot/Page/#type-FrameId)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct FrameId(String);

impl FrameId {
    pub fn new(id: impl Into<String>) -> Self {
        FrameId(id.into())
    }
}

impl AsRef<str> for FrameId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Information about the frame hosting a document on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: FrameId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FrameId>,
    pub loader_id: LoaderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub url: String,
    /// Fragment part of the url, including the `#`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTree {
    pub frame: Frame,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_frames: Option<Vec<FrameTree>>,
}

/// Enables page domain notifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnableParams {}

impl EnableParams {
    pub const IDENTIFIER: &'static str = "Page.enable";
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

/// Returns present frame tree structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetFrameTreeParams {}

impl GetFrameTreeParams {
    pub const IDENTIFIER: &'static str = "Page.getFrameTree";
}

impl Method for GetFrameTreeParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFrameTreeReturns {
    pub frame_tree: FrameTree,
}

impl Command for GetFrameTreeParams {
    type Response = GetFrameTreeReturns;
}

/// Controls whether page will emit lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLifecycleEventsEnabledParams {
    pub enabled: bool,
}

impl SetLifecycleEventsEnabledParams {
    pub const IDENTIFIER: &'static str = "Page.setLifecycleEventsEnabled";

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Method for SetLifecycleEventsEnabledParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetLifecycleEventsEnabledReturns {}

impl Command for SetLifecycleEventsEnabledParams {
    type Response = SetLifecycleEventsEnabledReturns;
}

/// Fired when frame has been attached to its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameAttached {
    pub frame_id: FrameId,
    pub parent_frame_id: FrameId,
    /// JavaScript stack at the point when frame was attached, only set if
    /// frame was attached from script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<StackTrace>,
}

impl EventFrameAttached {
    pub const IDENTIFIER: &'static str = "Page.frameAttached";
}

/// Fired once navigation of the frame has completed. Frame is now associated
/// with the new loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameNavigated {
    pub frame: Frame,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

impl EventFrameNavigated {
    pub const IDENTIFIER: &'static str = "Page.frameNavigated";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDownloadWillBegin {
    /// Id of the frame that caused download to begin.
    pub frame_id: FrameId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_filename: Option<String>,
}

impl EventDownloadWillBegin {
    pub const IDENTIFIER: &'static str = "Page.downloadWillBegin";
}

/// Fired when a new window is going to be opened. Covered by
/// `Target.targetCreated` for auditing purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWindowOpen {
    pub url: String,
    #[serde(default)]
    pub window_name: String,
    #[serde(default)]
    pub user_gesture: bool,
}

impl EventWindowOpen {
    pub const IDENTIFIER: &'static str = "Page.windowOpen";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventJavascriptDialogOpening {
    pub url: String,
    pub message: String,
    pub r#type: String,
}

impl EventJavascriptDialogOpening {
    pub const IDENTIFIER: &'static str = "Page.javascriptDialogOpening";
}
