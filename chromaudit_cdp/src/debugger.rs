use serde::{Deserialize, Serialize};

use chromaudit_types::{Command, Method};

use crate::page::FrameId;
use crate::runtime::{ExecutionContextId, StackTrace};

/// Unique script identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptId(String);

impl ScriptId {
    pub fn new(id: impl Into<String>) -> Self {
        ScriptId(id.into())
    }
}

impl AsRef<str> for ScriptId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ScriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Enables debugger for the given page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnableParams {}

impl EnableParams {
    pub const IDENTIFIER: &'static str = "Debugger.enable";
}

impl Method for EnableParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableReturns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_id: Option<String>,
}

impl Command for EnableParams {
    type Response = EnableReturns;
}

/// Embedder-specific auxiliary data attached to an execution context; for
/// pages it carries the owning frame id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextAuxData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// Fired when virtual machine parses script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventScriptParsed {
    pub script_id: ScriptId,
    /// URL or name of the script parsed, may be empty or absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub execution_context_id: ExecutionContextId,
    /// Content hash of the script.
    #[serde(default)]
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_context_aux_data: Option<ExecutionContextAuxData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
}

impl EventScriptParsed {
    pub const IDENTIFIER: &'static str = "Debugger.scriptParsed";
}
