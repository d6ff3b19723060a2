use serde::{Deserialize, Serialize};

use chromaudit_types::{Command, Method};

/// Id of an execution context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionContextId(i64);

impl ExecutionContextId {
    pub fn new(id: i64) -> Self {
        ExecutionContextId(id)
    }

    pub fn inner(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ExecutionContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Stack entry for runtime errors and assertions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    #[serde(default)]
    pub function_name: String,
    pub script_id: crate::debugger::ScriptId,
    #[serde(default)]
    pub url: String,
    pub line_number: i64,
    pub column_number: i64,
}

/// Call frames for assertions or error messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub call_frames: Vec<CallFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<StackTrace>>,
}

impl StackTrace {
    /// The caller at the bottom of the stack, i.e. the frame that issued the
    /// action this trace is attached to.
    pub fn caller(&self) -> Option<&CallFrame> {
        self.call_frames.first()
    }
}

/// Tells inspected instance to run if it was waiting for debugger to attach.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunIfWaitingForDebuggerParams {}

impl RunIfWaitingForDebuggerParams {
    pub const IDENTIFIER: &'static str = "Runtime.runIfWaitingForDebugger";
}

impl Method for RunIfWaitingForDebuggerParams {
    fn identifier(&self) -> std::borrow::Cow<'static, str> {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunIfWaitingForDebuggerReturns {}

impl Command for RunIfWaitingForDebuggerParams {
    type Response = RunIfWaitingForDebuggerReturns;
}
