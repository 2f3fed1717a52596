use serde::{Deserialize, Serialize};

use crate::error::ErrorIr;
use crate::response::{FinishReason, Usage};

/// One event in the normalized IR stream. Adapters' stream builders consume a sequence of these
/// in order and re-serialize it into their dialect's SSE wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    Start { id: String, model: String },
    Content { id: String, model: String, delta: String },
    Reasoning { id: String, model: String, delta: String },
    ToolCall { id: String, model: String, call: ToolCallDelta },
    End { id: String, model: String, finish_reason: FinishReason, usage: Usage },
    Error { id: String, model: String, error: ErrorIr },
}

impl StreamEvent {
    pub fn id(&self) -> &str {
        match self {
            StreamEvent::Start { id, .. }
            | StreamEvent::Content { id, .. }
            | StreamEvent::Reasoning { id, .. }
            | StreamEvent::ToolCall { id, .. }
            | StreamEvent::End { id, .. }
            | StreamEvent::Error { id, .. } => id,
        }
    }
}

/// A partial tool call fragment, indexed so concurrent/parallel tool calls can be reassembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A JSON-fragment shard; concatenate in arrival order to reassemble the full arguments.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments_delta: String,
}
