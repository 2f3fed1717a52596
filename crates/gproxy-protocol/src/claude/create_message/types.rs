use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BetaModel(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetaRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaMessageParam {
    pub role: BetaRole,
    pub content: BetaMessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BetaMessageContent {
    Text(String),
    Blocks(Vec<BetaContentBlockParam>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetaContentBlockParam {
    Text {
        text: String,
    },
    Image {
        source: BetaImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: JsonValue,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<BetaToolResultContent>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    Thinking {
        thinking: String,
        signature: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BetaToolResultContent {
    Text(String),
    Blocks(Vec<BetaContentBlockParam>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetaImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BetaSystemParam {
    Text(String),
    Blocks(Vec<BetaTextBlockParam>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaTextBlockParam {
    #[serde(rename = "type")]
    pub kind: BetaTextBlockType,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaTextBlockType {
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaTool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetaToolChoice {
    Auto,
    Any,
    Tool { name: String },
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaStopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
}

/// The non-streaming response body: a full Anthropic `Message` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetaMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BetaMessageType,
    pub role: BetaRole,
    pub content: Vec<BetaContentBlock>,
    pub model: BetaModel,
    pub stop_reason: Option<BetaStopReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
    pub usage: BetaUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaMessageType {
    Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetaContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: JsonValue },
    Thinking { thinking: String, signature: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BetaUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<i64>,
}
