use serde::{Deserialize, Serialize};

pub type RequestId = String;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicHeaders {
    #[serde(rename = "anthropic-version")]
    pub anthropic_version: AnthropicVersion,
    #[serde(rename = "anthropic-beta", skip_serializing_if = "Option::is_none")]
    pub anthropic_beta: Option<AnthropicBetaHeader>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnthropicVersion {
    #[default]
    #[serde(rename = "2023-06-01")]
    V20230601,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnthropicBetaHeader {
    Single(String),
    Multiple(Vec<String>),
}

pub use crate::claude::create_message::stream::{
    BetaStreamContentBlock, BetaStreamContentBlockDelta, BetaStreamEvent, BetaStreamEventKnown,
    BetaStreamMessageDelta, BetaStreamUsage,
};
pub use crate::claude::create_message::types::{
    BetaContentBlock, BetaContentBlockParam, BetaMessage, BetaMessageParam, BetaModel, BetaRole,
    BetaStopReason, BetaSystemParam, BetaTool, BetaToolChoice, BetaUsage,
};
pub use crate::claude::create_message::{
    CreateMessageHeaders, CreateMessageRequest, CreateMessageRequestBody, CreateMessageResponse,
};
pub use crate::claude::error::{ErrorDetail, ErrorResponse, ErrorResponseType, ErrorType};
