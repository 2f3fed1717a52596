//! Anthropic Messages dialect.
//!
//! Anthropic never sends a `[DONE]` sentinel; the stream simply ends after `message_stop`.

use std::collections::HashMap;

use gproxy_ir::{
    self as ir, AssistantMessage, Choice, ContentPart, ErrorIr, ErrorKind, FinishReason,
    GenerationConfig, ImageSource, Message, MessageContent, RequestIr, ResponseIr, Role,
    StreamEvent, Tool, ToolCall, ToolCallFunction, ToolCallKind, ToolChoice, ToolFunctionDef,
    Usage, UsageDetails,
};
use gproxy_protocol::claude::create_message::{
    BetaContentBlock, BetaContentBlockParam, BetaImageSource, BetaMessage, BetaMessageContent,
    BetaMessageParam, BetaMessageType, BetaModel, BetaRole, BetaStopReason,
    BetaStreamContentBlock, BetaStreamContentBlockDelta, BetaStreamEvent, BetaStreamEventKnown,
    BetaStreamMessage, BetaStreamUsage, BetaSystemParam, BetaTextBlockParam, BetaTextBlockType,
    BetaTool, BetaToolChoice, BetaUsage, CreateMessageRequestBody, CreateMessageResponse,
};
use gproxy_protocol::claude::error::{
    ErrorDetail, ErrorResponse, ErrorResponseType, ErrorResponseTypeKnown, ErrorType, ErrorTypeKnown,
};
use gproxy_protocol::sse::SseEvent;
use time::OffsetDateTime;

use crate::{
    Adapter, AdapterInfo, AdapterResult, Capabilities, InboundAdapter, OutboundAdapter,
    StreamEventBuilder,
};

pub struct AnthropicAdapter;

impl AnthropicAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnthropicAdapter {
    fn default() -> Self {
        Self::new()
    }
}

const DEFAULT_MAX_TOKENS: u32 = 4096;

fn role_to_ir(role: BetaRole) -> Role {
    match role {
        BetaRole::User => Role::User,
        BetaRole::Assistant => Role::Assistant,
    }
}

fn role_from_ir(role: Role) -> BetaRole {
    match role {
        Role::Assistant => BetaRole::Assistant,
        _ => BetaRole::User,
    }
}

/// Anthropic interleaves tool_use/tool_result blocks inside ordinary user/assistant
/// turns; the IR instead carries a dedicated `Role::Tool` message with `tool_call_id`.
fn blocks_to_ir_messages(role: BetaRole, blocks: Vec<BetaContentBlockParam>) -> Vec<Message> {
    let mut text_parts = Vec::new();
    let mut image_parts = Vec::new();
    let mut tool_calls = Vec::new();
    let mut tool_results = Vec::new();

    for block in blocks {
        match block {
            BetaContentBlockParam::Text { text } => text_parts.push(ContentPart::Text { text }),
            BetaContentBlockParam::Image { source } => image_parts.push(match source {
                BetaImageSource::Base64 { media_type, data } => {
                    ContentPart::Image { source: ImageSource::Base64 { media_type, data } }
                }
                BetaImageSource::Url { url } => ContentPart::Image { source: ImageSource::Url { url } },
            }),
            BetaContentBlockParam::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                id,
                kind: ToolCallKind::Function,
                function: ToolCallFunction {
                    name,
                    arguments: input.to_string(),
                },
            }),
            BetaContentBlockParam::ToolResult {
                tool_use_id,
                content,
                ..
            } => {
                let text = match content {
                    None => String::new(),
                    Some(gproxy_protocol::claude::create_message::BetaToolResultContent::Text(text)) => text,
                    Some(gproxy_protocol::claude::create_message::BetaToolResultContent::Blocks(blocks)) => blocks
                        .into_iter()
                        .filter_map(|block| match block {
                            BetaContentBlockParam::Text { text } => Some(text),
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                        .join(""),
                };
                tool_results.push((tool_use_id, text));
            }
            BetaContentBlockParam::Thinking { .. } => {}
        }
    }

    let mut messages = Vec::new();
    let mut parts: Vec<ContentPart> = text_parts;
    parts.extend(image_parts);
    if !parts.is_empty() || (tool_calls.is_empty() && tool_results.is_empty()) {
        messages.push(Message {
            role: role_to_ir(role),
            content: if parts.len() == 1 {
                if let ContentPart::Text { text } = &parts[0] {
                    MessageContent::Text(text.clone())
                } else {
                    MessageContent::Parts(parts.clone())
                }
            } else {
                MessageContent::Parts(parts.clone())
            },
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls.clone())
            },
            tool_call_id: None,
        });
    } else if !tool_calls.is_empty() {
        messages.push(Message {
            role: role_to_ir(role),
            content: MessageContent::Text(String::new()),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        });
    }

    for (tool_use_id, text) in tool_results {
        messages.push(Message {
            role: Role::Tool,
            content: MessageContent::Text(text),
            tool_calls: None,
            tool_call_id: Some(tool_use_id),
        });
    }

    messages
}

fn message_from_ir(message: &Message) -> BetaMessageParam {
    let mut blocks = Vec::new();

    if message.role == Role::Tool {
        return BetaMessageParam {
            role: BetaRole::User,
            content: BetaMessageContent::Blocks(vec![BetaContentBlockParam::ToolResult {
                tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                content: Some(
                    gproxy_protocol::claude::create_message::BetaToolResultContent::Text(
                        message.content.as_text(),
                    ),
                ),
                is_error: None,
            }]),
        };
    }

    match &message.content {
        MessageContent::Text(text) if !text.is_empty() => {
            blocks.push(BetaContentBlockParam::Text { text: text.clone() })
        }
        MessageContent::Text(_) => {}
        MessageContent::Parts(parts) => {
            for part in parts {
                match part {
                    ContentPart::Text { text } => {
                        blocks.push(BetaContentBlockParam::Text { text: text.clone() })
                    }
                    ContentPart::Image { source } => blocks.push(BetaContentBlockParam::Image {
                        source: match source {
                            ImageSource::Base64 { media_type, data } => BetaImageSource::Base64 {
                                media_type: media_type.clone(),
                                data: data.clone(),
                            },
                            ImageSource::Url { url } => BetaImageSource::Url { url: url.clone() },
                        },
                    }),
                    ContentPart::FileReference { file_id } => blocks.push(BetaContentBlockParam::Text {
                        text: format!("[file:{file_id}]"),
                    }),
                }
            }
        }
    }

    for call in message.tool_calls.iter().flatten() {
        blocks.push(BetaContentBlockParam::ToolUse {
            id: call.id.clone(),
            name: call.function.name.clone(),
            input: serde_json::from_str(&call.function.arguments)
                .unwrap_or(serde_json::Value::String(call.function.arguments.clone())),
        });
    }

    BetaMessageParam {
        role: role_from_ir(message.role),
        content: BetaMessageContent::Blocks(blocks),
    }
}

fn stop_reason_to_ir(reason: Option<BetaStopReason>) -> FinishReason {
    match reason {
        Some(BetaStopReason::EndTurn) | None => FinishReason::Stop,
        Some(BetaStopReason::MaxTokens) => FinishReason::Length,
        Some(BetaStopReason::StopSequence) => FinishReason::Stop,
        Some(BetaStopReason::ToolUse) => FinishReason::ToolCalls,
    }
}

fn stop_reason_from_ir(reason: FinishReason) -> BetaStopReason {
    match reason {
        FinishReason::Stop => BetaStopReason::EndTurn,
        FinishReason::Length => BetaStopReason::MaxTokens,
        FinishReason::ToolCalls => BetaStopReason::ToolUse,
        FinishReason::ContentFilter => BetaStopReason::EndTurn,
    }
}

impl InboundAdapter for AnthropicAdapter {
    fn parse_request(&self, raw: &[u8]) -> AdapterResult<RequestIr> {
        let body: CreateMessageRequestBody = serde_json::from_slice(raw)?;

        let system = body.system.map(|system| match system {
            BetaSystemParam::Text(text) => text,
            BetaSystemParam::Blocks(blocks) => blocks
                .into_iter()
                .map(|block| block.text)
                .collect::<Vec<_>>()
                .join("\n"),
        });

        let mut messages = Vec::new();
        for message in body.messages {
            let blocks = match message.content {
                BetaMessageContent::Text(text) => vec![BetaContentBlockParam::Text { text }],
                BetaMessageContent::Blocks(blocks) => blocks,
            };
            messages.extend(blocks_to_ir_messages(message.role, blocks));
        }

        let tools = body.tools.map(|tools| {
            tools
                .into_iter()
                .map(|tool| Tool {
                    kind: ToolCallKind::Function,
                    function: ToolFunctionDef {
                        name: tool.name,
                        description: tool.description,
                        parameters: Some(tool.input_schema),
                    },
                })
                .collect()
        });

        let tool_choice = body.tool_choice.map(|choice| match choice {
            BetaToolChoice::Auto => ToolChoice::Auto,
            BetaToolChoice::None => ToolChoice::None,
            BetaToolChoice::Any => ToolChoice::Required,
            BetaToolChoice::Tool { name } => ToolChoice::Function { name },
        });

        Ok(RequestIr {
            model: body.model.0,
            messages,
            system,
            tools,
            tool_choice,
            stream: body.stream.unwrap_or(false),
            generation: GenerationConfig {
                temperature: body.temperature,
                top_p: body.top_p,
                max_tokens: Some(body.max_tokens as i64),
                stop: body.stop_sequences.unwrap_or_default(),
                presence_penalty: None,
                frequency_penalty: None,
                n: None,
                seed: None,
                response_format: None,
                logprobs: None,
                top_logprobs: None,
            },
            metadata: HashMap::new(),
            extensions: HashMap::new(),
        })
    }

    fn parse_response(&self, raw: &[u8]) -> AdapterResult<ResponseIr> {
        let message: CreateMessageResponse = serde_json::from_slice(raw)?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in message.content {
            match block {
                BetaContentBlock::Text { text: t } => text.push_str(&t),
                BetaContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    kind: ToolCallKind::Function,
                    function: ToolCallFunction {
                        name,
                        arguments: input.to_string(),
                    },
                }),
                BetaContentBlock::Thinking { .. } => {}
            }
        }

        Ok(ResponseIr {
            id: message.id,
            model: message.model.0,
            created_at: OffsetDateTime::now_utc(),
            choices: vec![Choice {
                index: 0,
                message: AssistantMessage {
                    inner: Message {
                        role: Role::Assistant,
                        content: MessageContent::Text(text),
                        tool_calls: if tool_calls.is_empty() {
                            None
                        } else {
                            Some(tool_calls)
                        },
                        tool_call_id: None,
                    },
                    reasoning_content: None,
                },
                finish_reason: stop_reason_to_ir(message.stop_reason),
                logprobs: None,
            }],
            usage: Usage {
                prompt_tokens: message.usage.input_tokens,
                completion_tokens: message.usage.output_tokens,
                total_tokens: message.usage.input_tokens + message.usage.output_tokens,
                details: Some(UsageDetails {
                    reasoning_tokens: None,
                    cached_tokens: message.usage.cache_read_input_tokens,
                }),
            },
            system_fingerprint: None,
        })
    }

    fn parse_stream_event(&self, event: &SseEvent) -> AdapterResult<Option<Vec<StreamEvent>>> {
        let parsed: BetaStreamEvent = serde_json::from_str(&event.data)?;
        let BetaStreamEvent::Known(known) = parsed else {
            return Ok(Some(Vec::new()));
        };

        match known {
            BetaStreamEventKnown::MessageStart { message } => Ok(Some(vec![StreamEvent::Start {
                id: message.id,
                model: message.model.0,
            }])),
            BetaStreamEventKnown::ContentBlockDelta { delta, .. } => match delta {
                BetaStreamContentBlockDelta::TextDelta { text } => {
                    Ok(Some(vec![StreamEvent::Content {
                        id: String::new(),
                        model: String::new(),
                        delta: text,
                    }]))
                }
                BetaStreamContentBlockDelta::ThinkingDelta { thinking } => {
                    Ok(Some(vec![StreamEvent::Reasoning {
                        id: String::new(),
                        model: String::new(),
                        delta: thinking,
                    }]))
                }
                BetaStreamContentBlockDelta::InputJsonDelta { partial_json } => {
                    Ok(Some(vec![StreamEvent::ToolCall {
                        id: String::new(),
                        model: String::new(),
                        call: ir::ToolCallDelta {
                            index: 0,
                            id: None,
                            name: None,
                            arguments_delta: partial_json,
                        },
                    }]))
                }
                BetaStreamContentBlockDelta::SignatureDelta { .. } => Ok(Some(Vec::new())),
            },
            BetaStreamEventKnown::ContentBlockStart { content_block, .. } => match content_block {
                BetaStreamContentBlock::ToolUse { id, name, .. } => {
                    Ok(Some(vec![StreamEvent::ToolCall {
                        id: String::new(),
                        model: String::new(),
                        call: ir::ToolCallDelta {
                            index: 0,
                            id: Some(id),
                            name: Some(name),
                            arguments_delta: String::new(),
                        },
                    }]))
                }
                _ => Ok(Some(Vec::new())),
            },
            BetaStreamEventKnown::MessageDelta { delta, usage } => {
                Ok(Some(vec![StreamEvent::End {
                    id: String::new(),
                    model: String::new(),
                    finish_reason: stop_reason_to_ir(delta.stop_reason),
                    usage: Usage {
                        prompt_tokens: usage.input_tokens.unwrap_or_default() as i64,
                        completion_tokens: usage.output_tokens.unwrap_or_default() as i64,
                        total_tokens: (usage.input_tokens.unwrap_or_default()
                            + usage.output_tokens.unwrap_or_default()) as i64,
                        details: None,
                    },
                }]))
            }
            BetaStreamEventKnown::Error { error, .. } => Ok(Some(vec![StreamEvent::Error {
                id: String::new(),
                model: String::new(),
                error: ErrorIr::new(ErrorKind::Api, error.message),
            }])),
            BetaStreamEventKnown::ContentBlockStop { .. }
            | BetaStreamEventKnown::MessageStop
            | BetaStreamEventKnown::Ping => Ok(Some(Vec::new())),
        }
    }

    fn parse_error(&self, raw: &[u8], status: u16) -> ErrorIr {
        match serde_json::from_slice::<ErrorResponse>(raw) {
            Ok(response) => {
                ErrorIr::new(ErrorKind::from_upstream_status(status), response.error.message)
                    .with_raw(serde_json::to_value(&response).unwrap_or_default())
            }
            Err(_) => ErrorIr::new(
                ErrorKind::from_upstream_status(status),
                String::from_utf8_lossy(raw).to_string(),
            ),
        }
    }
}

impl OutboundAdapter for AnthropicAdapter {
    fn build_request(&self, ir: &RequestIr) -> AdapterResult<Vec<u8>> {
        let messages = ir.messages.iter().map(message_from_ir).collect();

        let tools = ir.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|tool| BetaTool {
                    name: tool.function.name.clone(),
                    description: tool.function.description.clone(),
                    input_schema: tool
                        .function
                        .parameters
                        .clone()
                        .unwrap_or(serde_json::json!({"type": "object", "properties": {}})),
                })
                .collect()
        });

        let tool_choice = ir.tool_choice.as_ref().map(|choice| match choice {
            ToolChoice::Auto => BetaToolChoice::Auto,
            ToolChoice::None => BetaToolChoice::None,
            ToolChoice::Required => BetaToolChoice::Any,
            ToolChoice::Function { name } => BetaToolChoice::Tool { name: name.clone() },
        });

        let body = CreateMessageRequestBody {
            max_tokens: ir
                .generation
                .max_tokens
                .map(|tokens| tokens as u32)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            model: BetaModel(ir.model.clone()),
            stop_sequences: if ir.generation.stop.is_empty() {
                None
            } else {
                Some(ir.generation.stop.clone())
            },
            stream: Some(ir.stream),
            system: ir.system.clone().map(|text| {
                BetaSystemParam::Blocks(vec![BetaTextBlockParam {
                    kind: BetaTextBlockType::Text,
                    text,
                }])
            }),
            temperature: ir.generation.temperature,
            tool_choice,
            tools,
            top_k: None,
            top_p: ir.generation.top_p,
        };

        Ok(serde_json::to_vec(&body)?)
    }

    fn build_response(&self, ir: &ResponseIr) -> AdapterResult<Vec<u8>> {
        let choice = ir.choices.first();

        let mut content = Vec::new();
        if let Some(choice) = choice {
            let text = choice.message.inner.content.as_text();
            if !text.is_empty() {
                content.push(BetaContentBlock::Text { text });
            }
            for call in choice.message.tool_calls() {
                content.push(BetaContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    input: serde_json::from_str(&call.function.arguments)
                        .unwrap_or(serde_json::Value::String(call.function.arguments.clone())),
                });
            }
        }

        let message = BetaMessage {
            id: ir.id.clone(),
            kind: BetaMessageType::Message,
            role: BetaRole::Assistant,
            content,
            model: BetaModel(ir.model.clone()),
            stop_reason: choice.map(|choice| stop_reason_from_ir(choice.finish_reason)),
            stop_sequence: None,
            usage: BetaUsage {
                input_tokens: ir.usage.prompt_tokens,
                output_tokens: ir.usage.completion_tokens,
                cache_creation_input_tokens: None,
                cache_read_input_tokens: ir.usage.details.as_ref().and_then(|d| d.cached_tokens),
            },
        };

        Ok(serde_json::to_vec(&message)?)
    }

    fn build_error(&self, error: &ErrorIr) -> Vec<u8> {
        let response = ErrorResponse {
            r#type: ErrorResponseType::Known(ErrorResponseTypeKnown::Error),
            error: ErrorDetail {
                r#type: ErrorType::Known(error_type_from_kind(error.kind)),
                message: error.message.clone(),
            },
            request_id: String::new(),
        };
        serde_json::to_vec(&response).unwrap_or_default()
    }

    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder> {
        Box::new(AnthropicStreamBuilder::default())
    }
}

fn error_type_from_kind(kind: ErrorKind) -> ErrorTypeKnown {
    match kind {
        ErrorKind::Validation => ErrorTypeKnown::InvalidRequestError,
        ErrorKind::Authentication => ErrorTypeKnown::AuthenticationError,
        ErrorKind::Permission => ErrorTypeKnown::PermissionError,
        ErrorKind::NotFound => ErrorTypeKnown::NotFoundError,
        ErrorKind::RateLimit => ErrorTypeKnown::RateLimitError,
        ErrorKind::Api | ErrorKind::Server | ErrorKind::Unknown => ErrorTypeKnown::ApiError,
    }
}

#[derive(Default)]
struct AnthropicStreamBuilder {
    started: bool,
    text_block_open: bool,
    tool_block_open: bool,
    next_index: u32,
}

fn event(value: &impl serde::Serialize) -> SseEvent {
    SseEvent {
        event: None,
        data: serde_json::to_string(value).unwrap_or_default(),
    }
}

impl StreamEventBuilder for AnthropicStreamBuilder {
    fn process(&mut self, evt: &StreamEvent) -> Vec<SseEvent> {
        let mut out = Vec::new();

        match evt {
            StreamEvent::Start { id, model } => {
                self.started = true;
                out.push(event(&BetaStreamEventKnown::MessageStart {
                    message: BetaStreamMessage {
                        id: id.clone(),
                        content: vec![],
                        model: BetaModel(model.clone()),
                        role: BetaRole::Assistant,
                        stop_reason: None,
                        stop_sequence: None,
                        kind: BetaMessageType::Message,
                        usage: BetaStreamUsage {
                            input_tokens: None,
                            output_tokens: None,
                            cache_creation_input_tokens: None,
                            cache_read_input_tokens: None,
                        },
                    },
                }));
            }
            StreamEvent::Content { delta, .. } => {
                if !self.text_block_open {
                    self.text_block_open = true;
                    out.push(event(&BetaStreamEventKnown::ContentBlockStart {
                        index: self.next_index,
                        content_block: BetaStreamContentBlock::Text { text: String::new() },
                    }));
                }
                out.push(event(&BetaStreamEventKnown::ContentBlockDelta {
                    index: self.next_index,
                    delta: BetaStreamContentBlockDelta::TextDelta { text: delta.clone() },
                }));
            }
            StreamEvent::Reasoning { delta, .. } => {
                out.push(event(&BetaStreamEventKnown::ContentBlockDelta {
                    index: self.next_index,
                    delta: BetaStreamContentBlockDelta::ThinkingDelta {
                        thinking: delta.clone(),
                    },
                }));
            }
            StreamEvent::ToolCall { call, .. } => {
                if self.text_block_open {
                    out.push(event(&BetaStreamEventKnown::ContentBlockStop {
                        index: self.next_index,
                    }));
                    self.text_block_open = false;
                    self.next_index += 1;
                }
                if !self.tool_block_open {
                    self.tool_block_open = true;
                    out.push(event(&BetaStreamEventKnown::ContentBlockStart {
                        index: self.next_index,
                        content_block: BetaStreamContentBlock::ToolUse {
                            id: call.id.clone().unwrap_or_default(),
                            name: call.name.clone().unwrap_or_default(),
                            input: serde_json::Value::Null,
                        },
                    }));
                }
                out.push(event(&BetaStreamEventKnown::ContentBlockDelta {
                    index: self.next_index,
                    delta: BetaStreamContentBlockDelta::InputJsonDelta {
                        partial_json: call.arguments_delta.clone(),
                    },
                }));
            }
            StreamEvent::End {
                finish_reason,
                usage,
                ..
            } => {
                if self.text_block_open || self.tool_block_open {
                    out.push(event(&BetaStreamEventKnown::ContentBlockStop {
                        index: self.next_index,
                    }));
                    self.text_block_open = false;
                    self.tool_block_open = false;
                }
                out.push(event(&BetaStreamEventKnown::MessageDelta {
                    delta: gproxy_protocol::claude::create_message::BetaStreamMessageDelta {
                        stop_reason: Some(stop_reason_from_ir(*finish_reason)),
                        stop_sequence: None,
                    },
                    usage: BetaStreamUsage {
                        input_tokens: Some(usage.prompt_tokens as u32),
                        output_tokens: Some(usage.completion_tokens as u32),
                        cache_creation_input_tokens: None,
                        cache_read_input_tokens: usage
                            .details
                            .as_ref()
                            .and_then(|d| d.cached_tokens)
                            .map(|tokens| tokens as u32),
                    },
                }));
                out.push(event(&BetaStreamEventKnown::MessageStop));
            }
            StreamEvent::Error { error, .. } => {
                out.push(event(&BetaStreamEventKnown::Error {
                    error: ErrorDetail {
                        r#type: gproxy_protocol::claude::error::ErrorType::Custom(
                            format!("{:?}", error.kind).to_lowercase(),
                        ),
                        message: error.message.clone(),
                    },
                    request_id: None,
                }));
            }
        }

        out
    }

    fn finalize(&mut self) -> Vec<SseEvent> {
        Vec::new()
    }
}

impl Adapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn version(&self) -> &'static str {
        "2023-06-01"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STREAMING
            | Capabilities::TOOLS
            | Capabilities::VISION
            | Capabilities::MULTIMODAL
            | Capabilities::SYSTEM_PROMPT
            | Capabilities::TOOL_CHOICE
            | Capabilities::REASONING
    }

    fn info(&self) -> AdapterInfo {
        AdapterInfo {
            base_url: "https://api.anthropic.com",
            chat_path: "/v1/messages",
            models_path: "/v1/models",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_tool_result_into_tool_role_message() {
        let adapter = AnthropicAdapter::new();
        let raw = serde_json::json!({
            "max_tokens": 256,
            "model": "claude-opus-4",
            "messages": [
                {"role": "user", "content": "what's the weather"},
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": "call_1", "name": "weather", "input": {"city": "sf"}}
                ]},
                {"role": "user", "content": [
                    {"type": "tool_result", "tool_use_id": "call_1", "content": "sunny"}
                ]}
            ]
        });
        let ir = adapter.parse_request(raw.to_string().as_bytes()).unwrap();
        let tool_message = ir.messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_message.content.as_text(), "sunny");
    }

    #[test]
    fn never_emits_done_sentinel_on_finalize() {
        let adapter = AnthropicAdapter::new();
        let mut builder = adapter.create_stream_builder();
        assert!(builder.finalize().is_empty());
    }
}
