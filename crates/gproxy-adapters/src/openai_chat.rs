//! OpenAI Chat Completions dialect. Also used verbatim for the OpenAI-compatible wire
//! format shared by deepseek, moonshot, qwen, zhipu and custom providers — they differ
//! only in base URL and auth header, not in request/response shape.

use gproxy_ir::{
    self as ir, Choice, ErrorIr, ErrorKind, FinishReason, GenerationConfig, Message,
    MessageContent, RequestIr, ResponseIr, Role, StreamEvent, Tool, ToolCall, ToolCallFunction,
    ToolCallKind, ToolChoice, ToolFunctionDef, Usage, UsageDetails,
};
use gproxy_protocol::openai::create_chat_completions::{
    ChatCompletionChoice, ChatCompletionFinishReason, ChatCompletionFunctionCallChunk,
    ChatCompletionImageUrl, ChatCompletionMessageContent, ChatCompletionMessageRole,
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCallChunk, ChatCompletionObject,
    ChatCompletionRequestMessage, ChatCompletionResponseMessage, ChatCompletionStreamChoice,
    ChatCompletionStreamResponseDelta, ChatCompletionToolCallType, ChatCompletionToolChoiceMode,
    ChatCompletionToolChoiceOption, ChatCompletionToolDefinition, ChatCompletionChunkObject,
    ChatCompletionContentPart, ChatCompletionFunctionCall, ChatCompletionFunctionDefinition,
    CompletionUsage, CompletionTokensDetails, PromptTokensDetails, CreateChatCompletionRequestBody,
    CreateChatCompletionResponse, CreateChatCompletionStreamResponse, StopConfiguration,
};
use gproxy_protocol::openai::error::{ErrorDetail, ErrorResponse, ErrorType, ErrorTypeKnown};
use gproxy_protocol::sse::SseEvent;
use time::OffsetDateTime;

use crate::{
    is_done_sentinel, json_sse_event, Adapter, AdapterInfo, AdapterResult, Capabilities,
    InboundAdapter, OutboundAdapter, StreamEventBuilder, DONE_EVENT,
};

pub struct OpenAiChatAdapter;

impl OpenAiChatAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OpenAiChatAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn role_to_ir(role: ChatCompletionMessageRole) -> Role {
    match role {
        ChatCompletionMessageRole::System => Role::System,
        ChatCompletionMessageRole::User => Role::User,
        ChatCompletionMessageRole::Assistant => Role::Assistant,
        ChatCompletionMessageRole::Tool => Role::Tool,
    }
}

fn role_from_ir(role: Role) -> ChatCompletionMessageRole {
    match role {
        Role::System => ChatCompletionMessageRole::System,
        Role::User => ChatCompletionMessageRole::User,
        Role::Assistant => ChatCompletionMessageRole::Assistant,
        Role::Tool => ChatCompletionMessageRole::Tool,
    }
}

fn content_to_ir(content: Option<ChatCompletionMessageContent>) -> MessageContent {
    match content {
        None => MessageContent::Text(String::new()),
        Some(ChatCompletionMessageContent::Text(text)) => MessageContent::Text(text),
        Some(ChatCompletionMessageContent::Parts(parts)) => {
            MessageContent::Parts(
                parts
                    .into_iter()
                    .map(|part| match part {
                        ChatCompletionContentPart::Text { text } => ir::ContentPart::Text { text },
                        ChatCompletionContentPart::ImageUrl { image_url } => {
                            ir::ContentPart::Image {
                                source: ir::ImageSource::from_data_url(&image_url.url),
                            }
                        }
                    })
                    .collect(),
            )
        }
    }
}

fn content_from_ir(content: &MessageContent) -> Option<ChatCompletionMessageContent> {
    match content {
        MessageContent::Text(text) if text.is_empty() => None,
        MessageContent::Text(text) => Some(ChatCompletionMessageContent::Text(text.clone())),
        MessageContent::Parts(parts) => Some(ChatCompletionMessageContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ir::ContentPart::Text { text } => {
                        ChatCompletionContentPart::Text { text: text.clone() }
                    }
                    ir::ContentPart::Image { source } => ChatCompletionContentPart::ImageUrl {
                        image_url: ChatCompletionImageUrl {
                            url: source.to_data_url(),
                        },
                    },
                    ir::ContentPart::FileReference { file_id } => {
                        ChatCompletionContentPart::Text {
                            text: format!("[file:{file_id}]"),
                        }
                    }
                })
                .collect(),
        )),
    }
}

fn tool_call_to_ir(call: ChatCompletionMessageToolCall) -> ToolCall {
    ToolCall {
        id: call.id,
        kind: ToolCallKind::Function,
        function: ToolCallFunction {
            name: call.function.name,
            arguments: call.function.arguments,
        },
    }
}

fn tool_call_from_ir(call: &ToolCall) -> ChatCompletionMessageToolCall {
    ChatCompletionMessageToolCall {
        id: call.id.clone(),
        kind: ChatCompletionToolCallType::Function,
        function: ChatCompletionFunctionCall {
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
        },
    }
}

fn finish_reason_to_ir(reason: ChatCompletionFinishReason) -> FinishReason {
    match reason {
        ChatCompletionFinishReason::Stop => FinishReason::Stop,
        ChatCompletionFinishReason::Length => FinishReason::Length,
        ChatCompletionFinishReason::ToolCalls => FinishReason::ToolCalls,
        ChatCompletionFinishReason::ContentFilter => FinishReason::ContentFilter,
        ChatCompletionFinishReason::FunctionCall => FinishReason::ToolCalls,
    }
}

fn finish_reason_from_ir(reason: FinishReason) -> ChatCompletionFinishReason {
    match reason {
        FinishReason::Stop => ChatCompletionFinishReason::Stop,
        FinishReason::Length => ChatCompletionFinishReason::Length,
        FinishReason::ToolCalls => ChatCompletionFinishReason::ToolCalls,
        FinishReason::ContentFilter => ChatCompletionFinishReason::ContentFilter,
    }
}

impl InboundAdapter for OpenAiChatAdapter {
    fn parse_request(&self, raw: &[u8]) -> AdapterResult<RequestIr> {
        let body: CreateChatCompletionRequestBody = serde_json::from_slice(raw)?;

        let mut system_parts = Vec::new();
        let mut messages = Vec::new();
        for message in body.messages {
            if matches!(message.role, ChatCompletionMessageRole::System) {
                if let Some(content) = &message.content {
                    let text = match content {
                        ChatCompletionMessageContent::Text(text) => text.clone(),
                        ChatCompletionMessageContent::Parts(parts) => parts
                            .iter()
                            .filter_map(|part| match part {
                                ChatCompletionContentPart::Text { text } => Some(text.clone()),
                                _ => None,
                            })
                            .collect::<Vec<_>>()
                            .join(""),
                    };
                    system_parts.push(text);
                }
                continue;
            }

            messages.push(Message {
                role: role_to_ir(message.role),
                content: content_to_ir(message.content),
                tool_calls: message
                    .tool_calls
                    .map(|calls| calls.into_iter().map(tool_call_to_ir).collect()),
                tool_call_id: message.tool_call_id,
            });
        }

        let tools = body.tools.map(|tools| {
            tools
                .into_iter()
                .map(|tool| Tool {
                    kind: ToolCallKind::Function,
                    function: ToolFunctionDef {
                        name: tool.function.name,
                        description: tool.function.description,
                        parameters: tool.function.parameters,
                    },
                })
                .collect()
        });

        let tool_choice = body.tool_choice.map(|choice| match choice {
            ChatCompletionToolChoiceOption::Mode(ChatCompletionToolChoiceMode::Auto) => {
                ToolChoice::Auto
            }
            ChatCompletionToolChoiceOption::Mode(ChatCompletionToolChoiceMode::None) => {
                ToolChoice::None
            }
            ChatCompletionToolChoiceOption::Mode(ChatCompletionToolChoiceMode::Required) => {
                ToolChoice::Required
            }
            ChatCompletionToolChoiceOption::Named { function, .. } => {
                ToolChoice::Function { name: function.name }
            }
        });

        let mut metadata = std::collections::HashMap::new();
        if let Some(user) = body.user {
            metadata.insert("user".to_string(), user);
        }

        let mut extensions = std::collections::HashMap::new();
        if let Some(effort) = body.reasoning_effort {
            extensions.insert(
                "openai-chat".to_string(),
                serde_json::json!({ "reasoning_effort": effort }),
            );
        }

        Ok(RequestIr {
            model: body.model,
            messages,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n"))
            },
            tools,
            tool_choice,
            stream: body.stream.unwrap_or(false),
            generation: GenerationConfig {
                temperature: body.temperature,
                top_p: body.top_p,
                max_tokens: body.max_tokens.or(body.max_completion_tokens),
                stop: body
                    .stop
                    .map(StopConfiguration::into_vec)
                    .unwrap_or_default(),
                presence_penalty: body.presence_penalty,
                frequency_penalty: body.frequency_penalty,
                n: body.n,
                seed: body.seed,
                response_format: body.response_format,
                logprobs: body.logprobs,
                top_logprobs: body.top_logprobs,
            },
            metadata,
            extensions,
        })
    }

    fn parse_response(&self, raw: &[u8]) -> AdapterResult<ResponseIr> {
        let response: CreateChatCompletionResponse = serde_json::from_slice(raw)?;

        let choices = response
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: ir::AssistantMessage {
                    inner: Message {
                        role: Role::Assistant,
                        content: MessageContent::Text(choice.message.content.unwrap_or_default()),
                        tool_calls: choice
                            .message
                            .tool_calls
                            .map(|calls| calls.into_iter().map(tool_call_to_ir).collect()),
                        tool_call_id: None,
                    },
                    reasoning_content: choice.message.reasoning_content,
                },
                finish_reason: finish_reason_to_ir(choice.finish_reason),
                logprobs: choice
                    .logprobs
                    .and_then(|logprobs| logprobs.content)
                    .map(|content| ir::LogprobDetail { content }),
            })
            .collect();

        let usage = response
            .usage
            .map(|usage| Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
                details: Some(UsageDetails {
                    reasoning_tokens: usage
                        .completion_tokens_details
                        .and_then(|details| details.reasoning_tokens),
                    cached_tokens: usage
                        .prompt_tokens_details
                        .and_then(|details| details.cached_tokens),
                }),
            })
            .unwrap_or_default();

        Ok(ResponseIr {
            id: response.id,
            model: response.model,
            created_at: OffsetDateTime::from_unix_timestamp(response.created)
                .unwrap_or_else(|_| OffsetDateTime::now_utc()),
            choices,
            usage,
            system_fingerprint: response.system_fingerprint,
        })
    }

    fn parse_stream_event(&self, event: &SseEvent) -> AdapterResult<Option<Vec<StreamEvent>>> {
        if is_done_sentinel(event) {
            return Ok(None);
        }
        if event.data.trim().is_empty() {
            return Ok(None);
        }

        let chunk: CreateChatCompletionStreamResponse = serde_json::from_str(&event.data)?;
        let id = chunk.id.clone();
        let model = chunk.model.clone();

        let mut events = Vec::new();
        let Some(choice) = chunk.choices.into_iter().next() else {
            if let Some(usage) = chunk.usage {
                events.push(StreamEvent::End {
                    id,
                    model,
                    finish_reason: FinishReason::Stop,
                    usage: Usage {
                        prompt_tokens: usage.prompt_tokens,
                        completion_tokens: usage.completion_tokens,
                        total_tokens: usage.total_tokens,
                        details: None,
                    },
                });
            }
            return Ok(Some(events));
        };

        if choice.delta.role.is_some() {
            events.push(StreamEvent::Start {
                id: id.clone(),
                model: model.clone(),
            });
        }
        if let Some(reasoning) = choice.delta.reasoning_content {
            events.push(StreamEvent::Reasoning {
                id: id.clone(),
                model: model.clone(),
                delta: reasoning,
            });
        }
        if let Some(content) = choice.delta.content {
            events.push(StreamEvent::Content {
                id: id.clone(),
                model: model.clone(),
                delta: content,
            });
        }
        for call in choice.delta.tool_calls.into_iter().flatten() {
            events.push(StreamEvent::ToolCall {
                id: id.clone(),
                model: model.clone(),
                call: ir::ToolCallDelta {
                    index: call.index,
                    id: call.id,
                    name: call.function.as_ref().and_then(|f| f.name.clone()),
                    arguments_delta: call
                        .function
                        .and_then(|f| f.arguments)
                        .unwrap_or_default(),
                },
            });
        }
        if let Some(reason) = choice.finish_reason {
            events.push(StreamEvent::End {
                id,
                model,
                finish_reason: finish_reason_to_ir(reason),
                usage: chunk
                    .usage
                    .map(|usage| Usage {
                        prompt_tokens: usage.prompt_tokens,
                        completion_tokens: usage.completion_tokens,
                        total_tokens: usage.total_tokens,
                        details: None,
                    })
                    .unwrap_or_default(),
            });
        }

        Ok(Some(events))
    }

    fn parse_error(&self, raw: &[u8], status: u16) -> ErrorIr {
        match serde_json::from_slice::<ErrorResponse>(raw) {
            Ok(response) => ErrorIr::new(ErrorKind::from_upstream_status(status), response.error.message)
                .with_raw(serde_json::to_value(&response).unwrap_or_default()),
            Err(_) => ErrorIr::new(
                ErrorKind::from_upstream_status(status),
                String::from_utf8_lossy(raw).to_string(),
            ),
        }
    }
}

impl OutboundAdapter for OpenAiChatAdapter {
    fn build_request(&self, ir: &RequestIr) -> AdapterResult<Vec<u8>> {
        let mut messages = Vec::new();
        if let Some(system) = &ir.system {
            messages.push(ChatCompletionRequestMessage {
                role: ChatCompletionMessageRole::System,
                content: Some(ChatCompletionMessageContent::Text(system.clone())),
                name: None,
                tool_calls: None,
                tool_call_id: None,
                reasoning_content: None,
            });
        }
        for message in &ir.messages {
            messages.push(ChatCompletionRequestMessage {
                role: role_from_ir(message.role),
                content: content_from_ir(&message.content),
                name: None,
                tool_calls: message
                    .tool_calls
                    .as_ref()
                    .map(|calls| calls.iter().map(tool_call_from_ir).collect()),
                tool_call_id: message.tool_call_id.clone(),
                reasoning_content: None,
            });
        }

        let tools = ir.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|tool| ChatCompletionToolDefinition {
                    kind: ChatCompletionToolCallType::Function,
                    function: ChatCompletionFunctionDefinition {
                        name: tool.function.name.clone(),
                        description: tool.function.description.clone(),
                        parameters: tool.function.parameters.clone(),
                    },
                })
                .collect()
        });

        let tool_choice = ir.tool_choice.as_ref().map(|choice| match choice {
            ToolChoice::Auto => ChatCompletionToolChoiceOption::Mode(ChatCompletionToolChoiceMode::Auto),
            ToolChoice::None => ChatCompletionToolChoiceOption::Mode(ChatCompletionToolChoiceMode::None),
            ToolChoice::Required => {
                ChatCompletionToolChoiceOption::Mode(ChatCompletionToolChoiceMode::Required)
            }
            ToolChoice::Function { name } => ChatCompletionToolChoiceOption::Named {
                kind: ChatCompletionToolCallType::Function,
                function: gproxy_protocol::openai::create_chat_completions::ChatCompletionToolChoiceFunction {
                    name: name.clone(),
                },
            },
        });

        let body = CreateChatCompletionRequestBody {
            messages,
            model: ir.model.clone(),
            reasoning_effort: None,
            max_completion_tokens: None,
            frequency_penalty: ir.generation.frequency_penalty,
            presence_penalty: ir.generation.presence_penalty,
            top_logprobs: ir.generation.top_logprobs,
            response_format: ir.generation.response_format.clone(),
            stream: Some(ir.stream),
            stop: if ir.generation.stop.is_empty() {
                None
            } else {
                Some(StopConfiguration::Many(ir.generation.stop.clone()))
            },
            logit_bias: None,
            logprobs: ir.generation.logprobs,
            max_tokens: ir.generation.max_tokens,
            n: ir.generation.n,
            seed: ir.generation.seed,
            stream_options: None,
            tools,
            tool_choice,
            parallel_tool_calls: None,
            extra_body: None,
            temperature: ir.generation.temperature,
            top_p: ir.generation.top_p,
            user: ir.metadata.get("user").cloned(),
        };

        Ok(serde_json::to_vec(&body)?)
    }

    fn build_response(&self, ir: &ResponseIr) -> AdapterResult<Vec<u8>> {
        let choices = ir
            .choices
            .iter()
            .map(|choice| ChatCompletionChoice {
                index: choice.index,
                message: ChatCompletionResponseMessage {
                    role: ChatCompletionMessageRole::Assistant,
                    content: match &choice.message.inner.content {
                        MessageContent::Text(text) if text.is_empty() => None,
                        MessageContent::Text(text) => Some(text.clone()),
                        MessageContent::Parts(_) => Some(choice.message.inner.content.as_text()),
                    },
                    tool_calls: choice
                        .message
                        .inner
                        .tool_calls
                        .as_ref()
                        .map(|calls| calls.iter().map(tool_call_from_ir).collect()),
                    reasoning_content: choice.message.reasoning_content.clone(),
                },
                finish_reason: finish_reason_from_ir(choice.finish_reason),
                logprobs: None,
            })
            .collect();

        let response = CreateChatCompletionResponse {
            id: ir.id.clone(),
            object: ChatCompletionObject::ChatCompletion,
            created: ir.created_at.unix_timestamp(),
            model: ir.model.clone(),
            choices,
            usage: Some(CompletionUsage {
                prompt_tokens: ir.usage.prompt_tokens,
                completion_tokens: ir.usage.completion_tokens,
                total_tokens: ir.usage.total_tokens,
                completion_tokens_details: ir
                    .usage
                    .details
                    .as_ref()
                    .map(|details| CompletionTokensDetails {
                        reasoning_tokens: details.reasoning_tokens,
                    }),
                prompt_tokens_details: ir.usage.details.as_ref().map(|details| PromptTokensDetails {
                    cached_tokens: details.cached_tokens,
                }),
            }),
            system_fingerprint: ir.system_fingerprint.clone(),
        };

        Ok(serde_json::to_vec(&response)?)
    }

    fn build_error(&self, error: &ErrorIr) -> Vec<u8> {
        let response = ErrorResponse {
            error: ErrorDetail {
                r#type: ErrorType::Known(error_type_from_kind(error.kind)),
                message: error.message.clone(),
                param: None,
                code: error.vendor_code.clone(),
            },
        };
        serde_json::to_vec(&response).unwrap_or_default()
    }

    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder> {
        Box::new(ChatStreamBuilder::default())
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
struct ChatStreamBuilder {
    created: Option<i64>,
}

impl ChatStreamBuilder {
    fn chunk(
        &mut self,
        id: &str,
        model: &str,
        delta: ChatCompletionStreamResponseDelta,
        finish_reason: Option<ChatCompletionFinishReason>,
        usage: Option<CompletionUsage>,
    ) -> SseEvent {
        let created = *self
            .created
            .get_or_insert_with(|| OffsetDateTime::now_utc().unix_timestamp());

        json_sse_event(&CreateChatCompletionStreamResponse {
            id: id.to_string(),
            object: ChatCompletionChunkObject::ChatCompletionChunk,
            created,
            model: model.to_string(),
            choices: vec![ChatCompletionStreamChoice {
                index: 0,
                delta,
                logprobs: None,
                finish_reason,
            }],
            usage,
            system_fingerprint: None,
        })
    }
}

impl StreamEventBuilder for ChatStreamBuilder {
    fn process(&mut self, event: &StreamEvent) -> Vec<SseEvent> {
        match event {
            StreamEvent::Start { id, model } => vec![self.chunk(
                id,
                model,
                ChatCompletionStreamResponseDelta {
                    role: Some(ChatCompletionMessageRole::Assistant),
                    ..Default::default()
                },
                None,
                None,
            )],
            StreamEvent::Reasoning { id, model, delta } => vec![self.chunk(
                id,
                model,
                ChatCompletionStreamResponseDelta {
                    reasoning_content: Some(delta.clone()),
                    ..Default::default()
                },
                None,
                None,
            )],
            StreamEvent::Content { id, model, delta } => vec![self.chunk(
                id,
                model,
                ChatCompletionStreamResponseDelta {
                    content: Some(delta.clone()),
                    ..Default::default()
                },
                None,
                None,
            )],
            StreamEvent::ToolCall { id, model, call } => vec![self.chunk(
                id,
                model,
                ChatCompletionStreamResponseDelta {
                    tool_calls: Some(vec![ChatCompletionMessageToolCallChunk {
                        index: call.index,
                        id: call.id.clone(),
                        kind: call.id.as_ref().map(|_| ChatCompletionToolCallType::Function),
                        function: Some(ChatCompletionFunctionCallChunk {
                            name: call.name.clone(),
                            arguments: Some(call.arguments_delta.clone()),
                        }),
                    }]),
                    ..Default::default()
                },
                None,
                None,
            )],
            StreamEvent::End {
                id,
                model,
                finish_reason,
                usage,
            } => vec![self.chunk(
                id,
                model,
                ChatCompletionStreamResponseDelta::default(),
                Some(finish_reason_from_ir(*finish_reason)),
                Some(CompletionUsage {
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                    completion_tokens_details: usage.details.as_ref().map(|details| {
                        CompletionTokensDetails {
                            reasoning_tokens: details.reasoning_tokens,
                        }
                    }),
                    prompt_tokens_details: usage.details.as_ref().map(|details| PromptTokensDetails {
                        cached_tokens: details.cached_tokens,
                    }),
                }),
            )],
            StreamEvent::Error { id, model, error } => vec![self.chunk(
                id,
                model,
                ChatCompletionStreamResponseDelta::default(),
                Some(ChatCompletionFinishReason::Stop),
                None,
            ), SseEvent {
                event: None,
                data: serde_json::to_string(&serde_json::json!({ "error": error.message })).unwrap_or_default(),
            }],
        }
    }

    fn finalize(&mut self) -> Vec<SseEvent> {
        vec![SseEvent {
            event: None,
            data: DONE_EVENT.to_string(),
        }]
    }
}

impl Adapter for OpenAiChatAdapter {
    fn name(&self) -> &'static str {
        "openai-chat"
    }

    fn version(&self) -> &'static str {
        "v1"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STREAMING
            | Capabilities::TOOLS
            | Capabilities::VISION
            | Capabilities::MULTIMODAL
            | Capabilities::SYSTEM_PROMPT
            | Capabilities::TOOL_CHOICE
            | Capabilities::REASONING
            | Capabilities::JSON_MODE
            | Capabilities::LOGPROBS
            | Capabilities::SEED
    }

    fn info(&self) -> AdapterInfo {
        AdapterInfo {
            base_url: "https://api.openai.com/v1",
            chat_path: "/chat/completions",
            models_path: "/models",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_leading_system_messages() {
        let adapter = OpenAiChatAdapter::new();
        let raw = serde_json::json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": "Be terse."},
                {"role": "system", "content": "Never apologize."},
                {"role": "user", "content": "hi"}
            ]
        });
        let ir = adapter.parse_request(raw.to_string().as_bytes()).unwrap();
        assert_eq!(ir.system.as_deref(), Some("Be terse.\nNever apologize."));
        assert_eq!(ir.messages.len(), 1);
    }

    #[test]
    fn round_trips_tool_call_arguments_verbatim() {
        let adapter = OpenAiChatAdapter::new();
        let raw = serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "lookup", "arguments": "{\"q\": \"rust\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let ir = adapter.parse_response(raw.to_string().as_bytes()).unwrap();
        let calls = ir.choices[0].message.tool_calls();
        assert_eq!(calls[0].function.arguments, "{\"q\": \"rust\"}");

        let rebuilt = adapter.build_response(&ir).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&rebuilt).unwrap();
        assert_eq!(
            value["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"],
            "{\"q\": \"rust\"}"
        );
    }

    #[test]
    fn stream_emits_done_sentinel_on_finalize() {
        let adapter = OpenAiChatAdapter::new();
        let mut builder = adapter.create_stream_builder();
        let closing = builder.finalize();
        assert_eq!(closing[0].data, "[DONE]");
    }

    #[test]
    fn parse_stream_event_skips_done_sentinel() {
        let adapter = OpenAiChatAdapter::new();
        let event = SseEvent {
            event: None,
            data: "[DONE]".to_string(),
        };
        assert!(adapter.parse_stream_event(&event).unwrap().is_none());
    }
}
