//! Gemini generateContent / streamGenerateContent dialect.
//!
//! Gemini's streaming wire format is bare `data: <json>\n\n` frames of the same shape as
//! the non-streaming response; there is no `[DONE]` sentinel and no distinct chunk type.

use std::collections::HashMap;

use gproxy_ir::{
    self as ir, AssistantMessage, Choice, ContentPart, ErrorIr, ErrorKind, FinishReason,
    GenerationConfig as IrGenerationConfig, ImageSource, Message, MessageContent, RequestIr,
    ResponseIr, Role, StreamEvent, Tool, ToolCall, ToolCallFunction, ToolCallKind, ToolChoice,
    ToolFunctionDef, Usage, UsageDetails,
};
use gproxy_protocol::gemini::error::{ErrorDetail as GeminiErrorDetail, ErrorResponse, Status, StatusKnown};
use gproxy_protocol::gemini::generate_content::{
    Blob, Candidate, Content, ContentRole, FinishReason as GeminiFinishReason, FunctionCall,
    FunctionCallingConfig, FunctionCallingMode, FunctionDeclaration, FunctionResponse,
    GenerateContentRequestBody, GenerateContentResponse, GenerationConfig, Part, Schema,
    Tool as GeminiTool, ToolConfig, Type as SchemaType, UsageMetadata,
};
use gproxy_protocol::sse::SseEvent;
use time::OffsetDateTime;

use crate::{
    Adapter, AdapterInfo, AdapterResult, Capabilities, InboundAdapter, OutboundAdapter,
    StreamEventBuilder,
};

pub struct GeminiAdapter;

impl GeminiAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn role_to_ir(role: Option<ContentRole>) -> Role {
    match role {
        Some(ContentRole::Model) => Role::Assistant,
        _ => Role::User,
    }
}

fn role_from_ir(role: Role) -> Option<ContentRole> {
    match role {
        Role::Assistant => Some(ContentRole::Model),
        Role::System => None,
        _ => Some(ContentRole::User),
    }
}

/// Gemini's JSON Schema subset drops `additionalProperties`/`$ref`/union types; best-effort
/// mapping, falling back to `Object` for anything not directly representable.
fn json_schema_to_gemini(value: &serde_json::Value) -> Schema {
    let obj = value.as_object();
    let type_str = obj.and_then(|o| o.get("type")).and_then(|t| t.as_str());
    let r#type = match type_str {
        Some("string") => SchemaType::String,
        Some("number") => SchemaType::Number,
        Some("integer") => SchemaType::Integer,
        Some("boolean") => SchemaType::Boolean,
        Some("array") => SchemaType::Array,
        Some("null") => SchemaType::Null,
        _ => SchemaType::Object,
    };

    let properties = obj
        .and_then(|o| o.get("properties"))
        .and_then(|p| p.as_object())
        .map(|props| {
            props
                .iter()
                .map(|(key, value)| (key.clone(), json_schema_to_gemini(value)))
                .collect()
        });

    let items = obj
        .and_then(|o| o.get("items"))
        .map(|items| Box::new(json_schema_to_gemini(items)));

    let required = obj
        .and_then(|o| o.get("required"))
        .and_then(|r| r.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        });

    let enum_values = obj
        .and_then(|o| o.get("enum"))
        .and_then(|e| e.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        });

    Schema {
        r#type,
        format: obj
            .and_then(|o| o.get("format"))
            .and_then(|f| f.as_str())
            .map(String::from),
        description: obj
            .and_then(|o| o.get("description"))
            .and_then(|d| d.as_str())
            .map(String::from),
        nullable: None,
        enum_values,
        properties,
        required,
        items,
    }
}

fn finish_reason_to_ir(reason: Option<GeminiFinishReason>) -> FinishReason {
    match reason {
        Some(GeminiFinishReason::MaxTokens) => FinishReason::Length,
        Some(GeminiFinishReason::Safety) | Some(GeminiFinishReason::Recitation) => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Stop,
    }
}

fn finish_reason_from_ir(reason: FinishReason) -> GeminiFinishReason {
    match reason {
        FinishReason::Stop => GeminiFinishReason::Stop,
        FinishReason::Length => GeminiFinishReason::MaxTokens,
        FinishReason::ToolCalls => GeminiFinishReason::Stop,
        FinishReason::ContentFilter => GeminiFinishReason::Safety,
    }
}

fn content_to_ir(content: Content) -> Message {
    let role = role_to_ir(content.role);
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut tool_call_id = None;
    let mut tool_result_text = None;

    for part in content.parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            tool_calls.push(ToolCall {
                id: call.id.unwrap_or_else(|| call.name.clone()),
                kind: ToolCallKind::Function,
                function: ToolCallFunction {
                    name: call.name,
                    arguments: call.args.unwrap_or(serde_json::Value::Null).to_string(),
                },
            });
        }
        if let Some(response) = part.function_response {
            tool_call_id = Some(response.id.unwrap_or(response.name));
            tool_result_text = Some(response.response.to_string());
        }
    }

    if let (Some(id), Some(text)) = (tool_call_id, tool_result_text) {
        return Message {
            role: Role::Tool,
            content: MessageContent::Text(text),
            tool_calls: None,
            tool_call_id: Some(id),
        };
    }

    Message {
        role,
        content: MessageContent::Text(text),
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        tool_call_id: None,
    }
}

fn message_from_ir(message: &Message) -> Content {
    if message.role == Role::Tool {
        return Content {
            role: Some(ContentRole::User),
            parts: vec![Part {
                text: None,
                inline_data: None,
                function_call: None,
                function_response: Some(FunctionResponse {
                    id: message.tool_call_id.clone(),
                    name: message.tool_call_id.clone().unwrap_or_default(),
                    response: serde_json::json!({ "result": message.content.as_text() }),
                }),
                thought: None,
                thought_signature: None,
            }],
        };
    }

    let mut parts = Vec::new();
    match &message.content {
        MessageContent::Text(text) if !text.is_empty() => parts.push(Part {
            text: Some(text.clone()),
            inline_data: None,
            function_call: None,
            function_response: None,
            thought: None,
            thought_signature: None,
        }),
        MessageContent::Text(_) => {}
        MessageContent::Parts(content_parts) => {
            for part in content_parts {
                match part {
                    ContentPart::Text { text } => parts.push(Part {
                        text: Some(text.clone()),
                        inline_data: None,
                        function_call: None,
                        function_response: None,
                        thought: None,
                        thought_signature: None,
                    }),
                    ContentPart::Image { source } => {
                        let (mime_type, data) = match source {
                            ImageSource::Base64 { media_type, data } => {
                                (media_type.clone(), data.clone())
                            }
                            ImageSource::Url { url } => (String::from("application/octet-stream"), url.clone()),
                        };
                        parts.push(Part {
                            text: None,
                            inline_data: Some(Blob { mime_type, data }),
                            function_call: None,
                            function_response: None,
                            thought: None,
                            thought_signature: None,
                        });
                    }
                    ContentPart::FileReference { file_id } => parts.push(Part {
                        text: Some(format!("[file:{file_id}]")),
                        inline_data: None,
                        function_call: None,
                        function_response: None,
                        thought: None,
                        thought_signature: None,
                    }),
                }
            }
        }
    }

    for call in message.tool_calls.iter().flatten() {
        parts.push(Part {
            text: None,
            inline_data: None,
            function_call: Some(FunctionCall {
                id: Some(call.id.clone()),
                name: call.function.name.clone(),
                args: serde_json::from_str(&call.function.arguments).ok(),
            }),
            function_response: None,
            thought: None,
            thought_signature: None,
        });
    }

    Content {
        parts,
        role: role_from_ir(message.role),
    }
}

impl InboundAdapter for GeminiAdapter {
    fn parse_request(&self, raw: &[u8]) -> AdapterResult<RequestIr> {
        let body: GenerateContentRequestBody = serde_json::from_slice(raw)?;

        let system = body.system_instruction.map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        });

        let messages = body.contents.into_iter().map(content_to_ir).collect();

        let tools = body.tools.map(|tools| {
            tools
                .into_iter()
                .flat_map(|tool| tool.function_declarations.unwrap_or_default())
                .map(|declaration| Tool {
                    kind: ToolCallKind::Function,
                    function: ToolFunctionDef {
                        name: declaration.name,
                        description: Some(declaration.description),
                        parameters: declaration.parameters.map(|schema| {
                            serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
                        }),
                    },
                })
                .collect()
        });

        let tool_choice = body
            .tool_config
            .and_then(|config| config.function_calling_config)
            .and_then(|config| config.mode)
            .map(|mode| match mode {
                FunctionCallingMode::Auto => ToolChoice::Auto,
                FunctionCallingMode::None => ToolChoice::None,
                FunctionCallingMode::Any => ToolChoice::Required,
                FunctionCallingMode::ModeUnspecified => ToolChoice::Auto,
            });

        let generation = body.generation_config.unwrap_or(GenerationConfig {
            stop_sequences: None,
            candidate_count: None,
            max_output_tokens: None,
            temperature: None,
            top_p: None,
            top_k: None,
            thinking_config: None,
        });

        let mut extensions = HashMap::new();
        if let Some(cached) = body.cached_content {
            extensions.insert(
                "gemini".to_string(),
                serde_json::json!({ "cached_content": cached }),
            );
        }

        Ok(RequestIr {
            model: body.model.unwrap_or_default(),
            messages,
            system,
            tools,
            tool_choice,
            stream: false,
            generation: IrGenerationConfig {
                temperature: generation.temperature,
                top_p: generation.top_p,
                max_tokens: generation.max_output_tokens.map(|tokens| tokens as i64),
                stop: generation.stop_sequences.unwrap_or_default(),
                presence_penalty: None,
                frequency_penalty: None,
                n: generation.candidate_count.map(|count| count as i64),
                seed: None,
                response_format: None,
                logprobs: None,
                top_logprobs: None,
            },
            metadata: HashMap::new(),
            extensions,
        })
    }

    fn parse_response(&self, raw: &[u8]) -> AdapterResult<ResponseIr> {
        let response: GenerateContentResponse = serde_json::from_slice(raw)?;

        let choices = response
            .candidates
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| candidate_to_choice(i as i64, candidate))
            .collect();

        let usage = response
            .usage_metadata
            .map(|usage| Usage {
                prompt_tokens: usage.prompt_token_count.unwrap_or_default() as i64,
                completion_tokens: usage.candidates_token_count.unwrap_or_default() as i64,
                total_tokens: usage.total_token_count.unwrap_or_default() as i64,
                details: Some(UsageDetails {
                    reasoning_tokens: usage.thoughts_token_count.map(|tokens| tokens as i64),
                    cached_tokens: None,
                }),
            })
            .unwrap_or_default();

        Ok(ResponseIr {
            id: response.response_id.unwrap_or_default(),
            model: response.model_version.unwrap_or_default(),
            created_at: OffsetDateTime::now_utc(),
            choices,
            usage,
            system_fingerprint: None,
        })
    }

    fn parse_stream_event(&self, event: &SseEvent) -> AdapterResult<Option<Vec<StreamEvent>>> {
        if event.data.trim().is_empty() {
            return Ok(None);
        }
        let chunk: GenerateContentResponse = serde_json::from_str(&event.data)?;

        let mut events = Vec::new();
        for candidate in chunk.candidates {
            for part in &candidate.content.parts {
                if let Some(text) = &part.text {
                    if part.thought == Some(true) {
                        events.push(StreamEvent::Reasoning {
                            id: String::new(),
                            model: String::new(),
                            delta: text.clone(),
                        });
                    } else {
                        events.push(StreamEvent::Content {
                            id: String::new(),
                            model: String::new(),
                            delta: text.clone(),
                        });
                    }
                }
                if let Some(call) = &part.function_call {
                    events.push(StreamEvent::ToolCall {
                        id: String::new(),
                        model: String::new(),
                        call: ir::ToolCallDelta {
                            index: 0,
                            id: call.id.clone(),
                            name: Some(call.name.clone()),
                            arguments_delta: call
                                .args
                                .clone()
                                .unwrap_or(serde_json::Value::Null)
                                .to_string(),
                        },
                    });
                }
            }
            if candidate.finish_reason.is_some() {
                events.push(StreamEvent::End {
                    id: String::new(),
                    model: String::new(),
                    finish_reason: finish_reason_to_ir(candidate.finish_reason),
                    usage: chunk
                        .usage_metadata
                        .as_ref()
                        .map(|usage| Usage {
                            prompt_tokens: usage.prompt_token_count.unwrap_or_default() as i64,
                            completion_tokens: usage.candidates_token_count.unwrap_or_default()
                                as i64,
                            total_tokens: usage.total_token_count.unwrap_or_default() as i64,
                            details: None,
                        })
                        .unwrap_or_default(),
                });
            }
        }

        Ok(Some(events))
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

fn candidate_to_choice(index: i64, candidate: Candidate) -> Choice {
    let finish_reason = finish_reason_to_ir(candidate.finish_reason);
    let message = content_to_ir(candidate.content);
    Choice {
        index,
        message: AssistantMessage {
            inner: Message {
                role: Role::Assistant,
                ..message
            },
            reasoning_content: None,
        },
        finish_reason,
        logprobs: None,
    }
}

impl OutboundAdapter for GeminiAdapter {
    fn build_request(&self, ir: &RequestIr) -> AdapterResult<Vec<u8>> {
        let contents = ir.messages.iter().map(message_from_ir).collect();

        let system_instruction = ir.system.as_ref().map(|text| Content {
            parts: vec![Part {
                text: Some(text.clone()),
                inline_data: None,
                function_call: None,
                function_response: None,
                thought: None,
                thought_signature: None,
            }],
            role: None,
        });

        let tools = ir.tools.as_ref().map(|tools| {
            vec![GeminiTool {
                function_declarations: Some(
                    tools
                        .iter()
                        .map(|tool| FunctionDeclaration {
                            name: tool.function.name.clone(),
                            description: tool.function.description.clone().unwrap_or_default(),
                            parameters: tool
                                .function
                                .parameters
                                .as_ref()
                                .map(json_schema_to_gemini),
                        })
                        .collect(),
                ),
            }]
        });

        let tool_config = ir.tool_choice.as_ref().map(|choice| ToolConfig {
            function_calling_config: Some(FunctionCallingConfig {
                mode: Some(match choice {
                    ToolChoice::Auto => FunctionCallingMode::Auto,
                    ToolChoice::None => FunctionCallingMode::None,
                    ToolChoice::Required | ToolChoice::Function { .. } => FunctionCallingMode::Any,
                }),
                allowed_function_names: match choice {
                    ToolChoice::Function { name } => Some(vec![name.clone()]),
                    _ => None,
                },
            }),
        });

        let body = GenerateContentRequestBody {
            contents,
            model: Some(ir.model.clone()),
            tools,
            tool_config,
            system_instruction,
            generation_config: Some(GenerationConfig {
                stop_sequences: if ir.generation.stop.is_empty() {
                    None
                } else {
                    Some(ir.generation.stop.clone())
                },
                candidate_count: ir.generation.n.map(|n| n as u32),
                max_output_tokens: ir.generation.max_tokens.map(|tokens| tokens as u32),
                temperature: ir.generation.temperature,
                top_p: ir.generation.top_p,
                top_k: None,
                thinking_config: None,
            }),
            cached_content: None,
        };

        Ok(serde_json::to_vec(&body)?)
    }

    fn build_response(&self, ir: &ResponseIr) -> AdapterResult<Vec<u8>> {
        let candidates = ir
            .choices
            .iter()
            .map(|choice| Candidate {
                content: message_from_ir(&choice.message.inner),
                finish_reason: Some(finish_reason_from_ir(choice.finish_reason)),
                index: Some(choice.index as u32),
            })
            .collect();

        let response = GenerateContentResponse {
            candidates,
            prompt_feedback: None,
            usage_metadata: Some(UsageMetadata {
                prompt_token_count: Some(ir.usage.prompt_tokens as u32),
                candidates_token_count: Some(ir.usage.completion_tokens as u32),
                thoughts_token_count: ir
                    .usage
                    .details
                    .as_ref()
                    .and_then(|d| d.reasoning_tokens)
                    .map(|tokens| tokens as u32),
                total_token_count: Some(ir.usage.total_tokens as u32),
            }),
            model_version: Some(ir.model.clone()),
            response_id: Some(ir.id.clone()),
        };

        Ok(serde_json::to_vec(&response)?)
    }

    fn build_error(&self, error: &ErrorIr) -> Vec<u8> {
        let response = ErrorResponse {
            error: GeminiErrorDetail {
                code: error.kind.http_status() as i32,
                message: error.message.clone(),
                status: Some(Status::Known(status_from_kind(error.kind))),
            },
        };
        serde_json::to_vec(&response).unwrap_or_default()
    }

    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder> {
        Box::new(GeminiStreamBuilder::default())
    }
}

fn status_from_kind(kind: ErrorKind) -> StatusKnown {
    match kind {
        ErrorKind::Validation => StatusKnown::InvalidArgument,
        ErrorKind::Authentication => StatusKnown::Unauthenticated,
        ErrorKind::Permission => StatusKnown::PermissionDenied,
        ErrorKind::NotFound => StatusKnown::NotFound,
        ErrorKind::RateLimit => StatusKnown::ResourceExhausted,
        ErrorKind::Api => StatusKnown::Unavailable,
        ErrorKind::Server | ErrorKind::Unknown => StatusKnown::Internal,
    }
}

#[derive(Default)]
struct GeminiStreamBuilder {
    model: String,
}

impl StreamEventBuilder for GeminiStreamBuilder {
    fn process(&mut self, event: &StreamEvent) -> Vec<SseEvent> {
        if self.model.is_empty() {
            self.model = event.id().to_string();
        }

        let (part, finish_reason, usage_metadata) = match event {
            StreamEvent::Start { .. } => return Vec::new(),
            StreamEvent::Content { delta, .. } => (
                Part {
                    text: Some(delta.clone()),
                    inline_data: None,
                    function_call: None,
                    function_response: None,
                    thought: None,
                    thought_signature: None,
                },
                None,
                None,
            ),
            StreamEvent::Reasoning { delta, .. } => (
                Part {
                    text: Some(delta.clone()),
                    inline_data: None,
                    function_call: None,
                    function_response: None,
                    thought: Some(true),
                    thought_signature: None,
                },
                None,
                None,
            ),
            StreamEvent::ToolCall { call, .. } => (
                Part {
                    text: None,
                    inline_data: None,
                    function_call: Some(FunctionCall {
                        id: call.id.clone(),
                        name: call.name.clone().unwrap_or_default(),
                        args: serde_json::from_str(&call.arguments_delta).ok(),
                    }),
                    function_response: None,
                    thought: None,
                    thought_signature: None,
                },
                None,
                None,
            ),
            StreamEvent::End {
                finish_reason,
                usage,
                ..
            } => (
                Part {
                    text: Some(String::new()),
                    inline_data: None,
                    function_call: None,
                    function_response: None,
                    thought: None,
                    thought_signature: None,
                },
                Some(finish_reason_from_ir(*finish_reason)),
                Some(UsageMetadata {
                    prompt_token_count: Some(usage.prompt_tokens as u32),
                    candidates_token_count: Some(usage.completion_tokens as u32),
                    thoughts_token_count: usage
                        .details
                        .as_ref()
                        .and_then(|d| d.reasoning_tokens)
                        .map(|tokens| tokens as u32),
                    total_token_count: Some(usage.total_tokens as u32),
                }),
            ),
            StreamEvent::Error { .. } => return Vec::new(),
        };

        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![part],
                    role: Some(ContentRole::Model),
                },
                finish_reason,
                index: Some(0),
            }],
            prompt_feedback: None,
            usage_metadata,
            model_version: None,
            response_id: None,
        };

        vec![SseEvent {
            event: None,
            data: serde_json::to_string(&response).unwrap_or_default(),
        }]
    }

    fn finalize(&mut self) -> Vec<SseEvent> {
        Vec::new()
    }
}

impl Adapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn version(&self) -> &'static str {
        "v1beta"
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
            base_url: "https://generativelanguage.googleapis.com/v1beta",
            chat_path: "/models/{model}:generateContent",
            models_path: "/models",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_function_response_to_tool_role_message() {
        let adapter = GeminiAdapter::new();
        let raw = serde_json::json!({
            "contents": [
                {"role": "user", "parts": [{"text": "weather?"}]},
                {"role": "model", "parts": [{"functionCall": {"name": "weather", "args": {"city": "sf"}}}]},
                {"role": "user", "parts": [{"functionResponse": {"name": "weather", "response": {"temp": 70}}}]}
            ]
        });
        let ir = adapter.parse_request(raw.to_string().as_bytes()).unwrap();
        let tool_message = ir.messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("weather"));
    }

    #[test]
    fn finalize_emits_no_terminal_sentinel() {
        let adapter = GeminiAdapter::new();
        let mut builder = adapter.create_stream_builder();
        assert!(builder.finalize().is_empty());
    }
}
