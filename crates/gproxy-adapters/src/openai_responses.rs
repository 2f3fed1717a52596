//! OpenAI Responses API dialect.
//!
//! The streaming builder is stateful: it tracks a monotonic `sequence_number` and synthesizes
//! reasoning/message/tool-call output items as the IR stream arrives, mirroring the shape the
//! real Responses API produces (reasoning item first, message item next, one item per tool call).

use std::collections::HashMap;

use gproxy_ir::{
    self as ir, AssistantMessage, Choice, ErrorIr, ErrorKind, FinishReason, GenerationConfig,
    Message, MessageContent, RequestIr, ResponseIr, Role, StreamEvent, Tool, ToolCall,
    ToolCallFunction, ToolCallKind, ToolChoice, ToolFunctionDef, Usage, UsageDetails,
};
use gproxy_protocol::openai::create_response::{
    CreateResponseRequestBody, InputParam, OutputContent, OutputItem, Response,
    ResponseCompletedEvent, ResponseContentPartAddedEvent, ResponseContentPartDoneEvent,
    ResponseErrorEvent, ResponseFunctionCallArgumentsDeltaEvent,
    ResponseFunctionCallArgumentsDoneEvent, ResponseIncompleteEvent, ResponseInputContent,
    ResponseInputMessage, ResponseInputRole, ResponseObject, ResponseOutputItemAddedEvent,
    ResponseOutputItemDoneEvent, ResponseOutputTokensDetails, ResponseInputTokensDetails,
    ResponseReasoningSummaryPartAddedEvent, ResponseReasoningSummaryPartDoneEvent,
    ResponseReasoningSummaryTextDeltaEvent, ResponseReasoningSummaryTextDoneEvent,
    ResponseError, ResponseStatus, ResponseStreamEvent, ResponseUsage, SummaryPart, SummaryPartType,
    ToolChoice as ResponsesToolChoice, ToolChoiceMode, ToolDefinition,
};
use gproxy_protocol::sse::SseEvent;
use time::OffsetDateTime;

use crate::{
    Adapter, AdapterInfo, AdapterResult, Capabilities, InboundAdapter, OutboundAdapter,
    StreamEventBuilder,
};

pub struct OpenAiResponsesAdapter;

impl OpenAiResponsesAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OpenAiResponsesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn input_role_to_ir(role: ResponseInputRole) -> Role {
    match role {
        ResponseInputRole::System => Role::System,
        ResponseInputRole::User => Role::User,
        ResponseInputRole::Assistant => Role::Assistant,
    }
}

fn input_role_from_ir(role: Role) -> ResponseInputRole {
    match role {
        Role::System => ResponseInputRole::System,
        Role::Assistant => ResponseInputRole::Assistant,
        _ => ResponseInputRole::User,
    }
}

impl InboundAdapter for OpenAiResponsesAdapter {
    fn parse_request(&self, raw: &[u8]) -> AdapterResult<RequestIr> {
        let body: CreateResponseRequestBody = serde_json::from_slice(raw)?;

        let mut system_parts = Vec::new();
        if let Some(instructions) = &body.instructions {
            system_parts.push(instructions.clone());
        }

        let mut messages = Vec::new();
        match body.input {
            Some(InputParam::Text(text)) => messages.push(Message {
                role: Role::User,
                content: MessageContent::Text(text),
                tool_calls: None,
                tool_call_id: None,
            }),
            Some(InputParam::Messages(items)) => {
                for item in items {
                    if matches!(item.role, ResponseInputRole::System) {
                        if let ResponseInputContent::Text(text) = &item.content {
                            system_parts.push(text.clone());
                        }
                        continue;
                    }
                    let content = match item.content {
                        ResponseInputContent::Text(text) => MessageContent::Text(text),
                        ResponseInputContent::Parts(parts) => MessageContent::Text(
                            parts
                                .into_iter()
                                .filter_map(|part| match part {
                                    gproxy_protocol::openai::create_response::ResponseInputContentPart::InputText {
                                        text,
                                    } => Some(text),
                                    _ => None,
                                })
                                .collect::<Vec<_>>()
                                .join(""),
                        ),
                    };
                    messages.push(Message {
                        role: input_role_to_ir(item.role),
                        content,
                        tool_calls: None,
                        tool_call_id: None,
                    });
                }
            }
            None => {}
        }

        let tools = body.tools.map(|tools| {
            tools
                .into_iter()
                .map(|tool| match tool {
                    ToolDefinition::Function {
                        name,
                        description,
                        parameters,
                    } => Tool {
                        kind: ToolCallKind::Function,
                        function: ToolFunctionDef {
                            name,
                            description,
                            parameters: Some(parameters),
                        },
                    },
                })
                .collect()
        });

        let tool_choice = body.tool_choice.map(|choice| match choice {
            ResponsesToolChoice::Mode(ToolChoiceMode::Auto) => ToolChoice::Auto,
            ResponsesToolChoice::Mode(ToolChoiceMode::None) => ToolChoice::None,
            ResponsesToolChoice::Mode(ToolChoiceMode::Required) => ToolChoice::Required,
            ResponsesToolChoice::Named { name, .. } => ToolChoice::Function { name },
        });

        let mut extensions = HashMap::new();
        if let Some(truncation) = body.truncation {
            extensions.insert(
                "openai-responses".to_string(),
                serde_json::json!({ "truncation": truncation }),
            );
        }
        if let Some(reasoning) = &body.reasoning {
            if let Some(effort) = &reasoning.effort {
                extensions.insert(
                    "openai-responses-reasoning".to_string(),
                    serde_json::json!({ "effort": effort }),
                );
            }
        }

        let mut metadata = HashMap::new();
        if let Some(user) = body.user {
            metadata.insert("user".to_string(), user);
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
                max_tokens: body.max_output_tokens,
                stop: Vec::new(),
                presence_penalty: None,
                frequency_penalty: None,
                n: None,
                seed: None,
                response_format: None,
                logprobs: None,
                top_logprobs: None,
            },
            metadata,
            extensions,
        })
    }

    fn parse_response(&self, raw: &[u8]) -> AdapterResult<ResponseIr> {
        let response: Response = serde_json::from_slice(raw)?;
        Ok(response_to_ir(response))
    }

    fn parse_stream_event(&self, event: &SseEvent) -> AdapterResult<Option<Vec<StreamEvent>>> {
        if event.data.trim().is_empty() {
            return Ok(None);
        }
        let parsed: ResponseStreamEvent = serde_json::from_str(&event.data)?;

        let events = match parsed {
            ResponseStreamEvent::Created(_) | ResponseStreamEvent::InProgress(_) => Vec::new(),
            ResponseStreamEvent::OutputTextDelta(delta) => vec![StreamEvent::Content {
                id: delta.item_id,
                model: String::new(),
                delta: delta.delta,
            }],
            ResponseStreamEvent::ReasoningSummaryTextDelta(delta) => {
                vec![StreamEvent::Reasoning {
                    id: delta.item_id,
                    model: String::new(),
                    delta: delta.delta,
                }]
            }
            ResponseStreamEvent::FunctionCallArgumentsDelta(delta) => {
                vec![StreamEvent::ToolCall {
                    id: delta.item_id,
                    model: String::new(),
                    call: ir::ToolCallDelta {
                        index: delta.output_index,
                        id: None,
                        name: None,
                        arguments_delta: delta.delta,
                    },
                }]
            }
            ResponseStreamEvent::OutputItemAdded(added) => match added.item {
                OutputItem::FunctionCall {
                    call_id, name, ..
                } => vec![StreamEvent::ToolCall {
                    id: call_id,
                    model: String::new(),
                    call: ir::ToolCallDelta {
                        index: added.output_index,
                        id: None,
                        name: Some(name),
                        arguments_delta: String::new(),
                    },
                }],
                _ => Vec::new(),
            },
            ResponseStreamEvent::Completed(completed) => {
                let ir_response = response_to_ir(completed.response);
                let choice = ir_response.choices.into_iter().next();
                vec![StreamEvent::End {
                    id: ir_response.id,
                    model: ir_response.model,
                    finish_reason: choice
                        .map(|choice| choice.finish_reason)
                        .unwrap_or(FinishReason::Stop),
                    usage: ir_response.usage,
                }]
            }
            ResponseStreamEvent::Incomplete(incomplete) => {
                let ir_response = response_to_ir(incomplete.response);
                vec![StreamEvent::End {
                    id: ir_response.id,
                    model: ir_response.model,
                    finish_reason: FinishReason::Length,
                    usage: ir_response.usage,
                }]
            }
            ResponseStreamEvent::Failed(failed) => {
                let ir_response = response_to_ir(failed.response);
                vec![StreamEvent::Error {
                    id: ir_response.id,
                    model: ir_response.model,
                    error: ErrorIr::new(ErrorKind::Api, "response failed".to_string()),
                }]
            }
            ResponseStreamEvent::Error(error) => vec![StreamEvent::Error {
                id: String::new(),
                model: String::new(),
                error: ErrorIr::new(ErrorKind::Api, error.message)
                    .with_vendor_code(error.code.unwrap_or_default()),
            }],
            ResponseStreamEvent::OutputItemDone(_)
            | ResponseStreamEvent::ContentPartAdded(_)
            | ResponseStreamEvent::ContentPartDone(_)
            | ResponseStreamEvent::OutputTextDone(_)
            | ResponseStreamEvent::ReasoningSummaryPartAdded(_)
            | ResponseStreamEvent::ReasoningSummaryPartDone(_)
            | ResponseStreamEvent::ReasoningSummaryTextDone(_)
            | ResponseStreamEvent::FunctionCallArgumentsDone(_) => Vec::new(),
        };

        Ok(Some(events))
    }

    fn parse_error(&self, raw: &[u8], status: u16) -> ErrorIr {
        #[derive(serde::Deserialize)]
        struct Envelope {
            error: gproxy_protocol::openai::create_response::ResponseError,
        }
        match serde_json::from_slice::<Envelope>(raw) {
            Ok(envelope) => ErrorIr::new(ErrorKind::from_upstream_status(status), envelope.error.message)
                .with_vendor_code(envelope.error.code),
            Err(_) => ErrorIr::new(
                ErrorKind::from_upstream_status(status),
                String::from_utf8_lossy(raw).to_string(),
            ),
        }
    }
}

fn response_to_ir(response: Response) -> ResponseIr {
    let mut text = String::new();
    let mut reasoning_text = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = match response.status {
        Some(ResponseStatus::Incomplete) => FinishReason::Length,
        Some(ResponseStatus::Failed) => FinishReason::Stop,
        _ => FinishReason::Stop,
    };

    for item in response.output {
        match item {
            OutputItem::Message { content, .. } => {
                for part in content {
                    match part {
                        OutputContent::OutputText { text: t, .. } => text.push_str(&t),
                        OutputContent::Refusal { refusal } => text.push_str(&refusal),
                    }
                }
            }
            OutputItem::Reasoning { summary, .. } => {
                for part in summary {
                    reasoning_text.push_str(&part.text);
                }
            }
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
                ..
            } => {
                tool_calls.push(ToolCall {
                    id: call_id,
                    kind: ToolCallKind::Function,
                    function: ToolCallFunction { name, arguments },
                });
            }
        }
    }

    if !tool_calls.is_empty() {
        finish_reason = FinishReason::ToolCalls;
    }

    let usage = response
        .usage
        .map(|usage| Usage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
            details: Some(UsageDetails {
                reasoning_tokens: usage
                    .output_tokens_details
                    .and_then(|details| details.reasoning_tokens),
                cached_tokens: usage
                    .input_tokens_details
                    .and_then(|details| details.cached_tokens),
            }),
        })
        .unwrap_or_default();

    ResponseIr {
        id: response.id,
        model: response.model,
        created_at: OffsetDateTime::from_unix_timestamp(response.created_at)
            .unwrap_or_else(|_| OffsetDateTime::now_utc()),
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
                reasoning_content: if reasoning_text.is_empty() {
                    None
                } else {
                    Some(reasoning_text)
                },
            },
            finish_reason,
            logprobs: None,
        }],
        usage,
        system_fingerprint: None,
    }
}

impl OutboundAdapter for OpenAiResponsesAdapter {
    fn build_request(&self, ir: &RequestIr) -> AdapterResult<Vec<u8>> {
        let messages = ir
            .messages
            .iter()
            .map(|message| ResponseInputMessage {
                role: input_role_from_ir(message.role),
                content: ResponseInputContent::Text(message.content.as_text()),
            })
            .collect();

        let tools = ir.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|tool| ToolDefinition::Function {
                    name: tool.function.name.clone(),
                    description: tool.function.description.clone(),
                    parameters: tool
                        .function
                        .parameters
                        .clone()
                        .unwrap_or(serde_json::json!({"type": "object", "properties": {}})),
                })
                .collect()
        });

        let tool_choice = ir.tool_choice.as_ref().map(|choice| match choice {
            ToolChoice::Auto => ResponsesToolChoice::Mode(ToolChoiceMode::Auto),
            ToolChoice::None => ResponsesToolChoice::Mode(ToolChoiceMode::None),
            ToolChoice::Required => ResponsesToolChoice::Mode(ToolChoiceMode::Required),
            ToolChoice::Function { name } => ResponsesToolChoice::Named {
                kind: gproxy_protocol::openai::create_response::ResponseFunctionCallType::Function,
                name: name.clone(),
            },
        });

        let body = CreateResponseRequestBody {
            model: ir.model.clone(),
            input: Some(InputParam::Messages(messages)),
            parallel_tool_calls: None,
            store: None,
            instructions: ir.system.clone(),
            stream: Some(ir.stream),
            previous_response_id: None,
            reasoning: None,
            background: None,
            max_output_tokens: ir.generation.max_tokens,
            tools,
            tool_choice,
            truncation: None,
            metadata: None,
            temperature: ir.generation.temperature,
            top_p: ir.generation.top_p,
            user: ir.metadata.get("user").cloned(),
        };

        Ok(serde_json::to_vec(&body)?)
    }

    fn build_response(&self, ir: &ResponseIr) -> AdapterResult<Vec<u8>> {
        let mut output = Vec::new();

        if let Some(reasoning) = &ir.choices.first().and_then(|c| c.message.reasoning_content.clone()) {
            output.push(OutputItem::Reasoning {
                id: format!("rs_{}", ir.id),
                summary: vec![SummaryPart {
                    kind: SummaryPartType::SummaryText,
                    text: reasoning.clone(),
                }],
            });
        }

        if let Some(choice) = ir.choices.first() {
            let text = choice.message.inner.content.as_text();
            output.push(OutputItem::Message {
                id: format!("msg_{}", ir.id),
                role: ResponseInputRole::Assistant,
                status: ResponseStatus::Completed,
                content: vec![OutputContent::OutputText {
                    text,
                    annotations: Vec::new(),
                }],
            });

            for call in choice.message.tool_calls() {
                output.push(OutputItem::FunctionCall {
                    id: format!("fc_{}", call.id),
                    call_id: call.id.clone(),
                    name: call.function.name.clone(),
                    arguments: call.function.arguments.clone(),
                    status: ResponseStatus::Completed,
                });
            }
        }

        let output_text = ir
            .choices
            .first()
            .map(|choice| choice.message.inner.content.as_text());

        let response = Response {
            id: ir.id.clone(),
            object: ResponseObject::Response,
            created_at: ir.created_at.unix_timestamp(),
            status: Some(ResponseStatus::Completed),
            error: None,
            model: ir.model.clone(),
            output,
            output_text,
            usage: Some(ResponseUsage {
                input_tokens: ir.usage.prompt_tokens,
                output_tokens: ir.usage.completion_tokens,
                total_tokens: ir.usage.total_tokens,
                output_tokens_details: ir.usage.details.as_ref().map(|details| {
                    ResponseOutputTokensDetails {
                        reasoning_tokens: details.reasoning_tokens,
                    }
                }),
                input_tokens_details: ir.usage.details.as_ref().map(|details| {
                    ResponseInputTokensDetails {
                        cached_tokens: details.cached_tokens,
                    }
                }),
            }),
            previous_response_id: None,
            reasoning: None,
            truncation: None,
            temperature: None,
            top_p: None,
            store: None,
        };

        Ok(serde_json::to_vec(&response)?)
    }

    fn build_error(&self, error: &ErrorIr) -> Vec<u8> {
        #[derive(serde::Serialize)]
        struct Envelope {
            error: ResponseError,
        }
        let envelope = Envelope {
            error: ResponseError {
                code: error.vendor_code.clone().unwrap_or_else(|| format!("{:?}", error.kind)),
                message: error.message.clone(),
            },
        };
        serde_json::to_vec(&envelope).unwrap_or_default()
    }

    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder> {
        Box::new(ResponsesStreamBuilder::default())
    }
}

#[derive(Default)]
struct ResponsesStreamBuilder {
    sequence: i64,
    response_id: String,
    model: String,
    reasoning_item_index: Option<i64>,
    reasoning_text: String,
    message_item_index: Option<i64>,
    message_text: String,
    next_output_index: i64,
    tool_call_items: HashMap<String, ToolCallItemState>,
    tool_call_order: Vec<String>,
    finish_reason: FinishReason,
    usage: Usage,
    created_at: Option<i64>,
}

#[derive(Default, Clone)]
struct ToolCallItemState {
    output_index: i64,
    name: String,
    arguments: String,
}

impl ResponsesStreamBuilder {
    fn next_sequence(&mut self) -> i64 {
        let seq = self.sequence;
        self.sequence += 1;
        seq
    }

    fn response_id(&self) -> String {
        format!("resp_{}", self.response_id)
    }

    fn ensure_reasoning_item(&mut self, out: &mut Vec<SseEvent>) -> i64 {
        if let Some(index) = self.reasoning_item_index {
            return index;
        }
        let index = self.next_output_index;
        self.next_output_index += 1;
        self.reasoning_item_index = Some(index);

        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::OutputItemAdded(
            ResponseOutputItemAddedEvent {
                output_index: index,
                item: OutputItem::Reasoning {
                    id: format!("rs_{}", self.response_id),
                    summary: Vec::new(),
                },
                sequence_number: seq,
            },
        )));

        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::ReasoningSummaryPartAdded(
            ResponseReasoningSummaryPartAddedEvent {
                item_id: format!("rs_{}", self.response_id),
                output_index: index,
                summary_index: 0,
                part: SummaryPart {
                    kind: SummaryPartType::SummaryText,
                    text: String::new(),
                },
                sequence_number: seq,
            },
        )));

        index
    }

    fn close_reasoning_item(&mut self, index: i64, out: &mut Vec<SseEvent>) {
        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::ReasoningSummaryTextDone(
            ResponseReasoningSummaryTextDoneEvent {
                item_id: format!("rs_{}", self.response_id),
                output_index: index,
                summary_index: 0,
                text: self.reasoning_text.clone(),
                sequence_number: seq,
            },
        )));
        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::ReasoningSummaryPartDone(
            ResponseReasoningSummaryPartDoneEvent {
                item_id: format!("rs_{}", self.response_id),
                output_index: index,
                summary_index: 0,
                part: SummaryPart {
                    kind: SummaryPartType::SummaryText,
                    text: self.reasoning_text.clone(),
                },
                sequence_number: seq,
            },
        )));
        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::OutputItemDone(
            ResponseOutputItemDoneEvent {
                output_index: index,
                item: OutputItem::Reasoning {
                    id: format!("rs_{}", self.response_id),
                    summary: vec![SummaryPart {
                        kind: SummaryPartType::SummaryText,
                        text: self.reasoning_text.clone(),
                    }],
                },
                sequence_number: seq,
            },
        )));
    }

    fn ensure_message_item(&mut self, out: &mut Vec<SseEvent>) -> i64 {
        if let Some(index) = self.message_item_index {
            return index;
        }
        let index = self.next_output_index;
        self.next_output_index += 1;
        self.message_item_index = Some(index);

        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::OutputItemAdded(
            ResponseOutputItemAddedEvent {
                output_index: index,
                item: OutputItem::Message {
                    id: format!("msg_{}", self.response_id),
                    role: ResponseInputRole::Assistant,
                    status: ResponseStatus::InProgress,
                    content: Vec::new(),
                },
                sequence_number: seq,
            },
        )));

        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::ContentPartAdded(
            ResponseContentPartAddedEvent {
                item_id: format!("msg_{}", self.response_id),
                output_index: index,
                content_index: 0,
                part: OutputContent::OutputText {
                    text: String::new(),
                    annotations: Vec::new(),
                },
                sequence_number: seq,
            },
        )));

        index
    }

    fn close_message_item(&mut self, index: i64, out: &mut Vec<SseEvent>) {
        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::OutputTextDone(
            gproxy_protocol::openai::create_response::ResponseTextDoneEvent {
                item_id: format!("msg_{}", self.response_id),
                output_index: index,
                content_index: 0,
                text: self.message_text.clone(),
                sequence_number: seq,
            },
        )));
        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::ContentPartDone(
            ResponseContentPartDoneEvent {
                item_id: format!("msg_{}", self.response_id),
                output_index: index,
                content_index: 0,
                part: OutputContent::OutputText {
                    text: self.message_text.clone(),
                    annotations: Vec::new(),
                },
                sequence_number: seq,
            },
        )));
        let seq = self.next_sequence();
        out.push(event(&ResponseStreamEvent::OutputItemDone(
            ResponseOutputItemDoneEvent {
                output_index: index,
                item: OutputItem::Message {
                    id: format!("msg_{}", self.response_id),
                    role: ResponseInputRole::Assistant,
                    status: ResponseStatus::Completed,
                    content: vec![OutputContent::OutputText {
                        text: self.message_text.clone(),
                        annotations: Vec::new(),
                    }],
                },
                sequence_number: seq,
            },
        )));
    }
}

fn event(value: &impl serde::Serialize) -> SseEvent {
    SseEvent {
        event: None,
        data: serde_json::to_string(value).unwrap_or_default(),
    }
}

impl StreamEventBuilder for ResponsesStreamBuilder {
    fn process(&mut self, evt: &StreamEvent) -> Vec<SseEvent> {
        let mut out = Vec::new();

        match evt {
            StreamEvent::Start { id, model } => {
                self.response_id = id.clone();
                self.model = model.clone();
                self.created_at = Some(OffsetDateTime::now_utc().unix_timestamp());
            }
            StreamEvent::Reasoning { delta, .. } => {
                let index = self.ensure_reasoning_item(&mut out);
                self.reasoning_text.push_str(delta);
                let seq = self.next_sequence();
                out.push(event(&ResponseStreamEvent::ReasoningSummaryTextDelta(
                    ResponseReasoningSummaryTextDeltaEvent {
                        item_id: format!("rs_{}", self.response_id),
                        output_index: index,
                        summary_index: 0,
                        delta: delta.clone(),
                        sequence_number: seq,
                    },
                )));
            }
            StreamEvent::Content { delta, .. } => {
                if let Some(index) = self.reasoning_item_index.take() {
                    self.close_reasoning_item(index, &mut out);
                }
                let index = self.ensure_message_item(&mut out);
                self.message_text.push_str(delta);
                let seq = self.next_sequence();
                out.push(event(&ResponseStreamEvent::OutputTextDelta(
                    gproxy_protocol::openai::create_response::ResponseTextDeltaEvent {
                        item_id: format!("msg_{}", self.response_id),
                        output_index: index,
                        content_index: 0,
                        delta: delta.clone(),
                        sequence_number: seq,
                    },
                )));
            }
            StreamEvent::ToolCall { call, .. } => {
                if let Some(index) = self.reasoning_item_index.take() {
                    self.close_reasoning_item(index, &mut out);
                }
                if let Some(index) = self.message_item_index.take() {
                    self.close_message_item(index, &mut out);
                }

                let call_id = call.id.clone().unwrap_or_else(|| call.index.to_string());
                if !self.tool_call_items.contains_key(&call_id) {
                    let index = self.next_output_index;
                    self.next_output_index += 1;
                    self.tool_call_items.insert(
                        call_id.clone(),
                        ToolCallItemState {
                            output_index: index,
                            name: call.name.clone().unwrap_or_default(),
                            arguments: String::new(),
                        },
                    );
                    self.tool_call_order.push(call_id.clone());

                    let seq = self.next_sequence();
                    out.push(event(&ResponseStreamEvent::OutputItemAdded(
                        ResponseOutputItemAddedEvent {
                            output_index: index,
                            item: OutputItem::FunctionCall {
                                id: format!("fc_{call_id}"),
                                call_id: call_id.clone(),
                                name: call.name.clone().unwrap_or_default(),
                                arguments: String::new(),
                                status: ResponseStatus::InProgress,
                            },
                            sequence_number: seq,
                        },
                    )));
                }

                let state = self.tool_call_items.get_mut(&call_id).unwrap();
                state.arguments.push_str(&call.arguments_delta);
                let output_index = state.output_index;

                let seq = self.next_sequence();
                out.push(event(&ResponseStreamEvent::FunctionCallArgumentsDelta(
                    ResponseFunctionCallArgumentsDeltaEvent {
                        item_id: format!("fc_{call_id}"),
                        output_index,
                        delta: call.arguments_delta.clone(),
                        sequence_number: seq,
                    },
                )));
            }
            StreamEvent::End {
                finish_reason,
                usage,
                ..
            } => {
                self.finish_reason = *finish_reason;
                self.usage = usage.clone();

                if let Some(index) = self.reasoning_item_index.take() {
                    self.close_reasoning_item(index, &mut out);
                }
                if let Some(index) = self.message_item_index.take() {
                    self.close_message_item(index, &mut out);
                }
                for call_id in self.tool_call_order.clone() {
                    let state = self.tool_call_items.get(&call_id).cloned().unwrap_or_default();
                    let seq = self.next_sequence();
                    out.push(event(&ResponseStreamEvent::FunctionCallArgumentsDone(
                        ResponseFunctionCallArgumentsDoneEvent {
                            item_id: format!("fc_{call_id}"),
                            name: state.name.clone(),
                            output_index: state.output_index,
                            arguments: state.arguments.clone(),
                            sequence_number: seq,
                        },
                    )));
                    let seq = self.next_sequence();
                    out.push(event(&ResponseStreamEvent::OutputItemDone(
                        ResponseOutputItemDoneEvent {
                            output_index: state.output_index,
                            item: OutputItem::FunctionCall {
                                id: format!("fc_{call_id}"),
                                call_id: call_id.clone(),
                                name: state.name,
                                arguments: state.arguments,
                                status: ResponseStatus::Completed,
                            },
                            sequence_number: seq,
                        },
                    )));
                }

                out.extend(self.terminal_event());
            }
            StreamEvent::Error { error, .. } => {
                let seq = self.next_sequence();
                out.push(event(&ResponseStreamEvent::Error(ResponseErrorEvent {
                    code: error.vendor_code.clone(),
                    message: error.message.clone(),
                    param: None,
                    sequence_number: seq,
                })));
            }
        }

        out
    }

    fn finalize(&mut self) -> Vec<SseEvent> {
        Vec::new()
    }
}

impl ResponsesStreamBuilder {
    fn terminal_event(&mut self) -> Vec<SseEvent> {
        let output = self.completed_output();
        let response = Response {
            id: self.response_id(),
            object: ResponseObject::Response,
            created_at: self.created_at.unwrap_or(0),
            status: Some(match self.finish_reason {
                FinishReason::Length => ResponseStatus::Incomplete,
                _ => ResponseStatus::Completed,
            }),
            error: None,
            model: self.model.clone(),
            output,
            output_text: Some(self.message_text.clone()),
            usage: Some(ResponseUsage {
                input_tokens: self.usage.prompt_tokens,
                output_tokens: self.usage.completion_tokens,
                total_tokens: self.usage.total_tokens,
                output_tokens_details: self.usage.details.as_ref().map(|details| {
                    ResponseOutputTokensDetails {
                        reasoning_tokens: details.reasoning_tokens,
                    }
                }),
                input_tokens_details: self.usage.details.as_ref().map(|details| {
                    ResponseInputTokensDetails {
                        cached_tokens: details.cached_tokens,
                    }
                }),
            }),
            previous_response_id: None,
            reasoning: None,
            truncation: None,
            temperature: None,
            top_p: None,
            store: None,
        };

        let seq = self.next_sequence();
        let wrapped = match self.finish_reason {
            FinishReason::Length => ResponseStreamEvent::Incomplete(ResponseIncompleteEvent {
                response,
                sequence_number: seq,
            }),
            _ => ResponseStreamEvent::Completed(ResponseCompletedEvent {
                response,
                sequence_number: seq,
            }),
        };

        vec![event(&wrapped)]
    }

    fn completed_output(&self) -> Vec<OutputItem> {
        let mut output = Vec::new();
        if !self.reasoning_text.is_empty() {
            output.push(OutputItem::Reasoning {
                id: format!("rs_{}", self.response_id),
                summary: vec![SummaryPart {
                    kind: SummaryPartType::SummaryText,
                    text: self.reasoning_text.clone(),
                }],
            });
        }
        if self.message_item_index.is_some() {
            output.push(OutputItem::Message {
                id: format!("msg_{}", self.response_id),
                role: ResponseInputRole::Assistant,
                status: ResponseStatus::Completed,
                content: vec![OutputContent::OutputText {
                    text: self.message_text.clone(),
                    annotations: Vec::new(),
                }],
            });
        }
        for call_id in &self.tool_call_order {
            if let Some(state) = self.tool_call_items.get(call_id) {
                output.push(OutputItem::FunctionCall {
                    id: format!("fc_{call_id}"),
                    call_id: call_id.clone(),
                    name: state.name.clone(),
                    arguments: state.arguments.clone(),
                    status: ResponseStatus::Completed,
                });
            }
        }
        output
    }
}

impl Adapter for OpenAiResponsesAdapter {
    fn name(&self) -> &'static str {
        "openai-responses"
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
    }

    fn info(&self) -> AdapterInfo {
        AdapterInfo {
            base_url: "https://api.openai.com/v1",
            chat_path: "/responses",
            models_path: "/models",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_number_increments_once_per_event() {
        let adapter = OpenAiResponsesAdapter::new();
        let mut builder = adapter.create_stream_builder();

        let mut events = Vec::new();
        events.extend(builder.process(&StreamEvent::Start {
            id: "resp_1".to_string(),
            model: "gpt-5".to_string(),
        }));
        events.extend(builder.process(&StreamEvent::Content {
            id: "resp_1".to_string(),
            model: "gpt-5".to_string(),
            delta: "hi".to_string(),
        }));
        events.extend(builder.process(&StreamEvent::End {
            id: "resp_1".to_string(),
            model: "gpt-5".to_string(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        }));

        let mut sequences = Vec::new();
        for evt in &events {
            let value: serde_json::Value = serde_json::from_str(&evt.data).unwrap();
            sequences.push(value["sequence_number"].as_i64().unwrap());
        }
        let mut sorted = sequences.clone();
        sorted.sort();
        assert_eq!(sequences, sorted);
        for pair in sequences.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
    }

    #[test]
    fn exactly_one_terminal_event_per_stream() {
        let adapter = OpenAiResponsesAdapter::new();
        let mut builder = adapter.create_stream_builder();
        builder.process(&StreamEvent::Start {
            id: "resp_1".to_string(),
            model: "gpt-5".to_string(),
        });
        let events = builder.process(&StreamEvent::End {
            id: "resp_1".to_string(),
            model: "gpt-5".to_string(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        });
        let terminal_count = events
            .iter()
            .filter(|evt| evt.data.contains("\"response.completed\""))
            .count();
        assert_eq!(terminal_count, 1);
    }

    #[test]
    fn tool_call_only_stream_has_no_phantom_message_item() {
        let adapter = OpenAiResponsesAdapter::new();
        let mut builder = adapter.create_stream_builder();
        builder.process(&StreamEvent::Start {
            id: "resp_1".to_string(),
            model: "gpt-5".to_string(),
        });
        builder.process(&StreamEvent::ToolCall {
            id: "resp_1".to_string(),
            model: "gpt-5".to_string(),
            call: gproxy_ir::ToolCallDelta {
                index: 0,
                id: Some("call_1".to_string()),
                name: Some("get_weather".to_string()),
                arguments_delta: "{\"city\":\"nyc\"}".to_string(),
            },
        });
        let terminal = builder.process(&StreamEvent::End {
            id: "resp_1".to_string(),
            model: "gpt-5".to_string(),
            finish_reason: FinishReason::ToolCalls,
            usage: Usage::default(),
        });
        let completed = terminal
            .iter()
            .find(|evt| evt.data.contains("\"response.completed\""))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&completed.data).unwrap();
        let output = value["response"]["output"].as_array().unwrap();
        assert!(
            output.iter().all(|item| item["type"] != "message"),
            "no message output item should be synthesized when no content deltas arrived"
        );
        assert!(output.iter().any(|item| item["type"] == "function_call"));
    }
}
