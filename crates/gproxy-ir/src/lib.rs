//! Dialect-agnostic intermediate representation for chat completion traffic.
//!
//! Every adapter parses its wire format into these types and builds its wire format back out of
//! them; no two adapters ever talk to each other directly.

pub mod error;
pub mod request;
pub mod response;
pub mod stream;

pub use error::{ErrorIr, ErrorKind};
pub use request::{
    ContentPart, GenerationConfig, ImageSource, Message, MessageContent, RequestIr, Role, Tool,
    ToolCall, ToolCallFunction, ToolCallKind, ToolChoice, ToolFunctionDef,
};
pub use response::{AssistantMessage, Choice, FinishReason, LogprobDetail, ResponseIr, Usage, UsageDetails};
pub use stream::{StreamEvent, ToolCallDelta};
