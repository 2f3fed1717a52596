//! Per-dialect inbound/outbound adapters bridging vendor wire formats to the IR.
//!
//! Each adapter is an O(1) mapping to and from [`gproxy_ir`]; the bridge pipeline never
//! translates directly between two vendor dialects.

pub mod anthropic;
pub mod capabilities;
pub mod error;
pub mod gemini;
pub mod openai_chat;
pub mod openai_responses;

use gproxy_ir::{ErrorIr, RequestIr, ResponseIr, StreamEvent};
use gproxy_protocol::sse::SseEvent;

pub use capabilities::Capabilities;
pub use error::{AdapterError, AdapterResult};

/// Default upstream routing hints an adapter's vendor publishes.
#[derive(Debug, Clone, Copy)]
pub struct AdapterInfo {
    pub base_url: &'static str,
    pub chat_path: &'static str,
    pub models_path: &'static str,
}

pub trait InboundAdapter: Send + Sync {
    fn parse_request(&self, raw: &[u8]) -> AdapterResult<RequestIr>;
    fn parse_response(&self, raw: &[u8]) -> AdapterResult<ResponseIr>;
    /// Returns `None` when the SSE event carries no IR-relevant payload (e.g. a `[DONE]` sentinel).
    fn parse_stream_event(&self, event: &SseEvent) -> AdapterResult<Option<Vec<StreamEvent>>>;
    fn parse_error(&self, raw: &[u8], status: u16) -> ErrorIr;
}

pub trait OutboundAdapter: Send + Sync {
    fn build_request(&self, ir: &RequestIr) -> AdapterResult<Vec<u8>>;
    fn build_response(&self, ir: &ResponseIr) -> AdapterResult<Vec<u8>>;
    /// Re-serializes an upstream error (already normalized to the IR by whichever adapter
    /// parsed it) into this dialect's own wire shape, so a tenant always sees an error body
    /// in the dialect it spoke, never the upstream provider's.
    fn build_error(&self, error: &ErrorIr) -> Vec<u8>;
    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder>;
}

/// Per-stream state machine that turns an ordered sequence of IR [`StreamEvent`]s into
/// wire-format SSE frames. One instance is created per client connection.
pub trait StreamEventBuilder: Send {
    fn process(&mut self, event: &StreamEvent) -> Vec<SseEvent>;
    /// Called once the IR stream has ended; emits any closing frames (e.g. `[DONE]`).
    fn finalize(&mut self) -> Vec<SseEvent>;
}

pub trait Adapter: InboundAdapter + OutboundAdapter {
    fn name(&self) -> &'static str;
    fn version(&self) -> &'static str;
    fn capabilities(&self) -> Capabilities;
    fn info(&self) -> AdapterInfo;
}

/// Renders a single JSON value as a data-only SSE frame (no `event:` line).
pub(crate) fn json_sse_event(value: &impl serde::Serialize) -> SseEvent {
    SseEvent {
        event: None,
        data: serde_json::to_string(value).unwrap_or_default(),
    }
}

pub(crate) const DONE_EVENT: &str = "[DONE]";

pub(crate) fn is_done_sentinel(event: &SseEvent) -> bool {
    event.data.trim() == DONE_EVENT
}
