use crate::gemini::generate_content::{GenerateContentPath, GenerateContentRequestBody, GenerateContentResponse};

#[derive(Debug, Clone)]
pub struct StreamGenerateContentRequest {
    pub path: GenerateContentPath,
    pub body: GenerateContentRequestBody,
    /// Raw downstream query string for stream shape hints (e.g. `alt=sse`).
    pub query: Option<String>,
}

/// Each streamed chunk has the same shape as the non-streaming response;
/// Gemini's wire format has no distinct per-chunk event type.
pub type StreamGenerateContentResponse = GenerateContentResponse;
