pub use crate::gemini::generate_content::types::*;
pub use crate::gemini::generate_content::{
    GenerateContentPath, GenerateContentRequest, GenerateContentRequestBody,
    GenerateContentResponse,
};
pub use crate::gemini::stream_content::{
    StreamGenerateContentRequest, StreamGenerateContentResponse,
};
pub use crate::gemini::error::{ErrorDetail, ErrorResponse, Status, StatusKnown};
