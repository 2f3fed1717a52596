use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorTypeKnown {
    /// 400
    #[serde(rename = "invalid_request_error")]
    InvalidRequestError,
    /// 401
    #[serde(rename = "authentication_error")]
    AuthenticationError,
    /// 403
    #[serde(rename = "permission_error")]
    PermissionError,
    /// 404
    #[serde(rename = "not_found_error")]
    NotFoundError,
    /// 429
    #[serde(rename = "rate_limit_error")]
    RateLimitError,
    /// 500
    #[serde(rename = "api_error")]
    ApiError,
    /// 503
    #[serde(rename = "overloaded_error")]
    OverloadedError,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorType {
    Known(ErrorTypeKnown),
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub r#type: ErrorType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}
