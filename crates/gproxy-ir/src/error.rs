use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authentication,
    Permission,
    NotFound,
    RateLimit,
    Api,
    Server,
    Unknown,
}

impl ErrorKind {
    /// Maps an error kind to the HTTP status the local front-end returns for it.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Authentication => 401,
            ErrorKind::Permission => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::RateLimit => 429,
            ErrorKind::Api => 502,
            ErrorKind::Server => 500,
            ErrorKind::Unknown => 500,
        }
    }

    /// Maps an upstream HTTP status to the IR error kind it represents.
    pub fn from_upstream_status(status: u16) -> ErrorKind {
        match status {
            400 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Permission,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimit,
            500..=599 => ErrorKind::Api,
            _ => ErrorKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorIr {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_code: Option<String>,
    /// The raw vendor error payload, kept for logging; never re-derived from IR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<JsonValue>,
}

impl ErrorIr {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            vendor_code: None,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: JsonValue) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn with_vendor_code(mut self, code: impl Into<String>) -> Self {
        self.vendor_code = Some(code.into());
        self
    }
}
