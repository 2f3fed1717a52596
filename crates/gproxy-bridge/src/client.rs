use std::time::Duration;

use wreq::header::{HeaderMap, HeaderValue};
use wreq::{Client, Response};

use crate::error::{BridgeError, BridgeResult};

/// Resolved upstream target: a base URL plus the path to call and the decrypted credential to
/// authenticate with, in the vendor's own scheme.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    pub base_url: String,
    pub chat_path: String,
    pub adapter_type: String,
    pub api_key: String,
}

impl UpstreamTarget {
    /// The full URL a non-streaming or streaming chat call is sent to. Gemini folds its API key
    /// into the query string rather than a header.
    pub fn request_url(&self, model: &str) -> String {
        let path = self.chat_path.replace("{model}", model);
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        if self.adapter_type == "gemini" {
            format!("{url}?key={}", self.api_key)
        } else {
            url
        }
    }

    pub fn auth_headers(&self) -> BridgeResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        match self.adapter_type.as_str() {
            "anthropic" => {
                headers.insert(
                    "x-api-key",
                    HeaderValue::from_str(&self.api_key)
                        .map_err(|_| BridgeError::Other("invalid api key header".into()))?,
                );
                headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
            }
            "gemini" => {}
            _ => {
                let value = format!("Bearer {}", self.api_key);
                headers.insert(
                    "authorization",
                    HeaderValue::from_str(&value)
                        .map_err(|_| BridgeError::Other("invalid api key header".into()))?,
                );
            }
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Thin wrapper around the shared `wreq::Client` used for every upstream call.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new() -> BridgeResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(BridgeError::Http)?;
        Ok(Self { client })
    }

    pub async fn send(&self, target: &UpstreamTarget, model: &str, body: Vec<u8>) -> BridgeResult<Response> {
        let url = target.request_url(model);
        let headers = target.auth_headers()?;
        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_url_carries_key_in_query() {
        let target = UpstreamTarget {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            chat_path: "/models/{model}:generateContent".to_string(),
            adapter_type: "gemini".to_string(),
            api_key: "secret".to_string(),
        };
        assert_eq!(
            target.request_url("gemini-1.5-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent?key=secret"
        );
    }

    #[test]
    fn anthropic_headers_carry_version_and_api_key() {
        let target = UpstreamTarget {
            base_url: "https://api.anthropic.com".to_string(),
            chat_path: "/v1/messages".to_string(),
            adapter_type: "anthropic".to_string(),
            api_key: "sk-ant".to_string(),
        };
        let headers = target.auth_headers().unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "sk-ant");
        assert_eq!(headers.get("anthropic-version").unwrap(), "2023-06-01");
    }

    #[test]
    fn openai_headers_carry_bearer_token() {
        let target = UpstreamTarget {
            base_url: "https://api.openai.com/v1".to_string(),
            chat_path: "/chat/completions".to_string(),
            adapter_type: "openai-chat".to_string(),
            api_key: "sk-openai".to_string(),
        };
        let headers = target.auth_headers().unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-openai");
    }
}
