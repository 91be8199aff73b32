//! Shared HTTP plumbing for the OpenAI-compatible REST API.

use crate::config::OpenAiConfig;
use crate::services::ServiceError;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::error;

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Authenticated handle on the remote API.
///
/// Cloning is cheap: `reqwest::Client` keeps its connection pool behind an `Arc`,
/// so all three service adapters reuse the same TLS connections.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST builder with bearer authentication already attached.
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
    }

    /// Send a request and turn any non-success status into [`ServiceError::Api`].
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = api_error_message(&body);
        error!(status = status.as_u16(), message = %message, "OpenAI API error");

        Err(ServiceError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull the human-readable message out of an error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let mut config = AppConfig::default().openai;
        config.base_url = "http://localhost:9000/v1/".to_string();
        let client = OpenAiClient::new(&config).unwrap();

        assert_eq!(
            client.endpoint("/chat/completions"),
            "http://localhost:9000/v1/chat/completions"
        );
        assert_eq!(client.endpoint("audio/speech"), "http://localhost:9000/v1/audio/speech");
    }

    #[test]
    fn test_api_error_message_extracts_detail() {
        let body = r#"{"error": {"message": "Invalid API key", "type": "invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "Invalid API key");
    }

    #[test]
    fn test_api_error_message_falls_back_to_raw_body() {
        assert_eq!(api_error_message("upstream timed out"), "upstream timed out");
    }

    #[test]
    fn test_api_error_display() {
        let err = ServiceError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid API key"));
    }
}
