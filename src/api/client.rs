use reqwest::{Client, Method};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::models::{ApiConfig, GenerateRequest, DEFAULT_MODEL};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// JSON client for the book-generation backend.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn health(&self) -> Result<Value> {
        self.request(Method::GET, "/api/health", None).await
    }

    pub async fn ingest(&self, payload: &Value) -> Result<Value> {
        self.request(Method::POST, "/api/ingest", Some(payload.to_string()))
            .await
    }

    /// Generate text; `model` falls back to the backend default.
    pub async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<Value> {
        let body = GenerateRequest {
            prompt: prompt.to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        };
        let body = serde_json::to_string(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON encode error: {}", e)))?;
        self.request(Method::POST, "/api/generate", Some(body)).await
    }

    /// Responses are decoded as JSON when labelled so, otherwise kept as a
    /// JSON string. Failures carry the body's `error` field when present.
    async fn request(&self, method: Method, path: &str, body: Option<String>) -> Result<Value> {
        let url = self.config.endpoint(path);
        debug!(method = method.as_str(), url = url.as_str(), "API request");

        let mut request = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let text = response.text().await?;
        let body = if is_json {
            serde_json::from_str(&text)
                .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?
        } else {
            Value::String(text)
        };

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "Request failed".to_string());
            return Err(ApiError::ApiError(message));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::Server) -> ApiClient {
        ApiClient::new(ApiConfig {
            base_url: server.url(),
        })
    }

    #[tokio::test]
    async fn test_health_decodes_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let body = client_for(&server).health().await.unwrap();

        assert_eq!(body, json!({ "status": "ok" }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_posts_prompt_and_default_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "prompt": "A book about spice",
                "model": "gpt-4o-mini"
            })))
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("Chapter 1")
            .create_async()
            .await;

        let body = client_for(&server)
            .generate("A book about spice", None)
            .await
            .unwrap();

        assert_eq!(body, Value::String("Chapter 1".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ingest_posts_book() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/ingest")
            .match_body(Matcher::Json(json!({ "title": "Dune", "chapters": [] })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let body = client_for(&server)
            .ingest(&json!({ "title": "Dune", "chapters": [] }))
            .await
            .unwrap();

        assert_eq!(body, json!({ "ok": true }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_field_becomes_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/ingest")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"payload too large"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .ingest(&json!({ "text": "..." }))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "payload too large");
    }

    #[tokio::test]
    async fn test_error_without_body_uses_status_reason() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/health")
            .with_status(503)
            .create_async()
            .await;

        let err = client_for(&server).health().await.unwrap_err();

        assert_eq!(err.to_string(), "Service Unavailable");
    }
}
