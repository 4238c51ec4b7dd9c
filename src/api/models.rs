use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Body of POST /api/generate
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: String,
}

/// Readable text of a generate response: a bare string, a `text` field, or
/// the pretty-printed JSON otherwise.
pub fn response_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| serde_json::to_string_pretty(other).unwrap_or_default()),
    }
}

/// Server-rendered export formats and their endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerExport {
    Pdf,
    Docx,
    Epub,
}

impl ServerExport {
    pub fn path(&self) -> &'static str {
        match self {
            ServerExport::Pdf => "/api/export-pdf",
            ServerExport::Docx => "/api/export-docx",
            ServerExport::Epub => "/api/export-epub",
        }
    }
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
