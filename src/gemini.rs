//! Gemini `generateContent` client for the raw model call.

use crate::config::UpsellOptions;
use crate::error::{CallError, Result, UpsellError};
use crate::inference::{InferenceClient, InferenceRequest};
use async_trait::async_trait;
use reqwest::{header::{HeaderMap, HeaderValue, CONTENT_TYPE}, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

/// HTTP client bound to one model and API key.
pub struct GeminiClient {
    client: Client,
    url: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(opts: &UpsellOptions) -> Result<Self> {
        let key = opts
            .api_key
            .as_deref()
            .ok_or_else(|| UpsellError::Config("no API key: set UPSELL_API_KEY, GEMINI_API_KEY or API_KEY".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key_header = HeaderValue::from_str(key)
            .map_err(|e| UpsellError::Config(format!("API key is not a valid header value: {e}")))?;
        key_header.set_sensitive(true);
        headers.insert("x-goog-api-key", key_header);

        let client = Client::builder()
            .timeout(opts.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| UpsellError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/v1beta/models/{}:generateContent", opts.endpoint, opts.model),
            temperature: opts.temperature,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn request_body(request: &InferenceRequest, temperature: f32) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.schema,
            "temperature": temperature,
        },
    })
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenated text parts of the first candidate.
fn response_text(body: &str) -> std::result::Result<String, CallError> {
    let resp: GenerateResponse =
        serde_json::from_str(body).map_err(|e| CallError::Batch(format!("undecodable response: {e}")))?;
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(CallError::Batch("response has no text candidate".into()));
    }
    Ok(text)
}

/// Statuses that will not change from one batch to the next.
fn is_structural_status(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND)
}

fn classify_send_error(e: reqwest::Error) -> CallError {
    if e.is_connect() || e.is_builder() {
        CallError::Transport(e.to_string())
    } else {
        CallError::Batch(e.to_string())
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn generate(&self, request: &InferenceRequest) -> std::result::Result<String, CallError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&request_body(request, self.temperature))
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| CallError::Batch(format!("reading body: {e}")))?;
        if !status.is_success() {
            let snippet: String = body.chars().take(300).collect();
            let msg = format!("HTTP {status}: {snippet}");
            return Err(if is_structural_status(status) { CallError::Transport(msg) } else { CallError::Batch(msg) });
        }
        response_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_schema_and_temperature() {
        let req = InferenceRequest { prompt: "hi".into(), schema: json!({"type": "ARRAY"}) };
        let body = request_body(&req, 0.5);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn text_parts_are_joined() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"[{\"a\""},{"text":":1}]"}]}}]}"#;
        assert_eq!(response_text(body).unwrap(), r#"[{"a":1}]"#);
    }

    #[test]
    fn empty_candidates_fail_the_batch_only() {
        assert!(matches!(response_text(r#"{"candidates":[]}"#), Err(CallError::Batch(_))));
        assert!(matches!(response_text("<html>"), Err(CallError::Batch(_))));
    }

    #[test]
    fn auth_failures_are_structural() {
        assert!(is_structural_status(StatusCode::UNAUTHORIZED));
        assert!(!is_structural_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_structural_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let opts = UpsellOptions::default();
        assert!(matches!(GeminiClient::new(&opts), Err(UpsellError::Config(_))));
        let client = GeminiClient::new(&opts.with_api_key("k").with_model("m")).unwrap();
        assert!(client.url().ends_with("/v1beta/models/m:generateContent"));
    }
}
