use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::headshot::payload::{ImagePayload, DEFAULT_IMAGE_MIME};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_model_timing;

pub const TRANSFORM_FAILED_MESSAGE: &str =
    "Image transformation failed. Please try a different photo.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("{}", TRANSFORM_FAILED_MESSAGE)]
    NoImage,
    #[error("{0}")]
    Request(String),
}

impl TransformError {
    /// Text shown to the user in place of the result.
    pub fn user_message(&self) -> String {
        match self {
            TransformError::NoImage => TRANSFORM_FAILED_MESSAGE.to_string(),
            TransformError::Request(message) if message.trim().is_empty() => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            TransformError::Request(message) => message.clone(),
        }
    }
}

/// Turns an uploaded photo plus an instruction prompt into a new image.
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    async fn transform(
        &self,
        original: &ImagePayload,
        prompt: &str,
    ) -> Result<ImagePayload, TransformError>;
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Clone)]
pub struct GeminiImageClient {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiImageClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.gemini_api_key.clone(),
            config.gemini_image_model.clone(),
            config.gemini_api_base.clone(),
            Duration::from_secs(config.gemini_request_timeout_seconds),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn redact_api_key(&self, text: &str) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    async fn call_generate_content(&self, payload: &Value) -> Result<GeminiResponse, TransformError> {
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(target: "llm.gemini", model = %self.model, payload = %summarize_payload(payload));
        }

        let response = get_http_client()
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                let err_text = self.redact_api_key(&err.to_string());
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect()
                );
                TransformError::Request(err_text)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = self.redact_api_key(&message.unwrap_or(body_summary));
            return Err(TransformError::Request(format!(
                "Gemini request failed with status {}: {}",
                status, detail
            )));
        }

        let value = response.json::<GeminiResponse>().await.map_err(|err| {
            warn!("Failed to decode Gemini response: {}", err);
            TransformError::Request(self.redact_api_key(&err.to_string()))
        })?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(target: "llm.gemini", model = %self.model, response = %summarize_response(&value));
        }
        Ok(value)
    }
}

#[async_trait]
impl ImageTransformer for GeminiImageClient {
    async fn transform(
        &self,
        original: &ImagePayload,
        prompt: &str,
    ) -> Result<ImagePayload, TransformError> {
        let payload = build_transform_payload(original, prompt);
        let metadata = json!({
            "mimeType": original.mime_type,
            "imageBytes": original.approx_len(),
        });

        let payload = &payload;
        log_model_timing(
            "gemini",
            &self.model,
            "headshot_transform",
            Some(metadata),
            move || async move {
                let response = self.call_generate_content(payload).await?;
                extract_first_image(response).ok_or(TransformError::NoImage)
            },
        )
        .await
    }
}

fn build_transform_payload(original: &ImagePayload, prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": original.mime_type,
                        "data": original.data
                    }
                },
                { "text": prompt }
            ]
        }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"]
        }
    })
}

/// First inline image of the first candidate, in part order.
fn extract_first_image(response: GeminiResponse) -> Option<ImagePayload> {
    let candidate = response.candidates?.into_iter().next()?;
    candidate
        .content?
        .parts?
        .into_iter()
        .find_map(|part| part.inline_data)
        .map(|inline| {
            let mime_type = inline
                .mime_type
                .filter(|mime| !mime.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
            ImagePayload::new(mime_type, inline.data)
        })
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let summarized = contents
            .iter()
            .map(|content| {
                let role = content
                    .get("role")
                    .and_then(|value| value.as_str())
                    .unwrap_or("user");
                let parts = content
                    .get("parts")
                    .and_then(|value| value.as_array())
                    .map(|parts| summarize_parts(parts))
                    .unwrap_or_default();
                json!({ "role": role, "parts": parts })
            })
            .collect();
        summary.insert("contents".to_string(), Value::Array(summarized));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    Value::Object(summary)
}

fn summarize_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
    let mut text_preview = None;

    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    let parts = candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .filter_map(|content| content.parts.as_ref())
        .flatten();
    for part in parts {
        if let Some(text) = &part.text {
            text_parts += 1;
            if text_preview.is_none() && !text.trim().is_empty() {
                text_preview = Some(truncate_for_log(text, 200));
            }
        }
        if part.inline_data.is_some() {
            image_parts += 1;
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts,
        "textPreview": text_preview
    })
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}
