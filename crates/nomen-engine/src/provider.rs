use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use crate::config::non_empty_env;
use crate::error::truncate_text;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const MIN_REQUEST_TIMEOUT_S: f64 = 1.0;
const MAX_REQUEST_TIMEOUT_S: f64 = 600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    pub system_instruction: String,
    /// `responseSchema` constraint; output is always requested as JSON.
    pub response_schema: Value,
    pub timeout_s: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextResponse {
    /// Concatenated text parts of the first candidate, if any.
    pub text: Option<String>,
    pub usage: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub timeout_s: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineImage {
        mime_type: Option<String>,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageResponse {
    pub parts: Vec<ContentPart>,
}

impl ImageResponse {
    pub fn first_inline_image(&self) -> Option<(Option<&str>, &[u8])> {
        self.parts.iter().find_map(|part| match part {
            ContentPart::InlineImage { mime_type, bytes } if !bytes.is_empty() => {
                Some((mime_type.as_deref(), bytes.as_slice()))
            }
            _ => None,
        })
    }
}

/// Outbound seam to the generative provider.
pub trait GenerativeClient: Send + Sync {
    fn name(&self) -> &str;
    fn generate_text(&self, request: &TextRequest) -> Result<TextResponse>;
    fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse>;
}

pub struct GeminiClient {
    api_base: String,
    http: HttpClient,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClient {
    /// Reads `GEMINI_API_BASE`; never touches credentials.
    pub fn new() -> Self {
        Self::with_api_base(
            non_empty_env("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        )
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn text_payload(request: &TextRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "systemInstruction": {
                "parts": [{ "text": request.system_instruction }],
            },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
            },
        })
    }

    fn image_payload(request: &ImageRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "imageConfig": { "aspectRatio": request.aspect_ratio },
            },
        })
    }

    fn post(
        &self,
        endpoint: &str,
        api_key: &str,
        payload: &Value,
        timeout_s: f64,
    ) -> Result<Value> {
        let response = self
            .http
            .post(endpoint)
            .query(&[("key", api_key)])
            .timeout(request_timeout(timeout_s))
            .json(payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        response_json_or_error("Gemini", response)
    }

    fn candidate_parts(response_payload: &Value) -> Vec<Value> {
        response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    fn extract_text(response_payload: &Value) -> Option<String> {
        let text = Self::candidate_parts(response_payload)
            .iter()
            .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<String>();
        if text.trim().is_empty() {
            return None;
        }
        Some(text)
    }

    /// Inline parts whose data does not decode are dropped.
    fn extract_parts(response_payload: &Value) -> Vec<ContentPart> {
        let mut out = Vec::new();
        for part in Self::candidate_parts(response_payload) {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                out.push(ContentPart::Text(text.to_string()));
                continue;
            }
            let inline = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let data = inline
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if data.is_empty() {
                continue;
            }
            let Ok(bytes) = BASE64.decode(data.as_bytes()) else {
                continue;
            };
            let mime_type = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .map(str::to_string);
            out.push(ContentPart::InlineImage { mime_type, bytes });
        }
        out
    }
}

impl GenerativeClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_text(&self, request: &TextRequest) -> Result<TextResponse> {
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::text_payload(request);
        let response_payload =
            self.post(&endpoint, &request.api_key, &payload, request.timeout_s)?;
        if let Some(reason) = blocked_reason(&response_payload) {
            bail!("Gemini blocked the prompt ({reason})");
        }
        Ok(TextResponse {
            text: Self::extract_text(&response_payload),
            usage: response_payload
                .get("usageMetadata")
                .cloned()
                .unwrap_or(Value::Null),
        })
    }

    fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse> {
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::image_payload(request);
        let response_payload =
            self.post(&endpoint, &request.api_key, &payload, request.timeout_s)?;
        Ok(ImageResponse {
            parts: Self::extract_parts(&response_payload),
        })
    }
}

/// Non-finite or out-of-range values land on the nearest bound.
fn request_timeout(timeout_s: f64) -> Duration {
    let seconds = if timeout_s.is_nan() {
        MAX_REQUEST_TIMEOUT_S
    } else {
        timeout_s.clamp(MIN_REQUEST_TIMEOUT_S, MAX_REQUEST_TIMEOUT_S)
    };
    Duration::from_secs_f64(seconds)
}

fn blocked_reason(response_payload: &Value) -> Option<String> {
    response_payload
        .get("promptFeedback")
        .and_then(Value::as_object)
        .and_then(|feedback: &Map<String, Value>| feedback.get("blockReason"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}
