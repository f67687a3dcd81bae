use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{GeminiSettings, Limits};
use crate::error::{AppError, Result};
use crate::media::MediaPayload;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Media {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

/// One model request: the task prompt plus an optional video.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    pub prompt: &'a str,
    pub media: Option<&'a MediaPayload>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings, limits: &Limits) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(limits.model_timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    fn endpoint(&self) -> String {
        let model = self.settings.model.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:generateContent", self.settings.api_base, model)
    }

    pub async fn summarize(&self, input: &SummaryInput<'_>) -> Result<String> {
        if self.settings.api_key.trim().is_empty() {
            return Err(AppError::ConfigError("GEMINI_API_KEY is not set".to_string()));
        }
        if self.settings.model.trim().is_empty() {
            return Err(AppError::ConfigError("GEMINI_MODEL is not set".to_string()));
        }

        let mut parts = Vec::with_capacity(2);
        if let Some(media) = input.media {
            parts.push(Part::Media {
                inline_data: InlineData {
                    mime_type: media.mime_type.clone(),
                    data: STANDARD.encode(&media.bytes),
                },
            });
        }
        parts.push(Part::Text { text: input.prompt });

        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
        };

        debug!(
            model = %self.settings.model,
            prompt_chars = input.prompt.len(),
            media_bytes = input.media.map(|m| m.bytes.len()).unwrap_or(0),
            "calling generateContent"
        );

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let json: Value = match res.json().await {
            Ok(json) => json,
            Err(_) if !status.is_success() => Value::Null,
            Err(e) => return Err(AppError::ModelError(format!("Invalid response from model API: {}", e))),
        };

        if !status.is_success() {
            return Err(api_error(status, &json));
        }

        response_text(&json)
    }
}

/// Classifies a failed generateContent call using the API's error object.
fn api_error(status: StatusCode, json: &Value) -> AppError {
    let message = json["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    let key_invalid = json["error"]["details"]
        .as_array()
        .is_some_and(|details| details.iter().any(|d| d["reason"] == "API_KEY_INVALID"));

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN || key_invalid {
        AppError::AuthError(message)
    } else {
        AppError::ModelError(format!("HTTP {}: {}", status.as_u16(), message))
    }
}

fn response_text(json: &Value) -> Result<String> {
    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        return Err(AppError::ModelError(format!("Prompt was blocked: {}", reason)));
    }

    let text: String = json["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::ModelError("No response returned from the model".to_string()));
    }
    Ok(text)
}
