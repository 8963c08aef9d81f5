//! REST client for the Gemini image model.
//!
//! Every operation is one `generateContent` call that sends images as inline
//! parts followed by an instruction, and asks for an image back. Responses are
//! classified into the crate error taxonomy here, so nothing downstream ever
//! inspects message text.

use super::prompts;
use super::usage::{log_usage, UsageMetadata};
use super::ImageGenerator;
use crate::config::GenerationConfig;
use crate::error::{Result, TryOnError};
use crate::models::ImageData;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

const UNSUPPORTED_MIME_MARKER: &str = "Unsupported MIME type";

/// Client for the hosted image-generation model.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TryOnError::Config {
                message: "Gemini API key is empty".to_string(),
            });
        }
        let http = Client::builder()
            .timeout(GenerationConfig::REQUEST_TIMEOUT)
            .user_agent(GenerationConfig::USER_AGENT)
            .build()
            .map_err(|e| TryOnError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            api_key,
            base_url: GenerationConfig::API_BASE.to_string(),
            model: GenerationConfig::MODEL.to_string(),
        })
    }

    /// Create a client from the first API key variable that is set.
    pub fn from_env() -> Result<Self> {
        let key = GenerationConfig::API_KEY_ENV_VARS
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| TryOnError::Config {
                message: format!(
                    "No API key found; set one of {}",
                    GenerationConfig::API_KEY_ENV_VARS.join(", ")
                ),
            })?;
        Self::new(key)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send images plus one instruction and return the generated image.
    async fn generate(&self, operation: &str, images: &[&ImageData], prompt: &str) -> Result<ImageData> {
        let mut parts: Vec<RequestPart> = images
            .iter()
            .map(|image| RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.to_base64(),
                },
            })
            .collect();
        parts.push(RequestPart::Text {
            text: prompt.to_string(),
        });

        let body = GenerateRequest {
            contents: vec![RequestContent { parts }],
            generation_config: GenerationSettings {
                response_modalities: vec!["IMAGE"],
            },
        };

        info!("{}: calling {} with {} image(s)", operation, self.model, images.len());
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TryOnError::Transport {
                message: format!("Request to {} failed: {}", self.model, e),
                status: e.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_http_error(status, &text));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        log_usage(operation, &self.model, parsed.usage_metadata.as_ref(), images.len());
        classify_response(parsed)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn apply_garments(&self, base: &ImageData, garments: &[ImageData]) -> Result<ImageData> {
        let mut images = Vec::with_capacity(garments.len() + 1);
        images.push(base);
        images.extend(garments.iter());
        self.generate("apply_garments", &images, prompts::APPLY_GARMENTS)
            .await
    }

    async fn change_pose(&self, base: &ImageData, pose_instruction: &str) -> Result<ImageData> {
        self.generate("change_pose", &[base], &prompts::change_pose(pose_instruction))
            .await
    }

    async fn remove_background(&self, image: &ImageData) -> Result<ImageData> {
        self.generate("remove_background", &[image], prompts::REMOVE_BACKGROUND)
            .await
    }

    async fn generate_model_image(&self, photo: &ImageData) -> Result<ImageData> {
        self.generate("generate_model_image", &[photo], prompts::MODEL_PHOTO)
            .await
    }
}

// Wire types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationSettings,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Turn a successful HTTP response into an image or a typed refusal.
fn classify_response(response: GenerateResponse) -> Result<ImageData> {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Err(TryOnError::Blocked {
                reason: reason.clone(),
                message: feedback.block_reason_message.clone().unwrap_or_default(),
            });
        }
    }

    let image = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .find_map(|part| part.inline_data.as_ref());
    if let Some(inline) = image {
        let bytes = STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
            TryOnError::NoImageReturned {
                message: format!("The returned image payload is not valid base64: {}", e),
            }
        })?;
        debug!("Received {} ({} bytes)", inline.mime_type, bytes.len());
        return Ok(ImageData::new(inline.mime_type.clone(), bytes));
    }

    let finish_reason = response
        .candidates
        .first()
        .and_then(|c| c.finish_reason.as_deref());
    if let Some(reason) = finish_reason.filter(|r| *r != "STOP") {
        return Err(TryOnError::Blocked {
            reason: reason.to_string(),
            message: "Image generation stopped unexpectedly; this often relates to safety settings."
                .to_string(),
        });
    }

    let text: String = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.trim();
    let message = if text.is_empty() {
        "This can happen because of safety filters or an overly complex request. Please try a different image."
            .to_string()
    } else {
        format!("The model responded with text: \"{}\"", text)
    };
    Err(TryOnError::NoImageReturned { message })
}

/// Classify a non-success HTTP response.
fn classify_http_error(status: StatusCode, body: &str) -> TryOnError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    if let Some(idx) = message.find(UNSUPPORTED_MIME_MARKER) {
        let mime_type = message[idx + UNSUPPORTED_MIME_MARKER.len()..]
            .trim_start_matches(|c: char| c == ':' || c.is_whitespace())
            .split_whitespace()
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("unsupported")
            .trim_matches(|c: char| c == '\'' || c == '"' || c == '.')
            .to_string();
        return TryOnError::UnsupportedInput { mime_type };
    }

    TryOnError::Transport {
        message: format!("HTTP {}: {}", status, message),
        status: Some(status.as_u16()),
    }
}
