//! Gemini (Google) image generation provider.

use crate::error::{parse_retry_after, sanitize_error_message, Result, TinderGenError};
use crate::image::provider::{ImageProvider, ImageProviderFactory};
use crate::image::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProviderKind,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Public Generative Language API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash Image preview. The only model the form offers.
    #[default]
    FlashImagePreview,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashImagePreview => "gemini-2.5-flash-image-preview",
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the API root (defaults to [`DEFAULT_BASE_URL`]).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Reuses an existing HTTP client and its connection pool.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the provider. Fails if no non-empty API key was given.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TinderGenError::Auth("no Gemini API key provided".into()))?;

        Ok(GeminiProvider {
            client: self.client.unwrap_or_default(),
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: GeminiModel::default(),
        })
    }
}

/// Gemini image generation provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: GeminiModel,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        );

        let body = GeminiRequest::from_generation_request(request);

        tracing::debug!(
            model = self.model.as_str(),
            prompt_len = request.prompt.len(),
            image_bytes = request.input_image.data().len(),
            "sending Gemini generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let (format, data, image_parts) = first_inline_image(gemini_response)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(duration_ms, image_parts, "Gemini generation complete");

        Ok(GeneratedImage::new(
            data,
            format,
            ImageProviderKind::Gemini,
            GenerationMetadata {
                model: Some(self.model.as_str().to_string()),
                duration_ms: Some(duration_ms),
                image_parts,
            },
        ))
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> TinderGenError {
    let message = extract_error_message(text).unwrap_or_else(|| text.to_string());
    let message = sanitize_error_message(&message);
    if status == 404 {
        return TinderGenError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        );
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
        return TinderGenError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return TinderGenError::Auth(message);
    }
    // Gemini reports a bad key as 400 INVALID_ARGUMENT
    if status == 400 && message.to_lowercase().contains("api key") {
        return TinderGenError::Auth(message);
    }
    let lower = message.to_lowercase();
    if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
        return TinderGenError::ContentBlocked(message);
    }
    TinderGenError::Api { status, message }
}

/// Pulls `error.message` out of a Google API error envelope.
fn extract_error_message(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Picks the first inline image of the first candidate.
///
/// Returns the decoded bytes along with how many inline image parts were present.
fn first_inline_image(response: GeminiResponse) -> Result<(ImageFormat, Vec<u8>, usize)> {
    // Prompt blocks come back as HTTP 200
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
            return Err(TinderGenError::ContentBlocked(msg));
        }
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(TinderGenError::NoImageReturned);
    };

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(TinderGenError::ContentBlocked(format!(
                    "Content blocked by Gemini safety filter: {}",
                    finish_reason
                )));
            }
            _ => {} // STOP, MAX_TOKENS, IMAGE_OTHER etc. fall through to the part scan
        }
    }

    let images: Vec<InlineData> = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.inline_data)
        .filter(|d| d.mime_type.to_ascii_lowercase().starts_with("image/"))
        .collect();

    let image_parts = images.len();
    let first = images
        .into_iter()
        .next()
        .ok_or(TinderGenError::NoImageReturned)?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(first.data.trim())
        .map_err(|e| TinderGenError::Decode(e.to_string()))?;

    let format = ImageFormat::from_mime_type(&first.mime_type)
        .or_else(|| ImageFormat::from_magic_bytes(&data))
        .unwrap_or_default();

    Ok((format, data, image_parts))
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.generate_impl(request).await
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Gemini
    }
}

/// Builds a [`GeminiProvider`] per session credential, sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderFactory {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl GeminiProviderFactory {
    /// Creates a factory targeting the public API.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the API root for every provider this factory builds.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl ImageProviderFactory for GeminiProviderFactory {
    fn provider(&self, credential: &str) -> Result<Box<dyn ImageProvider>> {
        let mut builder = GeminiProvider::builder()
            .api_key(credential)
            .client(self.client.clone());
        if let Some(ref url) = self.base_url {
            builder = builder.base_url(url.clone());
        }
        Ok(Box::new(builder.build()?))
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        let image = &req.input_image;
        let parts = vec![
            GeminiRequestPart::Text {
                text: req.prompt.clone(),
            },
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: image.format().mime_type().to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(image.data()),
                },
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::types::tests::{JPEG_MAGIC, PNG_MAGIC};
    use crate::image::types::UploadedImage;
    use reqwest::header::HeaderMap;

    fn b64(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }

    fn response(json: &str) -> GeminiResponse {
        serde_json::from_str(json).unwrap()
    }

    fn request() -> GenerationRequest {
        let image = UploadedImage::from_bytes(JPEG_MAGIC.to_vec(), None).unwrap();
        GenerationRequest::new("Make me look adventurous", image)
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(
            GeminiModel::FlashImagePreview.as_str(),
            "gemini-2.5-flash-image-preview"
        );
        assert_eq!(GeminiModel::default(), GeminiModel::FlashImagePreview);
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = GeminiProviderBuilder::new().api_key("test-key").build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_builder_rejects_blank_key() {
        assert!(matches!(
            GeminiProviderBuilder::new().api_key("   ").build(),
            Err(TinderGenError::Auth(_))
        ));
        assert!(GeminiProviderBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_trims_base_url() {
        let provider = GeminiProvider::builder()
            .api_key("k")
            .base_url("http://localhost:9999/v1beta/")
            .build()
            .unwrap();
        assert_eq!(provider.base_url, "http://localhost:9999/v1beta");
    }

    #[test]
    fn test_factory_builds_per_credential() {
        let factory = GeminiProviderFactory::new();
        let provider = factory.provider("session-key").unwrap();
        assert_eq!(provider.kind(), ImageProviderKind::Gemini);
        assert_eq!(provider.name(), "Gemini (Google)");
        assert!(factory.provider("").is_err());
    }

    #[test]
    fn test_request_puts_prompt_then_image() {
        let gemini_req = GeminiRequest::from_generation_request(&request());
        let json = serde_json::to_value(&gemini_req).unwrap();

        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "Make me look adventurous");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], b64(&JPEG_MAGIC));
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let gemini_req = GeminiRequest::from_generation_request(&request());
        let json = serde_json::to_value(&gemini_req).unwrap();

        assert!(json.get("generationConfig").is_some());
        assert!(json.get("generation_config").is_none());
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
    }

    #[test]
    fn test_first_of_two_images_is_selected() {
        let first = PNG_MAGIC.to_vec();
        let second = JPEG_MAGIC.to_vec();
        let json = format!(
            r#"{{
                "candidates": [{{
                    "content": {{
                        "parts": [
                            {{ "text": "Here you go" }},
                            {{ "inlineData": {{ "mimeType": "image/png", "data": "{}" }} }},
                            {{ "inlineData": {{ "mimeType": "image/jpeg", "data": "{}" }} }}
                        ]
                    }},
                    "finishReason": "STOP"
                }}]
            }}"#,
            b64(&first),
            b64(&second)
        );

        let (format, data, count) = first_inline_image(response(&json)).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(data, first);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_non_image_inline_parts_are_skipped() {
        let json = format!(
            r#"{{
                "candidates": [{{
                    "content": {{
                        "parts": [
                            {{ "inlineData": {{ "mimeType": "audio/wav", "data": "AAAA" }} }},
                            {{ "inlineData": {{ "mimeType": "image/jpeg", "data": "{}" }} }}
                        ]
                    }}
                }}]
            }}"#,
            b64(&JPEG_MAGIC)
        );

        let (format, data, count) = first_inline_image(response(&json)).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert_eq!(data, JPEG_MAGIC.to_vec());
        assert_eq!(count, 1);
    }

    #[test]
    fn test_text_only_response_is_no_image() {
        let json = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "I can't do that" }] },
                "finishReason": "STOP"
            }]
        }"#;
        assert!(matches!(
            first_inline_image(response(json)),
            Err(TinderGenError::NoImageReturned)
        ));
    }

    #[test]
    fn test_empty_candidates_is_no_image() {
        assert!(matches!(
            first_inline_image(response(r#"{ "candidates": [] }"#)),
            Err(TinderGenError::NoImageReturned)
        ));
        assert!(matches!(
            first_inline_image(response(r#"{}"#)),
            Err(TinderGenError::NoImageReturned)
        ));
    }

    #[test]
    fn test_prompt_feedback_block() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        match first_inline_image(response(json)) {
            Err(TinderGenError::ContentBlocked(msg)) => {
                assert_eq!(msg, "Prompt was blocked due to safety")
            }
            other => panic!("expected ContentBlocked, got {other:?}"),
        }
    }

    #[test]
    fn test_safety_finish_reason() {
        let json = r#"{ "candidates": [{ "finishReason": "IMAGE_SAFETY" }] }"#;
        assert!(matches!(
            first_inline_image(response(json)),
            Err(TinderGenError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_bad_base64_is_decode_error() {
        let json = r#"{
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": "!!!" } }] }
            }]
        }"#;
        assert!(matches!(
            first_inline_image(response(json)),
            Err(TinderGenError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_error_statuses() {
        let headers = HeaderMap::new();
        let invalid_key = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;

        assert!(matches!(
            parse_error(400, invalid_key, &headers),
            TinderGenError::Auth(_)
        ));
        assert!(matches!(
            parse_error(403, "forbidden", &headers),
            TinderGenError::Auth(_)
        ));
        assert!(matches!(
            parse_error(429, "", &headers),
            TinderGenError::RateLimited { retry_after: None }
        ));
        assert!(matches!(
            parse_error(404, "", &headers),
            TinderGenError::InvalidRequest(_)
        ));
        match parse_error(500, r#"{"error":{"message":"Internal error"}}"#, &headers) {
            TinderGenError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal error");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }
}
