use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    ImageRequest, ImageResponse, ImageServiceError, InlineData, RequestPart, ResponseCandidate,
    ResponsePart,
};
use crate::infra::env::{read_env_var, read_first_env_var, read_timeout_from_env};

use super::ImageService;
use super::credentials::ApiKeySlot;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";
const ENV_API_KEYS: &[&str] = &["LYRIC_STORYBOARD_API_KEY", "GEMINI_API_KEY", "API_KEY"];
const ENV_BASE_URL: &str = "LYRIC_STORYBOARD_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "LYRIC_STORYBOARD_TIMEOUT_SECS";
const RESPONSE_MODALITIES: [&str; 2] = ["TEXT", "IMAGE"];

/// HTTP adapter for the Gemini `generateContent` endpoint.
///
/// The API key is read from the shared slot on every call so a key chosen
/// through the key gate applies to the next request without rebuilding the
/// service.
pub struct GeminiImageService {
    api_keys: ApiKeySlot,
    api_base_url: String,
    client: Client,
}

impl GeminiImageService {
    /// Seeds `api_keys` from the environment when it is still empty. A missing
    /// key is not an error here; requests fail with `MissingApiKey` instead.
    pub fn from_env(api_keys: ApiKeySlot) -> Result<Self, ImageServiceError> {
        if !api_keys.is_set()
            && let Some(key) = read_first_env_var(ENV_API_KEYS)?
        {
            api_keys.set(key);
        }
        let api_base_url = read_env_var(ENV_BASE_URL)?.unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let timeout = read_timeout_from_env(ENV_TIMEOUT_SECS)?;
        Self::with_config(api_keys, api_base_url, timeout)
    }

    pub fn with_config(
        api_keys: ApiKeySlot,
        api_base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ImageServiceError> {
        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(ImageServiceError::internal(
                "image service base URL must not be empty",
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            ImageServiceError::internal(format!("failed to create image service HTTP client: {err}"))
        })?;

        Ok(Self {
            api_keys,
            api_base_url,
            client,
        })
    }

    fn endpoint_url(&self, model_id: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base_url.trim_end_matches('/'),
            model_id.trim()
        )
    }

    fn build_request_payload(&self, request: &ImageRequest) -> GenerateContentRequest {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                RequestPart::Text { text } => GeminiPart::Text { text: text.clone() },
                RequestPart::InlineData { mime_type, data } => GeminiPart::InlineData {
                    inline_data: GeminiBlob {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    },
                },
            })
            .collect();

        GenerateContentRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts,
            }],
            generation_config: GeminiGenerationConfig {
                response_modalities: RESPONSE_MODALITIES.to_vec(),
                image_config: GeminiImageConfig {
                    aspect_ratio: request.aspect_ratio.clone(),
                    image_size: request.image_size_hint.clone(),
                },
            },
        }
    }

    fn map_success_response(&self, response_body: &str) -> Result<ImageResponse, ImageServiceError> {
        let response: GenerateContentResponse =
            serde_json::from_str(response_body).map_err(|err| {
                ImageServiceError::request(format!("image service response decode failed: {err}"))
            })?;

        let candidates = response
            .candidates
            .into_iter()
            .map(|candidate| ResponseCandidate {
                parts: candidate
                    .content
                    .map(|content| content.parts)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|part| ResponsePart {
                        text: part.text,
                        inline_data: part.inline_data.map(|blob| InlineData {
                            mime_type: blob.mime_type,
                            data: blob.data,
                        }),
                    })
                    .collect(),
            })
            .collect();

        Ok(ImageResponse { candidates })
    }
}

impl ImageService for GeminiImageService {
    fn generate(&self, request: &ImageRequest) -> Result<ImageResponse, ImageServiceError> {
        let api_key = self
            .api_keys
            .current()
            .ok_or(ImageServiceError::MissingApiKey)?;
        let payload = self.build_request_payload(request);
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint_url(&request.model_id))
            .header(API_KEY_HEADER, api_key)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        let response_body = response.text().map_err(map_transport_error)?;
        debug!(
            model = %request.model_id,
            %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "image service responded"
        );

        if !status.is_success() {
            return Err(map_http_error(status, &response_body));
        }
        self.map_success_response(&response_body)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_modalities: Vec<&'static str>,
    image_config: GeminiImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<GeminiResponseBlob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponseBlob {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    #[serde(default)]
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
}

fn map_http_error(status: StatusCode, body: &str) -> ImageServiceError {
    let message = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .map(|detail| detail.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body.to_string());

    ImageServiceError::http(status.to_string(), message)
}

fn map_transport_error(error: reqwest::Error) -> ImageServiceError {
    if error.is_timeout() {
        return ImageServiceError::request(format!("image service request timed out: {error}"));
    }
    ImageServiceError::request(format!("image service transport error: {error}"))
}
