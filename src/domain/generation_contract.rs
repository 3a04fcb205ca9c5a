use serde::{Deserialize, Serialize};

use super::ImageServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPart {
    Text { text: String },
    InlineData { mime_type: String, data: String },
}

impl RequestPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::InlineData { .. } => None,
        }
    }
}

/// Payload for a single image generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub model_id: String,
    pub parts: Vec<RequestPart>,
    pub aspect_ratio: String,
    #[serde(default)]
    pub image_size_hint: Option<String>,
}

impl ImageRequest {
    pub fn validate(&self) -> Result<(), ImageServiceError> {
        if self.model_id.trim().is_empty() {
            return Err(ImageServiceError::internal("model id must not be empty"));
        }
        if self.aspect_ratio.trim().is_empty() {
            return Err(ImageServiceError::internal(
                "aspect ratio must not be empty",
            ));
        }
        if !self
            .parts
            .iter()
            .any(|part| matches!(part, RequestPart::Text { .. }))
        {
            return Err(ImageServiceError::internal(
                "request must contain a text part",
            ));
        }
        for part in &self.parts {
            if let RequestPart::InlineData { mime_type, data } = part
                && (mime_type.trim().is_empty() || data.is_empty())
            {
                return Err(ImageServiceError::internal(
                    "inline data parts require a mime type and payload",
                ));
            }
        }
        Ok(())
    }

    pub fn text_prompt(&self) -> Option<&str> {
        self.parts.iter().find_map(RequestPart::as_text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseCandidate {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
}
