use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::domain::{ImageResponse, ImageServiceError};

const FALLBACK_IMAGE_MIME_TYPE: &str = "image/png";

/// Returns the first inline image, scanning candidates and then their parts
/// in order, as a `data:` URI.
pub fn extract_image_data_uri(response: &ImageResponse) -> Result<String, ImageServiceError> {
    response
        .candidates
        .iter()
        .flat_map(|candidate| candidate.parts.iter())
        .filter_map(|part| part.inline_data.as_ref())
        .find(|inline| !inline.data.is_empty())
        .map(|inline| {
            let mime_type = inline
                .mime_type
                .as_deref()
                .filter(|mime| !mime.trim().is_empty())
                .unwrap_or(FALLBACK_IMAGE_MIME_TYPE);
            format!("data:{mime_type};base64,{}", inline.data)
        })
        .ok_or(ImageServiceError::NoImageData)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn file_extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/heic" => "heic",
            "image/heif" => "heif",
            _ => "png",
        }
    }
}

pub fn decode_data_uri(uri: &str) -> Result<DecodedImage, ImageServiceError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ImageServiceError::internal("image URL is not a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageServiceError::internal("data URI has no payload separator"))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| ImageServiceError::internal("data URI payload is not base64"))?;

    let bytes = STANDARD.decode(payload).map_err(|err| {
        ImageServiceError::internal(format!("data URI payload could not be decoded: {err}"))
    })?;

    Ok(DecodedImage {
        mime_type: mime_type.to_string(),
        bytes,
    })
}
