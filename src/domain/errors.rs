use std::path::PathBuf;

use thiserror::Error;

/// Phrase the image service uses when a previously selected credential is no
/// longer accepted.
pub const EXPIRED_KEY_MARKER: &str = "Requested entity was not found";
/// Status code the image service reports when its quota is exhausted.
pub const RATE_LIMIT_MARKER: &str = "429";

const MAX_DISPLAY_MESSAGE_LEN: usize = 256;

pub(crate) fn truncate_message(body: &str) -> String {
    let compact = body.trim().replace('\n', " ");
    compact.chars().take(MAX_DISPLAY_MESSAGE_LEN).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageServiceError {
    #[error("API key is missing")]
    MissingApiKey,
    #[error("{message}")]
    Request { message: String },
    /// Non-success HTTP status. `message` keeps the full error text; only the
    /// display form is shortened.
    #[error("Image service returned HTTP {status}: {}", truncate_message(.message))]
    Http { status: String, message: String },
    #[error("No image data found in response.")]
    NoImageData,
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ImageServiceError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn http(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            status: status.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationFailureKind {
    MissingKey,
    ExpiredKey,
    RateLimited,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationFailure {
    #[error("no API key is configured")]
    MissingKey,
    #[error("the selected API key was rejected")]
    ExpiredKey,
    #[error("the image service rate limit was reached")]
    RateLimited,
    #[error("{message}")]
    Unknown { message: String },
}

impl GenerationFailure {
    pub fn classify(error: &ImageServiceError) -> Self {
        match error {
            ImageServiceError::MissingApiKey => Self::MissingKey,
            ImageServiceError::Request { message } if message.contains(EXPIRED_KEY_MARKER) => {
                Self::ExpiredKey
            }
            ImageServiceError::Request { message } if message.contains(RATE_LIMIT_MARKER) => {
                Self::RateLimited
            }
            ImageServiceError::Http { message, .. } if message.contains(EXPIRED_KEY_MARKER) => {
                Self::ExpiredKey
            }
            ImageServiceError::Http { status, message }
                if status.contains(RATE_LIMIT_MARKER) || message.contains(RATE_LIMIT_MARKER) =>
            {
                Self::RateLimited
            }
            other => Self::Unknown {
                message: other.to_string(),
            },
        }
    }

    pub fn kind(&self) -> GenerationFailureKind {
        match self {
            Self::MissingKey => GenerationFailureKind::MissingKey,
            Self::ExpiredKey => GenerationFailureKind::ExpiredKey,
            Self::RateLimited => GenerationFailureKind::RateLimited,
            Self::Unknown { .. } => GenerationFailureKind::Unknown,
        }
    }

    /// Whether the key gate must be cleared and selection re-prompted.
    pub fn resets_key_gate(&self) -> bool {
        matches!(self, Self::ExpiredKey)
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::MissingKey => {
                "API key is missing. Select an API key before generating images.".to_string()
            }
            Self::ExpiredKey => {
                "Your API key session expired or the key is invalid. Please select your key again."
                    .to_string()
            }
            Self::RateLimited => {
                "Rate limit reached. Please wait a minute and try again.".to_string()
            }
            Self::Unknown { message } => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceImageError {
    #[error("unsupported reference image format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("failed to read reference image {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
    #[error("reference image {} is empty", path.display())]
    Empty { path: PathBuf },
    #[error("reference image {} is too large ({bytes} bytes, limit {limit})", path.display())]
    TooLarge {
        path: PathBuf,
        bytes: u64,
        limit: u64,
    },
}

impl ReferenceImageError {
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedFormat { .. } => {
                "Only PNG, JPEG, WebP, GIF, HEIC or HEIF images can be used as references."
                    .to_string()
            }
            Self::Io { .. } => {
                "Could not read the image file. Check the file path and permissions.".to_string()
            }
            Self::Empty { .. } => "The selected image file is empty.".to_string(),
            Self::TooLarge { limit, .. } => {
                format!(
                    "The selected image is too large. Reference images must be at most {} MiB.",
                    limit / (1024 * 1024)
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoryboardError {
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl StoryboardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
