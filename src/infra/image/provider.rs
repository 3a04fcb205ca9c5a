use crate::domain::{ImageRequest, ImageResponse, ImageServiceError};

pub trait ImageService: Send + Sync {
    fn generate(&self, request: &ImageRequest) -> Result<ImageResponse, ImageServiceError>;
}
