use std::sync::Arc;

use crate::domain::{ImageRequest, ImageServiceError};
use crate::infra::image::{ImageService, extract_image_data_uri};

/// Sends a composed request to the image service and returns the generated
/// image as a `data:` URI.
#[derive(Clone)]
pub struct GenerationService {
    service: Arc<dyn ImageService>,
}

impl GenerationService {
    pub fn new<S>(service: S) -> Self
    where
        S: ImageService + 'static,
    {
        Self::from_shared(Arc::new(service))
    }

    pub fn from_shared(service: Arc<dyn ImageService>) -> Self {
        Self { service }
    }

    pub fn generate(&self, mut request: ImageRequest) -> Result<String, ImageServiceError> {
        request.model_id = request.model_id.trim().to_string();
        request.validate()?;

        let response = self.service.generate(&request)?;
        extract_image_data_uri(&response)
    }
}
