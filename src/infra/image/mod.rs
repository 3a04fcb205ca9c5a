mod credentials;
mod gemini;
mod provider;
pub mod response_parsing;

pub use credentials::ApiKeySlot;
pub use gemini::GeminiImageService;
pub use provider::ImageService;
pub use response_parsing::{DecodedImage, decode_data_uri, extract_image_data_uri};
