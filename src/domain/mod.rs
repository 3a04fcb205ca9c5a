mod catalog;
mod errors;
mod generation_contract;
mod lyrics;
mod reference_image;
mod stanza;

pub use catalog::{
    ArtStyle, CATALOG_SCHEMA_VERSION, CUSTOM_STYLE_ID, CatalogDefaults, GenerationConfig,
    ImageModel, ModelTier, PREMIUM_MODEL_ID, STANDARD_MODEL_ID, StoryboardCatalog,
    StyleSelection,
};
pub use errors::{
    EXPIRED_KEY_MARKER, GenerationFailure, GenerationFailureKind, ImageServiceError,
    RATE_LIMIT_MARKER, ReferenceImageError, StoryboardError,
};
pub use generation_contract::{
    ImageRequest, ImageResponse, InlineData, RequestPart, ResponseCandidate, ResponsePart,
};
pub use lyrics::{segment_lyrics, split_stanza_texts};
pub use reference_image::{
    MAX_REFERENCE_IMAGES, ReferenceImage, ReferenceImageId, ReferenceImageSet,
};
pub use stanza::{Stanza, StanzaId};
