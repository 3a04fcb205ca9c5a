use crate::domain::{
    GenerationConfig, ImageRequest, ModelTier, ReferenceImage, RequestPart, StoryboardCatalog,
    StyleSelection,
};

const OPEN_CONTEXT: &str = "Open interpretation";
const UNSPECIFIED_SUBJECT: &str = "None specified";

const REFERENCE_INSTRUCTIONS: &str = "The attached reference images are the visual foundation of this series. Synthesize their characters, setting, and look into this scene rather than copying them.";
const CONTINUITY_INSTRUCTIONS: &str = "This image is one frame of a storyboard. Maintain continuity of characters and setting with the rest of the series.";
const COHERENCE_INSTRUCTIONS: &str = "Keep a consistent color palette and lighting across the series, and keep the image stylistically coherent with the other frames. Visualize the lyrics metaphorically or literally. High quality, detailed.";

/// Builds the ordered request for one stanza. Pure; performs no I/O.
pub struct PromptComposer;

impl PromptComposer {
    pub fn compose(
        catalog: &StoryboardCatalog,
        config: &GenerationConfig,
        references: &[ReferenceImage],
        lyrics: &str,
    ) -> ImageRequest {
        let mut parts: Vec<RequestPart> = references
            .iter()
            .map(|reference| RequestPart::InlineData {
                mime_type: reference.mime_type.clone(),
                data: reference.data.clone(),
            })
            .collect();

        parts.push(RequestPart::Text {
            text: compose_text(catalog, config, !references.is_empty(), lyrics),
        });

        let image_size_hint = catalog
            .model(&config.model_id)
            .filter(|model| model.tier == ModelTier::Premium)
            .map(|_| catalog.premium_image_size.clone());

        ImageRequest {
            model_id: config.model_id.clone(),
            parts,
            aspect_ratio: config.aspect_ratio.clone(),
            image_size_hint,
        }
    }
}

/// The style text sent to the model: the preset's modifier, or the user's
/// free-form text for the custom style.
pub fn style_description(catalog: &StoryboardCatalog, style: &StyleSelection) -> String {
    match style {
        StyleSelection::Custom(text) => text.trim().to_string(),
        StyleSelection::Preset(style_id) => catalog
            .style(style_id)
            .map(|style| style.prompt_modifier.clone())
            .unwrap_or_else(|| style_id.clone()),
    }
}

fn compose_text(
    catalog: &StoryboardCatalog,
    config: &GenerationConfig,
    has_references: bool,
    lyrics: &str,
) -> String {
    let style = style_description(catalog, &config.style);
    let context = non_empty_or(&config.context, OPEN_CONTEXT);
    let subject = non_empty_or(&config.subject, UNSPECIFIED_SUBJECT);
    let lyrics = lyrics.trim();
    let series_instructions = if has_references {
        REFERENCE_INSTRUCTIONS
    } else {
        CONTINUITY_INSTRUCTIONS
    };

    format!(
        "Create an image in the following art style: {style}.

Global visual context of the song: {context}.

Main subject: {subject}.

Scene to depict, based on these lyrics:
\"{lyrics}\"

Instructions:
- {series_instructions}
- {COHERENCE_INSTRUCTIONS}"
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() { fallback } else { trimmed }
}
