use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::StoryboardError;

pub const CATALOG_SCHEMA_VERSION: u32 = 1;
/// Style id reserved for user-supplied free-form style text.
pub const CUSTOM_STYLE_ID: &str = "custom";

pub const STANDARD_MODEL_ID: &str = "gemini-2.5-flash-image";
pub const PREMIUM_MODEL_ID: &str = "gemini-3-pro-image-preview";
const DEFAULT_PREMIUM_IMAGE_SIZE: &str = "1K";
const DEFAULT_ASPECT_RATIO: &str = "16:9";
const DEFAULT_STYLE_ID: &str = "cinematic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Standard,
    Premium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageModel {
    pub id: String,
    pub label: String,
    pub tier: ModelTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtStyle {
    pub id: String,
    pub name: String,
    pub prompt_modifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDefaults {
    pub model: String,
    pub aspect_ratio: String,
    pub style: String,
}

/// Versioned description of every selectable model, aspect ratio and style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardCatalog {
    pub schema_version: u32,
    pub models: Vec<ImageModel>,
    pub aspect_ratios: Vec<String>,
    pub styles: Vec<ArtStyle>,
    #[serde(default = "default_premium_image_size")]
    pub premium_image_size: String,
    pub defaults: CatalogDefaults,
}

fn default_premium_image_size() -> String {
    DEFAULT_PREMIUM_IMAGE_SIZE.to_string()
}

impl Default for StoryboardCatalog {
    fn default() -> Self {
        let style = |id: &str, name: &str, prompt_modifier: &str| ArtStyle {
            id: id.to_string(),
            name: name.to_string(),
            prompt_modifier: prompt_modifier.to_string(),
        };

        Self {
            schema_version: CATALOG_SCHEMA_VERSION,
            models: vec![
                ImageModel {
                    id: STANDARD_MODEL_ID.to_string(),
                    label: "Gemini 2.5 Flash Image".to_string(),
                    tier: ModelTier::Standard,
                },
                ImageModel {
                    id: PREMIUM_MODEL_ID.to_string(),
                    label: "Gemini 3 Pro Image (paid key required)".to_string(),
                    tier: ModelTier::Premium,
                },
            ],
            aspect_ratios: ["1:1", "16:9", "9:16", "4:3", "3:4"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            styles: vec![
                style(
                    "cinematic",
                    "Cinematic",
                    "Cinematic film still, 4k, highly detailed, dramatic lighting, photorealistic, movie scene",
                ),
                style(
                    "anime",
                    "Anime/Manga",
                    "Anime style, Studio Ghibli inspired, vibrant colors, detailed background, 2D animation",
                ),
                style(
                    "cyberpunk",
                    "Cyberpunk",
                    "Cyberpunk aesthetic, neon lights, futuristic city, high tech low life, synthwave colors",
                ),
                style(
                    "watercolor",
                    "Watercolor",
                    "Soft watercolor painting, artistic, fluid strokes, pastel colors, dreamy atmosphere",
                ),
                style(
                    "noir",
                    "Film Noir",
                    "Black and white photography, film noir, high contrast, shadows, mysterious, vintage",
                ),
                style(
                    "surreal",
                    "Surrealist",
                    "Surrealist art, Salvador Dali style, dreamlike, melting objects, abstract concepts, weird",
                ),
                style(
                    CUSTOM_STYLE_ID,
                    "Custom",
                    "Custom art style defined by user",
                ),
            ],
            premium_image_size: default_premium_image_size(),
            defaults: CatalogDefaults {
                model: STANDARD_MODEL_ID.to_string(),
                aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
                style: DEFAULT_STYLE_ID.to_string(),
            },
        }
    }
}

impl StoryboardCatalog {
    pub fn validate(&self) -> Result<(), StoryboardError> {
        if self.schema_version != CATALOG_SCHEMA_VERSION {
            return Err(StoryboardError::validation(format!(
                "unsupported catalog schema_version {} (expected {CATALOG_SCHEMA_VERSION})",
                self.schema_version
            )));
        }
        if self.models.is_empty() {
            return Err(StoryboardError::validation(
                "catalog must list at least one model",
            ));
        }
        if self.aspect_ratios.is_empty() {
            return Err(StoryboardError::validation(
                "catalog must list at least one aspect ratio",
            ));
        }

        ensure_unique("model", self.models.iter().map(|model| model.id.as_str()))?;
        ensure_unique("style", self.styles.iter().map(|style| style.id.as_str()))?;
        ensure_unique(
            "aspect ratio",
            self.aspect_ratios.iter().map(String::as_str),
        )?;

        if self.model(&self.defaults.model).is_none() {
            return Err(StoryboardError::validation(format!(
                "default model '{}' is not listed in the catalog",
                self.defaults.model
            )));
        }
        if !self.supports_aspect_ratio(&self.defaults.aspect_ratio) {
            return Err(StoryboardError::validation(format!(
                "default aspect ratio '{}' is not listed in the catalog",
                self.defaults.aspect_ratio
            )));
        }
        if self.defaults.style == CUSTOM_STYLE_ID || self.style(&self.defaults.style).is_none() {
            return Err(StoryboardError::validation(format!(
                "default style '{}' must be a listed preset style",
                self.defaults.style
            )));
        }
        Ok(())
    }

    pub fn model(&self, model_id: &str) -> Option<&ImageModel> {
        self.models.iter().find(|model| model.id == model_id)
    }

    pub fn style(&self, style_id: &str) -> Option<&ArtStyle> {
        self.styles.iter().find(|style| style.id == style_id)
    }

    pub fn supports_aspect_ratio(&self, aspect_ratio: &str) -> bool {
        self.aspect_ratios.iter().any(|ratio| ratio == aspect_ratio)
    }

    pub fn is_premium_model(&self, model_id: &str) -> bool {
        self.model(model_id)
            .is_some_and(|model| model.tier == ModelTier::Premium)
    }

    pub fn default_config(&self) -> GenerationConfig {
        GenerationConfig {
            style: StyleSelection::Preset(self.defaults.style.clone()),
            model_id: self.defaults.model.clone(),
            aspect_ratio: self.defaults.aspect_ratio.clone(),
            context: String::new(),
            subject: String::new(),
        }
    }
}

fn ensure_unique<'a>(
    kind: &str,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), StoryboardError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(StoryboardError::validation(format!(
                "{kind} id must not be empty"
            )));
        }
        if !seen.insert(id) {
            return Err(StoryboardError::validation(format!(
                "{kind} '{id}' is listed more than once"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleSelection {
    Preset(String),
    Custom(String),
}

/// Settings shared by every stanza. Read when a generation is requested, so
/// edits only affect later requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub style: StyleSelection,
    pub model_id: String,
    pub aspect_ratio: String,
    pub context: String,
    pub subject: String,
}
