use std::fs;
use std::path::Path;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::domain::{StoryboardCatalog, StoryboardError};

pub const CATALOG_JSON_SCHEMA: &str = r#"
{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "additionalProperties": false,
  "required": ["schema_version", "models", "aspect_ratios", "styles", "defaults"],
  "properties": {
    "schema_version": {
      "type": "integer",
      "minimum": 1
    },
    "models": {
      "type": "array",
      "minItems": 1,
      "items": {
        "type": "object",
        "additionalProperties": false,
        "required": ["id", "label", "tier"],
        "properties": {
          "id": { "type": "string", "minLength": 1 },
          "label": { "type": "string" },
          "tier": { "enum": ["standard", "premium"] }
        }
      }
    },
    "aspect_ratios": {
      "type": "array",
      "minItems": 1,
      "items": {
        "type": "string",
        "pattern": "^[0-9]+:[0-9]+$"
      }
    },
    "styles": {
      "type": "array",
      "items": {
        "type": "object",
        "additionalProperties": false,
        "required": ["id", "name", "prompt_modifier"],
        "properties": {
          "id": { "type": "string", "minLength": 1 },
          "name": { "type": "string" },
          "prompt_modifier": { "type": "string" }
        }
      }
    },
    "premium_image_size": {
      "enum": ["1K", "2K", "4K"]
    },
    "defaults": {
      "type": "object",
      "additionalProperties": false,
      "required": ["model", "aspect_ratio", "style"],
      "properties": {
        "model": { "type": "string", "minLength": 1 },
        "aspect_ratio": { "type": "string", "minLength": 1 },
        "style": { "type": "string", "minLength": 1 }
      }
    }
  }
}
"#;

pub struct CatalogSchemaValidator {
    compiled_schema: JSONSchema,
}

impl CatalogSchemaValidator {
    pub fn new() -> Result<Self, StoryboardError> {
        let schema: Value = serde_json::from_str(CATALOG_JSON_SCHEMA).map_err(|err| {
            StoryboardError::internal(format!("invalid built-in catalog schema: {err}"))
        })?;
        let compiled_schema = JSONSchema::compile(&schema).map_err(|err| {
            StoryboardError::internal(format!("failed to compile catalog schema: {err}"))
        })?;
        Ok(Self { compiled_schema })
    }

    pub fn validate_catalog_json(&self, json: &str) -> Result<StoryboardCatalog, StoryboardError> {
        let value: Value = serde_json::from_str(json).map_err(|err| {
            StoryboardError::validation(format!("catalog JSON decode failed: {err}"))
        })?;
        self.validate_catalog_value(value)
    }

    pub fn validate_catalog_value(&self, value: Value) -> Result<StoryboardCatalog, StoryboardError> {
        self.compiled_schema
            .validate(&value)
            .map_err(schema_validation_error)?;

        let catalog: StoryboardCatalog = serde_json::from_value(value).map_err(|err| {
            StoryboardError::validation(format!("catalog JSON did not match the catalog contract: {err}"))
        })?;
        catalog.validate()?;
        Ok(catalog)
    }
}

pub fn load_catalog_file(path: impl AsRef<Path>) -> Result<StoryboardCatalog, StoryboardError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|err| {
        StoryboardError::validation(format!(
            "catalog file {} could not be read: {err}",
            path.display()
        ))
    })?;
    CatalogSchemaValidator::new()?.validate_catalog_json(&json)
}

fn schema_validation_error<'a, I>(errors: I) -> StoryboardError
where
    I: IntoIterator<Item = jsonschema::ValidationError<'a>>,
{
    let details = errors
        .into_iter()
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    StoryboardError::validation(format!("catalog schema validation failed: {details}"))
}
