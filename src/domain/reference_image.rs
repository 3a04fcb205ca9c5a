use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_REFERENCE_IMAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceImageId(Uuid);

impl ReferenceImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReferenceImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReferenceImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user-supplied image attached to every generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub id: ReferenceImageId,
    /// Base64-encoded payload.
    pub data: String,
    pub mime_type: String,
}

impl ReferenceImage {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: ReferenceImageId::new(),
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Ordered reference images, never holding more than [`MAX_REFERENCE_IMAGES`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceImageSet {
    images: Vec<ReferenceImage>,
}

impl ReferenceImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `image` and truncates to the cap. Returns the ids that did not
    /// fit, which is the new image itself when the set was already full.
    pub fn push(&mut self, image: ReferenceImage) -> Vec<ReferenceImageId> {
        self.images.push(image);
        self.images
            .drain(MAX_REFERENCE_IMAGES.min(self.images.len())..)
            .map(|dropped| dropped.id)
            .collect()
    }

    pub fn remove(&mut self, id: ReferenceImageId) -> bool {
        let before = self.images.len();
        self.images.retain(|image| image.id != id);
        self.images.len() != before
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    pub fn as_slice(&self) -> &[ReferenceImage] {
        &self.images
    }
}
