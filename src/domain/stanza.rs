use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StanzaId(Uuid);

impl StanzaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StanzaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StanzaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One lyric segment and its generation state.
///
/// `text` never changes after construction. The remaining fields are only
/// mutated through the crate-internal transitions used by the stanza store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stanza {
    id: StanzaId,
    text: String,
    image_url: Option<String>,
    is_loading: bool,
    error: Option<String>,
}

impl Stanza {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: StanzaId::new(),
            text: text.into(),
            image_url: None,
            is_loading: false,
            error: None,
        }
    }

    pub fn id(&self) -> StanzaId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // The previous image stays visible until a new result replaces it.
    pub(crate) fn mark_pending(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub(crate) fn mark_succeeded(&mut self, image_url: String) {
        self.image_url = Some(image_url);
        self.is_loading = false;
        self.error = None;
    }

    pub(crate) fn mark_failed(&mut self, message: String) {
        self.is_loading = false;
        self.error = Some(message);
    }
}
