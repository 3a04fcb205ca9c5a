use std::sync::{Arc, RwLock};

/// API key shared between the key selection host, which writes it, and the
/// image service, which reads it for every request.
#[derive(Debug, Clone, Default)]
pub struct ApiKeySlot {
    key: Arc<RwLock<Option<String>>>,
}

impl ApiKeySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        let slot = Self::new();
        slot.set(key);
        slot
    }

    /// Stores `key`; blank input clears the slot.
    pub fn set(&self, key: impl Into<String>) {
        let key = key.into();
        let key = key.trim();
        let mut guard = self.key.write().expect("API key slot lock poisoned");
        *guard = (!key.is_empty()).then(|| key.to_string());
    }

    pub fn current(&self) -> Option<String> {
        self.key
            .read()
            .expect("API key slot lock poisoned")
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.key
            .read()
            .expect("API key slot lock poisoned")
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::ApiKeySlot;

    #[test]
    fn clones_share_the_same_key() {
        let slot = ApiKeySlot::new();
        let reader = slot.clone();

        slot.set("  paid-key \n");

        assert_eq!(reader.current().as_deref(), Some("paid-key"));
        slot.set("   ");
        assert!(!reader.is_set());
    }
}
