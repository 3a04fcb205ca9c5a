use std::collections::HashMap;

use crate::domain::{Stanza, StanzaId};

/// Ordered stanza collection with explicit state transitions.
///
/// Each dispatched request gets a per-stanza ticket so callers can tell
/// whether a completion belongs to the most recent request.
#[derive(Debug, Default)]
pub struct StanzaStore {
    stanzas: Vec<Stanza>,
    latest_tickets: HashMap<StanzaId, u64>,
}

impl StanzaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, stanzas: Vec<Stanza>) {
        self.stanzas = stanzas;
        self.latest_tickets.clear();
    }

    pub fn clear(&mut self) {
        self.replace_all(Vec::new());
    }

    pub fn remove(&mut self, id: StanzaId) -> bool {
        let before = self.stanzas.len();
        self.stanzas.retain(|stanza| stanza.id() != id);
        self.latest_tickets.remove(&id);
        self.stanzas.len() != before
    }

    pub fn get(&self, id: StanzaId) -> Option<&Stanza> {
        self.stanzas.iter().find(|stanza| stanza.id() == id)
    }

    pub fn contains(&self, id: StanzaId) -> bool {
        self.get(id).is_some()
    }

    pub fn as_slice(&self) -> &[Stanza] {
        &self.stanzas
    }

    /// Sets the stanza pending and returns the ticket of the new request.
    pub fn begin_request(&mut self, id: StanzaId) -> Option<u64> {
        let stanza = self.stanzas.iter_mut().find(|stanza| stanza.id() == id)?;
        stanza.mark_pending();

        let ticket = self.latest_tickets.entry(id).or_insert(0);
        *ticket += 1;
        Some(*ticket)
    }

    pub fn is_latest_ticket(&self, id: StanzaId, ticket: u64) -> bool {
        self.latest_tickets.get(&id) == Some(&ticket)
    }

    pub fn complete_success(&mut self, id: StanzaId, image_url: String) -> bool {
        self.update(id, |stanza| stanza.mark_succeeded(image_url))
    }

    pub fn complete_failure(&mut self, id: StanzaId, message: String) -> bool {
        self.update(id, |stanza| stanza.mark_failed(message))
    }

    fn update(&mut self, id: StanzaId, apply: impl FnOnce(&mut Stanza)) -> bool {
        match self.stanzas.iter_mut().find(|stanza| stanza.id() == id) {
            Some(stanza) => {
                apply(stanza);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StanzaStore;
    use crate::domain::{StanzaId, segment_lyrics};

    fn store(raw: &str) -> StanzaStore {
        let mut store = StanzaStore::new();
        store.replace_all(segment_lyrics(raw));
        store
    }

    #[test]
    fn begin_request_keeps_previous_image_and_clears_error() {
        let mut store = store("one\n\ntwo");
        let id = store.as_slice()[0].id();

        store.begin_request(id);
        store.complete_success(id, "data:image/png;base64,AAAA".to_string());
        store.begin_request(id);
        store.complete_failure(id, "boom".to_string());
        let ticket = store.begin_request(id).expect("stanza exists");

        let stanza = store.get(id).expect("stanza exists");
        assert!(stanza.is_loading());
        assert_eq!(stanza.error(), None);
        assert_eq!(stanza.image_url(), Some("data:image/png;base64,AAAA"));
        assert_eq!(ticket, 3);
        assert!(store.is_latest_ticket(id, 3));
        assert!(!store.is_latest_ticket(id, 2));
    }

    #[test]
    fn success_clears_error_and_loading() {
        let mut store = store("one");
        let id = store.as_slice()[0].id();

        store.begin_request(id);
        store.complete_failure(id, "first failed".to_string());
        store.complete_success(id, "data:image/png;base64,BBBB".to_string());

        let stanza = store.get(id).expect("stanza exists");
        assert!(!stanza.is_loading());
        assert_eq!(stanza.error(), None);
        assert_eq!(stanza.image_url(), Some("data:image/png;base64,BBBB"));
    }

    #[test]
    fn transitions_on_unknown_id_are_no_ops() {
        let mut store = store("one\n\ntwo");
        let before = store.as_slice().to_vec();
        let missing = StanzaId::new();

        assert_eq!(store.begin_request(missing), None);
        assert!(!store.complete_success(missing, "data:x".to_string()));
        assert!(!store.complete_failure(missing, "x".to_string()));
        assert!(!store.remove(missing));
        assert_eq!(store.as_slice(), before.as_slice());
    }

    #[test]
    fn remove_drops_stanza_and_ticket() {
        let mut store = store("one\n\ntwo");
        let id = store.as_slice()[1].id();
        store.begin_request(id);

        assert!(store.remove(id));
        assert_eq!(store.as_slice().len(), 1);
        assert!(!store.is_latest_ticket(id, 1));
        assert!(store.as_slice().iter().all(|stanza| !stanza.is_loading()));
    }
}
