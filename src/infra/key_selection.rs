use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use tracing::{info, warn};

use super::image::ApiKeySlot;

/// Host capability that owns the premium-key selection flow.
///
/// `select_key` returns once the host flow is over. It does not report
/// whether a key was actually chosen.
pub trait KeySelectionHost: Send + Sync {
    fn has_selected_key(&self) -> bool;

    fn select_key(&self);
}

/// Key selection for terminal sessions: prompts on stderr and reads one line
/// from the given input, storing it in the shared [`ApiKeySlot`].
pub struct TerminalKeyHost<R> {
    api_keys: ApiKeySlot,
    input: Mutex<R>,
}

impl TerminalKeyHost<io::BufReader<io::Stdin>> {
    pub fn stdin(api_keys: ApiKeySlot) -> Self {
        Self::new(api_keys, io::BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> TerminalKeyHost<R> {
    pub fn new(api_keys: ApiKeySlot, input: R) -> Self {
        Self {
            api_keys,
            input: Mutex::new(input),
        }
    }
}

impl<R: BufRead + Send> KeySelectionHost for TerminalKeyHost<R> {
    fn has_selected_key(&self) -> bool {
        self.api_keys.is_set()
    }

    fn select_key(&self) {
        let mut stderr = io::stderr().lock();
        let _ = write!(
            stderr,
            "The selected model needs an API key from a paid Google Cloud project.\nPaste the key and press Enter (leave empty to skip): "
        );
        let _ = stderr.flush();

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .expect("key selection input lock poisoned")
            .read_line(&mut line);

        match read {
            Ok(_) if !line.trim().is_empty() => {
                self.api_keys.set(line);
                info!("API key selected");
            }
            Ok(_) => info!("key selection finished without a new key"),
            Err(error) => warn!(%error, "key selection input could not be read"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{KeySelectionHost, TerminalKeyHost};
    use crate::infra::image::ApiKeySlot;

    #[test]
    fn select_key_stores_entered_key() {
        let slot = ApiKeySlot::new();
        let host = TerminalKeyHost::new(slot.clone(), Cursor::new("paid-key\n"));

        assert!(!host.has_selected_key());
        host.select_key();

        assert!(host.has_selected_key());
        assert_eq!(slot.current().as_deref(), Some("paid-key"));
    }

    #[test]
    fn empty_input_keeps_existing_key() {
        let slot = ApiKeySlot::with_key("existing");
        let host = TerminalKeyHost::new(slot.clone(), Cursor::new("\n"));

        host.select_key();

        assert_eq!(slot.current().as_deref(), Some("existing"));
    }
}
