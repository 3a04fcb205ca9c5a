#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyGateState {
    #[default]
    NoKeySelected,
    KeySelected,
}

/// How the gate settles once the host selection flow returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySelectionPolicy {
    /// Assume a key was chosen as soon as the host flow returns.
    #[default]
    Optimistic,
    /// Ask the host again and follow its answer.
    ConfirmWithHost,
}

/// Tracks whether a premium credential is active.
#[derive(Debug, Clone, Default)]
pub struct KeyGate {
    state: KeyGateState,
    policy: KeySelectionPolicy,
    selection_in_flight: bool,
}

impl KeyGate {
    pub fn new(has_selected_key: bool, policy: KeySelectionPolicy) -> Self {
        Self {
            state: if has_selected_key {
                KeyGateState::KeySelected
            } else {
                KeyGateState::NoKeySelected
            },
            policy,
            selection_in_flight: false,
        }
    }

    pub fn state(&self) -> KeyGateState {
        self.state
    }

    pub fn policy(&self) -> KeySelectionPolicy {
        self.policy
    }

    pub fn has_selected_key(&self) -> bool {
        self.state == KeyGateState::KeySelected
    }

    pub fn requires_gate(&self, is_premium_model: bool) -> bool {
        is_premium_model && !self.has_selected_key()
    }

    /// Marks a host selection flow as started. Returns `false` when one is
    /// already running, in which case no new flow should be started.
    pub(crate) fn begin_selection(&mut self) -> bool {
        if self.selection_in_flight {
            return false;
        }
        self.selection_in_flight = true;
        true
    }

    /// Settles the gate after the host flow returned. `confirmed` is the host's
    /// answer when the policy asked for one.
    pub(crate) fn finish_selection(&mut self, confirmed: Option<bool>) -> KeyGateState {
        self.selection_in_flight = false;
        let selected = match self.policy {
            KeySelectionPolicy::Optimistic => true,
            KeySelectionPolicy::ConfirmWithHost => confirmed.unwrap_or(false),
        };
        self.state = if selected {
            KeyGateState::KeySelected
        } else {
            KeyGateState::NoKeySelected
        };
        self.state
    }

    pub(crate) fn abort_selection(&mut self) {
        self.selection_in_flight = false;
    }

    pub(crate) fn reset(&mut self) {
        self.state = KeyGateState::NoKeySelected;
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyGate, KeyGateState, KeySelectionPolicy};

    #[test]
    fn gate_only_applies_to_premium_without_key() {
        let closed = KeyGate::new(false, KeySelectionPolicy::Optimistic);
        let open = KeyGate::new(true, KeySelectionPolicy::Optimistic);

        assert!(closed.requires_gate(true));
        assert!(!closed.requires_gate(false));
        assert!(!open.requires_gate(true));
    }

    #[test]
    fn optimistic_policy_opens_gate_whatever_the_host_says() {
        let mut gate = KeyGate::new(false, KeySelectionPolicy::Optimistic);

        assert!(gate.begin_selection());
        assert!(!gate.begin_selection());
        assert_eq!(gate.finish_selection(Some(false)), KeyGateState::KeySelected);
        assert!(gate.begin_selection());
    }

    #[test]
    fn confirming_policy_follows_host_answer() {
        let mut gate = KeyGate::new(false, KeySelectionPolicy::ConfirmWithHost);

        gate.begin_selection();
        assert_eq!(gate.finish_selection(Some(false)), KeyGateState::NoKeySelected);
        gate.begin_selection();
        assert_eq!(gate.finish_selection(Some(true)), KeyGateState::KeySelected);
    }

    #[test]
    fn reset_closes_gate() {
        let mut gate = KeyGate::new(true, KeySelectionPolicy::Optimistic);

        gate.reset();

        assert_eq!(gate.state(), KeyGateState::NoKeySelected);
        assert!(gate.requires_gate(true));
    }
}
