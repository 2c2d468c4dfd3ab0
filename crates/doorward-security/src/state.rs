//! Security states and transition records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of transitions kept for diagnostics.
pub const MAX_HISTORY_SIZE: usize = 100;

/// State of the [`SecurityManager`](crate::SecurityManager).
///
/// Never persisted. Every restart begins in [`SecurityState::Armed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityState {
    /// Monitoring motion and credentials.
    Armed,

    /// Motion seen; a credential must arrive before the window ends.
    EntryDelay,

    /// Re-arming after the door was used.
    ExitDelay,

    /// Alarm sounding until a valid credential arrives.
    Triggered,

    /// Door unlocked, then auto-locked.
    Disarmed,

    /// Brute-force penalty. Credentials are discarded unread.
    Locked,
}

impl fmt::Display for SecurityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecurityState::Armed => "Armed",
            SecurityState::EntryDelay => "EntryDelay",
            SecurityState::ExitDelay => "ExitDelay",
            SecurityState::Triggered => "Triggered",
            SecurityState::Disarmed => "Disarmed",
            SecurityState::Locked => "Locked",
        };
        f.write_str(name)
    }
}

impl SecurityState {
    /// Whether credentials are evaluated in this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorward_security::SecurityState;
    ///
    /// assert!(SecurityState::Triggered.evaluates_credentials());
    /// assert!(!SecurityState::Locked.evaluates_credentials());
    /// ```
    pub fn evaluates_credentials(&self) -> bool {
        matches!(
            self,
            SecurityState::Armed | SecurityState::EntryDelay | SecurityState::Triggered
        )
    }

    /// Whether the alarm is sounding in this state.
    pub fn is_alarm(&self) -> bool {
        matches!(self, SecurityState::Triggered | SecurityState::Locked)
    }
}

/// One recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SecurityState,
    pub to: SecurityState,
    /// Clock reading when the transition happened.
    pub at_ms: u32,
}

impl StateTransition {
    pub fn new(from: SecurityState, to: SecurityState, at_ms: u32) -> Self {
        Self { from, to, at_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SecurityState::Armed, "Armed")]
    #[case(SecurityState::EntryDelay, "EntryDelay")]
    #[case(SecurityState::ExitDelay, "ExitDelay")]
    #[case(SecurityState::Triggered, "Triggered")]
    #[case(SecurityState::Disarmed, "Disarmed")]
    #[case(SecurityState::Locked, "Locked")]
    fn test_display(#[case] state: SecurityState, #[case] expected: &str) {
        assert_eq!(state.to_string(), expected);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&SecurityState::EntryDelay).unwrap();
        assert_eq!(json, "\"entry_delay\"");

        let transition = StateTransition::new(SecurityState::Armed, SecurityState::Locked, 42);
        let json = serde_json::to_string(&transition).unwrap();
        let back: StateTransition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, transition);
    }

    #[test]
    fn test_alarm_states() {
        assert!(SecurityState::Triggered.is_alarm());
        assert!(SecurityState::Locked.is_alarm());
        assert!(!SecurityState::EntryDelay.is_alarm());
        assert!(!SecurityState::Disarmed.evaluates_credentials());
        assert!(!SecurityState::ExitDelay.evaluates_credentials());
    }
}
