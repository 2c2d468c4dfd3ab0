//! Simulation commands typed on the console.

use std::collections::VecDeque;

use anyhow::{Context, Result, bail};
use doorward_core::{CardUid, KeyChar};
use doorward_hardware::mock::MockKeypadMatrixHandle;

/// How long a simulated key is held. Longer than the debounce window.
pub const KEY_HOLD_MS: u32 = 120;

/// Gap between simulated keys, long enough to register a release.
pub const KEY_GAP_MS: u32 = 40;

/// A console line starting with `!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCommand {
    /// Raise a motion edge.
    Motion,
    /// Place a card on the reader.
    Card(CardUid),
    /// Take the card off the reader.
    NoCard,
    /// Type keys on the keypad.
    Keys(Vec<KeyChar>),
    /// Print the orchestrator snapshot.
    Status,
}

impl SimCommand {
    /// Parse a line, or return `None` if it is not a simulation command.
    pub fn parse(line: &str) -> Option<Result<Self>> {
        let body = line.trim().strip_prefix('!')?;
        Some(Self::parse_body(body))
    }

    fn parse_body(body: &str) -> Result<Self> {
        let (word, rest) = match body.split_once(' ') {
            Some((word, rest)) => (word, rest.trim()),
            None => (body, ""),
        };

        match word {
            "motion" => Ok(SimCommand::Motion),
            "nocard" => Ok(SimCommand::NoCard),
            "status" => Ok(SimCommand::Status),
            "card" => {
                let uid = CardUid::parse_hex(rest).context("!card needs a non-zero hex id")?;
                Ok(SimCommand::Card(uid))
            }
            "keys" => {
                let keys = rest
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(KeyChar::new)
                    .collect::<Result<Vec<_>, _>>()?;
                if keys.is_empty() {
                    bail!("!keys needs at least one key");
                }
                Ok(SimCommand::Keys(keys))
            }
            other => bail!("unknown simulation command !{other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Holding,
    Releasing,
}

/// Presses queued keys one at a time on the simulated matrix.
#[derive(Debug)]
pub struct KeyTyper {
    queue: VecDeque<KeyChar>,
    phase: Phase,
    remaining_ms: u32,
}

impl Default for KeyTyper {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyTyper {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            phase: Phase::Idle,
            remaining_ms: 0,
        }
    }

    pub fn enqueue(&mut self, keys: impl IntoIterator<Item = KeyChar>) {
        self.queue.extend(keys);
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle && self.queue.is_empty()
    }

    /// Advance by one millisecond.
    pub fn tick(&mut self, keys: &MockKeypadMatrixHandle) {
        if self.remaining_ms == 0 {
            match self.phase {
                Phase::Holding => {
                    keys.release_all();
                    self.phase = Phase::Releasing;
                    self.remaining_ms = KEY_GAP_MS;
                }
                Phase::Idle | Phase::Releasing => match self.queue.pop_front() {
                    Some(key) => {
                        keys.press(key.as_char());
                        self.phase = Phase::Holding;
                        self.remaining_ms = KEY_HOLD_MS;
                    }
                    None => self.phase = Phase::Idle,
                },
            }
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(1);
    }
}
