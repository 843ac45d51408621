use serde::{Deserialize, Serialize};
use std::fmt;

/// Playbook identifier. Signals and positions refer to their playbook only
/// through this id; the registry resolves it at update time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaybookId(pub u32);

impl fmt::Display for PlaybookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pb{}", self.0)
    }
}

/// Position identifier, unique within one core instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pos{}", self.0)
    }
}

/// Monotonic id generator. Ids start at 1 and never repeat.
#[derive(Debug, Clone, Default)]
pub struct IdGen {
    last_position: u64,
}

impl IdGen {
    pub fn next_position_id(&mut self) -> PositionId {
        self.last_position += 1;
        PositionId(self.last_position)
    }

    /// Skip past an id assigned elsewhere so it is never reissued.
    pub fn observe(&mut self, id: PositionId) {
        self.last_position = self.last_position.max(id.0);
    }
}
