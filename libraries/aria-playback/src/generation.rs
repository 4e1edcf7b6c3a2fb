//! Load generation tagging
//!
//! Every load is stamped with a fresh [`Generation`]. Events from the
//! primitive carry the generation they belong to, and anything that does not
//! match the active generation is stale and gets dropped.

use std::fmt;

/// Monotonic tag identifying one load operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Issues generations and decides whether an event is still relevant
#[derive(Debug, Default)]
pub struct GenerationGuard {
    counter: u64,
    active: Option<Generation>,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load, superseding whatever was active
    pub fn advance(&mut self) -> Generation {
        self.counter += 1;
        let generation = Generation(self.counter);
        self.active = Some(generation);
        generation
    }

    /// Drop the active generation; every in-flight event becomes stale
    pub fn invalidate(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<Generation> {
        self.active
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.active == Some(generation)
    }
}
