use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation counter shared between an owner and its workers.
///
/// Starting a new unit of work advances the counter; every token minted for
/// an older generation becomes stale at that moment. Workers poll
/// [`GenerationToken::is_stale`] between steps and stop on their own.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes all outstanding tokens and returns one for the new generation.
    pub fn advance(&self) -> GenerationToken {
        let generation = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        GenerationToken {
            current: Arc::clone(&self.current),
            generation,
        }
    }

    /// Stales every outstanding token without starting new work.
    pub fn cancel_all(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }
}

/// Ticket for one generation of work. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct GenerationToken {
    current: Arc<AtomicU64>,
    generation: u64,
}

impl GenerationToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }

    pub fn is_stale(&self) -> bool {
        !self.is_current()
    }
}
