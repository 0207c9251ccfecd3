use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for checking if computation should be cancelled
pub trait CancellationChecker: Clone + Send + Sync {
    /// Returns true if computation should be cancelled
    fn is_cancelled(&self) -> bool;
}

/// Monotonically increasing frame generation shared by the producer of
/// commands and every in-flight compute pass.
#[derive(Clone, Debug, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Start a new generation, abandoning work tagged with older ones.
    /// Returns the new generation.
    pub fn advance(&self) -> u64 {
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Token for work belonging to the current generation.
    pub fn token(&self) -> GenerationToken {
        GenerationToken {
            generation: self.current(),
            counter: Arc::clone(&self.current),
        }
    }
}

/// Cancelled as soon as the counter moves past the generation it was issued for.
#[derive(Clone, Debug)]
pub struct GenerationToken {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl GenerationToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl CancellationChecker for GenerationToken {
    fn is_cancelled(&self) -> bool {
        self.counter.load(Ordering::Acquire) != self.generation
    }
}
