// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View generation counter for discarding stale work.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, monotonically increasing view generation.
///
/// The camera layer advances it whenever the view changes enough to
/// invalidate layout. Work started under an older generation is dropped
/// before submission instead of being cancelled.
#[derive(Clone, Debug, Default)]
pub struct ViewGeneration(Arc<AtomicU64>);

impl ViewGeneration {
    /// A counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current generation.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Move to the next generation and return it.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Move forward to `generation`; never moves backwards.
    pub fn advance_to(&self, generation: u64) -> u64 {
        self.0.fetch_max(generation, Ordering::AcqRel).max(generation)
    }

    /// A ticket for the current generation.
    pub fn ticket(&self) -> GenerationTicket {
        self.ticket_at(self.current())
    }

    /// A ticket for a specific generation, typically `ViewState::generation`.
    pub fn ticket_at(&self, generation: u64) -> GenerationTicket {
        GenerationTicket {
            generation,
            counter: Arc::clone(&self.0),
        }
    }
}

/// The generation some piece of work was started under.
#[derive(Clone, Debug)]
pub struct GenerationTicket {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl GenerationTicket {
    /// The captured generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the counter has not moved past the captured generation.
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::Acquire) <= self.generation
    }
}
