//! Synchronizers: shared selection sequences.
//!
//! A synchronizer owns a permutation of item indices and hands them out one
//! at a time, so distant parts of a pattern (or repeated dictionary queries)
//! can agree on selection order instead of rolling independently. Each
//! synchronizer carries its own RNG branch, keyed by its identifier, so
//! shuffles are reproducible and independent of the main draw sequence.

use tracing::trace;

use weft_foundation::PatternRng;

/// Sequencing discipline of a synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncType {
    /// Items in ascending order, wrapping around.
    Ordered,
    /// Shuffled order; reshuffled on every wrap.
    Deck,
    /// One shuffled draw, then that item forever.
    Locked,
    /// Items in descending order, wrapping around.
    Reverse,
}

impl SyncType {
    /// Parse a type name as it appears in tag arguments.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ordered" => Some(Self::Ordered),
            "deck" => Some(Self::Deck),
            "locked" => Some(Self::Locked),
            "reverse" => Some(Self::Reverse),
            _ => None,
        }
    }
}

/// A shared selection sequence over `count` items.
///
/// Slot allocation is lazy: the item count is unknown until the first
/// consumer asks, and a consumer with a different count reallocates (the
/// cursor resets, since the old permutation is meaningless for the new
/// size).
#[derive(Debug)]
pub struct Synchronizer {
    sync_type: SyncType,
    slots: Vec<usize>,
    cursor: usize,
    pinned: bool,
    rng: PatternRng,
}

impl Synchronizer {
    pub fn new(sync_type: SyncType, rng: PatternRng) -> Self {
        Self {
            sync_type,
            slots: Vec::new(),
            cursor: 0,
            pinned: false,
            rng,
        }
    }

    pub fn sync_type(&self) -> SyncType {
        self.sync_type
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Pin the cursor so `next_item` repeats the current item without
    /// advancing. Explicit stepping still advances.
    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    /// Next item index for a consumer with `count` items.
    pub fn next_item(&mut self, count: usize) -> usize {
        if self.slots.len() != count {
            trace!(count, previous = self.slots.len(), "synchronizer resized");
            self.slots.resize(count, 0);
            self.fill_slots();
            self.cursor = 0;
        }
        self.step(false)
    }

    /// Advance the cursor even when pinned, returning the item stepped past.
    pub fn force_step(&mut self) -> usize {
        self.step(true)
    }

    /// Rewind to the start of a fresh cycle. Deck and Locked orders get a
    /// new shuffle.
    pub fn reset(&mut self) {
        self.cursor = 0;
        if !self.slots.is_empty() {
            self.fill_slots();
        }
    }

    fn fill_slots(&mut self) {
        let n = self.slots.len();
        match self.sync_type {
            SyncType::Ordered => {
                for (i, slot) in self.slots.iter_mut().enumerate() {
                    *slot = i;
                }
            }
            SyncType::Reverse => {
                for (i, slot) in self.slots.iter_mut().enumerate() {
                    *slot = n - 1 - i;
                }
            }
            SyncType::Deck | SyncType::Locked => {
                for (i, slot) in self.slots.iter_mut().enumerate() {
                    *slot = i;
                }
                self.scramble_slots();
            }
        }
    }

    /// In-place scramble. Every position swaps with a partner holding a
    /// different value, so no element is guaranteed to stay put across a
    /// reshuffle of three or more items.
    fn scramble_slots(&mut self) {
        let n = self.slots.len();
        if n < 2 {
            return;
        }
        if n == 2 {
            if self.rng.next_max(2) == 1 {
                self.slots.swap(0, 1);
            }
            return;
        }
        for i in 0..n {
            let mut partner = self.rng.next_max(n as u32) as usize;
            while self.slots[partner] == self.slots[i] {
                partner = self.rng.next_max(n as u32) as usize;
            }
            self.slots.swap(i, partner);
        }
    }

    fn step(&mut self, force: bool) -> usize {
        if self.slots.is_empty() {
            return 0;
        }
        if self.sync_type == SyncType::Locked {
            return self.slots[0];
        }
        if self.pinned && !force {
            return self.slots[self.cursor];
        }
        let item = self.slots[self.cursor];
        self.cursor += 1;
        if self.cursor >= self.slots.len() {
            self.cursor = 0;
            if self.sync_type == SyncType::Deck {
                self.scramble_slots();
            }
        }
        item
    }
}
