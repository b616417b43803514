//! Block repetition state.
//!
//! Every block gets a repeater, even a bare one that runs a single
//! iteration. The repeater owns the block's alternatives, its decoration
//! slices (before/item/after/separator) and the iteration counters the
//! positional tags ask about.

use std::rc::Rc;

use weft_foundation::PatternRng;
use weft_pattern::{InstrSlice, Pattern};

use crate::sync::Synchronizer;

/// Repetition count of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepCount {
    /// Fixed number of iterations.
    Times(usize),
    /// One iteration per alternative.
    Each,
}

/// Attributes collected by decoration tags before their block opens.
#[derive(Debug, Default)]
pub struct BlockAttributes {
    pub count: Option<RepCount>,
    pub separator: Option<InstrSlice>,
    pub before: Option<InstrSlice>,
    pub after: Option<InstrSlice>,
    pub sync_id: Option<String>,
}

/// One selected iteration: the item to expand plus whichever decorations
/// apply at this position.
#[derive(Debug, Clone, Copy)]
pub struct RepStep {
    pub item: InstrSlice,
    pub before: Option<InstrSlice>,
    pub after: Option<InstrSlice>,
    /// Present on every iteration except the last.
    pub separator: Option<InstrSlice>,
}

/// Iteration state of one active block.
#[derive(Debug)]
pub struct Repeater {
    pattern: Rc<Pattern>,
    alternatives: Vec<InstrSlice>,
    weights: Option<Vec<f64>>,
    /// Total iterations to run.
    total: usize,
    /// Next iteration index.
    index: usize,
    /// Index of the iteration currently expanding.
    current: usize,
    separator: Option<InstrSlice>,
    before: Option<InstrSlice>,
    after: Option<InstrSlice>,
    sync_id: Option<String>,
    /// Positional tags answer truthfully only while this is set; it is
    /// cleared while separators expand so they see a stable position.
    stats_enabled: bool,
}

impl Repeater {
    pub fn new(
        pattern: Rc<Pattern>,
        alternatives: Vec<InstrSlice>,
        weights: Option<Vec<f64>>,
        attrs: BlockAttributes,
    ) -> Self {
        let total = match attrs.count {
            None => 1,
            Some(RepCount::Times(n)) => n,
            Some(RepCount::Each) => alternatives.len(),
        };
        Self {
            pattern,
            alternatives,
            weights,
            total,
            index: 0,
            current: 0,
            separator: attrs.separator,
            before: attrs.before,
            after: attrs.after,
            sync_id: attrs.sync_id,
            stats_enabled: true,
        }
    }

    /// The pattern the slices index into.
    pub fn pattern(&self) -> &Rc<Pattern> {
        &self.pattern
    }

    pub fn sync_id(&self) -> Option<&str> {
        self.sync_id.as_deref()
    }

    /// Select the next iteration, or None when the block is done.
    pub fn select(
        &mut self,
        rng: &mut PatternRng,
        sync: Option<&mut Synchronizer>,
    ) -> Option<RepStep> {
        if self.index >= self.total || self.alternatives.is_empty() {
            return None;
        }
        let n = self.alternatives.len();
        let choice = match sync {
            Some(sync) => sync.next_item(n).min(n - 1),
            None => match &self.weights {
                Some(weights) => rng.weighted(weights),
                None => rng.next_max(n as u32) as usize,
            },
        };
        self.current = self.index;
        self.index += 1;
        Some(RepStep {
            item: self.alternatives[choice],
            before: self.before,
            after: self.after,
            separator: (self.index < self.total).then_some(self.separator).flatten(),
        })
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.total
    }

    pub fn is_odd(&self) -> bool {
        self.current % 2 == 1
    }

    pub fn is_even(&self) -> bool {
        self.current % 2 == 0
    }

    /// True on iterations offset, offset+interval, offset+2*interval, ...
    pub fn nth(&self, offset: usize, interval: usize) -> bool {
        if self.current < offset || interval == 0 {
            return false;
        }
        (self.current - offset) % interval == 0
    }

    /// Current iteration, 1-based.
    pub fn number(&self) -> usize {
        self.current + 1
    }

    pub fn count(&self) -> usize {
        self.total
    }

    pub fn stats_enabled(&self) -> bool {
        self.stats_enabled
    }

    pub fn set_stats(&mut self, enabled: bool) {
        self.stats_enabled = enabled;
    }
}
