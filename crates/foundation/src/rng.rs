//! Deterministic generation-indexed random number generation.
//!
//! Every selection the engine makes (block alternatives, deck shuffles,
//! dictionary picks) draws from a [`PatternRng`]. The generator is indexed
//! rather than streamed: `value(seed, generation)` is a pure function of its
//! inputs, so any point in the sequence can be peeked without disturbing it,
//! and `prev()` can walk the sequence backwards.
//!
//! # Algorithm
//!
//! Seed and generation are combined with a fixed 256-entry 64-bit lookup
//! table through 8 rotate/multiply-add mixing rounds, producing a 64-bit
//! hash. The low 31 bits are the output value.
//!
//! Ranged variants reduce **by modulo**, not rejection sampling. The slight
//! bias at non-power-of-two ranges is intentional, reproducible behavior:
//! determinism, not statistical independence, is the contract, and changing
//! the reduction would silently change output for existing seeds.
//!
//! # Branch model
//!
//! ```text
//! base (seed, generation)
//!   └─> branch(salt) pushes a derived (seed', 0)
//!         └─> merge() pops back to the parent, untouched
//! ```

use thiserror::Error;

/// RNG errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RngError {
    /// `merge()` was called with only the base branch remaining.
    #[error("cannot merge the base rng branch")]
    BranchUnderflow,
}

/// Multiplier for the mixing rounds.
const ROUND_MUL: u64 = 0xFF51_AFD7_ED55_8CCD;
/// Whitening constant folded into the seed before mixing.
const SEED_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
/// Whitening constant folded into the generation before mixing.
const GEN_GAMMA: u64 = 0xC2B2_AE3D_27D4_EB4F;

/// One (seed, generation) stream on the branch stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Branch {
    seed: i64,
    generation: u64,
}

/// A deterministic, generation-indexed pseudo-random source.
///
/// The sequence for a given seed is fixed forever; `next()` and `prev()`
/// move a cursor (the generation counter) along it. Branching pushes a
/// derived stream for scoped use (e.g. a synchronizer's private sequence)
/// and merging pops back without disturbing the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRng {
    /// Branch stack; index 0 is the base branch and is never popped.
    branches: Vec<Branch>,
}

impl PatternRng {
    /// Create a generator with the given seed, at generation 0.
    pub fn new(seed: i64) -> Self {
        Self {
            branches: vec![Branch {
                seed,
                generation: 0,
            }],
        }
    }

    fn top(&self) -> &Branch {
        // Invariant: branches is never empty.
        self.branches.last().expect("rng branch stack empty")
    }

    fn top_mut(&mut self) -> &mut Branch {
        self.branches.last_mut().expect("rng branch stack empty")
    }

    /// Seed of the active branch.
    pub fn seed(&self) -> i64 {
        self.top().seed
    }

    /// Generation counter of the active branch.
    pub fn generation(&self) -> u64 {
        self.top().generation
    }

    /// Number of branches on the stack (1 = base only).
    pub fn branch_depth(&self) -> usize {
        self.branches.len()
    }

    /// Return the value at the current generation and advance by one.
    ///
    /// The returned value is a 31-bit unsigned integer.
    pub fn next(&mut self) -> u32 {
        let branch = self.top_mut();
        let v = value(branch.seed, branch.generation);
        branch.generation = branch.generation.wrapping_add(1);
        v
    }

    /// Step the generation back by one and return the value there.
    ///
    /// Inverse of [`next`](Self::next): `prev()` after `next()` returns the
    /// same value and restores the cursor.
    pub fn prev(&mut self) -> u32 {
        let branch = self.top_mut();
        branch.generation = branch.generation.wrapping_sub(1);
        value(branch.seed, branch.generation)
    }

    /// Next value reduced to `[0, max)` by modulo. Returns 0 when `max` is 0.
    pub fn next_max(&mut self, max: u32) -> u32 {
        let v = self.next();
        if max == 0 { 0 } else { v % max }
    }

    /// Next value reduced to `[min, max)` by modulo.
    ///
    /// Returns `min` when the range is empty or inverted.
    pub fn next_range(&mut self, min: i64, max: i64) -> i64 {
        let v = self.next();
        if min >= max {
            min
        } else {
            min + (v as i64) % (max - min)
        }
    }

    /// Read the value at the current generation without advancing.
    pub fn peek(&self) -> u32 {
        let branch = self.top();
        value(branch.seed, branch.generation)
    }

    /// Read the value at an arbitrary generation without advancing.
    pub fn peek_at(&self, generation: u64) -> u32 {
        value(self.top().seed, generation)
    }

    /// Read the current value reduced to `[0, max)` without advancing.
    pub fn peek_max(&self, max: u32) -> u32 {
        let v = self.peek();
        if max == 0 { 0 } else { v % max }
    }

    /// Read the current value reduced to `[min, max)` without advancing.
    pub fn peek_range(&self, min: i64, max: i64) -> i64 {
        let v = self.peek();
        if min >= max {
            min
        } else {
            min + (v as i64) % (max - min)
        }
    }

    /// Push a derived branch seeded from the active branch and `salt`,
    /// starting at generation 0.
    pub fn branch(&mut self, salt: u64) {
        let parent = self.top();
        let derived = mix64((parent.seed as u64) ^ mix64(salt ^ SEED_GAMMA));
        self.branches.push(Branch {
            seed: derived as i64,
            generation: 0,
        });
    }

    /// Pop the most recent branch, restoring the parent stream.
    ///
    /// Errors if only the base branch remains.
    pub fn merge(&mut self) -> Result<(), RngError> {
        if self.branches.len() == 1 {
            return Err(RngError::BranchUnderflow);
        }
        self.branches.pop();
        Ok(())
    }

    /// Rewind the active branch to generation 0.
    pub fn reset(&mut self) {
        self.top_mut().generation = 0;
    }

    /// Reseed the active branch and rewind it to generation 0.
    pub fn reset_seed(&mut self, seed: i64) {
        let branch = self.top_mut();
        branch.seed = seed;
        branch.generation = 0;
    }

    /// Derive a child generator, consuming exactly one generation step.
    ///
    /// Nested evaluations seed themselves through this so that the parent's
    /// sequence stays reproducible across runs regardless of how much the
    /// child draws.
    pub fn fork(&mut self) -> PatternRng {
        let drawn = self.next() as u64;
        let seed = mix64(drawn ^ (self.seed() as u64).rotate_left(32));
        PatternRng::new(seed as i64)
    }

    /// Select an index according to `weights` (need not sum to 1).
    ///
    /// Empty or non-positive weight sets select index 0. Consumes one
    /// generation step.
    pub fn weighted(&mut self, weights: &[f64]) -> usize {
        if weights.is_empty() {
            return 0;
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return 0;
        }

        let threshold = (self.next() as f64 / (1u64 << 31) as f64) * total;
        let mut cumulative = 0.0;
        for (i, &weight) in weights.iter().enumerate() {
            cumulative += weight;
            if threshold < cumulative {
                return i;
            }
        }
        // Floating point edge cases land on the last index.
        weights.len() - 1
    }
}

/// The pure generator function: 31-bit value for a (seed, generation) pair.
#[inline]
pub fn value(seed: i64, generation: u64) -> u32 {
    (hash64(seed, generation) & 0x7FFF_FFFF) as u32
}

/// Combine seed and generation into a 64-bit hash.
///
/// 8 rounds; each rotates the accumulator by a generation-dependent amount,
/// then multiply-adds an entry from the fixed lookup table.
#[inline]
fn hash64(seed: i64, generation: u64) -> u64 {
    let mut h = (seed as u64) ^ SEED_GAMMA;
    let mut g = generation ^ GEN_GAMMA;

    let mut round = 0;
    while round < 8 {
        h = h.rotate_left(((g & 0x3F) as u32) | 1);
        h = h
            .wrapping_mul(ROUND_MUL)
            .wrapping_add(MIX_TABLE[((h ^ g) & 0xFF) as usize]);
        g = g.rotate_right(11).wrapping_add(GEN_GAMMA);
        round += 1;
    }
    h ^ (h >> 29)
}

/// SplitMix64-style finalizer used for table construction and seed
/// derivation.
#[inline]
const fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Build the fixed 256-entry mixing table at compile time.
const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut state = SEED_GAMMA;
    let mut i = 0usize;
    while i < 256 {
        state = state.wrapping_add(SEED_GAMMA);
        table[i] = mix64(state);
        i += 1;
    }
    table
}

/// Fixed mixing table. Part of the output contract: changing any entry
/// changes every generated sequence.
static MIX_TABLE: [u64; 256] = build_table();
