//! Weft Foundation
//!
//! Core primitives for the Weft pattern runtime: stable hashing for
//! deterministic seed derivation, and the generation-indexed pseudo-random
//! source every selection in the engine draws from.

pub mod rng;
pub mod stable_hash;

pub use rng::{PatternRng, RngError};
pub use stable_hash::{FNV1A_OFFSET_BASIS_64, FNV1A_PRIME_64, fnv1a64, fnv1a64_str};
