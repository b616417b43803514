//! Stable hashing for deterministic seed derivation.
//!
//! Synchronizer and carrier ids are user-chosen strings; the engine turns
//! them into RNG branch salts with a stable FNV-1a 64-bit hash so that the
//! same id yields the same selection stream on every run.
//!
//! NOTE: FNV-1a is **not** cryptographically secure. It is used strictly for
//! reproducible derivations.

/// 64-bit FNV-1a offset basis.
pub const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf29ce484222325;
/// 64-bit FNV-1a prime.
pub const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01B3;

/// Hash an arbitrary byte slice with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV1A_OFFSET_BASIS_64;
    let mut i = 0usize;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV1A_PRIME_64);
        i += 1;
    }
    hash
}

/// Hash a UTF-8 string with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64_str(s: &str) -> u64 {
    fnv1a64(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_offset_basis() {
        assert_eq!(fnv1a64(b""), FNV1A_OFFSET_BASIS_64);
    }

    #[test]
    fn str_matches_bytes() {
        assert_eq!(fnv1a64_str("carrier"), fnv1a64(b"carrier"));
    }

    #[test]
    fn distinct_ids_distinct_hashes() {
        assert_ne!(fnv1a64_str("deck-a"), fnv1a64_str("deck-b"));
    }

    #[test]
    fn stable_across_calls() {
        let a = fnv1a64_str("names");
        let b = fnv1a64_str("names");
        assert_eq!(a, b);
    }
}
