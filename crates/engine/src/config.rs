//! Host-facing engine configuration.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Default maximum frame depth.
pub const DEFAULT_MAX_FRAME_DEPTH: usize = 64;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum interpreter frame depth. Guards against unbounded pattern
    /// self-expansion (e.g. unguarded recursive subroutines).
    pub max_frame_depth: usize,
    /// Character output limit across all channels. 0 = unlimited.
    pub char_limit: usize,
    /// Explicit RNG seed. `None` derives a seed from the current time.
    pub seed: Option<i64>,
    /// Content-filter flag, passed through to the dictionary collaborator.
    pub content_filter: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_frame_depth: DEFAULT_MAX_FRAME_DEPTH,
            char_limit: 0,
            seed: None,
            content_filter: false,
        }
    }
}

impl EngineConfig {
    /// Configuration with an explicit seed.
    pub fn seeded(seed: i64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// The seed to run with: explicit if configured, time-derived otherwise.
    pub fn resolve_seed(&self) -> i64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as i64)
                .unwrap_or(0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_frame_depth, 64);
        assert_eq!(config.char_limit, 0);
        assert!(config.seed.is_none());
        assert!(!config.content_filter);
    }

    #[test]
    fn explicit_seed_wins() {
        assert_eq!(EngineConfig::seeded(99).resolve_seed(), 99);
    }
}
