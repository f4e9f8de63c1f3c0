//! Run-start tunables for reconciliation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};

/// Default grouping tolerance between one episode's end and the next start.
pub const DEFAULT_TOLERANCE_WINDOW_DAYS: u32 = 14;

/// Default number of episode slots per entity row.
pub const DEFAULT_MAX_EPISODES: usize = 5;

/// Parameters shared by every entity in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellConfig {
    /// Days of slack added past an episode's nominal end. An episode starting
    /// inside this trailing slice of the running boundary joins the spell.
    pub tolerance_window_days: u32,
    /// Fixed number of episode slots per entity.
    pub max_episodes: usize,
}

impl Default for SpellConfig {
    fn default() -> Self {
        Self {
            tolerance_window_days: DEFAULT_TOLERANCE_WINDOW_DAYS,
            max_episodes: DEFAULT_MAX_EPISODES,
        }
    }
}

impl SpellConfig {
    pub fn new(tolerance_window_days: u32, max_episodes: usize) -> Result<Self> {
        let config = Self {
            tolerance_window_days,
            max_episodes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations under which no episode could ever be merged.
    ///
    /// A zero window makes the contiguity test `start <= end && start > end`
    /// unsatisfiable, so it is refused rather than silently disabling merging.
    pub fn validate(&self) -> Result<()> {
        if self.max_episodes == 0 {
            return Err(SpellError::InvalidConfig(
                "max_episodes must be at least 1".to_string(),
            ));
        }
        if self.tolerance_window_days == 0 {
            return Err(SpellError::InvalidConfig(
                "tolerance_window_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
