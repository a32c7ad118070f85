/*!
 * Arena Configuration
 *
 * Construction-time settings: OOM policy and commit-on-demand sizing.
 * Buffer-backed arenas take their capacity from the buffer itself.
 */

use super::errors::{ArenaError, ArenaResult};
use super::limits::{DEFAULT_COMMIT_CHUNK, DEFAULT_RESERVE_SIZE};
use super::types::OomPolicy;
use serde::{Deserialize, Serialize};

/// Arena configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Behaviour on OOM without a live checkpoint
    pub oom_policy: OomPolicy,
    /// Bytes committed per step under commit-on-demand (rounded up to pages)
    pub commit_chunk: usize,
    /// Virtual reservation size under commit-on-demand
    pub reserve_size: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            oom_policy: OomPolicy::Fatal,
            commit_chunk: DEFAULT_COMMIT_CHUNK,
            reserve_size: DEFAULT_RESERVE_SIZE,
        }
    }
}

impl ArenaConfig {
    /// Configuration whose allocations return `Err` instead of panicking
    pub fn soft() -> Self {
        Self {
            oom_policy: OomPolicy::Soft,
            ..Self::default()
        }
    }

    pub fn with_oom_policy(mut self, policy: OomPolicy) -> Self {
        self.oom_policy = policy;
        self
    }

    pub fn with_commit_chunk(mut self, bytes: usize) -> Self {
        self.commit_chunk = bytes;
        self
    }

    pub fn with_reserve_size(mut self, bytes: usize) -> Self {
        self.reserve_size = bytes;
        self
    }

    /// Check commit-on-demand sizing
    pub fn validate(&self) -> ArenaResult<()> {
        if self.commit_chunk == 0 {
            return Err(ArenaError::InvalidConfig(
                "commit_chunk must be non-zero".into(),
            ));
        }
        if self.reserve_size == 0 {
            return Err(ArenaError::InvalidConfig(
                "reserve_size must be non-zero".into(),
            ));
        }
        if self.commit_chunk > self.reserve_size {
            return Err(ArenaError::InvalidConfig(format!(
                "commit_chunk ({}) exceeds reserve_size ({})",
                self.commit_chunk, self.reserve_size
            )));
        }
        Ok(())
    }
}
