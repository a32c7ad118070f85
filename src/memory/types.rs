/*!
 * Memory Types
 * Usage statistics and pressure levels for arenas
 */

use crate::core::limits::{PRESSURE_CRITICAL, PRESSURE_HIGH, PRESSURE_MEDIUM};
use crate::core::types::Direction;
use serde::{Deserialize, Serialize};

/// Arena statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaStats {
    pub capacity: usize,
    pub used: usize,
    pub available: usize,
    pub usage_percentage: f64,
    pub direction: Direction,
    /// Physically backed bytes for reservation-backed arenas
    pub committed: Option<usize>,
}

impl ArenaStats {
    pub(crate) fn new(
        capacity: usize,
        used: usize,
        available: usize,
        direction: Direction,
        committed: Option<usize>,
    ) -> Self {
        let usage_percentage = if capacity > 0 {
            (used as f64 / capacity as f64) * 100.0
        } else {
            0.0
        };
        Self {
            capacity,
            used,
            available,
            usage_percentage,
            direction,
            committed,
        }
    }

    pub fn pressure(&self) -> ArenaPressure {
        ArenaPressure::from_ratio(self.usage_percentage / 100.0)
    }
}

/// Arena pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArenaPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl ArenaPressure {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= PRESSURE_CRITICAL {
            ArenaPressure::Critical
        } else if ratio >= PRESSURE_HIGH {
            ArenaPressure::High
        } else if ratio >= PRESSURE_MEDIUM {
            ArenaPressure::Medium
        } else {
            ArenaPressure::Low
        }
    }
}

impl std::fmt::Display for ArenaPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ArenaPressure::Low => write!(f, "LOW"),
            ArenaPressure::Medium => write!(f, "MEDIUM"),
            ArenaPressure::High => write!(f, "HIGH"),
            ArenaPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}
