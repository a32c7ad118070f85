/*!
 * Core Types
 * Common types used across the arena allocators
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Address type for raw allocation bookkeeping
pub type Address = usize;

/// Size type for allocation requests
pub type Size = usize;

/// Per-call allocation flags
///
/// Combine with `|`:
///
/// ```ignore
/// arena.alloc_raw(8, 8, 4, AllocFlags::NO_ZERO | AllocFlags::SOFT_FAIL)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AllocFlags(u8);

impl AllocFlags {
    /// Zero-filled, failure follows the arena's OOM policy
    pub const NONE: Self = Self(0);

    /// Return `Err` on OOM even when the arena policy is fatal
    pub const SOFT_FAIL: Self = Self(1 << 0);

    /// Skip zero-filling the returned bytes
    pub const NO_ZERO: Self = Self(1 << 1);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for AllocFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for AllocFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Direction in which an arena's frontier moves
///
/// Root arenas grow upward. A scratch region grows in the opposite direction
/// of the arena it was derived from, so the two frontiers approach each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// What an allocation does when the arena runs out of space and no
/// checkpoint is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OomPolicy {
    /// Log the failure and panic
    #[default]
    Fatal,
    /// Return the error to the caller
    Soft,
}

/// Round `addr` up to `align` (power of two)
#[inline(always)]
pub const fn align_up(addr: Address, align: Size) -> Address {
    addr.wrapping_add(align - 1) & !(align - 1)
}

/// Round `addr` down to `align` (power of two)
#[inline(always)]
pub const fn align_down(addr: Address, align: Size) -> Address {
    addr & !(align - 1)
}
