/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use thiserror::Error;

/// Arena operation result
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Arena errors
///
/// The first three variants are out-of-memory conditions: they are recovered
/// at the nearest checkpoint, returned under a soft policy, or escalated to a
/// panic otherwise. Invariant violations are never reported through this
/// type; they panic at the point of detection.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ArenaError {
    #[error("Out of memory: requested {requested} bytes (align {align}), {available} bytes available")]
    #[diagnostic(
        code(arena::out_of_memory),
        help("Use a larger buffer, reset the arena, or establish a checkpoint to recover.")
    )]
    OutOfMemory {
        requested: usize,
        align: usize,
        available: usize,
    },

    #[error("Reservation exhausted: requested {requested} bytes, {reserved} bytes reserved")]
    #[diagnostic(
        code(arena::reservation_exhausted),
        help("Reserve more virtual address space for the arena.")
    )]
    ReservationExhausted { requested: usize, reserved: usize },

    #[error("Commit denied for {len} bytes at offset {offset}: {reason}")]
    #[diagnostic(
        code(arena::commit_denied),
        help("The OS refused to back reserved pages. Check memory limits (ulimit -v, cgroups).")
    )]
    CommitDenied {
        offset: usize,
        len: usize,
        reason: String,
    },

    #[error("Failed to reserve {size} bytes of address space: {reason}")]
    #[diagnostic(
        code(arena::reserve_failed),
        help("Lower the reservation size or check the process address-space limit.")
    )]
    ReserveFailed { size: usize, reason: String },

    #[error("Invalid arena configuration: {0}")]
    #[diagnostic(code(arena::invalid_config))]
    InvalidConfig(String),

    #[error("Formatting into the arena failed")]
    #[diagnostic(
        code(arena::format_failed),
        help("A Display implementation returned an error.")
    )]
    Format,
}

impl ArenaError {
    /// True for every out-of-capacity condition
    #[inline]
    pub fn is_oom(&self) -> bool {
        matches!(
            self,
            ArenaError::OutOfMemory { .. }
                | ArenaError::ReservationExhausted { .. }
                | ArenaError::CommitDenied { .. }
        )
    }
}
