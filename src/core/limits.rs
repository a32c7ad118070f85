/*!
 * Arena Limits and Constants
 *
 * Centralized location for allocation constants and configuration defaults.
 * - Performance-critical constants are marked with [PERF]
 * - Values that must agree with the OS are marked with [OS]
 */

// =============================================================================
// GROWTH POLICY
// =============================================================================

/// Minimum number of elements added on each growth of an `ArenaVec`
/// Also the capacity of a vector's first allocation
pub const MIN_GROWTH: usize = 16;

/// Growth numerator/denominator (x1.5)
/// [PERF] Keeps relocations logarithmic while wasting at most a third
pub const GROWTH_NUMERATOR: usize = 3;
pub const GROWTH_DENOMINATOR: usize = 2;

/// Capacity after one growth step: `max(cap * 1.5, cap + MIN_GROWTH)`
#[inline]
pub const fn grow_capacity(cap: usize) -> usize {
    let scaled = cap.saturating_mul(GROWTH_NUMERATOR) / GROWTH_DENOMINATOR;
    let stepped = cap.saturating_add(MIN_GROWTH);
    if scaled > stepped {
        scaled
    } else {
        stepped
    }
}

// =============================================================================
// COMMIT-ON-DEMAND
// =============================================================================

/// Fallback page size when the OS cannot be queried (4KB)
/// [OS] Chunk sizes are rounded up to the real page size at runtime
pub const FALLBACK_PAGE_SIZE: usize = 4 * 1024;

/// Default commit chunk (64KB)
/// [PERF] Sixteen pages per mprotect call amortizes the syscall
pub const DEFAULT_COMMIT_CHUNK: usize = 64 * 1024;

/// Default virtual reservation (1GB)
/// Address space only; nothing is backed until committed
pub const DEFAULT_RESERVE_SIZE: usize = 1024 * 1024 * 1024;

// =============================================================================
// STATISTICS
// =============================================================================

/// Usage ratio at which an arena reports medium pressure
pub const PRESSURE_MEDIUM: f64 = 0.60;

/// Usage ratio at which an arena reports high pressure
pub const PRESSURE_HIGH: f64 = 0.80;

/// Usage ratio at which an arena reports critical pressure
pub const PRESSURE_CRITICAL: f64 = 0.95;
