/*!
 * Tip Arena Library
 * Region allocators with scratch sub-arenas, checkpoint OOM recovery and
 * in-place growth at the arena tip
 *
 * ```ignore
 * let mut buf = vec![0u8; 1 << 16];
 * let mut arena = Arena::new(&mut buf);
 *
 * let total = arena.checkpoint(|cp| {
 *     let mut fib = ArenaVec::with_capacity(cp, 64)?;
 *     fib.extend_from_slice(cp, &[0u64, 1])?;
 *     for i in 2..80 {
 *         let next = fib[i - 1] + fib[i - 2];
 *         fib.push(cp, next)?;
 *     }
 *     Ok(fib[79])
 * })?;
 * ```
 */

pub mod collections;
pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use collections::{fnv1a_64, ArenaString, ArenaVec, FnvBuildHasher, FnvHasher};
pub use crate::core::{AllocFlags, ArenaConfig, ArenaError, ArenaResult, Direction, OomPolicy};
pub use memory::{Arena, ArenaAlloc, ArenaPressure, ArenaStats, Checkpoint, Reservation};
pub use monitoring::init_tracing;
