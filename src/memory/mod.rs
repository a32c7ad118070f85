/*!
 * Memory Module
 * Arena allocation, scratch regions, checkpoints and commit-on-demand
 */

pub mod adapter;
pub mod arena;
pub mod checkpoint;
pub mod commit;
pub mod scratch;
pub mod types;

// Re-export for convenience
pub use adapter::ArenaAlloc;
pub use arena::Arena;
pub use checkpoint::Checkpoint;
pub use commit::Reservation;
pub use types::*;
