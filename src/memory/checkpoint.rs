/*!
 * Checkpoint Recovery
 *
 * Scoped rollback points for out-of-memory recovery.
 *
 * While a checkpoint scope is live, exhaustion inside the arena (or any
 * scratch region derived from it) is returned as `Err` instead of panicking.
 * The error travels back through `?` to the scope, which restores the frontier
 * captured on entry so nothing allocated inside the failed scope leaks. Under
 * commit-on-demand the pages committed inside the scope are returned to the
 * OS as well.
 *
 * ## Example
 *
 * ```ignore
 * let mut arena = Arena::new(&mut buf);
 * let result = arena.checkpoint(|cp| {
 *     let header = cp.alloc([0u8; 64])?;
 *     let body = cp.alloc_slice_fill(1 << 20, 0u8)?; // OOM: unwinds here
 *     Ok(header.len() + body.len())
 * });
 * assert!(result.is_err());
 * assert_eq!(arena.used(), 0);
 * ```
 */

use super::arena::Arena;
use crate::core::errors::ArenaResult;
use crate::core::types::Direction;
use std::ops::Deref;
use tracing::{debug, warn};

/// A live checkpoint scope
///
/// Dereferences to the arena, so every allocation method is available. The
/// scope is only handed out by reference to a closure, which keeps references
/// allocated inside it from outliving the rollback.
pub struct Checkpoint<'c, 'buf> {
    arena: &'c Arena<'buf>,
}

impl<'buf> Deref for Checkpoint<'_, 'buf> {
    type Target = Arena<'buf>;

    #[inline]
    fn deref(&self) -> &Arena<'buf> {
        self.arena
    }
}

impl<'buf> Checkpoint<'_, 'buf> {
    /// Establish a nested checkpoint on the same arena
    pub fn checkpoint<R, F>(&mut self, f: F) -> ArenaResult<R>
    where
        F: FnOnce(&mut Checkpoint<'_, 'buf>) -> ArenaResult<R>,
    {
        run(self.arena, f)
    }
}

impl<'buf> Arena<'buf> {
    /// Run `f` under a checkpoint
    ///
    /// On `Err`, the frontier is restored to its value on entry and the error
    /// is returned. On `Ok`, allocations made inside the scope are kept.
    pub fn checkpoint<R, F>(&mut self, f: F) -> ArenaResult<R>
    where
        F: FnOnce(&mut Checkpoint<'_, 'buf>) -> ArenaResult<R>,
    {
        run(self, f)
    }

    /// Number of checkpoint scopes live on this arena
    #[inline]
    pub fn checkpoint_depth(&self) -> u32 {
        self.checkpoints.get()
    }
}

fn run<'buf, R, F>(arena: &Arena<'buf>, f: F) -> ArenaResult<R>
where
    F: FnOnce(&mut Checkpoint<'_, 'buf>) -> ArenaResult<R>,
{
    let snapshot = Snapshot::capture(arena);
    let _depth = DepthGuard::enter(arena);

    let mut scope = Checkpoint { arena };
    match f(&mut scope) {
        Ok(value) => Ok(value),
        Err(err) => {
            let released = snapshot.restore(arena);
            if err.is_oom() {
                warn!(%err, released, depth = arena.checkpoints.get(), "recovered at checkpoint");
            } else {
                debug!(%err, released, "checkpoint scope failed");
            }
            Err(err)
        }
    }
}

/// Recovery state captured on entry
struct Snapshot {
    frontier: usize,
    committed: Option<(usize, usize)>,
}

impl Snapshot {
    fn capture(arena: &Arena<'_>) -> Self {
        Self {
            frontier: arena.frontier(),
            committed: arena.reservation.map(|r| r.committed_bounds()),
        }
    }

    /// Roll the arena back, returning how many bytes were reclaimed
    ///
    /// Only the frontier moves back. The limit may have been tightened by a
    /// parent allocating meanwhile and must stay where it is.
    fn restore(&self, arena: &Arena<'_>) -> usize {
        let released = arena.frontier().abs_diff(self.frontier);
        arena.set_frontier(self.frontier);
        arena.release_to_parent();

        if let (Some(reservation), Some((lo, hi))) = (arena.reservation, self.committed) {
            match arena.direction {
                Direction::Up => reservation.decommit_prefix(lo),
                Direction::Down => reservation.decommit_suffix(hi),
            }
        }
        released
    }
}

/// Keeps the live-checkpoint count accurate even if the scope panics
struct DepthGuard<'a> {
    arena: &'a Arena<'a>,
}

impl<'a> DepthGuard<'a> {
    fn enter(arena: &'a Arena<'a>) -> Self {
        arena.checkpoints.set(arena.checkpoints.get() + 1);
        Self { arena }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let depth = &self.arena.checkpoints;
        depth.set(depth.get() - 1);
    }
}
