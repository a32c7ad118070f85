/*!
 * Scratch Regions
 *
 * Temporary sub-arenas carved from the unused remainder of an arena.
 *
 * A scratch region grows from the far end of its parent's free space, in the
 * opposite direction, and shares the parent's buffer:
 *
 * ```text
 *   parent (Up)                       scratch (Down)
 *   [ used ... lo ->   free space   <- hi ... used ]
 * ```
 *
 * Before every allocation the scratch tightens its limit to the parent's live
 * frontier; after it, the scratch publishes its own frontier as the parent's
 * limit. Neither side can cross the other. Dropping the scratch gives the
 * parent its original limit back, reclaiming everything the scratch used.
 *
 * Two rules are enforced with assertions:
 * - An arena has at most one live scratch region.
 * - A scratch derived from a scratch pins the grandparent, which may not
 *   allocate until the nested scratch is dropped.
 */

use super::arena::Arena;
use crate::core::types::Direction;
use std::cell::Cell;
use std::marker::PhantomData;
use tracing::debug;

impl<'buf> Arena<'buf> {
    /// Derive a scratch region from this arena's free space
    ///
    /// Everything allocated from the returned arena is reclaimed when it is
    /// dropped. The parent stays usable meanwhile.
    ///
    /// # Panics
    ///
    /// If this arena already has a live scratch region.
    pub fn scratch(&self) -> Arena<'_> {
        assert!(
            !self.scratch_live.get(),
            "arena already has a live scratch region"
        );

        // Pick up any space our own parent claimed since our last allocation
        self.sync_limit();

        let direction = self.direction.opposite();
        let lo = self.lo.get();
        let hi = self.hi.get();
        // Start at the parent's limit and move toward its frontier
        let origin = match self.direction {
            Direction::Up => hi,
            Direction::Down => lo,
        };

        let pinned = self.parent;
        if let Some(grandparent) = pinned {
            grandparent.pins.set(grandparent.pins.get() + 1);
        }
        self.scratch_live.set(true);

        debug!(
            parent = %self.direction,
            direction = %direction,
            available = hi - lo,
            nested = pinned.is_some(),
            "derived scratch region"
        );

        Arena {
            base: self.base,
            len: self.len,
            capacity: hi - lo,
            lo: Cell::new(lo),
            hi: Cell::new(hi),
            direction,
            origin,
            policy: self.policy,
            checkpoints: Cell::new(0),
            scratch_live: Cell::new(false),
            pins: Cell::new(0),
            parent: Some(self),
            saved_parent_limit: self.limit(),
            pinned,
            reservation: self.reservation,
            commit_chunk: self.commit_chunk,
            _buf: PhantomData,
        }
    }

    /// Whether this arena is a scratch region
    #[inline]
    pub fn is_scratch(&self) -> bool {
        self.parent.is_some()
    }

    /// Whether a scratch region derived from this arena is alive
    #[inline]
    pub fn has_scratch(&self) -> bool {
        self.scratch_live.get()
    }
}

impl Drop for Arena<'_> {
    fn drop(&mut self) {
        let Some(parent) = self.parent else { return };

        parent.set_limit(self.saved_parent_limit);
        parent.scratch_live.set(false);
        if let Some(grandparent) = self.pinned {
            grandparent.pins.set(grandparent.pins.get() - 1);
        }

        debug!(
            direction = %self.direction,
            used = self.used(),
            "released scratch region"
        );
    }
}
