/*!
 * Bump Arena
 *
 * Linear allocation over a single caller-supplied region.
 *
 * An arena tracks two offsets into its region, `lo` and `hi`. One of them is
 * the frontier (the boundary between used and free bytes) and the other is
 * the limit the frontier may not cross:
 *
 * - `Direction::Up`: frontier = `lo`, limit = `hi` (root arenas)
 * - `Direction::Down`: frontier = `hi`, limit = `lo`
 *
 * Scratch regions (see `scratch.rs`) grow from the opposite end of their
 * parent's free space, so parent and child share one buffer and their
 * frontiers only approach each other.
 *
 * # Performance
 *
 * - **Allocation**: O(1), align then bump
 * - **Deallocation**: O(1) at the tip, whole-arena `reset` otherwise
 * - Values placed in an arena are never dropped
 */

use super::commit::Reservation;
use super::types::ArenaStats;
use crate::core::errors::{ArenaError, ArenaResult};
use crate::core::types::{align_down, align_up, AllocFlags, Direction, OomPolicy};
use crate::core::ArenaConfig;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};
use tracing::{debug, error, trace};

/// Region-based bump allocator
///
/// `Arena` is `!Sync`: all bookkeeping lives in `Cell`s and the allocation
/// methods take `&self`, so any number of live allocations may coexist.
/// Resetting requires `&mut self`, which the borrow checker only grants once
/// every reference into the arena is gone.
pub struct Arena<'buf> {
    pub(super) base: NonNull<u8>,
    pub(super) len: usize,
    /// Span available at creation
    pub(super) capacity: usize,
    pub(super) lo: Cell<usize>,
    pub(super) hi: Cell<usize>,
    pub(super) direction: Direction,
    /// Frontier value at creation, restored by `reset`
    pub(super) origin: usize,
    pub(super) policy: OomPolicy,
    /// Live checkpoint scopes on this arena
    pub(super) checkpoints: Cell<u32>,
    pub(super) scratch_live: Cell<bool>,
    /// Grandchildren currently relying on this arena's frontier standing still
    pub(super) pins: Cell<u32>,
    pub(super) parent: Option<&'buf Arena<'buf>>,
    /// Parent limit at derivation time
    pub(super) saved_parent_limit: usize,
    pub(super) pinned: Option<&'buf Arena<'buf>>,
    pub(super) reservation: Option<&'buf Reservation>,
    pub(super) commit_chunk: usize,
    pub(super) _buf: PhantomData<&'buf mut [u8]>,
}

impl<'buf> Arena<'buf> {
    /// Create an arena over `buf` with the default (fatal) OOM policy
    pub fn new(buf: &'buf mut [u8]) -> Self {
        Self::with_policy(buf, OomPolicy::default())
    }

    /// Create an arena over `buf` using the configured OOM policy
    pub fn with_config(buf: &'buf mut [u8], config: &ArenaConfig) -> Self {
        Self::with_policy(buf, config.oom_policy)
    }

    pub fn with_policy(buf: &'buf mut [u8], policy: OomPolicy) -> Self {
        let len = buf.len();
        // A slice pointer is never null, even for empty slices
        let base = NonNull::from(buf).cast::<u8>();
        debug!(capacity = len, ?policy, "created arena");
        Self::root(base, len, policy, None, 0)
    }

    /// Create an arena that commits pages of `reservation` on demand
    pub fn with_reservation(
        reservation: &'buf mut Reservation,
        config: &ArenaConfig,
    ) -> ArenaResult<Self> {
        config.validate()?;
        let reservation: &'buf Reservation = reservation;
        let chunk = reservation.chunk_for(config.commit_chunk);
        debug!(
            reserved = reservation.size(),
            chunk,
            policy = ?config.oom_policy,
            "created commit-on-demand arena"
        );
        Ok(Self::root(
            reservation.base(),
            reservation.size(),
            config.oom_policy,
            Some(reservation),
            chunk,
        ))
    }

    fn root(
        base: NonNull<u8>,
        len: usize,
        policy: OomPolicy,
        reservation: Option<&'buf Reservation>,
        commit_chunk: usize,
    ) -> Self {
        Self {
            base,
            len,
            capacity: len,
            lo: Cell::new(0),
            hi: Cell::new(len),
            direction: Direction::Up,
            origin: 0,
            policy,
            checkpoints: Cell::new(0),
            scratch_live: Cell::new(false),
            pins: Cell::new(0),
            parent: None,
            saved_parent_limit: 0,
            pinned: None,
            reservation,
            commit_chunk,
            _buf: PhantomData,
        }
    }

    // =========================================================================
    // Raw allocation
    // =========================================================================

    /// Allocate `size * count` bytes aligned to `align`
    ///
    /// Returns zero-filled memory unless `AllocFlags::NO_ZERO` is set. On
    /// exhaustion the error is returned when `AllocFlags::SOFT_FAIL` is set,
    /// the arena policy is soft, or a checkpoint is live; otherwise the
    /// process panics.
    ///
    /// # Panics
    ///
    /// If `align` is not a power of two, or a nested scratch region derived
    /// from a child of this arena is still alive.
    pub fn alloc_raw(
        &self,
        size: usize,
        align: usize,
        count: usize,
        flags: AllocFlags,
    ) -> ArenaResult<NonNull<u8>> {
        assert!(
            align.is_power_of_two(),
            "alignment {align} is not a power of two"
        );
        assert!(
            self.pins.get() == 0,
            "allocation from an arena pinned by a nested scratch region"
        );

        let total = match size.checked_mul(count) {
            Some(total) => total,
            None => {
                return self.fail(
                    ArenaError::OutOfMemory {
                        requested: usize::MAX,
                        align,
                        available: self.remaining(),
                    },
                    flags,
                )
            }
        };

        self.sync_limit();

        let start = match self.place(total, align) {
            Some(start) => start,
            None => {
                let err = self.exhausted(total, align);
                return self.fail(err, flags);
            }
        };

        if let Err(err) = self.commit(start, total) {
            return self.fail(err, flags);
        }

        match self.direction {
            Direction::Up => self.lo.set(start + total),
            Direction::Down => self.hi.set(start),
        }
        self.publish_frontier();

        let ptr = self.ptr_at(start);
        if !flags.contains(AllocFlags::NO_ZERO) {
            // SAFETY: [start, start + total) is inside the region and now owned by the caller
            unsafe { ptr::write_bytes(ptr.as_ptr(), 0, total) };
        }

        trace!(offset = start, size = total, align, "arena allocation");
        Ok(ptr)
    }

    /// Offset of a `total`-byte block aligned to `align`, if it fits
    fn place(&self, total: usize, align: usize) -> Option<usize> {
        let base = self.base.as_ptr() as usize;
        match self.direction {
            Direction::Up => {
                let start = align_up(base + self.lo.get(), align).checked_sub(base)?;
                let end = start.checked_add(total)?;
                (end <= self.hi.get()).then_some(start)
            }
            Direction::Down => {
                let room = self.hi.get().checked_sub(total)?;
                let start = align_down(base + room, align).checked_sub(base)?;
                (start >= self.lo.get()).then_some(start)
            }
        }
    }

    fn exhausted(&self, total: usize, align: usize) -> ArenaError {
        if let (Some(reservation), None) = (self.reservation, self.parent) {
            ArenaError::ReservationExhausted {
                requested: total,
                reserved: reservation.size(),
            }
        } else {
            ArenaError::OutOfMemory {
                requested: total,
                align,
                available: self.remaining(),
            }
        }
    }

    fn commit(&self, start: usize, total: usize) -> ArenaResult<()> {
        let Some(reservation) = self.reservation else {
            return Ok(());
        };
        match self.direction {
            Direction::Up => reservation.commit_prefix(start + total, self.commit_chunk),
            Direction::Down => reservation.commit_suffix(start, self.commit_chunk),
        }
    }

    /// Deliver an OOM according to flags, policy and live checkpoints
    fn fail<T>(&self, err: ArenaError, flags: AllocFlags) -> ArenaResult<T> {
        if flags.contains(AllocFlags::SOFT_FAIL)
            || self.policy == OomPolicy::Soft
            || self.recoverable()
        {
            debug!(%err, "arena allocation failed");
            return Err(err);
        }
        error!(%err, used = self.used(), "fatal arena exhaustion");
        panic!("arena exhausted: {err}");
    }

    /// True when a checkpoint is live on this arena or one of its ancestors
    pub(super) fn recoverable(&self) -> bool {
        let mut arena = Some(self);
        while let Some(a) = arena {
            if a.checkpoints.get() > 0 {
                return true;
            }
            arena = a.parent;
        }
        false
    }

    // =========================================================================
    // Typed allocation
    // =========================================================================

    /// Move `value` into the arena
    pub fn alloc<T>(&self, value: T) -> ArenaResult<&mut T> {
        let ptr = self
            .alloc_raw(
                mem::size_of::<T>(),
                mem::align_of::<T>(),
                1,
                AllocFlags::NO_ZERO,
            )?
            .cast::<T>();
        // SAFETY: fresh, aligned and sized for one T
        unsafe {
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Copy `src` into the arena
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> ArenaResult<&mut [T]> {
        let ptr = self
            .alloc_raw(
                mem::size_of::<T>(),
                mem::align_of::<T>(),
                src.len(),
                AllocFlags::NO_ZERO,
            )?
            .cast::<T>();
        // SAFETY: fresh, aligned, sized for src.len() elements, disjoint from src
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            Ok(std::slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// Allocate `count` clones of `value`
    pub fn alloc_slice_fill<T: Clone>(&self, count: usize, value: T) -> ArenaResult<&mut [T]> {
        let slots = self.alloc_uninit::<T>(count)?;
        for slot in slots.iter_mut() {
            slot.write(value.clone());
        }
        // SAFETY: every slot was initialized above
        Ok(unsafe { &mut *(slots as *mut [MaybeUninit<T>] as *mut [T]) })
    }

    /// Allocate uninitialized storage for `count` values of `T`
    pub fn alloc_uninit<T>(&self, count: usize) -> ArenaResult<&mut [MaybeUninit<T>]> {
        let ptr = self
            .alloc_raw(
                mem::size_of::<T>(),
                mem::align_of::<T>(),
                count,
                AllocFlags::NO_ZERO,
            )?
            .cast::<MaybeUninit<T>>();
        // SAFETY: fresh, aligned and sized; MaybeUninit needs no initialization
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), count) })
    }

    /// Copy `s` into the arena
    pub fn alloc_str(&self, s: &str) -> ArenaResult<&mut str> {
        let bytes = self.alloc_slice_copy(s.as_bytes())?;
        // SAFETY: copied verbatim from a valid str
        Ok(unsafe { std::str::from_utf8_unchecked_mut(bytes) })
    }

    // =========================================================================
    // Tip operations
    // =========================================================================

    /// True if `[ptr, ptr + len)` is the most recent allocation
    ///
    /// Upward arenas compare the block's end with the frontier, downward
    /// arenas compare its start.
    pub fn is_tip(&self, ptr: *const u8, len: usize) -> bool {
        let Some(offset) = self.offset_of(ptr) else {
            return false;
        };
        match self.direction {
            Direction::Up => offset.checked_add(len) == Some(self.lo.get()),
            Direction::Down => offset == self.hi.get() && offset + len <= self.len,
        }
    }

    /// Grow the block `[ptr, ptr + old_size)` by `extra` bytes in place
    ///
    /// Succeeds only in upward arenas when the block is the tip. Returns
    /// `Ok(None)` when the block cannot be extended in place, and an error
    /// (subject to the usual OOM delivery) when it is the tip but the extra
    /// bytes do not fit.
    pub fn try_extend(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        extra: usize,
        flags: AllocFlags,
    ) -> ArenaResult<Option<NonNull<u8>>> {
        if self.direction != Direction::Up || !self.is_tip(ptr.as_ptr(), old_size) {
            return Ok(None);
        }
        let Some(offset) = self.offset_of(ptr.as_ptr()) else {
            return Ok(None);
        };

        self.alloc_raw(extra, 1, 1, flags)?;

        trace!(offset, old_size, extra, "extended tip in place");
        Ok(Some(self.ptr_at(offset)))
    }

    /// Release `[ptr, ptr + size)` if it is the most recent allocation
    ///
    /// Returns whether the frontier moved. Blocks below the tip are left in
    /// place until the arena is reset.
    ///
    /// # Safety
    ///
    /// The block must not be used after a successful release.
    pub unsafe fn free_tip(&self, ptr: NonNull<u8>, size: usize) -> bool {
        if !self.is_tip(ptr.as_ptr(), size) {
            return false;
        }
        match self.direction {
            Direction::Up => self.lo.set(self.lo.get() - size),
            Direction::Down => self.hi.set(self.hi.get() + size),
        }
        self.release_to_parent();
        trace!(size, "released tip");
        true
    }

    /// Reclaim every allocation made from this arena
    pub fn reset(&mut self) {
        match self.direction {
            Direction::Up => self.lo.set(self.origin),
            Direction::Down => self.hi.set(self.origin),
        }
        if let Some(parent) = self.parent {
            parent.set_limit(self.saved_parent_limit);
        }
        debug!(direction = %self.direction, "arena reset");
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn policy(&self) -> OomPolicy {
        self.policy
    }

    /// Bytes between the origin and the frontier
    pub fn used(&self) -> usize {
        self.frontier().abs_diff(self.origin)
    }

    /// Bytes between the frontier and the limit (before alignment)
    pub fn remaining(&self) -> usize {
        self.sync_limit();
        self.hi.get().saturating_sub(self.lo.get())
    }

    /// Bytes this arena could hold when it was created
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the bytes are backed by a commit-on-demand reservation
    #[inline]
    pub fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats::new(
            self.capacity(),
            self.used(),
            self.remaining(),
            self.direction,
            self.reservation.map(Reservation::committed),
        )
    }

    // =========================================================================
    // Frontier bookkeeping
    // =========================================================================

    #[inline]
    pub(super) fn frontier(&self) -> usize {
        match self.direction {
            Direction::Up => self.lo.get(),
            Direction::Down => self.hi.get(),
        }
    }

    #[inline]
    pub(super) fn set_frontier(&self, value: usize) {
        match self.direction {
            Direction::Up => self.lo.set(value),
            Direction::Down => self.hi.set(value),
        }
    }

    #[inline]
    pub(super) fn limit(&self) -> usize {
        match self.direction {
            Direction::Up => self.hi.get(),
            Direction::Down => self.lo.get(),
        }
    }

    #[inline]
    pub(super) fn set_limit(&self, value: usize) {
        match self.direction {
            Direction::Up => self.hi.set(value),
            Direction::Down => self.lo.set(value),
        }
    }

    /// Tighten this arena's limit to the parent's live frontier
    pub(super) fn sync_limit(&self) {
        let Some(parent) = self.parent else { return };
        let frontier = parent.frontier();
        match self.direction {
            Direction::Down => self.lo.set(self.lo.get().max(frontier)),
            Direction::Up => self.hi.set(self.hi.get().min(frontier)),
        }
    }

    /// Publish this arena's frontier as the parent's limit
    fn publish_frontier(&self) {
        let Some(parent) = self.parent else { return };
        match self.direction {
            Direction::Down => parent.hi.set(parent.hi.get().min(self.hi.get())),
            Direction::Up => parent.lo.set(parent.lo.get().max(self.lo.get())),
        }
    }

    /// Loosen the parent's limit to this arena's frontier after it retreated
    ///
    /// Never beyond the limit the parent had when this scratch was derived.
    pub(super) fn release_to_parent(&self) {
        let Some(parent) = self.parent else { return };
        let frontier = self.frontier();
        match self.direction {
            Direction::Down => parent.hi.set(frontier.min(self.saved_parent_limit)),
            Direction::Up => parent.lo.set(frontier.max(self.saved_parent_limit)),
        }
    }

    /// Offset of `ptr` within the region, if it belongs to it
    fn offset_of(&self, ptr: *const u8) -> Option<usize> {
        let offset = (ptr as usize).checked_sub(self.base.as_ptr() as usize)?;
        (offset <= self.len).then_some(offset)
    }

    /// Pointer to `offset`, derived from the region base
    #[inline]
    pub(super) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.len);
        // SAFETY: offset is within (or one past) the region
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
    }
}

impl fmt::Debug for Arena<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("len", &self.len)
            .field("lo", &self.lo.get())
            .field("hi", &self.hi.get())
            .field("direction", &self.direction)
            .field("policy", &self.policy)
            .field("checkpoints", &self.checkpoints.get())
            .field("scratch", &self.scratch_live.get())
            .field("is_scratch", &self.parent.is_some())
            .field("reserved", &self.reservation.is_some())
            .finish()
    }
}
