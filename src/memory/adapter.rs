/*!
 * Container Adapter
 *
 * Lets external containers allocate from an arena through the
 * `allocator-api2` `Allocator` trait. There is no global default arena: the
 * handle is passed to each container explicitly.
 *
 * ```ignore
 * let map = hashbrown::HashMap::with_hasher_in(FnvBuildHasher::default(), ArenaAlloc::new(&arena));
 * ```
 *
 * Freeing and shrinking only give bytes back when the block is at the tip;
 * growing extends in place under the same condition and relocates otherwise.
 */

use super::arena::Arena;
use crate::core::types::AllocFlags;
use allocator_api2::alloc::{AllocError, Allocator};
use std::alloc::Layout;
use std::fmt;
use std::ptr::{self, NonNull};

/// Arena handle implementing `Allocator`
#[derive(Clone, Copy)]
pub struct ArenaAlloc<'a> {
    arena: &'a Arena<'a>,
}

impl<'a> ArenaAlloc<'a> {
    #[inline]
    pub fn new(arena: &'a Arena<'a>) -> Self {
        Self { arena }
    }

    #[inline]
    pub fn arena(&self) -> &'a Arena<'a> {
        self.arena
    }

    fn raw(&self, layout: Layout, flags: AllocFlags) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = self
            .arena
            .alloc_raw(layout.size(), layout.align(), 1, flags | AllocFlags::SOFT_FAIL)
            .map_err(|_| AllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    /// Shared body of `grow` and `grow_zeroed`
    unsafe fn grow_with(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
        flags: AllocFlags,
    ) -> Result<NonNull<[u8]>, AllocError> {
        let old_size = old_layout.size();
        let new_size = new_layout.size();

        if is_aligned(ptr, new_layout.align()) {
            let extended = self
                .arena
                .try_extend(ptr, old_size, new_size - old_size, flags | AllocFlags::SOFT_FAIL)
                .map_err(|_| AllocError)?;
            if let Some(ptr) = extended {
                return Ok(NonNull::slice_from_raw_parts(ptr, new_size));
            }
        }

        let fresh = self.raw(new_layout, flags)?;
        // SAFETY: the old block holds old_size initialized bytes; a fresh block never overlaps a live one
        unsafe { ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.cast::<u8>().as_ptr(), old_size) };
        Ok(fresh)
    }
}

unsafe impl Allocator for ArenaAlloc<'_> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.raw(layout, AllocFlags::NO_ZERO)
    }

    #[inline]
    fn allocate_zeroed(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.raw(layout, AllocFlags::NONE)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the caller gives up the block
        unsafe { self.arena.free_tip(ptr, layout.size()) };
    }

    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        unsafe { self.grow_with(ptr, old_layout, new_layout, AllocFlags::NO_ZERO) }
    }

    unsafe fn grow_zeroed(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        unsafe { self.grow_with(ptr, old_layout, new_layout, AllocFlags::NONE) }
    }

    unsafe fn shrink(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        let new_size = new_layout.size();
        if !is_aligned(ptr, new_layout.align()) {
            let fresh = self.raw(new_layout, AllocFlags::NO_ZERO)?;
            // SAFETY: both blocks hold at least new_size bytes and do not overlap
            unsafe { ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.cast::<u8>().as_ptr(), new_size) };
            return Ok(fresh);
        }

        let tail = old_layout.size() - new_size;
        if tail > 0 && self.arena.is_tip(ptr.as_ptr(), old_layout.size()) {
            // SAFETY: the tail past new_size is being given up
            unsafe {
                let tail_ptr = NonNull::new_unchecked(ptr.as_ptr().add(new_size));
                self.arena.free_tip(tail_ptr, tail);
            }
        }
        Ok(NonNull::slice_from_raw_parts(ptr, new_size))
    }
}

impl fmt::Debug for ArenaAlloc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArenaAlloc").field(self.arena).finish()
    }
}

#[inline]
fn is_aligned(ptr: NonNull<u8>, align: usize) -> bool {
    ptr.as_ptr() as usize & (align - 1) == 0
}
