/*!
 * Arena Vector
 *
 * Growable array whose storage lives in an arena.
 *
 * The vector owns no memory: the arena does. Every growing operation takes the
 * arena explicitly, so one vector can be filled from a checkpoint scope or a
 * scratch region without storing a handle.
 *
 * # Growth
 *
 * - Storage at the tip of an upward arena grows in place: only the extra
 *   bytes are allocated and nothing is copied.
 * - Otherwise a new block of `max(cap * 1.5, cap + 16)` elements is
 *   allocated and the elements are copied over.
 * - A failed growth leaves length and capacity untouched.
 */

use crate::core::errors::ArenaResult;
use crate::core::limits::grow_capacity;
use crate::core::types::AllocFlags;
use crate::memory::Arena;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::ptr::{self, NonNull};
use std::slice::SliceIndex;
use tracing::trace;

/// Arena-backed vector of `Copy` elements
pub struct ArenaVec<'a, T: Copy> {
    ptr: NonNull<T>,
    len: usize,
    /// Zero while the elements are borrowed from outside the arena
    cap: usize,
    _marker: PhantomData<&'a [T]>,
}

impl<'a, T: Copy> ArenaVec<'a, T> {
    /// Empty vector; the first push allocates
    #[inline]
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: 0,
            _marker: PhantomData,
        }
    }

    /// Empty vector with room for `cap` elements
    pub fn with_capacity(arena: &'a Arena<'_>, cap: usize) -> ArenaResult<Self> {
        let mut vec = Self::new();
        if cap > 0 {
            vec.grow_to(arena, cap)?;
        }
        Ok(vec)
    }

    /// View over existing data
    ///
    /// The data is copied into the arena on the first growth. Until then the
    /// vector is read-only.
    #[inline]
    pub fn from_borrowed(data: &'a [T]) -> Self {
        Self {
            // SAFETY: slice pointers are never null
            ptr: unsafe { NonNull::new_unchecked(data.as_ptr() as *mut T) },
            len: data.len(),
            cap: 0,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Whether the elements still live outside the arena
    #[inline]
    pub fn is_borrowed(&self) -> bool {
        self.cap == 0 && self.len > 0
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: [0, len) is initialized
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// # Panics
    ///
    /// If the vector still borrows its elements (see [`ArenaVec::from_borrowed`])
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        assert!(
            !self.is_borrowed(),
            "borrowed ArenaVec must be grown before mutation"
        );
        // SAFETY: [0, len) is initialized arena storage owned by this vector
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Append `value`, growing if full, and return its slot
    pub fn push(&mut self, arena: &'a Arena<'_>, value: T) -> ArenaResult<&mut T> {
        if self.len >= self.cap {
            self.grow_to(arena, grow_capacity(self.cap.max(self.len)))?;
        }
        // SAFETY: len < cap after growth
        unsafe {
            let slot = self.ptr.as_ptr().add(self.len);
            slot.write(value);
            self.len += 1;
            Ok(&mut *slot)
        }
    }

    /// Append every element of `items`
    pub fn extend_from_slice(&mut self, arena: &'a Arena<'_>, items: &[T]) -> ArenaResult<()> {
        self.reserve(arena, items.len())?;
        // SAFETY: capacity covers len + items.len(); items cannot alias spare capacity
        unsafe {
            ptr::copy_nonoverlapping(items.as_ptr(), self.ptr.as_ptr().add(self.len), items.len());
        }
        self.len += items.len();
        Ok(())
    }

    /// Ensure room for `additional` more elements
    ///
    /// Also moves borrowed elements into the arena.
    pub fn reserve(&mut self, arena: &'a Arena<'_>, additional: usize) -> ArenaResult<()> {
        let needed = self.len.saturating_add(additional);
        if needed <= self.cap && !self.is_borrowed() {
            return Ok(());
        }
        let target = grow_capacity(self.cap.max(self.len)).max(needed);
        self.grow_to(arena, target)
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: index len was initialized
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Drop all elements, keeping the capacity
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    fn grow_to(&mut self, arena: &'a Arena<'_>, new_cap: usize) -> ArenaResult<()> {
        let size = mem::size_of::<T>();
        assert!(size != 0, "ArenaVec does not support zero-sized types");

        if self.cap > 0 {
            let extra = (new_cap - self.cap).saturating_mul(size);
            let extended =
                arena.try_extend(self.ptr.cast(), self.cap * size, extra, AllocFlags::NO_ZERO)?;
            if let Some(ptr) = extended {
                trace!(from = self.cap, to = new_cap, "grew vector in place");
                self.ptr = ptr.cast();
                self.cap = new_cap;
                return Ok(());
            }
        }

        let fresh = arena
            .alloc_raw(size, mem::align_of::<T>(), new_cap, AllocFlags::NO_ZERO)?
            .cast::<T>();
        // SAFETY: fresh holds new_cap >= len slots; ptr::copy tolerates overlap
        unsafe { ptr::copy(self.ptr.as_ptr(), fresh.as_ptr(), self.len) };

        trace!(from = self.cap, to = new_cap, len = self.len, "relocated vector");
        self.ptr = fresh;
        self.cap = new_cap;
        Ok(())
    }
}

impl<T: Copy> Default for ArenaVec<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> Deref for ArenaVec<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Copy> DerefMut for ArenaVec<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Copy, I: SliceIndex<[T]>> Index<I> for ArenaVec<'_, T> {
    type Output = I::Output;

    #[inline]
    fn index(&self, index: I) -> &I::Output {
        &self.as_slice()[index]
    }
}

impl<T: Copy, I: SliceIndex<[T]>> IndexMut<I> for ArenaVec<'_, T> {
    #[inline]
    fn index_mut(&mut self, index: I) -> &mut I::Output {
        &mut self.as_mut_slice()[index]
    }
}

impl<'v, T: Copy> IntoIterator for &'v ArenaVec<'_, T> {
    type Item = &'v T;
    type IntoIter = std::slice::Iter<'v, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for ArenaVec<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: Copy + PartialEq> PartialEq<[T]> for ArenaVec<'_, T> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Copy + PartialEq> PartialEq for ArenaVec<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}
