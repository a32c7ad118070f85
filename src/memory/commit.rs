/*!
 * Commit-on-Demand
 *
 * Reserve a large span of virtual address space up front and back it with
 * physical memory one chunk at a time, only as allocations reach it.
 *
 * An upward arena commits a growing prefix of the reservation; a downward
 * scratch region commits a growing suffix. The two committed spans are
 * tracked separately so each side only ever asks the OS for fresh pages.
 */

use crate::core::errors::{ArenaError, ArenaResult};
use crate::core::limits::FALLBACK_PAGE_SIZE;
use crate::core::ArenaConfig;
use std::cell::Cell;
use std::fmt;
use std::ptr::NonNull;
use tracing::{debug, warn};

/// Reserved (but mostly uncommitted) virtual memory
///
/// Dropping the reservation unmaps it, so every arena built on it must be
/// gone first; the borrow in [`crate::Arena::with_reservation`] enforces that.
pub struct Reservation {
    base: NonNull<u8>,
    size: usize,
    page_size: usize,
    /// Prefix `[0, committed_lo)` is readable and writable
    committed_lo: Cell<usize>,
    /// Suffix `[committed_hi, size)` is readable and writable
    committed_hi: Cell<usize>,
}

impl Reservation {
    /// Reserve `size` bytes (rounded up to whole pages) with no access rights
    pub fn new(size: usize) -> ArenaResult<Self> {
        let page_size = sys::page_size();
        let rounded = size
            .checked_add(page_size - 1)
            .map(|s| s / page_size * page_size)
            .filter(|&s| s > 0)
            .ok_or_else(|| ArenaError::ReserveFailed {
                size,
                reason: "size must be non-zero and fit the address space".into(),
            })?;

        let base = sys::reserve(rounded).map_err(|reason| ArenaError::ReserveFailed {
            size: rounded,
            reason,
        })?;

        debug!(size = rounded, page_size, "reserved virtual address space");

        Ok(Self {
            base,
            size: rounded,
            page_size,
            committed_lo: Cell::new(0),
            committed_hi: Cell::new(rounded),
        })
    }

    /// Reserve `config.reserve_size` bytes
    pub fn from_config(config: &ArenaConfig) -> ArenaResult<Self> {
        config.validate()?;
        Self::new(config.reserve_size)
    }

    /// Reserved bytes (page multiple)
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Bytes currently backed by physical memory
    pub fn committed(&self) -> usize {
        let lo = self.committed_lo.get();
        let hi = self.committed_hi.get();
        if lo >= hi {
            self.size
        } else {
            lo + (self.size - hi)
        }
    }

    /// Committed prefix end and suffix start
    #[inline]
    pub fn committed_bounds(&self) -> (usize, usize) {
        (self.committed_lo.get(), self.committed_hi.get())
    }

    #[inline]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Round a requested chunk size up to whole pages
    pub(crate) fn chunk_for(&self, requested: usize) -> usize {
        let pages = requested.max(1).div_ceil(self.page_size);
        pages.saturating_mul(self.page_size).min(self.size)
    }

    /// Make `[0, end)` accessible, committing whole chunks
    pub(crate) fn commit_prefix(&self, end: usize, chunk: usize) -> ArenaResult<()> {
        let lo = self.committed_lo.get();
        if end <= lo {
            return Ok(());
        }
        if end > self.size {
            return Err(ArenaError::ReservationExhausted {
                requested: end,
                reserved: self.size,
            });
        }

        let new_lo = end.div_ceil(chunk).saturating_mul(chunk).min(self.size);
        self.protect(lo, new_lo - lo)?;
        self.committed_lo.set(new_lo);

        debug!(from = lo, to = new_lo, "committed prefix chunk");
        Ok(())
    }

    /// Make `[start, size)` accessible, committing whole chunks
    pub(crate) fn commit_suffix(&self, start: usize, chunk: usize) -> ArenaResult<()> {
        let hi = self.committed_hi.get();
        if start >= hi {
            return Ok(());
        }

        let new_hi = start / chunk * chunk;
        self.protect(new_hi, hi - new_hi)?;
        self.committed_hi.set(new_hi);

        debug!(from = hi, to = new_hi, "committed suffix chunk");
        Ok(())
    }

    /// Shrink the committed prefix back to `lo`, returning pages to the OS
    pub(crate) fn decommit_prefix(&self, lo: usize) {
        let cur = self.committed_lo.get();
        if cur <= lo {
            return;
        }
        // Pages shared with the committed suffix stay mapped
        let end = cur.min(self.committed_hi.get().max(lo));
        if end > lo {
            self.release_pages(lo, end - lo);
        }
        self.committed_lo.set(lo);
    }

    /// Shrink the committed suffix back to `hi`, returning pages to the OS
    pub(crate) fn decommit_suffix(&self, hi: usize) {
        let cur = self.committed_hi.get();
        if cur >= hi {
            return;
        }
        let start = cur.max(self.committed_lo.get().min(hi));
        if hi > start {
            self.release_pages(start, hi - start);
        }
        self.committed_hi.set(hi);
    }

    fn protect(&self, offset: usize, len: usize) -> ArenaResult<()> {
        if len == 0 {
            return Ok(());
        }
        // SAFETY: offset + len lies within the reservation
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) };
        sys::commit(ptr, len).map_err(|reason| ArenaError::CommitDenied {
            offset,
            len,
            reason,
        })
    }

    fn release_pages(&self, offset: usize, len: usize) {
        // SAFETY: offset + len lies within the reservation
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) };
        if let Err(reason) = sys::decommit(ptr, len) {
            warn!(offset, len, %reason, "failed to decommit pages");
        } else {
            debug!(offset, len, "decommitted pages");
        }
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("size", &self.size)
            .field("page_size", &self.page_size)
            .field("committed_lo", &self.committed_lo.get())
            .field("committed_hi", &self.committed_hi.get())
            .finish()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if let Err(reason) = sys::release(self.base, self.size) {
            warn!(size = self.size, %reason, "failed to unmap reservation");
        }
    }
}

#[cfg(unix)]
mod sys {
    use super::FALLBACK_PAGE_SIZE;
    use nix::sys::mman::{madvise, mmap_anonymous, mprotect, munmap, MapFlags, MmapAdvise, ProtFlags};
    use nix::unistd::{sysconf, SysconfVar};
    use std::num::NonZeroUsize;
    use std::ptr::NonNull;

    pub fn page_size() -> usize {
        match sysconf(SysconfVar::PAGE_SIZE) {
            Ok(Some(size)) if size > 0 => size as usize,
            _ => FALLBACK_PAGE_SIZE,
        }
    }

    pub fn reserve(size: usize) -> Result<NonNull<u8>, String> {
        let len = NonZeroUsize::new(size).ok_or_else(|| "zero-length reservation".to_string())?;

        #[allow(unused_mut)]
        let mut flags = MapFlags::MAP_PRIVATE;
        #[cfg(target_os = "linux")]
        {
            flags |= MapFlags::MAP_NORESERVE;
        }

        // SAFETY: a fresh anonymous mapping does not alias existing memory
        let ptr = unsafe { mmap_anonymous(None, len, ProtFlags::PROT_NONE, flags) }
            .map_err(|e| e.to_string())?;
        Ok(ptr.cast())
    }

    pub fn commit(ptr: NonNull<u8>, len: usize) -> Result<(), String> {
        // SAFETY: the range is page aligned and inside our own mapping
        unsafe { mprotect(ptr.cast(), len, ProtFlags::PROT_READ | ProtFlags::PROT_WRITE) }
            .map_err(|e| e.to_string())
    }

    pub fn decommit(ptr: NonNull<u8>, len: usize) -> Result<(), String> {
        // SAFETY: the range is page aligned, inside our mapping and no longer referenced
        unsafe {
            madvise(ptr.cast(), len, MmapAdvise::MADV_DONTNEED).map_err(|e| e.to_string())?;
            mprotect(ptr.cast(), len, ProtFlags::PROT_NONE).map_err(|e| e.to_string())
        }
    }

    pub fn release(ptr: NonNull<u8>, len: usize) -> Result<(), String> {
        // SAFETY: unmaps exactly the region returned by `reserve`
        unsafe { munmap(ptr.cast(), len) }.map_err(|e| e.to_string())
    }
}

#[cfg(not(unix))]
mod sys {
    use super::FALLBACK_PAGE_SIZE;
    use std::ptr::NonNull;

    const UNSUPPORTED: &str = "commit-on-demand requires a unix target";

    pub fn page_size() -> usize {
        FALLBACK_PAGE_SIZE
    }

    pub fn reserve(_size: usize) -> Result<NonNull<u8>, String> {
        Err(UNSUPPORTED.to_string())
    }

    pub fn commit(_ptr: NonNull<u8>, _len: usize) -> Result<(), String> {
        Err(UNSUPPORTED.to_string())
    }

    pub fn decommit(_ptr: NonNull<u8>, _len: usize) -> Result<(), String> {
        Ok(())
    }

    pub fn release(_ptr: NonNull<u8>, _len: usize) -> Result<(), String> {
        Ok(())
    }
}
