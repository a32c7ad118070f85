/*!
 * Arena String
 *
 * Byte string whose contents live in an arena (or anywhere that outlives it).
 *
 * `ArenaString` is a `Copy` view: creating, cloning, concatenating and
 * formatting go through an arena, while trimming, splitting and comparing
 * only move the view bounds. Concatenation reuses the tip trick from
 * `ArenaVec`: a head that ends at the frontier of an upward arena is extended
 * in place and only the tail is copied.
 *
 * Contents are bytes, not necessarily UTF-8; [`ArenaString::to_str`] checks.
 */

use super::hash::fnv1a_64;
use crate::core::errors::{ArenaError, ArenaResult};
use crate::core::types::AllocFlags;
use crate::memory::Arena;
use std::cmp::Ordering;
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};
use std::ptr::{self, NonNull};
use std::str::Utf8Error;

/// Format into a new [`ArenaString`]
///
/// ```ignore
/// let key = arena_format!(&arena, "key-{}", 5)?;
/// ```
#[macro_export]
macro_rules! arena_format {
    ($arena:expr, $($arg:tt)*) => {
        $crate::collections::ArenaString::format($arena, format_args!($($arg)*))
    };
}

/// Arena-owned byte string
#[derive(Clone, Copy, Default)]
pub struct ArenaString<'a> {
    bytes: &'a [u8],
}

impl<'a> ArenaString<'a> {
    pub const EMPTY: ArenaString<'static> = ArenaString { bytes: &[] };

    /// View over bytes that outlive the string
    #[inline]
    pub const fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Copy `bytes` into the arena
    pub fn copy_bytes(arena: &'a Arena<'_>, bytes: &[u8]) -> ArenaResult<Self> {
        let copied = arena.alloc_slice_copy(bytes)?;
        Ok(Self { bytes: copied })
    }

    /// Format `args` into the arena
    ///
    /// Measures the output first, then allocates exactly that many bytes and
    /// formats in place. Prefer the [`arena_format!`] macro.
    pub fn format(arena: &'a Arena<'_>, args: fmt::Arguments<'_>) -> ArenaResult<Self> {
        if let Some(literal) = args.as_str() {
            return Self::copy_bytes(arena, literal.as_bytes());
        }

        let mut counter = Counter(0);
        counter.write_fmt(args).map_err(|_| ArenaError::Format)?;

        let ptr = arena.alloc_raw(1, 1, counter.0, AllocFlags::NO_ZERO)?;
        // SAFETY: fresh allocation of counter.0 bytes, exclusively ours
        let out: &'a mut [u8] = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), counter.0) };
        let mut writer = SliceWriter { out, written: 0 };
        if writer.write_fmt(args).is_err() {
            // SAFETY: the block is still the tip and nothing else refers to it
            unsafe { arena.free_tip(ptr, counter.0) };
            return Err(ArenaError::Format);
        }

        let SliceWriter { out, written } = writer;
        let out: &'a [u8] = out;
        Ok(Self {
            bytes: &out[..written],
        })
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub const fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    pub fn to_str(&self) -> Result<&'a str, Utf8Error> {
        std::str::from_utf8(self.bytes)
    }

    /// Whether the string ends exactly at the arena frontier
    #[inline]
    pub fn is_tip(&self, arena: &Arena<'_>) -> bool {
        !self.is_empty() && arena.is_tip(self.as_ptr(), self.len())
    }

    // =========================================================================
    // Arena operations
    // =========================================================================

    /// Arena-owned copy
    ///
    /// Empty strings and strings already at the tip are returned unchanged.
    pub fn clone_in(self, arena: &'a Arena<'_>) -> ArenaResult<Self> {
        if self.is_empty() || self.is_tip(arena) {
            return Ok(self);
        }
        let ptr = arena.alloc_raw(1, 1, self.len(), AllocFlags::NO_ZERO)?;
        // SAFETY: fresh block of len bytes; ptr::copy tolerates overlap
        unsafe {
            ptr::copy(self.as_ptr(), ptr.as_ptr(), self.len());
            Ok(Self::from_raw(ptr, self.len()))
        }
    }

    /// `self` followed by `tail`
    ///
    /// Extends `self` in place when it is at the tip of an upward arena;
    /// otherwise both parts are copied into a fresh block. An empty head
    /// yields `tail` itself when it is at the tip. `tail` is never modified.
    pub fn concat(self, arena: &'a Arena<'_>, tail: ArenaString<'a>) -> ArenaResult<Self> {
        if self.is_empty() {
            return tail.clone_in(arena);
        }
        self.append(arena, tail.as_bytes())
    }

    /// `self` followed by `bytes`
    pub fn append(self, arena: &'a Arena<'_>, bytes: &[u8]) -> ArenaResult<Self> {
        if self.is_empty() {
            return Self::copy_bytes(arena, bytes);
        }
        if bytes.is_empty() {
            return Ok(self);
        }

        let head = self.len();
        let total = head.checked_add(bytes.len()).ok_or(ArenaError::OutOfMemory {
            requested: usize::MAX,
            align: 1,
            available: arena.remaining(),
        })?;

        // SAFETY: self.bytes is a live slice, so its pointer is non-null
        let head_ptr = unsafe { NonNull::new_unchecked(self.as_ptr() as *mut u8) };
        if let Some(base) = arena.try_extend(head_ptr, head, bytes.len(), AllocFlags::NO_ZERO)? {
            // SAFETY: [base + head, base + total) was just allocated for us
            unsafe {
                ptr::copy_nonoverlapping(bytes.as_ptr(), base.as_ptr().add(head), bytes.len());
                return Ok(Self::from_raw(base, total));
            }
        }

        let ptr = arena.alloc_raw(1, 1, total, AllocFlags::NO_ZERO)?;
        // SAFETY: fresh block of total bytes, disjoint from both sources
        unsafe {
            ptr::copy_nonoverlapping(self.as_ptr(), ptr.as_ptr(), head);
            ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr().add(head), bytes.len());
            Ok(Self::from_raw(ptr, total))
        }
    }

    /// # Safety
    ///
    /// `[ptr, ptr + len)` must be initialized and immutable for `'a`.
    #[inline]
    unsafe fn from_raw(ptr: NonNull<u8>, len: usize) -> Self {
        Self {
            bytes: unsafe { std::slice::from_raw_parts(ptr.as_ptr(), len) },
        }
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Split on every occurrence of `sep`
    ///
    /// Adjacent separators yield empty pieces and a trailing separator yields
    /// a trailing empty piece: `"a,b,,c,"` gives `a`, `b`, ``, `c`, ``.
    ///
    /// # Panics
    ///
    /// If `sep` is empty.
    pub fn split<'p>(self, sep: &'p [u8]) -> Split<'a, 'p> {
        assert!(!sep.is_empty(), "split separator must not be empty");
        Split {
            rest: Some(self.bytes),
            sep,
        }
    }

    /// Tokens separated by runs of bytes from `delims`
    ///
    /// Leading delimiters and delimiter runs are skipped; a trailing
    /// delimiter yields one trailing empty token. An input made only of
    /// delimiters yields nothing.
    pub fn tokenize<'p>(self, delims: &'p [u8]) -> Tokens<'a, 'p> {
        let start = self
            .bytes
            .iter()
            .position(|b| !delims.contains(b))
            .unwrap_or(self.len());
        let rest = &self.bytes[start..];
        Tokens {
            rest,
            delims,
            done: rest.is_empty(),
        }
    }

    pub fn trim(self) -> Self {
        self.trim_start().trim_end()
    }

    pub fn trim_start(self) -> Self {
        let start = self
            .bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(self.len());
        Self {
            bytes: &self.bytes[start..],
        }
    }

    pub fn trim_end(self) -> Self {
        let end = self
            .bytes
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        Self {
            bytes: &self.bytes[..end],
        }
    }

    #[inline]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.bytes.starts_with(prefix)
    }

    #[inline]
    pub fn ends_with(&self, suffix: &[u8]) -> bool {
        self.bytes.ends_with(suffix)
    }

    /// Byte offset of the first occurrence of `needle`
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        find_bytes(self.bytes, needle)
    }

    /// 64-bit FNV-1a hash of the contents
    #[inline]
    pub fn hash64(&self) -> u64 {
        fnv1a_64(self.bytes)
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl<'a> From<&'a str> for ArenaString<'a> {
    #[inline]
    fn from(s: &'a str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for ArenaString<'a> {
    #[inline]
    fn from(bytes: &'a [u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl PartialEq for ArenaString<'_> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for ArenaString<'_> {}

impl PartialEq<str> for ArenaString<'_> {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for ArenaString<'_> {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialOrd for ArenaString<'_> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArenaString<'_> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(other.bytes)
    }
}

impl Hash for ArenaString<'_> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.bytes);
        state.write_u8(0xff);
    }
}

impl fmt::Display for ArenaString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&String::from_utf8_lossy(self.bytes), f)
    }
}

impl fmt::Debug for ArenaString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&String::from_utf8_lossy(self.bytes), f)
    }
}

/// Iterator returned by [`ArenaString::split`]
#[derive(Debug, Clone)]
pub struct Split<'a, 'p> {
    rest: Option<&'a [u8]>,
    sep: &'p [u8],
}

impl<'a> Iterator for Split<'a, '_> {
    type Item = ArenaString<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        match find_bytes(rest, self.sep) {
            Some(i) => {
                self.rest = Some(&rest[i + self.sep.len()..]);
                Some(ArenaString::from_bytes(&rest[..i]))
            }
            None => {
                self.rest = None;
                Some(ArenaString::from_bytes(rest))
            }
        }
    }
}

/// Iterator returned by [`ArenaString::tokenize`]
#[derive(Debug, Clone)]
pub struct Tokens<'a, 'p> {
    rest: &'a [u8],
    delims: &'p [u8],
    done: bool,
}

impl<'a> Iterator for Tokens<'a, '_> {
    type Item = ArenaString<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rest = self.rest;
        let Some(end) = rest.iter().position(|b| self.delims.contains(b)) else {
            // Last token; empty when the input ended with a delimiter
            self.done = true;
            return Some(ArenaString::from_bytes(rest));
        };

        let after = rest[end..]
            .iter()
            .position(|b| !self.delims.contains(b))
            .map_or(rest.len(), |i| end + i);
        self.rest = &rest[after..];
        Some(ArenaString::from_bytes(&rest[..end]))
    }
}

/// Counts formatted bytes without storing them
struct Counter(usize);

impl fmt::Write for Counter {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

/// Writes formatted bytes into a fixed slice
struct SliceWriter<'o> {
    out: &'o mut [u8],
    written: usize,
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.written + s.len();
        let dest = self.out.get_mut(self.written..end).ok_or(fmt::Error)?;
        dest.copy_from_slice(s.as_bytes());
        self.written = end;
        Ok(())
    }
}
