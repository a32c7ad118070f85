/*!
 * Arena Vector Tests
 * Growth across scratch regions, checkpoints and borrowed storage
 */

use crate::common::Aligned;
use pretty_assertions::assert_eq;
use tip_arena::{Arena, ArenaResult, ArenaVec, OomPolicy};

#[test]
fn test_scenario_fibonacci_across_scratch() {
    let mut buf = Aligned::<2048>::new();
    let arena = Arena::new(buf.bytes());
    let mut v = ArenaVec::with_capacity(&arena, 64).unwrap();
    v.push(&arena, 0u64).unwrap();
    v.push(&arena, 1u64).unwrap();

    {
        let scratch = arena.scratch();
        for i in 2..80 {
            let next = v[i - 1] + v[i - 2];
            // Even steps grow through the scratch region, odd ones through the arena
            if i % 2 == 0 {
                v.push(&scratch, next).unwrap();
            } else {
                v.push(&arena, next).unwrap();
            }
        }

        assert_eq!(v.len(), 80);
        assert_eq!(v[10], 55);
        assert_eq!(v[20], 6765);
        assert_eq!(v[79], 14_472_334_024_676_221);
        assert!(v.capacity() > 64);
        assert!(scratch.used() > 0);
    }

    // The vector's original block stays in the arena
    assert_eq!(arena.used(), 64 * 8);
}

#[test]
fn test_growth_keeps_contents() {
    let mut buf = Aligned::<4096>::new();
    let arena = Arena::new(buf.bytes());
    let mut v = ArenaVec::new();
    for i in 0..100u32 {
        v.push(&arena, i).unwrap();
        // Interleave foreign allocations so some growths relocate
        if i % 17 == 0 {
            arena.alloc(i as u8).unwrap();
        }
    }
    assert_eq!(v.len(), 100);
    assert!(v.iter().copied().eq(0..100));
}

#[test]
fn test_extend_and_reserve() {
    let mut buf = Aligned::<1024>::new();
    let arena = Arena::new(buf.bytes());
    let mut v = ArenaVec::new();
    v.extend_from_slice(&arena, &[1u16, 2, 3]).unwrap();
    v.reserve(&arena, 50).unwrap();
    assert!(v.capacity() >= 53);

    let cap = v.capacity();
    v.extend_from_slice(&arena, &[4, 5]).unwrap();
    assert_eq!(v.capacity(), cap);
    assert_eq!(&v[..], &[1, 2, 3, 4, 5]);

    v.clear();
    assert!(v.is_empty());
    assert_eq!(v.capacity(), cap);
}

#[test]
fn test_borrowed_view_moves_into_arena() {
    let mut buf = Aligned::<256>::new();
    let arena = Arena::new(buf.bytes());
    let source = vec![3u8, 1, 4, 1, 5];
    let mut v = ArenaVec::from_borrowed(&source);
    assert_eq!(v.as_ptr(), source.as_ptr());
    assert_eq!(v.pop(), Some(5));

    v.reserve(&arena, 0).unwrap();
    assert!(!v.is_borrowed());
    v.as_mut_slice().sort_unstable();
    assert_eq!(v.as_slice(), &[1, 1, 3, 4]);
    assert_eq!(source, vec![3, 1, 4, 1, 5]);
}

#[test]
fn test_growth_failure_rolls_back_checkpoint() {
    let mut buf = Aligned::<512>::new();
    let mut arena = Arena::with_policy(buf.bytes(), OomPolicy::Fatal);
    let kept: ArenaResult<usize> = arena.checkpoint(|cp| {
        let mut small = ArenaVec::with_capacity(cp, 4)?;
        small.push(cp, 1u32)?;
        Ok(small.len())
    });
    assert_eq!(kept, Ok(1));
    let used = arena.used();

    let failed: ArenaResult<usize> = arena.checkpoint(|cp| {
        let mut big = ArenaVec::new();
        for i in 0..1000u64 {
            big.push(cp, i)?;
        }
        Ok(big.len())
    });
    assert!(failed.unwrap_err().is_oom());
    assert_eq!(arena.used(), used);
}
