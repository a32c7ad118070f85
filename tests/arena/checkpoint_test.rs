/*!
 * Checkpoint Recovery Tests
 * OOM unwinding to the nearest checkpoint, across scratch regions and nesting
 */

use crate::common::Aligned;
use pretty_assertions::assert_eq;
use tip_arena::{AllocFlags, Arena, ArenaError, ArenaResult, ArenaVec};

#[test]
fn test_oom_unwinds_to_checkpoint() {
    let mut buf = Aligned::<1024>::new();
    let mut arena = Arena::new(buf.bytes());
    arena.alloc_raw(8, 8, 3, AllocFlags::NONE).unwrap();
    let before = arena.used();

    let result: ArenaResult<()> = arena.checkpoint(|cp| {
        for _ in 0..10 {
            cp.alloc([0u64; 8])?;
        }
        cp.alloc_raw(1000, 1, 1, AllocFlags::NONE)?;
        unreachable!("the allocation above cannot fit");
    });

    assert!(matches!(result, Err(ArenaError::OutOfMemory { requested: 1000, .. })));
    assert_eq!(arena.used(), before);
    assert_eq!(arena.checkpoint_depth(), 0);

    // Fatal policy is back in force outside the scope
    let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = arena.alloc_raw(2000, 1, 1, AllocFlags::NONE);
    }));
    assert!(caught.is_err());
}

#[test]
fn test_failed_growth_inside_checkpoint() {
    let mut buf = Aligned::<256>::new();
    let mut arena = Arena::new(buf.bytes());

    let result = arena.checkpoint(|cp| {
        let mut v = ArenaVec::new();
        for i in 0..1000u64 {
            v.push(cp, i)?;
        }
        Ok(v.len())
    });

    assert!(result.unwrap_err().is_oom());
    assert_eq!(arena.used(), 0);
}

#[test]
fn test_scratch_oom_reaches_parent_checkpoint() {
    let mut buf = Aligned::<512>::new();
    let mut arena = Arena::new(buf.bytes());
    arena.alloc([0u8; 100]).unwrap();

    let result: ArenaResult<usize> = arena.checkpoint(|cp| {
        cp.alloc([0u8; 100])?;
        let scratch = cp.scratch();
        scratch.alloc([0u8; 200])?;
        scratch.alloc([0u8; 200])?;
        Ok(scratch.used())
    });

    assert!(result.is_err());
    assert_eq!(arena.used(), 100);
    assert!(!arena.has_scratch());
    assert_eq!(arena.remaining(), 412);
}

#[test]
fn test_checkpoint_on_scratch_region() {
    let mut buf = Aligned::<256>::new();
    let arena = Arena::new(buf.bytes());
    let mut scratch = arena.scratch();
    scratch.alloc([0u8; 16]).unwrap();

    let result: ArenaResult<()> = scratch.checkpoint(|cp| {
        cp.alloc([0u8; 64])?;
        cp.alloc([0u8; 512])?;
        Ok(())
    });

    assert!(result.is_err());
    assert_eq!(scratch.used(), 16);
}

#[test]
fn test_inner_failure_recovered_by_caller() {
    let mut buf = Aligned::<128>::new();
    let mut arena = Arena::new(buf.bytes());

    let kept = arena
        .checkpoint(|cp| {
            let first = *cp.alloc(7u64)?;
            let attempt: ArenaResult<()> = cp.checkpoint(|inner| {
                inner.alloc([0u8; 256])?;
                Ok(())
            });
            // Recover locally and carry on with a smaller request
            if attempt.is_err() {
                cp.alloc([0u8; 32])?;
            }
            Ok(first)
        })
        .unwrap();

    assert_eq!(kept, 7);
    assert_eq!(arena.used(), 40);
}

#[test]
fn test_non_oom_error_also_rolls_back() {
    let mut buf = Aligned::<64>::new();
    let mut arena = Arena::new(buf.bytes());

    let result: ArenaResult<()> = arena.checkpoint(|cp| {
        cp.alloc([0u8; 16])?;
        Err(ArenaError::Format)
    });

    assert_eq!(result, Err(ArenaError::Format));
    assert_eq!(arena.used(), 0);
}
