/*!
 * Arena Property Tests
 * Alignment, bounds, disjointness and rollback over random request sequences
 */

use crate::common::Aligned;
use proptest::prelude::*;
use tip_arena::{AllocFlags, Arena, ArenaError, ArenaResult, OomPolicy};

const REGION: usize = 4096;

fn requests() -> impl Strategy<Value = Vec<(usize, u32)>> {
    prop::collection::vec((0usize..256, 0u32..7), 1..64)
}

proptest! {
    #[test]
    fn prop_allocations_aligned_bounded_disjoint(reqs in requests()) {
        let mut buf = Aligned::<REGION>::new();
        let region = buf.bytes();
        let start = region.as_ptr() as usize;
        let arena = Arena::with_policy(region, OomPolicy::Soft);

        let mut blocks: Vec<(usize, usize)> = Vec::new();
        let mut last_used = 0;
        for (size, shift) in reqs {
            let align = 1usize << shift;
            match arena.alloc_raw(size, align, 1, AllocFlags::NONE) {
                Ok(ptr) => {
                    let addr = ptr.as_ptr() as usize;
                    prop_assert_eq!(addr % align, 0);
                    prop_assert!(addr >= start && addr + size <= start + REGION);
                    for &(other, len) in &blocks {
                        prop_assert!(addr + size <= other || other + len <= addr);
                    }
                    blocks.push((addr, size));
                }
                Err(err) => {
                    let is_oom = matches!(err, ArenaError::OutOfMemory { .. });
                    prop_assert!(is_oom);
                }
            }
            // The frontier only moves forward
            prop_assert!(arena.used() >= last_used);
            prop_assert!(arena.used() <= REGION);
            last_used = arena.used();
        }
    }

    #[test]
    fn prop_scratch_never_overlaps_parent(reqs in requests()) {
        let mut buf = Aligned::<REGION>::new();
        let arena = Arena::with_policy(buf.bytes(), OomPolicy::Soft);
        let scratch = arena.scratch();

        let mut parent_blocks: Vec<(usize, usize)> = Vec::new();
        let mut scratch_blocks: Vec<(usize, usize)> = Vec::new();
        for (i, (size, shift)) in reqs.into_iter().enumerate() {
            let align = 1usize << shift;
            let (side, blocks) = if i % 2 == 0 {
                (&arena, &mut parent_blocks)
            } else {
                (&scratch, &mut scratch_blocks)
            };
            if let Ok(ptr) = side.alloc_raw(size, align, 1, AllocFlags::NONE) {
                blocks.push((ptr.as_ptr() as usize, size));
            }
        }

        for &(p, plen) in &parent_blocks {
            for &(s, slen) in &scratch_blocks {
                prop_assert!(p + plen <= s || s + slen <= p);
            }
        }
        prop_assert!(arena.used() + scratch.used() <= REGION);
    }

    #[test]
    fn prop_checkpoint_restores_frontier(
        before in requests(),
        inside in requests(),
    ) {
        let mut buf = Aligned::<REGION>::new();
        let mut arena = Arena::with_policy(buf.bytes(), OomPolicy::Soft);
        for (size, shift) in before {
            let _ = arena.alloc_raw(size, 1 << shift, 1, AllocFlags::NONE);
        }
        let used = arena.used();

        let result: ArenaResult<()> = arena.checkpoint(|cp| {
            for (size, shift) in inside {
                cp.alloc_raw(size, 1 << shift, 1, AllocFlags::NONE)?;
            }
            // Force the rollback path even when everything fit
            cp.alloc_raw(REGION + 1, 1, 1, AllocFlags::NONE)?;
            Ok(())
        });

        prop_assert!(result.is_err());
        prop_assert_eq!(arena.used(), used);
        prop_assert_eq!(arena.checkpoint_depth(), 0);
    }
}
