/*!
 * Collections Property Tests
 * ArenaVec against Vec, and ArenaString against std string operations
 */

use crate::common::Aligned;
use proptest::prelude::*;
use tip_arena::{arena_format, Arena, ArenaString, ArenaVec};

#[derive(Debug, Clone)]
enum Op {
    Push(u32),
    Pop,
    Extend(Vec<u32>),
    Foreign,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u32>().prop_map(Op::Push),
        1 => Just(Op::Pop),
        1 => prop::collection::vec(any::<u32>(), 0..8).prop_map(Op::Extend),
        1 => Just(Op::Foreign),
    ]
}

fn word() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(vec![b'a', b'b', b',', b' ']), 0..24)
}

proptest! {
    #[test]
    fn prop_vec_matches_std(ops in prop::collection::vec(op(), 0..128)) {
        let mut buf = Aligned::<32768>::new();
        let arena = Arena::new(buf.bytes());
        let mut ours = ArenaVec::new();
        let mut model = Vec::new();

        for op in ops {
            match op {
                Op::Push(x) => {
                    ours.push(&arena, x).unwrap();
                    model.push(x);
                }
                Op::Pop => prop_assert_eq!(ours.pop(), model.pop()),
                Op::Extend(items) => {
                    ours.extend_from_slice(&arena, &items).unwrap();
                    model.extend_from_slice(&items);
                }
                Op::Foreign => {
                    arena.alloc(0u8).unwrap();
                }
            }
            prop_assert!(ours.capacity() >= ours.len());
        }
        prop_assert_eq!(ours.as_slice(), model.as_slice());
    }

    #[test]
    fn prop_concat_matches_format(a in word(), b in word(), in_place in any::<bool>()) {
        let mut buf = Aligned::<256>::new();
        let arena = Arena::new(buf.bytes());
        let head = ArenaString::copy_bytes(&arena, &a).unwrap();
        if !in_place {
            arena.alloc(0u8).unwrap();
        }
        let joined = head.concat(&arena, ArenaString::from(b.as_slice())).unwrap();

        let mut expected = a.clone();
        expected.extend_from_slice(&b);
        prop_assert_eq!(joined.as_bytes(), expected.as_slice());
        prop_assert_eq!(head.as_bytes(), a.as_slice());
    }

    #[test]
    fn prop_format_matches_std(n in any::<i64>(), w in word()) {
        let mut buf = Aligned::<256>::new();
        let arena = Arena::new(buf.bytes());
        let text = String::from_utf8(w).unwrap();
        let s = arena_format!(&arena, "{}:{:x}|{}", n, n, text).unwrap();
        prop_assert_eq!(s.to_string(), format!("{}:{:x}|{}", n, n, text));
    }

    #[test]
    fn prop_split_rejoins(w in word()) {
        let s = ArenaString::from(w.as_slice());
        let pieces: Vec<&[u8]> = s.split(b",").map(|p| p.as_bytes()).collect();
        prop_assert_eq!(pieces.len(), w.iter().filter(|&&c| c == b',').count() + 1);
        prop_assert_eq!(pieces.join(&b','), w);
    }

    #[test]
    fn prop_tokens_have_no_delimiters(w in word()) {
        let s = ArenaString::from(w.as_slice());
        let tokens: Vec<ArenaString<'_>> = s.tokenize(b", ").collect();
        for (i, token) in tokens.iter().enumerate() {
            prop_assert!(!token.as_bytes().iter().any(|c| b", ".contains(c)));
            // Only the last token may be empty
            prop_assert!(!token.is_empty() || i + 1 == tokens.len());
        }
    }
}
