/*!
 * Arena String Tests
 * Building, joining and slicing strings inside arenas and scratch regions
 */

use crate::common::Aligned;
use pretty_assertions::assert_eq;
use tip_arena::{arena_format, fnv1a_64, Arena, ArenaString, OomPolicy};

fn collect<'a>(pieces: impl Iterator<Item = ArenaString<'a>>) -> Vec<String> {
    pieces.map(|p| p.to_string()).collect()
}

#[test]
fn test_build_path_by_concatenation() {
    let mut buf = Aligned::<256>::new();
    let arena = Arena::new(buf.bytes());

    let mut path = ArenaString::copy_bytes(&arena, b"/usr").unwrap();
    let start = path.as_ptr();
    for part in ["/local", "/share", "/doc"] {
        path = path.concat(&arena, part.into()).unwrap();
    }
    assert_eq!(path, "/usr/local/share/doc");
    // Every step extended the tip
    assert_eq!(path.as_ptr(), start);
    assert_eq!(arena.used(), path.len());
}

#[test]
fn test_concat_in_scratch_copies() {
    let mut buf = Aligned::<256>::new();
    let arena = Arena::new(buf.bytes());
    let head = ArenaString::copy_bytes(&arena, b"left").unwrap();

    let scratch = arena.scratch();
    let joined = head.concat(&scratch, "+right".into()).unwrap();
    assert_eq!(joined, "left+right");
    assert_ne!(joined.as_ptr(), head.as_ptr());
    assert_eq!(scratch.used(), joined.len());
    assert_eq!(head, "left");
}

#[test]
fn test_format_sizes_exactly() {
    let mut buf = Aligned::<128>::new();
    let arena = Arena::new(buf.bytes());

    let s = arena_format!(&arena, "{}-{:04}-{:>3}", "id", 7, 'x').unwrap();
    assert_eq!(s, "id-0007-  x");
    assert_eq!(arena.used(), s.len());

    let empty = arena_format!(&arena, "{}", "").unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_format_oom_is_reported() {
    let mut buf = Aligned::<8>::new();
    let arena = Arena::with_policy(buf.bytes(), OomPolicy::Soft);
    let err = arena_format!(&arena, "{}", 1234567890123u64).unwrap_err();
    assert!(err.is_oom());
    assert_eq!(arena.used(), 0);
}

#[test]
fn test_split_lines_with_trailing_newline() {
    let text = ArenaString::from("alpha\nbeta\n\ngamma\n");
    assert_eq!(
        collect(text.split(b"\n")),
        vec!["alpha", "beta", "", "gamma", ""]
    );
}

#[test]
fn test_split_multibyte_separator() {
    let s = ArenaString::from("a::b::::c::");
    assert_eq!(collect(s.split(b"::")), vec!["a", "b", "", "c", ""]);
    assert_eq!(collect(ArenaString::from("no-sep").split(b"::")), vec!["no-sep"]);
}

#[test]
#[should_panic(expected = "must not be empty")]
fn test_split_empty_separator_panics() {
    let _ = ArenaString::from("abc").split(b"").next();
}

#[test]
fn test_tokenize_fields() {
    let line = ArenaString::from("  GET   /index.html\tHTTP/1.1");
    assert_eq!(
        collect(line.tokenize(b" \t")),
        vec!["GET", "/index.html", "HTTP/1.1"]
    );

    // Trailing delimiters leave one empty token
    let line = ArenaString::from("k=v;  ");
    assert_eq!(collect(line.tokenize(b"=; ")), vec!["k", "v", ""]);
}

#[test]
fn test_trim_then_split() {
    let record = ArenaString::from("  x, y ,z  ");
    let fields: Vec<String> = record
        .trim()
        .split(b",")
        .map(|f| f.trim().to_string())
        .collect();
    assert_eq!(fields, vec!["x", "y", "z"]);
}

#[test]
fn test_hash_matches_fnv() {
    let mut buf = Aligned::<64>::new();
    let arena = Arena::new(buf.bytes());
    let s = arena_format!(&arena, "key-{}", 3).unwrap();
    assert_eq!(s.hash64(), fnv1a_64(b"key-3"));
    assert_eq!(s.to_str(), Ok("key-3"));
}
