/*!
 * Collections Module
 * Arena-backed growable vector, byte string and FNV hashing
 */

pub mod hash;
pub mod string;
pub mod vec;

// Re-export for convenience
pub use hash::{fnv1a_64, FnvBuildHasher, FnvHasher};
pub use string::{ArenaString, Split, Tokens};
pub use vec::ArenaVec;
