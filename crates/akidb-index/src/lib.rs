//! Vector index implementations for AkiDB.
//!
//! - `FlatIndex`: exact-membership in-memory index used as the authoritative
//!   store in front of the WAL and the remote tier.

mod flat;

pub use flat::FlatIndex;
