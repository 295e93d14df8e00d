#![forbid(unsafe_code)]
//! treegen-core: value types shared by every treegen crate.
//!
//! - `Tree`: owned, canonicalizable unordered rooted tree (API boundary type).
//! - `TreeArena`: hash-consed node arena the generators work in.
//! - Partition enumeration, fingerprints, configuration, and errors.
//!
//! Nothing here spawns threads or touches the OS.

pub mod arena;
pub mod budget;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod partition;
pub mod prelude;
pub mod tree;
