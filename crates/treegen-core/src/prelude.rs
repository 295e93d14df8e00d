//! Convenient re-exports for downstream crates.

pub use crate::arena::TreeArena;
pub use crate::config::GeneratorConfig;
pub use crate::error::{Error, Result};
pub use crate::hash::Fingerprint;
pub use crate::id::{NodeId, WorkerId};
pub use crate::partition::{compositions, for_each_partition, partitions, partitions_at_most};
pub use crate::tree::Tree;
