//! Linear octree engine for one partition of a distributed adaptive mesh.
//!
//! The partition owns a Morton-sorted sequence of leaf octants and a read-only
//! layer of ghost octants mirrored from its neighbors. On top of that it
//! provides:
//!
//! - Morton encoding and binary-search lookups
//! - refine and coarse with index remaps for external per-octant data
//! - 2:1 balancing over refinement markers
//! - face, edge and node neighbor resolution with periodic wrap-around
//! - derived node connectivity and face intersections
//!
//! Partitioning, ghost exchange and element geometry belong to the driver.
//!
//! ```
//! use local_octree::{LocalTree, TreeConfig};
//!
//! let mut tree = LocalTree::new(TreeConfig::new(2)).unwrap();
//! tree.global_refine();
//! tree.set_marker(0, 1).unwrap();
//! tree.local_balance(true, true);
//! tree.refine();
//! assert_eq!(tree.num_octants(), 7);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod morton;
pub mod octant;
pub mod remap;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::TreeConfig;
pub use constants::{TreeConstants, INVALID_MORTON, MAX_LEVEL_2D, MAX_LEVEL_3D};
pub use error::{TreeError, TreeResult};
pub use octant::Octant;
pub use remap::IndexRemap;
pub use tree::{
  BalanceStats, Bound, CoarseOutcome, Connectivity, DeferReason, Intersection, IntersectionKind,
  Intersections, LocalTree, MergeStatus, MortonOwner, Neighbors,
};
