//! Errors raised while configuring a tree or accepting driver input.
//!
//! Depth-limit clamping, empty neighbor sets and deferred coarsening are
//! normal states and never show up here.

use thiserror::Error;

/// Invalid configuration or malformed input handed to a [`LocalTree`].
///
/// [`LocalTree`]: crate::tree::LocalTree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
  #[error("unsupported dimension {0}: only 2 and 3 are valid")]
  InvalidDimension(u8),

  #[error("balance codimension {codim} is out of range 1..={dim}")]
  InvalidBalanceCodimension { codim: u8, dim: u8 },

  #[error("periodic face {face} has a non-periodic opposite face")]
  UnpairedPeriodicFace { face: u8 },

  #[error("octant dimension {found} does not match tree dimension {expected}")]
  DimensionMismatch { expected: u8, found: u8 },

  #[error("{sequence} octant {index} is misaligned or outside the domain")]
  OctantOutsideDomain { sequence: &'static str, index: usize },

  #[error("{sequence} octants are not strictly ascending at index {index}")]
  UnsortedSequence { sequence: &'static str, index: usize },

  #[error("{sequence} octant {index} overlaps its predecessor")]
  OverlappingOctants { sequence: &'static str, index: usize },

  #[error("{ghosts} ghosts were given with {global_indices} global indices")]
  GhostIndexMismatch { ghosts: usize, global_indices: usize },

  #[error("octant index {index} out of range (len {len})")]
  IndexOutOfRange { index: u32, len: u32 },
}

/// Result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
