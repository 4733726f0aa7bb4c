//! Per-dimension tree constants.
//!
//! The tables are `static` values built at compile time and shared by
//! reference. A tree picks one instance at construction through
//! [`TreeConstants::for_dim`] and never mutates it.
//!
//! # Entity Numbering
//!
//! Every face, edge and node of an octant is described by an offset vector
//! with components in `{-1, 0, +1}`. Translating an octant by its own size
//! along that vector yields the same-size virtual neighbor through the entity.
//!
//! ```text
//! Faces (one non-zero axis):
//!   0 = -X   1 = +X   2 = -Y   3 = +Y   4 = -Z   5 = +Z
//!
//! Nodes (binary: ZYX, 0 = low side, 1 = high side):
//!   0 = (0,0,0)    4 = (0,0,1)
//!   1 = (1,0,0)    5 = (1,0,1)
//!   2 = (0,1,0)    6 = (0,1,1)
//!   3 = (1,1,0)    7 = (1,1,1)
//!
//! Edges (3D only, two non-zero axes):
//!   0 = -X-Z   1 = +X-Z   2 = -Y-Z   3 = +Y-Z
//!   4 = -X-Y   5 = +X-Y   6 = -X+Y   7 = +X+Y
//!   8 = -X+Z   9 = +X+Z  10 = -Y+Z  11 = +Y+Z
//! ```
//!
//! Children use the node numbering: child `i` sits at node `i` of its parent.
//! In 2D the node table stops at 3 and the Z component is always zero.

use smallvec::SmallVec;

use crate::error::TreeError;

/// Direction vector of a face, edge or node.
pub type Offset = [i8; 3];

/// Finest level reachable in 2D (30 bits per coordinate, 60-bit Morton).
pub const MAX_LEVEL_2D: u8 = 30;

/// Finest level reachable in 3D (20 bits per coordinate, 60-bit Morton).
pub const MAX_LEVEL_3D: u8 = 20;

/// Morton value returned by bound searches that run past the sequence end.
pub const INVALID_MORTON: u64 = u64::MAX;

const FACE_OFFSETS_2D: [Offset; 4] = [[-1, 0, 0], [1, 0, 0], [0, -1, 0], [0, 1, 0]];

const FACE_OFFSETS_3D: [Offset; 6] = [
  [-1, 0, 0], // -X
  [1, 0, 0],  // +X
  [0, -1, 0], // -Y
  [0, 1, 0],  // +Y
  [0, 0, -1], // -Z
  [0, 0, 1],  // +Z
];

const EDGE_OFFSETS_3D: [Offset; 12] = [
  [-1, 0, -1],
  [1, 0, -1],
  [0, -1, -1],
  [0, 1, -1],
  [-1, -1, 0],
  [1, -1, 0],
  [-1, 1, 0],
  [1, 1, 0],
  [-1, 0, 1],
  [1, 0, 1],
  [0, -1, 1],
  [0, 1, 1],
];

const NODE_OFFSETS_2D: [Offset; 4] = [[-1, -1, 0], [1, -1, 0], [-1, 1, 0], [1, 1, 0]];

const NODE_OFFSETS_3D: [Offset; 8] = [
  [-1, -1, -1],
  [1, -1, -1],
  [-1, 1, -1],
  [1, 1, -1],
  [-1, -1, 1],
  [1, -1, 1],
  [-1, 1, 1],
  [1, 1, 1],
];

/// Immutable geometric tables for one space dimension.
#[derive(Debug)]
pub struct TreeConstants {
  /// Space dimension (2 or 3).
  pub dim: u8,
  /// Finest refinement level.
  pub max_level: u8,
  /// Children per octant (`2^dim`).
  pub n_children: u8,
  /// Faces per octant (`2 * dim`).
  pub n_faces: u8,
  /// Edges per octant (12 in 3D, none in 2D).
  pub n_edges: u8,
  /// Corner nodes per octant (`2^dim`).
  pub n_nodes: u8,
  face_offsets: &'static [Offset],
  edge_offsets: &'static [Offset],
  node_offsets: &'static [Offset],
}

/// Constants for quadtrees.
pub static TREE_CONSTANTS_2D: TreeConstants = TreeConstants {
  dim: 2,
  max_level: MAX_LEVEL_2D,
  n_children: 4,
  n_faces: 4,
  n_edges: 0,
  n_nodes: 4,
  face_offsets: &FACE_OFFSETS_2D,
  edge_offsets: &[],
  node_offsets: &NODE_OFFSETS_2D,
};

/// Constants for octrees.
pub static TREE_CONSTANTS_3D: TreeConstants = TreeConstants {
  dim: 3,
  max_level: MAX_LEVEL_3D,
  n_children: 8,
  n_faces: 6,
  n_edges: 12,
  n_nodes: 8,
  face_offsets: &FACE_OFFSETS_3D,
  edge_offsets: &EDGE_OFFSETS_3D,
  node_offsets: &NODE_OFFSETS_3D,
};

impl TreeConstants {
  /// Look up the shared constants for a dimension.
  pub fn for_dim(dim: u8) -> Result<&'static TreeConstants, TreeError> {
    match dim {
      2 => Ok(&TREE_CONSTANTS_2D),
      3 => Ok(&TREE_CONSTANTS_3D),
      other => Err(TreeError::InvalidDimension(other)),
    }
  }

  /// Logical edge length of the whole domain (`2^max_level`).
  #[inline]
  pub fn max_length(&self) -> u32 {
    1u32 << self.max_level
  }

  /// Logical edge length of an octant at `level`.
  #[inline]
  pub fn length(&self, level: u8) -> u32 {
    debug_assert!(level <= self.max_level, "level {} above max level", level);
    1u32 << (self.max_level - level)
  }

  /// Logical face area of an octant at `level`.
  #[inline]
  pub fn area(&self, level: u8) -> u64 {
    (self.length(level) as u64).pow(u32::from(self.dim) - 1)
  }

  /// Logical volume of an octant at `level`.
  #[inline]
  pub fn volume(&self, level: u8) -> u64 {
    (self.length(level) as u64).pow(u32::from(self.dim))
  }

  /// Offset vector of a face.
  #[inline]
  pub fn face_offset(&self, face: u8) -> Offset {
    self.face_offsets[face as usize]
  }

  /// Offset vector of an edge (3D only).
  #[inline]
  pub fn edge_offset(&self, edge: u8) -> Offset {
    self.edge_offsets[edge as usize]
  }

  /// Offset vector of a node.
  #[inline]
  pub fn node_offset(&self, node: u8) -> Offset {
    self.node_offsets[node as usize]
  }

  /// Face on the other side of the octant.
  #[inline]
  pub fn opposite_face(face: u8) -> u8 {
    face ^ 1
  }

  /// Unit coordinates (0 or 1 per axis) of a node, also the position of
  /// child `node` inside its parent.
  #[inline]
  pub fn node_coordinates(&self, node: u8) -> [u32; 3] {
    let z = if self.dim == 3 { u32::from((node >> 2) & 1) } else { 0 };
    [u32::from(node & 1), u32::from((node >> 1) & 1), z]
  }

  /// Faces crossed by an offset vector, in axis order.
  pub fn offset_faces(&self, offset: Offset) -> SmallVec<[u8; 3]> {
    (0..self.dim)
      .filter(|&axis| offset[axis as usize] != 0)
      .map(|axis| 2 * axis + u8::from(offset[axis as usize] > 0))
      .collect()
  }

  /// The two faces sharing an edge.
  pub fn edge_faces(&self, edge: u8) -> [u8; 2] {
    let faces = self.offset_faces(self.edge_offset(edge));
    [faces[0], faces[1]]
  }

  /// The faces sharing a node (`dim` of them).
  pub fn node_faces(&self, node: u8) -> SmallVec<[u8; 3]> {
    self.offset_faces(self.node_offset(node))
  }

  /// Offsets whose adjacency is enforced by 2:1 balancing at `codim`.
  ///
  /// Faces are always included. In 3D codimension 2 adds edges and
  /// codimension 3 adds nodes; in 2D nodes are the codimension-2 entities.
  pub fn balance_offsets(&self, codim: u8) -> SmallVec<[Offset; 26]> {
    let mut offsets: SmallVec<[Offset; 26]> = self.face_offsets.iter().copied().collect();
    if codim >= 2 {
      offsets.extend(self.edge_offsets.iter().copied());
    }
    if codim >= self.dim {
      offsets.extend(self.node_offsets.iter().copied());
    }
    offsets
  }
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
