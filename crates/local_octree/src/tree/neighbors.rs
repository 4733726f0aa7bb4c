//! Neighbor resolution through faces, edges and nodes.
//!
//! A query translates the octant by its own size along the entity's offset to
//! get a same-size "virtual" neighbor, then looks that cell up in the local and
//! ghost sequences:
//!
//! ```text
//!   coarser / same level           finer
//!   +-------+-------+              +-------+---+---+
//!   |       |       |              |       | a | b |
//!   |   o   |   N   |              |   o   +---+---+
//!   |       |       |              |       | c | d |
//!   +-------+-------+              +-------+---+---+
//!   one octant contains the        leaves inside the virtual cell that
//!   virtual cell's first key       touch o: a and c
//! ```
//!
//! The finer case descends from the virtual cell into the sub-cells on the
//! side facing `o`, probing each with a lower-bound search, so leaves away
//! from the shared entity are never visited.
//!
//! Leaving the domain through a periodic face wraps around; through any other
//! face the result is empty.

use smallvec::SmallVec;

use crate::constants::{Offset, TreeConstants};
use crate::morton;
use crate::octant::Octant;

use super::search;
use super::LocalTree;

/// Neighbors found by a query. Local octants come before ghosts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Neighbors {
  pub indices: SmallVec<[u32; 8]>,
  pub is_ghost: SmallVec<[bool; 8]>,
}

impl Neighbors {
  #[inline]
  pub fn len(&self) -> usize {
    self.indices.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  /// `(index, is_ghost)` pairs.
  pub fn iter(&self) -> impl Iterator<Item = (u32, bool)> + '_ {
    self.indices.iter().copied().zip(self.is_ghost.iter().copied())
  }

  fn push(&mut self, index: u32, is_ghost: bool) {
    self.indices.push(index);
    self.is_ghost.push(is_ghost);
  }
}

impl LocalTree {
  /// Neighbors of `octant` through `face`.
  ///
  /// With `only_internal` the ghost layer is not searched.
  pub fn find_neighbors(&self, octant: &Octant, face: u8, only_internal: bool) -> Neighbors {
    self.find_neighbors_by_offset(octant, self.constants.face_offset(face), only_internal)
  }

  /// Neighbors of `octant` through `edge` (3D only).
  pub fn find_edge_neighbors(&self, octant: &Octant, edge: u8, only_internal: bool) -> Neighbors {
    self.find_neighbors_by_offset(octant, self.constants.edge_offset(edge), only_internal)
  }

  /// Neighbors of `octant` through `node`.
  pub fn find_node_neighbors(&self, octant: &Octant, node: u8, only_internal: bool) -> Neighbors {
    self.find_neighbors_by_offset(octant, self.constants.node_offset(node), only_internal)
  }

  /// Neighbors of the local octant at `index` through `face`.
  pub fn find_neighbors_of(&self, index: u32, face: u8, only_internal: bool) -> Neighbors {
    match self.octant(index) {
      Some(octant) => self.find_neighbors(octant, face, only_internal),
      None => Neighbors::default(),
    }
  }

  /// Local octants adjacent to the ghost at `index` through `face`.
  pub fn find_ghost_neighbors(&self, index: u32, face: u8) -> Neighbors {
    match self.ghost(index) {
      Some(ghost) => self.find_neighbors(ghost, face, true),
      None => Neighbors::default(),
    }
  }

  pub(crate) fn find_neighbors_by_offset(
    &self,
    octant: &Octant,
    offset: Offset,
    only_internal: bool,
  ) -> Neighbors {
    let mut neighbors = Neighbors::default();
    let Some(anchor) = self.virtual_anchor(octant, offset) else {
      return neighbors;
    };
    let probe = VirtualCell::new(self, octant.level(), anchor);

    probe.collect(&self.octants, offset, |i| neighbors.push(i, false));
    if !only_internal {
      probe.collect(&self.ghosts, offset, |i| neighbors.push(i, true));
    }
    neighbors
  }

  /// Anchor of the same-size cell across `offset`, wrapped on periodic faces.
  fn virtual_anchor(&self, octant: &Octant, offset: Offset) -> Option<[u32; 3]> {
    let size = i64::from(octant.size());
    let max = i64::from(self.constants.max_length());
    let anchor = octant.anchor();
    let mut out = [0u32; 3];
    for axis in 0..self.constants.dim as usize {
      let mut coord = i64::from(anchor[axis]) + i64::from(offset[axis]) * size;
      if !(0..max).contains(&coord) {
        let face = (2 * axis + usize::from(offset[axis] > 0)) as u8;
        if self.periodic_mask & (1 << face) == 0 {
          return None;
        }
        coord = coord.rem_euclid(max);
      }
      out[axis] = coord as u32;
    }
    Some(out)
  }
}

/// Same-size probe cell next to the queried octant.
struct VirtualCell {
  constants: &'static TreeConstants,
  level: u8,
  anchor: [u32; 3],
  size: u32,
  first: u64,
}

impl VirtualCell {
  fn new(tree: &LocalTree, level: u8, anchor: [u32; 3]) -> Self {
    let constants = tree.constants;
    Self {
      constants,
      level,
      anchor,
      size: constants.length(level),
      first: morton::encode(constants.dim, anchor),
    }
  }

  /// Push every leaf of `octants` adjacent to the queried octant.
  fn collect(&self, octants: &[Octant], offset: Offset, mut push: impl FnMut(u32)) {
    // Coarser or same level: one leaf holds the probe's first key.
    let after = search::upper_bound(octants, self.first).index as usize;
    if let Some(candidate) = after.checked_sub(1).map(|i| &octants[i]) {
      if candidate.level() <= self.level && candidate.contains_morton(self.first) {
        push(after as u32 - 1);
        return;
      }
    }

    // Finer: descend only into sub-cells on the side facing the octant,
    // in Morton order so the leaves come out ascending.
    let mut stack: SmallVec<[([u32; 3], u8); 32]> = SmallVec::new();
    stack.push((self.anchor, self.level));
    while let Some((anchor, level)) = stack.pop() {
      let key = morton::encode(self.constants.dim, anchor);
      let (first, last) = morton::descendant_range(self.constants, key, level);
      let bound = search::lower_bound(octants, first);
      if bound.morton > last {
        continue;
      }
      if octants[bound.index as usize].level() <= level {
        push(bound.index);
        continue;
      }
      let half = self.constants.length(level + 1);
      for child in (0..self.constants.n_children).rev() {
        let unit = self.constants.node_coordinates(child);
        let child_anchor = [
          anchor[0] + unit[0] * half,
          anchor[1] + unit[1] * half,
          anchor[2] + unit[2] * half,
        ];
        if self.touches(child_anchor, half, offset) {
          stack.push((child_anchor, level + 1));
        }
      }
    }
  }

  /// True if a cell inside the probe lies on the side facing the octant.
  fn touches(&self, anchor: [u32; 3], size: u32, offset: Offset) -> bool {
    (0..3).all(|axis| match offset[axis] {
      1 => anchor[axis] == self.anchor[axis],
      -1 => anchor[axis] + size == self.anchor[axis] + self.size,
      _ => true,
    })
  }
}

#[cfg(test)]
#[path = "neighbors_test.rs"]
mod neighbors_test;
