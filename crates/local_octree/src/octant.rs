//! Octant - value type for one cell of the linear octree.
//!
//! An octant is identified by the Morton key of its anchor (the corner closest
//! to the origin) plus its level. The key is the sole ordering key of the tree
//! sequences; the level travels alongside because an octant and its first
//! child share the same anchor.
//!
//! Coordinates are logical integers at the finest resolution: the domain spans
//! `0..2^max_level` on every axis.

use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::constants::{TreeConstants, TREE_CONSTANTS_2D, TREE_CONSTANTS_3D};
use crate::morton;

/// One cell of the tree (a quadrant in 2D).
///
/// Equality and hashing look at dimension, Morton key and level only;
/// markers and flags are mutable state, not identity.
#[derive(Clone, Copy, Debug)]
pub struct Octant {
  morton: u64,
  dim: u8,
  level: u8,
  marker: i8,
  balance: bool,
  bound: u8,
  periodic: u8,
  new_refined: bool,
  new_coarsened: bool,
}

impl Octant {
  /// Create an octant from its anchor and level.
  ///
  /// Boundary flags are derived from the position in the domain. Periodic
  /// flags start cleared; see [`Octant::with_periodic`].
  pub fn new(constants: &TreeConstants, level: u8, anchor: [u32; 3]) -> Self {
    debug_assert!(level <= constants.max_level, "level {} too fine", level);
    let mut octant = Self {
      morton: morton::encode(constants.dim, anchor),
      dim: constants.dim,
      level,
      marker: 0,
      balance: true,
      bound: 0,
      periodic: 0,
      new_refined: false,
      new_coarsened: false,
    };
    octant.bound = octant.compute_bound(constants, anchor);
    octant
  }

  /// Create an octant from the Morton key of its anchor.
  pub fn from_morton(constants: &TreeConstants, level: u8, morton: u64) -> Self {
    Self::new(constants, level, morton::decode(constants.dim, morton))
  }

  /// Level-0 octant covering the whole domain.
  pub fn root(constants: &TreeConstants) -> Self {
    Self::new(constants, 0, [0; 3])
  }

  fn compute_bound(&self, constants: &TreeConstants, anchor: [u32; 3]) -> u8 {
    let size = constants.length(self.level) as u64;
    let max = constants.max_length() as u64;
    let mut bound = 0u8;
    for axis in 0..constants.dim as usize {
      if anchor[axis] == 0 {
        bound |= 1 << (2 * axis);
      }
      if anchor[axis] as u64 + size == max {
        bound |= 1 << (2 * axis + 1);
      }
    }
    bound
  }

  #[inline]
  pub(crate) fn constants(&self) -> &'static TreeConstants {
    if self.dim == 2 {
      &TREE_CONSTANTS_2D
    } else {
      &TREE_CONSTANTS_3D
    }
  }

  // ---------------------------------------------------------------------------
  // Basic accessors
  // ---------------------------------------------------------------------------

  /// Space dimension (2 or 3).
  #[inline]
  pub fn dim(&self) -> u8 {
    self.dim
  }

  /// Refinement level (0 = root).
  #[inline]
  pub fn level(&self) -> u8 {
    self.level
  }

  /// Morton key of the anchor.
  #[inline]
  pub fn morton(&self) -> u64 {
    self.morton
  }

  /// Refinement marker: positive refines, negative coarsens.
  #[inline]
  pub fn marker(&self) -> i8 {
    self.marker
  }

  /// Set the refinement marker.
  #[inline]
  pub fn set_marker(&mut self, marker: i8) {
    self.marker = marker;
  }

  /// Whether the octant takes part in 2:1 balancing.
  #[inline]
  pub fn balance(&self) -> bool {
    self.balance
  }

  /// Enable or disable 2:1 balancing for this octant.
  #[inline]
  pub fn set_balance(&mut self, balance: bool) {
    self.balance = balance;
  }

  /// Level the octant will reach once its marker is consumed.
  #[inline]
  pub fn target_level(&self) -> u8 {
    let target = i16::from(self.level) + i16::from(self.marker);
    target.clamp(0, i16::from(self.constants().max_level)) as u8
  }

  /// True if created by the last refinement.
  #[inline]
  pub fn is_new_refined(&self) -> bool {
    self.new_refined
  }

  /// True if created by the last coarsening.
  #[inline]
  pub fn is_new_coarsened(&self) -> bool {
    self.new_coarsened
  }

  #[inline]
  pub(crate) fn clear_new_flags(&mut self) {
    self.new_refined = false;
    self.new_coarsened = false;
  }

  #[inline]
  pub(crate) fn mark_new_coarsened(&mut self) {
    self.new_coarsened = true;
  }

  // ---------------------------------------------------------------------------
  // Boundary flags
  // ---------------------------------------------------------------------------

  /// True if `face` lies on the domain boundary.
  #[inline]
  pub fn is_bound(&self, face: u8) -> bool {
    self.bound & (1 << face) != 0
  }

  /// True if any face lies on the domain boundary.
  #[inline]
  pub fn is_any_bound(&self) -> bool {
    self.bound != 0
  }

  /// True if either face of `edge` lies on the domain boundary.
  pub fn is_edge_bound(&self, edge: u8) -> bool {
    self.constants().edge_faces(edge).iter().any(|&f| self.is_bound(f))
  }

  /// True if any face sharing `node` lies on the domain boundary.
  pub fn is_node_bound(&self, node: u8) -> bool {
    self.constants().node_faces(node).iter().any(|&f| self.is_bound(f))
  }

  /// Domain-boundary faces as a bit mask (bit `f` = face `f`).
  #[inline]
  pub fn bound_mask(&self) -> u8 {
    self.bound
  }

  /// True if `face` is on a periodic domain boundary.
  #[inline]
  pub fn is_periodic(&self, face: u8) -> bool {
    self.periodic & (1 << face) != 0
  }

  /// Periodic faces as a bit mask.
  #[inline]
  pub fn periodic_mask(&self) -> u8 {
    self.periodic
  }

  /// Stamp the domain's periodic faces; only boundary faces keep the flag.
  #[inline]
  pub fn with_periodic(mut self, domain_periodic: u8) -> Self {
    self.periodic = domain_periodic & self.bound;
    self
  }

  // ---------------------------------------------------------------------------
  // Logical geometry
  // ---------------------------------------------------------------------------

  /// Anchor coordinates (node 0).
  #[inline]
  pub fn anchor(&self) -> [u32; 3] {
    morton::decode(self.dim, self.morton)
  }

  /// Edge length.
  #[inline]
  pub fn size(&self) -> u32 {
    self.constants().length(self.level)
  }

  /// Face area.
  #[inline]
  pub fn area(&self) -> u64 {
    self.constants().area(self.level)
  }

  /// Volume (area in 2D).
  #[inline]
  pub fn volume(&self) -> u64 {
    self.constants().volume(self.level)
  }

  /// Center point.
  pub fn center(&self) -> [f64; 3] {
    self.displaced_point([0, 0, 0])
  }

  /// Center of a face.
  pub fn face_center(&self, face: u8) -> [f64; 3] {
    self.displaced_point(self.constants().face_offset(face))
  }

  /// Center of an edge (3D only).
  pub fn edge_center(&self, edge: u8) -> [f64; 3] {
    self.displaced_point(self.constants().edge_offset(edge))
  }

  /// Point at `center + offset * size / 2`, flattened onto z = 0 in 2D.
  fn displaced_point(&self, offset: [i8; 3]) -> [f64; 3] {
    let anchor = self.anchor();
    let half = f64::from(self.size()) * 0.5;
    let mut point = [0.0; 3];
    for axis in 0..self.dim as usize {
      point[axis] = f64::from(anchor[axis]) + half * (1.0 + f64::from(offset[axis]));
    }
    point
  }

  /// Logical coordinates of a corner node.
  pub fn node(&self, node: u8) -> [u32; 3] {
    let anchor = self.anchor();
    let unit = self.constants().node_coordinates(node);
    let size = self.size();
    [
      anchor[0] + unit[0] * size,
      anchor[1] + unit[1] * size,
      anchor[2] + unit[2] * size,
    ]
  }

  /// Logical coordinates of all corner nodes, in node order.
  pub fn nodes(&self) -> SmallVec<[[u32; 3]; 8]> {
    (0..self.constants().n_nodes).map(|n| self.node(n)).collect()
  }

  /// Persistent key of a corner node, shared by every octant touching it.
  pub fn node_key(&self, node: u8) -> u64 {
    morton::node_key(self.dim, self.node(node))
  }

  /// Morton key of the last finest descendant.
  #[inline]
  pub fn last_desc_morton(&self) -> u64 {
    self.descendant_range().1
  }

  /// Closed Morton interval of the finest descendants.
  #[inline]
  pub fn descendant_range(&self) -> (u64, u64) {
    morton::descendant_range(self.constants(), self.morton, self.level)
  }

  /// True if the finest cell with key `morton` lies inside this octant.
  #[inline]
  pub fn contains_morton(&self, morton: u64) -> bool {
    let (first, last) = self.descendant_range();
    (first..=last).contains(&morton)
  }

  // ---------------------------------------------------------------------------
  // Family
  // ---------------------------------------------------------------------------

  /// Position of this octant among its siblings (0 for the root).
  pub fn child_index(&self) -> u8 {
    if self.level == 0 {
      return 0;
    }
    let anchor = self.anchor();
    let shift = self.constants().max_level - self.level;
    (0..self.dim as usize).fold(0u8, |index, axis| {
      index | ((((anchor[axis] >> shift) & 1) as u8) << axis)
    })
  }

  /// Morton key of the father's anchor.
  pub fn father_morton(&self) -> u64 {
    self.father().morton
  }

  /// Father octant (the root is its own father).
  ///
  /// Marker is reset; the balance flag is inherited and periodic flags are
  /// kept on the faces the father still has on the boundary.
  pub fn father(&self) -> Octant {
    let constants = self.constants();
    let level = self.level.saturating_sub(1);
    let mask = !(constants.length(level) - 1);
    let anchor = self.anchor().map(|c| c & mask);
    let mut father = Octant::new(constants, level, anchor);
    father.balance = self.balance;
    father.periodic = self.periodic & father.bound;
    father
  }

  /// Children in Morton order, or none at the finest level.
  ///
  /// Children carry `max(marker - 1, 0)`, inherit the balance flag and the
  /// periodic flags of the faces they share with the parent, and are flagged
  /// as new after refinement.
  pub fn children(&self) -> SmallVec<[Octant; 8]> {
    let constants = self.constants();
    if self.level >= constants.max_level {
      return SmallVec::new();
    }
    let anchor = self.anchor();
    let half = constants.length(self.level + 1);
    (0..constants.n_children)
      .map(|child| {
        let unit = constants.node_coordinates(child);
        let child_anchor = [
          anchor[0] + unit[0] * half,
          anchor[1] + unit[1] * half,
          anchor[2] + unit[2] * half,
        ];
        let mut octant = Octant::new(constants, self.level + 1, child_anchor);
        octant.marker = self.marker.saturating_sub(1).max(0);
        octant.balance = self.balance;
        octant.periodic = self.periodic & octant.bound;
        octant.new_refined = true;
        octant
      })
      .collect()
  }

  /// True if the anchor is aligned to the level and the octant fits the domain.
  pub fn is_valid(&self) -> bool {
    let constants = self.constants();
    if self.level > constants.max_level {
      return false;
    }
    let size = constants.length(self.level) as u64;
    let max = constants.max_length() as u64;
    let anchor = self.anchor();
    (0..constants.dim as usize).all(|axis| {
      let c = anchor[axis] as u64;
      c % size == 0 && c + size <= max
    }) && (self.dim == 3 || anchor[2] == 0)
  }
}

impl PartialEq for Octant {
  fn eq(&self, other: &Self) -> bool {
    self.dim == other.dim && self.morton == other.morton && self.level == other.level
  }
}

impl Eq for Octant {}

impl Hash for Octant {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.dim.hash(state);
    self.morton.hash(state);
    self.level.hash(state);
  }
}

#[cfg(test)]
#[path = "octant_test.rs"]
mod octant_test;
