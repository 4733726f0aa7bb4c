//! TreeConfig - per-partition configuration and logical-to-physical mapping.
//!
//! The configuration is fixed once a [`LocalTree`] is built; the partition
//! driver sets it at initialization and never changes it afterwards.
//!
//! [`LocalTree`]: crate::tree::LocalTree

use glam::DVec3;

use crate::constants::TreeConstants;
use crate::error::{TreeError, TreeResult};
use crate::octant::Octant;

/// Configuration of one partition's tree.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeConfig {
  /// Space dimension: 2 (quadtree) or 3 (octree).
  pub dim: u8,

  /// Adjacency enforced by 2:1 balancing.
  /// 1 = faces, 2 = faces and edges (nodes in 2D), 3 = faces, edges and nodes.
  pub balance_codim: u8,

  /// Periodic domain faces, indexed like octant faces.
  /// Must come in pairs: face `2k` and `2k + 1` are periodic together.
  pub periodic: [bool; 6],

  /// Physical position of the logical origin.
  pub origin: DVec3,

  /// Physical edge length of the whole domain.
  pub length: f64,
}

impl Default for TreeConfig {
  fn default() -> Self {
    Self {
      dim: 3,
      balance_codim: 1,
      periodic: [false; 6],
      origin: DVec3::ZERO,
      length: 1.0,
    }
  }
}

impl TreeConfig {
  pub fn new(dim: u8) -> Self {
    Self {
      dim,
      ..Self::default()
    }
  }

  pub fn with_balance_codim(mut self, codim: u8) -> Self {
    self.balance_codim = codim;
    self
  }

  /// Mark both faces of an axis as periodic.
  pub fn with_periodic_axis(mut self, axis: usize) -> Self {
    self.periodic[2 * axis] = true;
    self.periodic[2 * axis + 1] = true;
    self
  }

  pub fn with_periodic(mut self, periodic: [bool; 6]) -> Self {
    self.periodic = periodic;
    self
  }

  pub fn with_origin(mut self, origin: DVec3) -> Self {
    self.origin = origin;
    self
  }

  pub fn with_length(mut self, length: f64) -> Self {
    self.length = length;
    self
  }

  /// Check the configuration and resolve the dimension's constants.
  pub fn validate(&self) -> TreeResult<&'static TreeConstants> {
    let constants = TreeConstants::for_dim(self.dim)?;
    if !(1..=self.dim).contains(&self.balance_codim) {
      return Err(TreeError::InvalidBalanceCodimension {
        codim: self.balance_codim,
        dim: self.dim,
      });
    }
    for face in 0..constants.n_faces {
      if self.periodic[face as usize] != self.periodic[TreeConstants::opposite_face(face) as usize] {
        return Err(TreeError::UnpairedPeriodicFace { face });
      }
    }
    Ok(constants)
  }

  /// Periodic faces as a bit mask, restricted to the dimension's faces.
  pub fn periodic_mask(&self) -> u8 {
    let n_faces = (2 * self.dim).min(6) as usize;
    self.periodic[..n_faces]
      .iter()
      .enumerate()
      .fold(0u8, |mask, (face, &p)| if p { mask | (1 << face) } else { mask })
  }

  // ---------------------------------------------------------------------------
  // Physical mapping
  // ---------------------------------------------------------------------------

  /// Physical size of one logical unit.
  #[inline]
  pub fn unit_size(&self, constants: &TreeConstants) -> f64 {
    self.length / f64::from(constants.max_length())
  }

  /// Physical position of a logical point.
  #[inline]
  pub fn map_point(&self, constants: &TreeConstants, logical: [f64; 3]) -> DVec3 {
    self.origin + DVec3::from_array(logical) * self.unit_size(constants)
  }

  /// Physical position of a logical node.
  #[inline]
  pub fn map_node(&self, constants: &TreeConstants, node: [u32; 3]) -> DVec3 {
    self.map_point(constants, node.map(f64::from))
  }

  /// Physical edge length of an octant.
  #[inline]
  pub fn octant_size(&self, octant: &Octant) -> f64 {
    self.length / f64::from(1u32 << octant.level())
  }

  /// Physical minimum corner of an octant.
  #[inline]
  pub fn octant_min(&self, octant: &Octant) -> DVec3 {
    self.map_node(octant.constants(), octant.anchor())
  }

  /// Physical center of an octant.
  #[inline]
  pub fn octant_center(&self, octant: &Octant) -> DVec3 {
    self.map_point(octant.constants(), octant.center())
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
