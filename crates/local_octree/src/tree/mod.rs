//! LocalTree - the octants owned by one partition, plus its ghost layer.
//!
//! The tree is linear: only leaves are stored, as a sequence sorted by the
//! Morton key of their anchors. Parent/child relations are computed from
//! coordinates, never stored.
//!
//! # Module Structure
//!
//! - [`search`]: exact, lower-bound and upper-bound Morton lookups
//! - [`mutation`]: refine, coarse and cross-partition merge resolution
//! - [`neighbors`]: face, edge and node neighbor resolution
//! - [`balance`]: 2:1 balancing over markers
//! - [`connectivity`]: deduplicated node table and cell-to-node lists
//! - [`intersections`]: shared faces grouped by kind
//!
//! # Adaptation Cycle
//!
//! ```text
//! set markers -> local_balance -> refine (until no marker > 0)
//!             -> coarse -> check_coarse (after ghost exchange) -> local_balance
//! ```
//!
//! Ghosts are a read-only snapshot; only [`LocalTree::set_ghosts`] replaces them.

pub mod balance;
pub mod connectivity;
pub mod intersections;
pub mod mutation;
pub mod neighbors;
pub mod search;

pub use balance::BalanceStats;
pub use connectivity::Connectivity;
pub use intersections::{Intersection, IntersectionKind, Intersections};
pub use mutation::{CoarseOutcome, DeferReason, MergeStatus};
pub use neighbors::Neighbors;
pub use search::{Bound, MortonOwner};

use crate::config::TreeConfig;
use crate::constants::{TreeConstants, INVALID_MORTON};
use crate::error::{TreeError, TreeResult};
use crate::octant::Octant;

/// Octants of one partition, sorted by Morton key.
#[derive(Clone, Debug)]
pub struct LocalTree {
  constants: &'static TreeConstants,
  config: TreeConfig,
  periodic_mask: u8,
  octants: Vec<Octant>,
  ghosts: Vec<Octant>,
  ghost_global_index: Vec<u64>,
  first_desc_morton: u64,
  last_desc_morton: u64,
  local_max_depth: u8,
  connectivity: Option<Connectivity>,
  connectivity_stale: bool,
  intersections: Option<Intersections>,
}

impl LocalTree {
  /// Tree holding the single root octant.
  pub fn new(config: TreeConfig) -> TreeResult<Self> {
    let mut tree = Self::empty(config)?;
    let root = Octant::root(tree.constants).with_periodic(tree.periodic_mask);
    tree.octants.push(root);
    tree.refresh();
    Ok(tree)
  }

  /// Tree without octants, for partitions that own nothing yet.
  pub fn empty(config: TreeConfig) -> TreeResult<Self> {
    let constants = config.validate()?;
    let periodic_mask = config.periodic_mask();
    Ok(Self {
      constants,
      config,
      periodic_mask,
      octants: Vec::new(),
      ghosts: Vec::new(),
      ghost_global_index: Vec::new(),
      first_desc_morton: INVALID_MORTON,
      last_desc_morton: INVALID_MORTON,
      local_max_depth: 0,
      connectivity: None,
      connectivity_stale: false,
      intersections: None,
    })
  }

  /// Tree built from a partition handed over by the driver.
  ///
  /// The octants must be valid, sorted and non-overlapping. Periodic flags
  /// are restamped from the configuration.
  pub fn from_octants(config: TreeConfig, octants: Vec<Octant>) -> TreeResult<Self> {
    let mut tree = Self::empty(config)?;
    validate_sequence(tree.constants, &octants, "local")?;
    let mask = tree.periodic_mask;
    tree.octants = octants.into_iter().map(|o| o.with_periodic(mask)).collect();
    tree.refresh();
    Ok(tree)
  }

  /// Replace the ghost layer after an exchange with neighbor partitions.
  ///
  /// `global_index[i]` is the identifier of `ghosts[i]` on its owner.
  pub fn set_ghosts(&mut self, ghosts: Vec<Octant>, global_index: Vec<u64>) -> TreeResult<()> {
    if ghosts.len() != global_index.len() {
      return Err(TreeError::GhostIndexMismatch {
        ghosts: ghosts.len(),
        global_indices: global_index.len(),
      });
    }
    validate_sequence(self.constants, &ghosts, "ghost")?;
    let mask = self.periodic_mask;
    self.ghosts = ghosts.into_iter().map(|o| o.with_periodic(mask)).collect();
    self.ghost_global_index = global_index;
    self.invalidate_caches();
    Ok(())
  }

  /// Drop the ghost layer.
  pub fn clear_ghosts(&mut self) {
    self.ghosts.clear();
    self.ghost_global_index.clear();
    self.invalidate_caches();
  }

  // ---------------------------------------------------------------------------
  // Partition state
  // ---------------------------------------------------------------------------

  #[inline]
  pub fn constants(&self) -> &'static TreeConstants {
    self.constants
  }

  #[inline]
  pub fn config(&self) -> &TreeConfig {
    &self.config
  }

  #[inline]
  pub fn dim(&self) -> u8 {
    self.constants.dim
  }

  #[inline]
  pub fn balance_codim(&self) -> u8 {
    self.config.balance_codim
  }

  #[inline]
  pub fn num_octants(&self) -> u32 {
    self.octants.len() as u32
  }

  #[inline]
  pub fn num_ghosts(&self) -> u32 {
    self.ghosts.len() as u32
  }

  /// Morton key of the first finest cell owned by the partition.
  /// [`INVALID_MORTON`] when the partition is empty.
  #[inline]
  pub fn first_desc_morton(&self) -> u64 {
    self.first_desc_morton
  }

  /// Morton key of the last finest cell owned by the partition.
  /// [`INVALID_MORTON`] when the partition is empty, which
  /// [`LocalTree::check_coarse`] reads as no previous partition.
  #[inline]
  pub fn last_desc_morton(&self) -> u64 {
    self.last_desc_morton
  }

  /// Finest level present among the local octants.
  #[inline]
  pub fn local_max_depth(&self) -> u8 {
    self.local_max_depth
  }

  #[inline]
  pub fn octants(&self) -> &[Octant] {
    &self.octants
  }

  #[inline]
  pub fn ghosts(&self) -> &[Octant] {
    &self.ghosts
  }

  #[inline]
  pub fn ghost_global_index(&self) -> &[u64] {
    &self.ghost_global_index
  }

  #[inline]
  pub fn octant(&self, index: u32) -> Option<&Octant> {
    self.octants.get(index as usize)
  }

  #[inline]
  pub fn ghost(&self, index: u32) -> Option<&Octant> {
    self.ghosts.get(index as usize)
  }

  // ---------------------------------------------------------------------------
  // Markers
  // ---------------------------------------------------------------------------

  /// Set the refinement marker of a local octant.
  ///
  /// The marker is clamped so the target level stays inside `0..=max_level`.
  pub fn set_marker(&mut self, index: u32, marker: i8) -> TreeResult<()> {
    let max_level = self.constants.max_level;
    let octant = self.octant_mut(index)?;
    let level = octant.level() as i8;
    octant.set_marker(marker.clamp(-level, max_level as i8 - level));
    Ok(())
  }

  /// Include or exclude a local octant from 2:1 balancing.
  pub fn set_balance(&mut self, index: u32, balance: bool) -> TreeResult<()> {
    self.octant_mut(index)?.set_balance(balance);
    Ok(())
  }

  fn octant_mut(&mut self, index: u32) -> TreeResult<&mut Octant> {
    let len = self.num_octants();
    self
      .octants
      .get_mut(index as usize)
      .ok_or(TreeError::IndexOutOfRange { index, len })
  }

  // ---------------------------------------------------------------------------
  // Periodicity
  // ---------------------------------------------------------------------------

  /// True if `face` of `octant` lies on a periodic domain face.
  #[inline]
  pub fn is_periodic(&self, octant: &Octant, face: u8) -> bool {
    octant.is_bound(face) && self.periodic_mask & (1 << face) != 0
  }

  /// True if any face of `edge` lies on a periodic domain face.
  pub fn is_edge_periodic(&self, octant: &Octant, edge: u8) -> bool {
    self
      .constants
      .edge_faces(edge)
      .iter()
      .any(|&face| self.is_periodic(octant, face))
  }

  /// True if any face sharing `node` lies on a periodic domain face.
  pub fn is_node_periodic(&self, octant: &Octant, node: u8) -> bool {
    self
      .constants
      .node_faces(node)
      .iter()
      .any(|&face| self.is_periodic(octant, face))
  }

  // ---------------------------------------------------------------------------
  // Derived state
  // ---------------------------------------------------------------------------

  /// Recompute partition bounds and depth, and drop derived caches.
  pub(crate) fn refresh(&mut self) {
    match (self.octants.first(), self.octants.last()) {
      (Some(first), Some(last)) => {
        self.first_desc_morton = first.morton();
        self.last_desc_morton = last.last_desc_morton();
      }
      _ => {
        self.first_desc_morton = INVALID_MORTON;
        self.last_desc_morton = INVALID_MORTON;
      }
    }
    self.local_max_depth = self.octants.iter().map(Octant::level).max().unwrap_or(0);
    self.invalidate_caches();
  }

  fn invalidate_caches(&mut self) {
    self.intersections = None;
    // Kept for update_connectivity, hidden from readers until patched.
    self.connectivity_stale = self.connectivity.is_some();
  }
}

/// Check that a driver-provided sequence is a valid set of sorted leaves.
fn validate_sequence(
  constants: &TreeConstants,
  octants: &[Octant],
  sequence: &'static str,
) -> TreeResult<()> {
  for (index, octant) in octants.iter().enumerate() {
    if octant.dim() != constants.dim {
      return Err(TreeError::DimensionMismatch {
        expected: constants.dim,
        found: octant.dim(),
      });
    }
    if !octant.is_valid() {
      return Err(TreeError::OctantOutsideDomain { sequence, index });
    }
    if index == 0 {
      continue;
    }
    let prev = &octants[index - 1];
    if octant.morton() < prev.morton() {
      return Err(TreeError::UnsortedSequence { sequence, index });
    }
    if octant.morton() <= prev.last_desc_morton() {
      return Err(TreeError::OverlappingOctants { sequence, index });
    }
  }
  Ok(())
}
