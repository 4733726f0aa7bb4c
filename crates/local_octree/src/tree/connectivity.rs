//! Node table and cell-to-node lists derived from the octant sequences.
//!
//! Corners are generated in parallel, then deduplicated sequentially in
//! octant-then-ghost order through the persistent node key, so two processes
//! holding the same octants agree on node numbering.
//!
//! An update after refine or coarse only generates corners for octants that
//! are not in the cached table. The others keep their node lists, matched by
//! `(morton, level)` in a merge walk over both sorted sequences.

use std::collections::HashMap;

use glam::DVec3;
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use crate::morton;
use crate::octant::Octant;

use super::LocalTree;

/// Node indices of one octant, in node order.
pub type NodeList = SmallVec<[u32; 8]>;

type Corners = SmallVec<[[u32; 3]; 8]>;

/// Deduplicated corner nodes of local octants and ghosts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Connectivity {
  nodes: Vec<[u32; 3]>,
  octant_nodes: Vec<NodeList>,
  ghost_nodes: Vec<NodeList>,
  node_index: HashMap<u64, u32>,
  octant_keys: Vec<(u64, u8)>,
  ghost_keys: Vec<(u64, u8)>,
}

impl Connectivity {
  /// Logical coordinates of every node.
  #[inline]
  pub fn nodes(&self) -> &[[u32; 3]] {
    &self.nodes
  }

  #[inline]
  pub fn num_nodes(&self) -> u32 {
    self.nodes.len() as u32
  }

  /// Node lists of the local octants.
  #[inline]
  pub fn octant_nodes(&self) -> &[NodeList] {
    &self.octant_nodes
  }

  /// Node lists of the ghosts.
  #[inline]
  pub fn ghost_nodes(&self) -> &[NodeList] {
    &self.ghost_nodes
  }

  /// Index of the node with persistent key `key`.
  pub fn find_node(&self, key: u64) -> Option<u32> {
    self.node_index.get(&key).copied()
  }

  /// Register the corners of one octant, reusing known nodes.
  fn push_octant(&mut self, dim: u8, corners: &[[u32; 3]]) -> NodeList {
    corners
      .iter()
      .map(|&corner| {
        let next = self.nodes.len() as u32;
        let index = *self.node_index.entry(morton::node_key(dim, corner)).or_insert(next);
        if index == next {
          self.nodes.push(corner);
        }
        index
      })
      .collect()
  }

  /// Node lists for `octants`, reusing the list of every octant found in
  /// `known_keys`. Returns the lists and how many were rebuilt.
  fn relink(
    &mut self,
    dim: u8,
    octants: &[Octant],
    known_keys: &[(u64, u8)],
    known_lists: &[NodeList],
  ) -> (Vec<NodeList>, usize) {
    let reused = match_keys(octants, known_keys);
    let corners: Vec<Option<Corners>> = octants
      .par_iter()
      .zip(reused.par_iter())
      .map(|(octant, known)| known.is_none().then(|| octant.nodes()))
      .collect();

    let mut rebuilt = 0;
    let lists: Vec<NodeList> = reused
      .into_iter()
      .zip(corners)
      .map(|(known, corners)| match known {
        Some(j) => known_lists[j].clone(),
        None => {
          rebuilt += 1;
          self.push_octant(dim, corners.as_deref().unwrap_or(&[]))
        }
      })
      .collect();
    (lists, rebuilt)
  }

  /// Drop nodes no list refers to, keeping the survivors in order.
  fn compact(&mut self, dim: u8) -> u32 {
    let mut used = vec![false; self.nodes.len()];
    for &node in self.octant_nodes.iter().chain(&self.ghost_nodes).flatten() {
      used[node as usize] = true;
    }
    let orphaned = used.iter().filter(|&&u| !u).count() as u32;
    if orphaned == 0 {
      return 0;
    }

    let mut renumber = vec![u32::MAX; self.nodes.len()];
    let mut kept = Vec::with_capacity(self.nodes.len() - orphaned as usize);
    for (old, node) in self.nodes.iter().enumerate() {
      if used[old] {
        renumber[old] = kept.len() as u32;
        kept.push(*node);
      }
    }
    for node in self.octant_nodes.iter_mut().chain(&mut self.ghost_nodes).flatten() {
      *node = renumber[*node as usize];
    }
    self.node_index = kept
      .iter()
      .enumerate()
      .map(|(i, &node)| (morton::node_key(dim, node), i as u32))
      .collect();
    self.nodes = kept;
    orphaned
  }
}

fn octant_keys(octants: &[Octant]) -> Vec<(u64, u8)> {
  octants.iter().map(|o| (o.morton(), o.level())).collect()
}

/// Position of each octant in the sorted `known` keys, if present.
fn match_keys(octants: &[Octant], known: &[(u64, u8)]) -> Vec<Option<usize>> {
  let mut j = 0;
  octants
    .iter()
    .map(|octant| {
      while j < known.len() && known[j].0 < octant.morton() {
        j += 1;
      }
      (known.get(j) == Some(&(octant.morton(), octant.level()))).then_some(j)
    })
    .collect()
}

impl LocalTree {
  /// Corners of every local octant, then every ghost, in sequence order.
  fn corner_lists(&self) -> Vec<Corners> {
    self
      .octants
      .par_iter()
      .chain(self.ghosts.par_iter())
      .map(|octant| octant.nodes())
      .collect()
  }

  /// Build the node table from scratch.
  #[tracing::instrument(skip_all, name = "local_tree::compute_connectivity")]
  pub fn compute_connectivity(&mut self) -> &Connectivity {
    let dim = self.constants.dim;
    let corners = self.corner_lists();
    let mut connectivity = Connectivity::default();
    let (local, ghost) = corners.split_at(self.octants.len());
    let octant_nodes: Vec<NodeList> = local.iter().map(|c| connectivity.push_octant(dim, c)).collect();
    let ghost_nodes: Vec<NodeList> = ghost.iter().map(|c| connectivity.push_octant(dim, c)).collect();
    connectivity.octant_nodes = octant_nodes;
    connectivity.ghost_nodes = ghost_nodes;
    connectivity.octant_keys = octant_keys(&self.octants);
    connectivity.ghost_keys = octant_keys(&self.ghosts);
    debug!(nodes = connectivity.num_nodes(), "compute_connectivity");

    self.connectivity_stale = false;
    self.connectivity.insert(connectivity)
  }

  /// Patch the node table after the octants changed.
  ///
  /// Octants and ghosts already in the table keep their node lists; corners
  /// are generated only for the others. Existing node indices are kept, new
  /// corners are appended and nodes no longer referenced are dropped. Builds
  /// from scratch when nothing is cached.
  #[tracing::instrument(skip_all, name = "local_tree::update_connectivity")]
  pub fn update_connectivity(&mut self) -> &Connectivity {
    let Some(mut connectivity) = self.connectivity.take() else {
      return self.compute_connectivity();
    };
    let dim = self.constants.dim;
    let old_octant_nodes = std::mem::take(&mut connectivity.octant_nodes);
    let old_ghost_nodes = std::mem::take(&mut connectivity.ghost_nodes);
    let old_octant_keys = std::mem::replace(&mut connectivity.octant_keys, octant_keys(&self.octants));
    let old_ghost_keys = std::mem::replace(&mut connectivity.ghost_keys, octant_keys(&self.ghosts));

    let (octant_nodes, rebuilt) =
      connectivity.relink(dim, &self.octants, &old_octant_keys, &old_octant_nodes);
    let (ghost_nodes, ghosts_rebuilt) =
      connectivity.relink(dim, &self.ghosts, &old_ghost_keys, &old_ghost_nodes);
    connectivity.octant_nodes = octant_nodes;
    connectivity.ghost_nodes = ghost_nodes;
    let orphaned = connectivity.compact(dim);
    debug!(
      nodes = connectivity.num_nodes(),
      rebuilt = rebuilt + ghosts_rebuilt,
      orphaned,
      "update_connectivity"
    );

    self.connectivity_stale = false;
    self.connectivity.insert(connectivity)
  }

  /// Drop the node table.
  pub fn clear_connectivity(&mut self) {
    self.connectivity = None;
    self.connectivity_stale = false;
  }

  /// Cached node table, if computed since the last change.
  pub fn connectivity(&self) -> Option<&Connectivity> {
    if self.connectivity_stale {
      return None;
    }
    self.connectivity.as_ref()
  }

  /// Physical coordinates of the cached nodes.
  pub fn physical_nodes(&self) -> Option<Vec<DVec3>> {
    let connectivity = self.connectivity()?;
    Some(
      connectivity
        .nodes
        .iter()
        .map(|&node| self.config.map_node(self.constants, node))
        .collect(),
    )
  }
}

#[cfg(test)]
#[path = "connectivity_test.rs"]
mod connectivity_test;
