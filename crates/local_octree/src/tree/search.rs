//! Binary searches over Morton-sorted octant sequences.
//!
//! Every lookup in the crate goes through these; nothing scans a full
//! sequence linearly.

use crate::constants::INVALID_MORTON;
use crate::octant::Octant;

use super::LocalTree;

/// Result of a bound search: position plus the key found there.
///
/// Past the end of the sequence `morton` is [`INVALID_MORTON`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bound {
  pub index: u32,
  pub morton: u64,
}

/// Where a finest-level Morton key lives, as seen from one partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MortonOwner {
  /// Inside the local octant at this index.
  Local(u32),
  /// Inside the ghost at this index.
  Ghost(u32),
  /// Neither local nor visible through the ghost layer.
  Remote,
}

/// Index of the octant whose anchor key is `morton`.
pub fn find_morton(octants: &[Octant], morton: u64) -> Option<u32> {
  octants
    .binary_search_by_key(&morton, Octant::morton)
    .ok()
    .map(|i| i as u32)
}

/// First octant with key `>= morton`.
pub fn lower_bound(octants: &[Octant], morton: u64) -> Bound {
  bound_at(octants, octants.partition_point(|o| o.morton() < morton))
}

/// First octant with key `> morton`.
pub fn upper_bound(octants: &[Octant], morton: u64) -> Bound {
  bound_at(octants, octants.partition_point(|o| o.morton() <= morton))
}

/// Index of the octant covering the finest cell `morton`, if any.
pub fn find_containing(octants: &[Octant], morton: u64) -> Option<u32> {
  let after = octants.partition_point(|o| o.morton() <= morton);
  let index = after.checked_sub(1)?;
  octants[index].contains_morton(morton).then_some(index as u32)
}

fn bound_at(octants: &[Octant], index: usize) -> Bound {
  Bound {
    index: index as u32,
    morton: octants.get(index).map_or(INVALID_MORTON, Octant::morton),
  }
}

impl LocalTree {
  /// Local octant with anchor key `morton`.
  pub fn find_morton(&self, morton: u64) -> Option<u32> {
    find_morton(&self.octants, morton)
  }

  /// Ghost with anchor key `morton`.
  pub fn find_ghost_morton(&self, morton: u64) -> Option<u32> {
    find_morton(&self.ghosts, morton)
  }

  pub fn find_morton_lower_bound(&self, morton: u64) -> Bound {
    lower_bound(&self.octants, morton)
  }

  pub fn find_morton_upper_bound(&self, morton: u64) -> Bound {
    upper_bound(&self.octants, morton)
  }

  pub fn find_ghost_morton_lower_bound(&self, morton: u64) -> Bound {
    lower_bound(&self.ghosts, morton)
  }

  pub fn find_ghost_morton_upper_bound(&self, morton: u64) -> Bound {
    upper_bound(&self.ghosts, morton)
  }

  /// Classify a finest-level key against the partition range and ghosts.
  pub fn locate_morton(&self, morton: u64) -> MortonOwner {
    if (self.first_desc_morton..=self.last_desc_morton).contains(&morton) {
      if let Some(index) = find_containing(&self.octants, morton) {
        return MortonOwner::Local(index);
      }
    }
    match find_containing(&self.ghosts, morton) {
      Some(index) => MortonOwner::Ghost(index),
      None => MortonOwner::Remote,
    }
  }
}

#[cfg(test)]
#[path = "search_test.rs"]
mod search_test;
