//! 2:1 balance over refinement markers.
//!
//! Balancing never changes the octant sequence. It raises markers until every
//! pair of adjacent octants (through the entities selected by the balance
//! codimension, ghosts included) has target levels at most one apart:
//!
//! ```text
//! target(o) = level(o) + marker(o)   if marker(o) >= 0
//!           = level(o) - 1           if the next coarse merges o's family
//!           = level(o)               otherwise
//! |target(a) - target(b)| <= 1       for all adjacent a, b
//! ```
//!
//! A negative marker only lowers the target when [`LocalTree::coarse`] would
//! really merge the family: every sibling wants it and the partition owns the
//! family. Raising one member of such a family cancels the merge for all of
//! them. Ghost targets never go below their level, since their families are
//! decided by the partition that owns them.
//!
//! Running [`LocalTree::coarse`] and then [`LocalTree::refine`] until no
//! positive marker is left yields a 2:1 balanced tree.
//!
//! The fixed point is reached with a worklist: only octants whose target
//! changed in one generation are revisited in the next. Ghosts constrain their
//! local neighbors but are never raised, and neither are octants excluded with
//! [`LocalTree::set_balance`].

use std::ops::Range;

use tracing::debug;

use crate::constants::Offset;
use crate::octant::Octant;

use super::LocalTree;

/// Target levels of the local octants and the merges they rely on.
struct Targets {
  levels: Vec<u8>,
  family: Vec<Option<u32>>,
  merges: Vec<Range<usize>>,
}

impl Targets {
  fn new(tree: &LocalTree) -> Self {
    let merges = tree.pending_merges();
    let mut family = vec![None; tree.octants.len()];
    for (id, range) in merges.iter().enumerate() {
      for slot in &mut family[range.clone()] {
        *slot = Some(id as u32);
      }
    }
    let levels = tree
      .octants
      .iter()
      .zip(&family)
      .map(|(octant, family)| match family {
        Some(_) => octant.level() - 1,
        None => refine_target(octant),
      })
      .collect();
    Self { levels, family, merges }
  }
}

fn refine_target(octant: &Octant) -> u8 {
  let marker = octant.marker().max(0) as u8;
  (octant.level() + marker).min(octant.constants().max_level)
}

/// Counters from one [`LocalTree::local_balance`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceStats {
  /// Worklist generations processed.
  pub passes: u32,
  /// Target raises applied, cancelled merges included.
  pub raised: u32,
  /// Octants examined, with repeats.
  pub visited: u32,
}

impl BalanceStats {
  /// True if any target was raised.
  #[inline]
  pub fn changed(&self) -> bool {
    self.raised > 0
  }
}

impl LocalTree {
  /// Raise markers until the target levels are 2:1 balanced.
  ///
  /// Only markers change here; the octants keep their levels. Call
  /// [`LocalTree::coarse`] and then [`LocalTree::refine`] until no positive
  /// marker is left to reach the balanced tree. A marker above one needs that
  /// many refine calls.
  ///
  /// With `do_new` the worklist starts from octants created by the last
  /// refine or coarse and from octants with a pending marker; otherwise from
  /// every octant. Without `do_interior` only octants with a ghost neighbor
  /// seed the worklist. Raises always propagate to any neighbor.
  #[tracing::instrument(skip_all, name = "local_tree::local_balance")]
  pub fn local_balance(&mut self, do_new: bool, do_interior: bool) -> BalanceStats {
    let offsets = self.constants.balance_offsets(self.config.balance_codim);
    let n = self.octants.len();
    let mut targets = Targets::new(self);
    let mut queued = vec![false; n];
    let mut current: Vec<u32> = (0..n as u32)
      .filter(|&i| {
        let octant = &self.octants[i as usize];
        let fresh = !do_new
          || octant.marker() != 0
          || octant.is_new_refined()
          || octant.is_new_coarsened();
        fresh && (do_interior || self.has_ghost_neighbor(i, &offsets))
      })
      .collect();
    for &i in &current {
      queued[i as usize] = true;
    }

    let mut stats = BalanceStats::default();
    while !current.is_empty() {
      stats.passes += 1;
      let mut next = Vec::new();
      for &index in &current {
        queued[index as usize] = false;
        stats.visited += 1;
        for raised in self.balance_octant(index, &offsets, &mut targets) {
          stats.raised += 1;
          if !queued[raised as usize] {
            queued[raised as usize] = true;
            next.push(raised);
          }
        }
      }
      current = next;
    }

    debug!(
      passes = stats.passes,
      raised = stats.raised,
      visited = stats.visited,
      "local_balance"
    );
    stats
  }

  /// Resolve every violation between one octant and its neighbors.
  ///
  /// Returns the local octants whose target was raised.
  fn balance_octant(&mut self, index: u32, offsets: &[Offset], targets: &mut Targets) -> Vec<u32> {
    let octant = self.octants[index as usize];
    let mut raised = Vec::new();
    for &offset in offsets {
      let neighbors = self.find_neighbors_by_offset(&octant, offset, false);
      for (neighbor, is_ghost) in neighbors.iter() {
        let own_target = targets.levels[index as usize];
        let (other_target, other_balance) = if is_ghost {
          let ghost = &self.ghosts[neighbor as usize];
          (refine_target(ghost), ghost.balance())
        } else {
          let other = &self.octants[neighbor as usize];
          (targets.levels[neighbor as usize], other.balance())
        };

        if other_target > own_target + 1 && octant.balance() {
          self.raise_target(index, other_target - 1, targets, &mut raised);
        } else if own_target > other_target + 1 && !is_ghost && other_balance {
          self.raise_target(neighbor, own_target - 1, targets, &mut raised);
        }
      }
    }
    raised
  }

  fn raise_target(&mut self, index: u32, target: u8, targets: &mut Targets, raised: &mut Vec<u32>) {
    let octant = &mut self.octants[index as usize];
    octant.set_marker((i16::from(target) - i16::from(octant.level())) as i8);
    targets.levels[index as usize] = target;
    raised.push(index);

    // The family no longer merges, so its other members keep their level.
    let Some(family) = targets.family[index as usize].take() else {
      return;
    };
    for sibling in targets.merges[family as usize].clone() {
      if targets.family[sibling].take().is_some() {
        targets.levels[sibling] = self.octants[sibling].level();
        raised.push(sibling as u32);
      }
    }
  }

  fn has_ghost_neighbor(&self, index: u32, offsets: &[Offset]) -> bool {
    if self.ghosts.is_empty() {
      return false;
    }
    let octant = &self.octants[index as usize];
    offsets.iter().any(|&offset| {
      self
        .find_neighbors_by_offset(octant, offset, false)
        .iter()
        .any(|(_, is_ghost)| is_ghost)
    })
  }

  /// Seed markers of octants next to freshly created ones.
  ///
  /// Compares the levels of new octants (border octants only, unless
  /// `internal`) with their neighbors. Whenever one side is more than one
  /// level coarser, its marker is raised so the next refine closes the gap.
  /// Returns the sorted indices of the octants whose marker changed.
  #[tracing::instrument(skip_all, name = "local_tree::pre_balance_21")]
  pub fn pre_balance_21(&mut self, internal: bool) -> Vec<u32> {
    let offsets = self.constants.balance_offsets(self.config.balance_codim);
    let fresh: Vec<u32> = (0..self.num_octants())
      .filter(|&i| {
        let octant = &self.octants[i as usize];
        (octant.is_new_refined() || octant.is_new_coarsened())
          && (internal || self.has_ghost_neighbor(i, &offsets))
      })
      .collect();

    let mut modified = Vec::new();
    for index in fresh {
      let octant = self.octants[index as usize];
      for &offset in offsets.iter() {
        let neighbors = self.find_neighbors_by_offset(&octant, offset, false);
        for (neighbor, is_ghost) in neighbors.iter() {
          let other = if is_ghost {
            self.ghosts[neighbor as usize]
          } else {
            self.octants[neighbor as usize]
          };
          if octant.level() > other.level() + 1 && !is_ghost && other.balance() {
            if self.raise_marker_to(neighbor, (octant.level() - 1 - other.level()) as i8) {
              modified.push(neighbor);
            }
          } else if other.level() > octant.level() + 1 && octant.balance() {
            if self.raise_marker_to(index, (other.level() - 1 - octant.level()) as i8) {
              modified.push(index);
            }
          }
        }
      }
    }
    modified.sort_unstable();
    modified.dedup();
    debug!(modified = modified.len(), "pre_balance_21");
    modified
  }

  /// Keep the larger of the current and requested marker.
  fn raise_marker_to(&mut self, index: u32, marker: i8) -> bool {
    let octant = &mut self.octants[index as usize];
    if octant.marker() >= marker {
      return false;
    }
    octant.set_marker(marker);
    true
  }
}

#[cfg(test)]
#[path = "balance_test.rs"]
mod balance_test;
