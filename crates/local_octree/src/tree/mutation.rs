//! Refine and coarse: in-place rewrites of the sorted octant sequence.
//!
//! Children occupy a contiguous, ordered slice of their parent's descendant
//! range, so splitting an octant or merging a family is a local splice that
//! keeps the sequence sorted.
//!
//! # Families Across Partitions
//!
//! A family can straddle a partition boundary. The partition holding sibling 0
//! owns the merged parent:
//!
//! ```text
//!   partition A          | partition B
//!   ... s0 s1 s2 s3 s4   | s5 s6 s7 ...
//!   merge if ghosts s5..s7 all want to coarsen
//!                        | defer, then check_coarse(A.last_desc) drops s5..s7
//! ```

use std::ops::Range;

use tracing::debug;

use crate::constants::INVALID_MORTON;
use crate::octant::Octant;
use crate::remap::IndexRemap;

use super::search;
use super::LocalTree;

/// Why a family was left unmerged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferReason {
  /// Sibling 0 lives on the previous partition, which decides the merge.
  OwnedByPreviousPartition,
  /// Some trailing siblings are not visible in the ghost layer.
  IncompleteGhostFamily,
}

/// Outcome for one family that asked to be coarsened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStatus {
  Completed { parent_morton: u64, level: u8 },
  Deferred { parent_morton: u64, reason: DeferReason },
}

impl MergeStatus {
  #[inline]
  pub fn is_deferred(&self) -> bool {
    matches!(self, MergeStatus::Deferred { .. })
  }
}

/// Result of a coarse pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoarseOutcome {
  pub remap: IndexRemap,
  pub merges: Vec<MergeStatus>,
}

impl CoarseOutcome {
  pub fn completed(&self) -> usize {
    self.merges.iter().filter(|m| !m.is_deferred()).count()
  }

  pub fn deferred(&self) -> usize {
    self.merges.iter().filter(|m| m.is_deferred()).count()
  }
}

/// What a coarse pass does with one run of siblings.
enum FamilyPlan {
  Merge,
  Defer(DeferReason),
  Keep,
}

/// State of a trailing sibling that is not local.
enum GhostSibling {
  Present { wants_merge: bool },
  Refined,
  Unknown,
}

impl LocalTree {
  /// Split every octant with a positive marker into its children.
  ///
  /// Markers above one carry over to the children, so a marker of `n` needs
  /// `n` calls. Positive markers at the finest level are cleared.
  #[tracing::instrument(skip_all, name = "local_tree::refine")]
  pub fn refine(&mut self) -> IndexRemap {
    self.split_where(|octant| octant.marker() > 0)
  }

  /// Split every octant once, regardless of markers.
  #[tracing::instrument(skip_all, name = "local_tree::global_refine")]
  pub fn global_refine(&mut self) -> IndexRemap {
    for octant in &mut self.octants {
      octant.set_marker(octant.marker().max(1));
    }
    self.split_where(|_| true)
  }

  fn split_where(&mut self, mut should_split: impl FnMut(&Octant) -> bool) -> IndexRemap {
    let max_level = self.constants.max_level;
    let old = std::mem::take(&mut self.octants);
    let mut next = Vec::with_capacity(old.len());
    let mut ranges = Vec::with_capacity(old.len());
    let mut split = 0usize;

    for mut octant in old {
      octant.clear_new_flags();
      if octant.level() >= max_level && octant.marker() > 0 {
        octant.set_marker(0);
      }
      let start = next.len() as u32;
      if octant.level() < max_level && should_split(&octant) {
        next.extend(octant.children());
        split += 1;
      } else {
        next.push(octant);
      }
      ranges.push(start..next.len() as u32);
    }

    let new_len = next.len() as u32;
    self.octants = next;
    self.refresh();
    debug!(split, octants = new_len, "refine");
    IndexRemap::from_ranges(ranges, new_len)
  }

  /// Merge every complete family whose members all have negative markers.
  ///
  /// Families cut by the partition start are deferred to the previous
  /// partition; families cut by the partition end are merged only when the
  /// ghost layer shows every trailing sibling as a leaf that wants to merge.
  #[tracing::instrument(skip_all, name = "local_tree::coarse")]
  pub fn coarse(&mut self) -> CoarseOutcome {
    self.merge_where(|octant| octant.marker() < 0)
  }

  /// Merge every complete family, regardless of markers.
  #[tracing::instrument(skip_all, name = "local_tree::global_coarse")]
  pub fn global_coarse(&mut self) -> CoarseOutcome {
    self.merge_where(|_| true)
  }

  fn merge_where(&mut self, wants_merge: impl Fn(&Octant) -> bool) -> CoarseOutcome {
    let old = std::mem::take(&mut self.octants);
    let mut next: Vec<Octant> = Vec::with_capacity(old.len());
    let mut ranges = Vec::with_capacity(old.len());
    let mut merges = Vec::new();

    let mut i = 0;
    while i < old.len() {
      let mut octant = old[i];
      octant.clear_new_flags();
      if octant.level() == 0 && octant.marker() < 0 {
        octant.set_marker(0);
      }
      if octant.level() == 0 || !wants_merge(&octant) {
        ranges.push(next.len() as u32..next.len() as u32 + 1);
        next.push(octant);
        i += 1;
        continue;
      }

      let family = self.local_family_run(&old, i, &wants_merge);
      let father = octant.father();
      let merge = match self.plan_family(&old, i, family, &wants_merge) {
        FamilyPlan::Merge => true,
        FamilyPlan::Keep => false,
        FamilyPlan::Defer(reason) => {
          merges.push(MergeStatus::Deferred {
            parent_morton: father.morton(),
            reason,
          });
          false
        }
      };

      if merge {
        let members = &old[i..i + family];
        let parent = self.merged_parent(father, members);
        let at = next.len() as u32;
        ranges.extend(std::iter::repeat(at..at + 1).take(family));
        merges.push(MergeStatus::Completed {
          parent_morton: parent.morton(),
          level: parent.level(),
        });
        next.push(parent);
      } else {
        for member in &old[i..i + family] {
          let mut member = *member;
          member.clear_new_flags();
          ranges.push(next.len() as u32..next.len() as u32 + 1);
          next.push(member);
        }
      }
      i += family;
    }

    let new_len = next.len() as u32;
    self.octants = next;
    self.refresh();
    let outcome = CoarseOutcome {
      remap: IndexRemap::from_ranges(ranges, new_len),
      merges,
    };
    debug!(
      merged = outcome.completed(),
      deferred = outcome.deferred(),
      octants = new_len,
      "coarse"
    );
    outcome
  }

  /// Local families the next [`LocalTree::coarse`] merges, as index ranges.
  pub(crate) fn pending_merges(&self) -> Vec<Range<usize>> {
    let wants_merge = |octant: &Octant| octant.marker() < 0;
    let mut families = Vec::new();
    let mut i = 0;
    while i < self.octants.len() {
      let octant = &self.octants[i];
      if octant.level() == 0 || !wants_merge(octant) {
        i += 1;
        continue;
      }
      let family = self.local_family_run(&self.octants, i, &wants_merge);
      if let FamilyPlan::Merge = self.plan_family(&self.octants, i, family, &wants_merge) {
        families.push(i..i + family);
      }
      i += family;
    }
    families
  }

  /// Decide a run of `family` siblings starting at `octants[start]`.
  fn plan_family(
    &self,
    octants: &[Octant],
    start: usize,
    family: usize,
    wants_merge: &impl Fn(&Octant) -> bool,
  ) -> FamilyPlan {
    let first = &octants[start];
    let child_index = first.child_index() as usize;
    if child_index == 0 && family == self.constants.n_children as usize {
      return FamilyPlan::Merge;
    }
    if child_index != 0 && start == 0 {
      return FamilyPlan::Defer(DeferReason::OwnedByPreviousPartition);
    }
    if child_index == 0 && start + family == octants.len() {
      return match self.ghost_tail_state(&first.father(), family, wants_merge) {
        Some(true) => FamilyPlan::Merge,
        Some(false) => FamilyPlan::Keep,
        None => FamilyPlan::Defer(DeferReason::IncompleteGhostFamily),
      };
    }
    FamilyPlan::Keep
  }

  /// Consecutive siblings of `old[start]` (itself included) that want to merge.
  fn local_family_run(&self, old: &[Octant], start: usize, wants_merge: &impl Fn(&Octant) -> bool) -> usize {
    let first = &old[start];
    let father_morton = first.father_morton();
    let n_children = self.constants.n_children as usize;
    old[start..]
      .iter()
      .take(n_children)
      .take_while(|o| {
        o.level() == first.level() && o.father_morton() == father_morton && wants_merge(*o)
      })
      .count()
  }

  /// Whether the trailing siblings missing locally can be merged.
  ///
  /// `Some(true)` when every one is a ghost leaf that wants to merge,
  /// `Some(false)` when one is refined or keeps its level, `None` when
  /// the ghost layer does not show them all.
  fn ghost_tail_state(
    &self,
    father: &Octant,
    local: usize,
    wants_merge: &impl Fn(&Octant) -> bool,
  ) -> Option<bool> {
    let siblings = father.children();
    let mut unknown = false;
    for sibling in &siblings[local..] {
      match self.ghost_sibling(sibling, wants_merge) {
        GhostSibling::Present { wants_merge: true } => {}
        GhostSibling::Present { wants_merge: false } | GhostSibling::Refined => return Some(false),
        GhostSibling::Unknown => unknown = true,
      }
    }
    if unknown {
      None
    } else {
      Some(true)
    }
  }

  fn ghost_sibling(&self, sibling: &Octant, wants_merge: &impl Fn(&Octant) -> bool) -> GhostSibling {
    let bound = search::lower_bound(&self.ghosts, sibling.morton());
    let Some(ghost) = self.ghosts.get(bound.index as usize) else {
      return GhostSibling::Unknown;
    };
    if !sibling.contains_morton(ghost.morton()) {
      return GhostSibling::Unknown;
    }
    if ghost.level() == sibling.level() {
      GhostSibling::Present {
        wants_merge: wants_merge(ghost),
      }
    } else {
      GhostSibling::Refined
    }
  }

  fn merged_parent(&self, father: Octant, members: &[Octant]) -> Octant {
    let mut parent = father.with_periodic(self.periodic_mask);
    parent.set_marker(0);
    parent.set_balance(members.iter().any(Octant::balance));
    parent.mark_new_coarsened();
    parent
  }

  /// Drop leading octants already covered by the previous partition.
  ///
  /// After the previous partition merged a family that started there, the
  /// trailing siblings held here are stale. `prev_last_desc` is the last
  /// descendant key of the previous partition, [`INVALID_MORTON`] when there
  /// is none or it is empty; the removal is composed into
  /// `remap`, which must end at the current octant count. Returns how many
  /// octants were dropped.
  #[tracing::instrument(skip_all, name = "local_tree::check_coarse")]
  pub fn check_coarse(&mut self, prev_last_desc: u64, remap: &mut IndexRemap) -> u32 {
    debug_assert_eq!(remap.new_len(), self.num_octants(), "remap does not end here");
    if prev_last_desc == INVALID_MORTON {
      return 0;
    }
    let removed = self.octants.partition_point(|o| o.morton() <= prev_last_desc) as u32;
    if removed == 0 {
      return 0;
    }

    let len = self.num_octants();
    let ranges = (0..len)
      .map(|i| if i < removed { 0..0 } else { i - removed..i - removed + 1 })
      .collect();
    let removal = IndexRemap::from_ranges(ranges, len - removed);
    *remap = remap.compose(&removal);

    self.octants.drain(..removed as usize);
    self.refresh();
    debug!(removed, octants = self.num_octants(), "check_coarse");
    removed
  }
}

#[cfg(test)]
#[path = "mutation_test.rs"]
mod mutation_test;
