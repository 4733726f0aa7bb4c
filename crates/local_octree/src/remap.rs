//! IndexRemap - how old octant positions map onto the rewritten sequence.
//!
//! Every mutation of the local sequence returns one of these so the driver
//! can move its own per-octant payloads along with the octants.
//!
//! ```text
//! refine (old 1 split in 4):   coarse (old 1..=4 merged):
//!   old 0 -> 0..1                old 0 -> 0..1
//!   old 1 -> 1..5                old 1 -> 1..2
//!   old 2 -> 5..6                old 2 -> 1..2   (same parent)
//!                                ...
//!                                old 5 -> 2..3
//! ```
//!
//! Ranges are monotonic in the old index. An empty range means the octant
//! left the partition.

use std::ops::Range;

/// Old-index to new-index-range map produced by a mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRemap {
  ranges: Vec<Range<u32>>,
  new_len: u32,
}

impl IndexRemap {
  /// Remap that keeps every index in place.
  pub fn identity(len: u32) -> Self {
    Self {
      ranges: (0..len).map(|i| i..i + 1).collect(),
      new_len: len,
    }
  }

  pub(crate) fn from_ranges(ranges: Vec<Range<u32>>, new_len: u32) -> Self {
    debug_assert!(
      ranges.windows(2).all(|w| w[0].start <= w[1].start && w[0].end <= w[1].end),
      "remap ranges must be monotonic"
    );
    Self { ranges, new_len }
  }

  /// Number of octants before the mutation.
  #[inline]
  pub fn old_len(&self) -> u32 {
    self.ranges.len() as u32
  }

  /// Number of octants after the mutation.
  #[inline]
  pub fn new_len(&self) -> u32 {
    self.new_len
  }

  /// New indices holding what used to be at `old`.
  pub fn get(&self, old: u32) -> Option<Range<u32>> {
    self.ranges.get(old as usize).cloned()
  }

  /// All ranges, indexed by old position.
  pub fn ranges(&self) -> &[Range<u32>] {
    &self.ranges
  }

  /// True if the mutation changed nothing.
  pub fn is_identity(&self) -> bool {
    self.new_len == self.old_len()
      && self
        .ranges
        .iter()
        .enumerate()
        .all(|(i, r)| r.start == i as u32 && r.end == i as u32 + 1)
  }

  /// Remap equivalent to applying `self` and then `next`.
  pub fn compose(&self, next: &IndexRemap) -> IndexRemap {
    debug_assert_eq!(self.new_len, next.old_len(), "remaps do not chain");
    let position = |i: u32| -> u32 {
      next
        .ranges
        .get(i as usize)
        .map_or(next.new_len, |r| r.start)
    };
    let ranges = self
      .ranges
      .iter()
      .map(|r| {
        if r.is_empty() {
          let at = position(r.start);
          return at..at;
        }
        let start = next.ranges[r.start as usize].start;
        let end = next.ranges[(r.end - 1) as usize].end.max(start);
        start..end
      })
      .collect();
    IndexRemap {
      ranges,
      new_len: next.new_len,
    }
  }

  /// For every new index, the first old index that produced it.
  pub fn new_to_old(&self) -> Vec<u32> {
    let mut map = vec![u32::MAX; self.new_len as usize];
    for (old, range) in self.ranges.iter().enumerate() {
      for new in range.clone() {
        let slot = &mut map[new as usize];
        if *slot == u32::MAX {
          *slot = old as u32;
        }
      }
    }
    debug_assert!(map.iter().all(|&o| o != u32::MAX), "new index without source");
    map
  }

  /// Move per-octant payloads to the new layout.
  ///
  /// Split octants copy their value to every child; merged families keep the
  /// value of their first member.
  pub fn redistribute<T: Clone>(&self, data: &[T]) -> Vec<T> {
    debug_assert_eq!(data.len(), self.ranges.len(), "payload length mismatch");
    self
      .new_to_old()
      .into_iter()
      .map(|old| data[old as usize].clone())
      .collect()
  }
}

#[cfg(test)]
#[path = "remap_test.rs"]
mod remap_test;
