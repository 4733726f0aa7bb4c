//! Shared helpers for the in-crate tests.

use crate::config::TreeConfig;
use crate::remap::IndexRemap;
use crate::tree::LocalTree;

/// Tree refined uniformly to `level`.
pub fn uniform_tree(config: TreeConfig, level: u8) -> LocalTree {
  let mut tree = LocalTree::new(config).expect("valid test config");
  for _ in 0..level {
    tree.global_refine();
  }
  tree
}

/// Apply refine until no marker is left, returning the composed remap.
pub fn refine_until_stable(tree: &mut LocalTree) -> IndexRemap {
  let mut total = IndexRemap::identity(tree.num_octants());
  while tree.octants().iter().any(|o| o.marker() > 0) {
    let step = tree.refine();
    total = total.compose(&step);
  }
  total
}

/// Local octants are strictly ascending and do not overlap.
pub fn assert_sorted(tree: &LocalTree) {
  for (i, pair) in tree.octants().windows(2).enumerate() {
    assert!(
      pair[0].morton() < pair[1].morton(),
      "octants {} and {} out of order",
      i,
      i + 1
    );
    assert!(
      pair[0].last_desc_morton() < pair[1].morton(),
      "octants {} and {} overlap",
      i,
      i + 1
    );
  }
}

/// Every adjacency selected by the balance codimension differs by at most
/// one level, ghosts included.
pub fn assert_balanced(tree: &LocalTree) {
  let offsets = tree.constants().balance_offsets(tree.balance_codim());
  for (i, octant) in tree.octants().iter().enumerate() {
    for &offset in &offsets {
      let neighbors = tree.find_neighbors_by_offset(octant, offset, false);
      for (n, is_ghost) in neighbors.iter() {
        let other = if is_ghost {
          tree.ghosts()[n as usize]
        } else {
          tree.octants()[n as usize]
        };
        assert!(
          octant.level().abs_diff(other.level()) <= 1,
          "octant {} (level {}) and {} {} (level {}) violate 2:1 across {:?}",
          i,
          octant.level(),
          if is_ghost { "ghost" } else { "octant" },
          n,
          other.level(),
          offset
        );
      }
    }
  }
}
