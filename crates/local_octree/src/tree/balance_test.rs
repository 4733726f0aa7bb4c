use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::config::TreeConfig;
use crate::constants::{TREE_CONSTANTS_2D, TREE_CONSTANTS_3D};
use crate::morton;
use crate::test_utils::{assert_balanced, assert_sorted, refine_until_stable, uniform_tree};

fn index_at(tree: &LocalTree, level: u8, anchor: [u32; 3]) -> u32 {
  let index = tree
    .find_morton(morton::encode(tree.dim(), anchor))
    .expect("no octant at anchor");
  assert_eq!(tree.octants()[index as usize].level(), level);
  index
}

/// Level-1 octant at the origin facing level-3 octants across +X.
fn level_one_against_level_three(config: TreeConfig) -> LocalTree {
  let c = &TREE_CONSTANTS_3D;
  let mut tree = uniform_tree(config, 1);
  tree.set_marker(1, 1).unwrap();
  tree.refine();
  let inner = index_at(&tree, 2, [c.length(1), 0, 0]);
  tree.set_marker(inner, 1).unwrap();
  tree.refine();
  tree
}

/// 2D level-2 quadrant 0 asking to coarsen next to a level-3 family where
/// only the two -X children ask.
fn half_family_beside_coarsening_family() -> LocalTree {
  let c = &TREE_CONSTANTS_2D;
  let mut tree = uniform_tree(TreeConfig::new(2), 2);
  let refined = index_at(&tree, 2, [c.length(1), 0, 0]);
  tree.set_marker(refined, 1).unwrap();
  tree.refine();
  for i in 0..4 {
    tree.set_marker(i, -1).unwrap();
  }
  for anchor in [[c.length(1), 0, 0], [c.length(1), c.length(3), 0]] {
    let index = index_at(&tree, 3, anchor);
    tree.set_marker(index, -1).unwrap();
  }
  tree
}

/// Targets of local octants within one level of each other, and never more
/// than one below a ghost's.
fn assert_targets_balanced(tree: &LocalTree) {
  let offsets = tree.constants().balance_offsets(tree.balance_codim());
  for (i, octant) in tree.octants().iter().enumerate() {
    for &offset in &offsets {
      for (n, is_ghost) in tree.find_neighbors_by_offset(octant, offset, false).iter() {
        let target = octant.target_level();
        if is_ghost {
          let ghost = tree.ghosts()[n as usize].target_level();
          assert!(target + 1 >= ghost, "octant {} at {} below ghost {} at {}", i, target, n, ghost);
        } else {
          let other = tree.octants()[n as usize].target_level();
          assert!(target.abs_diff(other) <= 1, "octants {} and {} at {} and {}", i, n, target, other);
        }
      }
    }
  }
}

// =========================================================================
// Batch 1: local_balance
// =========================================================================

#[test]
fn test_balanced_tree_needs_no_raise() {
  let mut tree = uniform_tree(TreeConfig::default(), 2);
  let stats = tree.local_balance(false, true);
  assert!(!stats.changed());
  assert_eq!(stats.passes, 1);
  assert_eq!(stats.visited, 64);
}

#[test]
fn test_nothing_fresh_means_no_pass() {
  let mut tree = uniform_tree(TreeConfig::default(), 1);
  tree.refine();
  let stats = tree.local_balance(true, true);
  assert_eq!(stats, BalanceStats::default());
}

/// Levels 1 and 3 across a face: the coarse octant is raised one level only,
/// and a second pass confirms the fixed point.
#[test]
fn test_level_gap_raises_coarse_side_by_one() {
  let mut tree = level_one_against_level_three(TreeConfig::default());
  let stats = tree.local_balance(true, true);

  assert!(stats.changed());
  assert!(stats.passes >= 2);
  assert_eq!(tree.octants()[0].marker(), 1);
  assert_eq!(tree.octants()[0].target_level(), 2);

  refine_until_stable(&mut tree);
  assert_sorted(&tree);
  assert_balanced(&tree);
  assert_eq!(tree.octants()[0].level(), 2);
}

#[test]
fn test_face_balance_ignores_edge_gap() {
  let mut tree = uniform_tree(TreeConfig::default(), 1);
  tree.set_marker(3, 2).unwrap();
  let stats = tree.local_balance(false, true);
  // Octant 3 touches octant 0 only along an edge.
  assert_eq!(tree.octants()[0].marker(), 0);
  assert!(stats.changed(), "face neighbors 1 and 2 must rise");
  assert_eq!(tree.octants()[1].target_level(), 2);

  let mut tree = uniform_tree(TreeConfig::default().with_balance_codim(2), 1);
  tree.set_marker(3, 2).unwrap();
  tree.local_balance(false, true);
  assert_eq!(tree.octants()[0].target_level(), 2);
  assert_eq!(tree.octants()[5].target_level(), 2, "edge neighbor");
  assert_eq!(tree.octants()[4].target_level(), 1, "node-only neighbor");

  let mut tree = uniform_tree(TreeConfig::default().with_balance_codim(3), 1);
  tree.set_marker(3, 2).unwrap();
  tree.local_balance(false, true);
  assert_eq!(tree.octants()[4].target_level(), 2);
}

#[test]
fn test_excluded_octant_is_not_raised() {
  let mut tree = level_one_against_level_three(TreeConfig::default());
  tree.set_balance(0, false).unwrap();
  tree.local_balance(true, true);
  assert_eq!(tree.octants()[0].marker(), 0);
}

#[test]
fn test_ghost_constrains_local_octant() {
  let full = level_one_against_level_three(TreeConfig::default());
  let octants = full.octants().to_vec();
  // Partition: only the level-1 origin octant is local, the rest are ghosts.
  let mut tree = LocalTree::from_octants(TreeConfig::default(), vec![octants[0]]).unwrap();
  let ghosts = octants[1..].to_vec();
  let ids = (1..octants.len() as u64).collect();
  tree.set_ghosts(ghosts, ids).unwrap();

  let stats = tree.local_balance(false, false);
  assert_eq!(stats.raised, 1);
  assert_eq!(tree.octants()[0].target_level(), 2);
  assert_eq!(tree.ghosts()[0].marker(), 0, "ghosts are never raised");
}

#[test]
fn test_interior_octants_skipped_without_do_interior() {
  let mut tree = level_one_against_level_three(TreeConfig::default());
  let stats = tree.local_balance(false, false);
  assert_eq!(stats, BalanceStats::default());
  assert_eq!(tree.octants()[0].marker(), 0);
}

/// Random refinement markers, balanced and applied, leave a 2:1 tree.
#[test]
fn test_random_markers_balance_to_two_to_one() {
  let mut rng = StdRng::seed_from_u64(0xba1a);
  for codim in 1..=2 {
    let mut tree = uniform_tree(TreeConfig::new(2).with_balance_codim(codim), 2);
    for _ in 0..4 {
      for i in 0..tree.num_octants() {
        if rng.random_bool(0.15) {
          tree.set_marker(i, rng.random_range(1..=2)).unwrap();
        }
      }
      tree.local_balance(true, true);
      refine_until_stable(&mut tree);
      assert_sorted(&tree);
      assert_balanced(&tree);
    }
  }
}

/// Random markers on both sides of a partition cut, in 3D and for every
/// codimension.
#[test]
fn test_random_markers_against_ghost_layer() {
  let mut rng = StdRng::seed_from_u64(0x9057);
  for codim in 1..=3 {
    let config = TreeConfig::default().with_balance_codim(codim);
    let mut full = uniform_tree(config.clone(), 2);
    for i in 0..full.num_octants() {
      if rng.random_bool(0.2) {
        full.set_marker(i, 1).unwrap();
      }
    }
    full.local_balance(true, true);
    refine_until_stable(&mut full);

    let octants = full.octants().to_vec();
    let cut = octants.len() / 2;
    let mut tree = LocalTree::from_octants(config, octants[..cut].to_vec()).unwrap();
    let ghosts = octants[cut..]
      .iter()
      .map(|o| {
        let mut o = *o;
        if rng.random_bool(0.2) {
          o.set_marker(rng.random_range(1..=2));
        }
        o
      })
      .collect();
    let ids = (cut as u64..octants.len() as u64).collect();
    tree.set_ghosts(ghosts, ids).unwrap();
    for i in 0..tree.num_octants() {
      if rng.random_bool(0.1) {
        tree.set_marker(i, 1).unwrap();
      }
    }

    tree.local_balance(false, true);
    assert_targets_balanced(&tree);
  }
}

// =========================================================================
// Batch 2: coarsening
// =========================================================================

/// A family only half of which asks to coarsen stays put, so its coarsening
/// neighbor family is held back as well.
#[test]
fn test_refused_coarsening_cancels_neighbor_merge() {
  let mut tree = half_family_beside_coarsening_family();
  assert_eq!(tree.pending_merges(), vec![0..4]);

  let stats = tree.local_balance(false, true);
  assert!(stats.changed());
  assert!(tree.pending_merges().is_empty());
  assert_eq!(tree.octants()[1].marker(), 0);

  let outcome = tree.coarse();
  assert_eq!(outcome.completed(), 0);
  refine_until_stable(&mut tree);
  assert_sorted(&tree);
  assert_balanced(&tree);
  assert_eq!(tree.octants()[0].level(), 2);
}

#[test]
fn test_coarsening_family_merges_when_balanced() {
  let mut tree = uniform_tree(TreeConfig::new(2), 2);
  for i in 0..4 {
    tree.set_marker(i, -1).unwrap();
  }
  let stats = tree.local_balance(false, true);
  assert!(!stats.changed());

  let outcome = tree.coarse();
  assert_eq!(outcome.completed(), 1);
  assert_eq!(tree.octants()[0].level(), 1);
  assert_balanced(&tree);
}

/// Markers below -1 still coarsen one level per pass, and balance treats
/// them that way.
#[test]
fn test_deep_coarsening_marker_counts_one_level() {
  let mut tree = uniform_tree(TreeConfig::new(2), 3);
  for i in 0..4 {
    tree.set_marker(i, -3).unwrap();
  }
  let stats = tree.local_balance(false, true);
  assert!(!stats.changed(), "level 2 next to level 3 is balanced");
  tree.coarse();
  assert_eq!(tree.octants()[0].level(), 2);
  assert_balanced(&tree);
}

/// Refine, balance, coarse and refine again with mixed random markers.
#[test]
fn test_random_adaptation_cycles_stay_balanced() {
  let mut rng = StdRng::seed_from_u64(0xc0a5e);
  for codim in 1..=3 {
    let mut tree = uniform_tree(TreeConfig::default().with_balance_codim(codim), 2);
    for round in 0..4 {
      for i in 0..tree.num_octants() {
        let roll: f64 = rng.random();
        let marker = if roll < 0.1 {
          1
        } else if roll < 0.5 {
          -1
        } else {
          0
        };
        tree.set_marker(i, marker).unwrap();
      }
      tree.local_balance(round % 2 == 0, true);
      tree.coarse();
      refine_until_stable(&mut tree);
      assert_sorted(&tree);
      assert_balanced(&tree);
    }
  }
}

// =========================================================================
// Batch 3: pre_balance_21
// =========================================================================

#[test]
fn test_pre_balance_seeds_marker_on_coarse_neighbor() {
  let mut tree = level_one_against_level_three(TreeConfig::default());
  let modified = tree.pre_balance_21(true);
  assert_eq!(modified, vec![0]);
  assert_eq!(tree.octants()[0].marker(), 1);
}

#[test]
fn test_pre_balance_keeps_larger_marker() {
  let mut tree = level_one_against_level_three(TreeConfig::default());
  tree.set_marker(0, 2).unwrap();
  let modified = tree.pre_balance_21(true);
  assert!(modified.is_empty());
  assert_eq!(tree.octants()[0].marker(), 2);
}

#[test]
fn test_pre_balance_border_only() {
  let mut tree = level_one_against_level_three(TreeConfig::default());
  assert!(tree.pre_balance_21(false).is_empty(), "no ghosts, no border octants");
}
