use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::constants::{TREE_CONSTANTS_2D, TREE_CONSTANTS_3D};

// =========================================================================
// Morton codec
// =========================================================================

#[test]
fn test_known_interleavings() {
  assert_eq!(encode(2, [1, 0, 0]), 0b01);
  assert_eq!(encode(2, [0, 1, 0]), 0b10);
  assert_eq!(encode(2, [3, 3, 0]), 0b1111);
  assert_eq!(encode(3, [1, 0, 0]), 0b001);
  assert_eq!(encode(3, [0, 1, 0]), 0b010);
  assert_eq!(encode(3, [0, 0, 1]), 0b100);
  assert_eq!(encode(3, [2, 0, 0]), 0b001_000);
}

/// Random anchors anywhere in the domain decode to themselves.
#[test]
fn test_decode_inverts_encode() {
  let mut rng = StdRng::seed_from_u64(0x5eed);
  for c in [&TREE_CONSTANTS_2D, &TREE_CONSTANTS_3D] {
    for _ in 0..1000 {
      let mut anchor = [0u32; 3];
      for axis in 0..c.dim as usize {
        anchor[axis] = rng.random_range(0..c.max_length());
      }
      let key = encode(c.dim, anchor);
      assert_eq!(decode(c.dim, key), anchor, "round trip failed in {}D", c.dim);
    }
  }
}

#[test]
fn test_extreme_coordinates() {
  let c = &TREE_CONSTANTS_3D;
  let last = c.max_length() - 1;
  let key = encode(3, [last, last, last]);
  assert_eq!(decode(3, key), [last, last, last]);
  assert_eq!(key, (1u64 << 60) - 1);

  let c = &TREE_CONSTANTS_2D;
  let last = c.max_length() - 1;
  let key = encode(2, [last, last, 0]);
  assert_eq!(decode(2, key), [last, last, 0]);
  assert_eq!(key, (1u64 << 60) - 1);
}

/// Children in node order are ascending and tile the parent's range.
#[test]
fn test_children_partition_descendant_range() {
  let c = &TREE_CONSTANTS_3D;
  let level = 4;
  let size = c.length(level);
  let anchor = [3 * size, 5 * size, size];
  let parent = encode(3, anchor);
  let (first, last) = descendant_range(c, parent, level);

  let half = size / 2;
  let mut expected_next = first;
  for child in 0..c.n_children {
    let unit = c.node_coordinates(child);
    let child_anchor = [
      anchor[0] + unit[0] * half,
      anchor[1] + unit[1] * half,
      anchor[2] + unit[2] * half,
    ];
    let key = encode(3, child_anchor);
    let (cf, cl) = descendant_range(c, key, level + 1);
    assert_eq!(cf, expected_next, "child {} leaves a gap", child);
    expected_next = cl + 1;
  }
  assert_eq!(expected_next - 1, last);
}

/// The last descendant key is the key of the last finest cell.
#[test]
fn test_descendant_range_matches_last_cell() {
  let c = &TREE_CONSTANTS_2D;
  let level = 7;
  let size = c.length(level);
  let anchor = [9 * size, 2 * size, 0];
  let (_, last) = descendant_range(c, encode(2, anchor), level);
  assert_eq!(last, encode(2, [anchor[0] + size - 1, anchor[1] + size - 1, 0]));
}

#[test]
fn test_root_covers_whole_key_space() {
  let c = &TREE_CONSTANTS_3D;
  assert_eq!(descendant_range(c, 0, 0), (0, (1u64 << 60) - 1));
}

#[test]
fn test_node_key_accepts_domain_bound() {
  let c = &TREE_CONSTANTS_3D;
  let top = c.max_length();
  let a = node_key(3, [top, 0, 0]);
  let b = node_key(3, [0, top, 0]);
  let d = node_key(3, [0, 0, top]);
  assert_ne!(a, b);
  assert_ne!(b, d);
  assert_ne!(a, d);
}
