//! Morton (Z-order) codec for octant anchors.
//!
//! Interleaves the anchor coordinates so that sorting by the resulting key
//! walks the domain along the Z-order curve:
//!
//! ```text
//! 2D:  ...y1x1 y0x0
//! 3D:  ...z1y1x1 z0y0x0
//! ```
//!
//! An octant at level `L` has its anchor aligned to `2^(max_level - L)`, so
//! the low `dim * (max_level - L)` bits of its key are zero and every finest
//! descendant lies in one contiguous key interval. Children enumerated in node
//! order (X fastest) are therefore already in ascending key order.

use crate::constants::TreeConstants;

#[inline]
fn split_by_2(a: u32) -> u64 {
  let mut x = a as u64;
  x = (x | (x << 16)) & 0x0000_ffff_0000_ffff;
  x = (x | (x << 8)) & 0x00ff_00ff_00ff_00ff;
  x = (x | (x << 4)) & 0x0f0f_0f0f_0f0f_0f0f;
  x = (x | (x << 2)) & 0x3333_3333_3333_3333;
  x = (x | (x << 1)) & 0x5555_5555_5555_5555;
  x
}

#[inline]
fn compact_by_2(m: u64) -> u32 {
  let mut x = m & 0x5555_5555_5555_5555;
  x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
  x = (x | (x >> 2)) & 0x0f0f_0f0f_0f0f_0f0f;
  x = (x | (x >> 4)) & 0x00ff_00ff_00ff_00ff;
  x = (x | (x >> 8)) & 0x0000_ffff_0000_ffff;
  x = (x | (x >> 16)) & 0x0000_0000_ffff_ffff;
  x as u32
}

#[inline]
fn split_by_3(a: u32) -> u64 {
  let mut x = (a as u64) & 0x1f_ffff;
  x = (x | (x << 32)) & 0x001f_0000_0000_ffff;
  x = (x | (x << 16)) & 0x001f_0000_ff00_00ff;
  x = (x | (x << 8)) & 0x100f_00f0_0f00_f00f;
  x = (x | (x << 4)) & 0x10c3_0c30_c30c_30c3;
  x = (x | (x << 2)) & 0x1249_2492_4924_9249;
  x
}

#[inline]
fn compact_by_3(m: u64) -> u32 {
  let mut x = m & 0x1249_2492_4924_9249;
  x = (x | (x >> 2)) & 0x10c3_0c30_c30c_30c3;
  x = (x | (x >> 4)) & 0x100f_00f0_0f00_f00f;
  x = (x | (x >> 8)) & 0x001f_0000_ff00_00ff;
  x = (x | (x >> 16)) & 0x001f_0000_0000_ffff;
  x = (x | (x >> 32)) & 0x1f_ffff;
  x as u32
}

/// Morton key of an anchor.
///
/// The Z coordinate is ignored in 2D.
#[inline]
pub fn encode(dim: u8, anchor: [u32; 3]) -> u64 {
  if dim == 2 {
    split_by_2(anchor[0]) | (split_by_2(anchor[1]) << 1)
  } else {
    debug_assert!(
      anchor.iter().all(|&c| c < (1 << 21)),
      "3D anchor exceeds 21-bit limit"
    );
    split_by_3(anchor[0]) | (split_by_3(anchor[1]) << 1) | (split_by_3(anchor[2]) << 2)
  }
}

/// Anchor of a Morton key.
#[inline]
pub fn decode(dim: u8, key: u64) -> [u32; 3] {
  if dim == 2 {
    [compact_by_2(key), compact_by_2(key >> 1), 0]
  } else {
    [compact_by_3(key), compact_by_3(key >> 1), compact_by_3(key >> 2)]
  }
}

/// Closed key interval `[first, last]` covered by the finest descendants of
/// the octant with anchor key `key` at `level`.
#[inline]
pub fn descendant_range(constants: &TreeConstants, key: u64, level: u8) -> (u64, u64) {
  let depth = u32::from(constants.max_level - level);
  let span_bits = u32::from(constants.dim) * depth;
  let mask = if span_bits >= 64 { u64::MAX } else { (1u64 << span_bits) - 1 };
  debug_assert_eq!(key & mask, 0, "key {:#x} not aligned to level {}", key, level);
  (key, key | mask)
}

/// Persistent key of a logical node position.
///
/// Unlike the Morton key it accepts the domain upper bound on every axis
/// (node coordinates run over `0..=max_length`).
#[inline]
pub fn node_key(dim: u8, node: [u32; 3]) -> u64 {
  if dim == 2 {
    node[0] as u64 | ((node[1] as u64) << 32)
  } else {
    node[0] as u64 | ((node[1] as u64) << 21) | ((node[2] as u64) << 42)
  }
}

#[cfg(test)]
#[path = "morton_test.rs"]
mod morton_test;
