use super::*;
use crate::constants::TREE_CONSTANTS_3D;

// =========================================================================
// Validation
// =========================================================================

#[test]
fn test_default_is_valid_3d_face_balance() {
  let config = TreeConfig::default();
  let constants = config.validate().expect("default config must validate");
  assert_eq!(constants.dim, 3);
  assert_eq!(config.balance_codim, 1);
  assert_eq!(config.periodic_mask(), 0);
}

#[test]
fn test_rejects_bad_dimension() {
  assert_eq!(
    TreeConfig::new(1).validate().unwrap_err(),
    TreeError::InvalidDimension(1)
  );
  assert_eq!(
    TreeConfig::new(4).validate().unwrap_err(),
    TreeError::InvalidDimension(4)
  );
}

#[test]
fn test_rejects_codimension_above_dimension() {
  let err = TreeConfig::new(2).with_balance_codim(3).validate().unwrap_err();
  assert_eq!(err, TreeError::InvalidBalanceCodimension { codim: 3, dim: 2 });

  let err = TreeConfig::new(3).with_balance_codim(0).validate().unwrap_err();
  assert_eq!(err, TreeError::InvalidBalanceCodimension { codim: 0, dim: 3 });
}

#[test]
fn test_rejects_unpaired_periodic_face() {
  let mut periodic = [false; 6];
  periodic[2] = true;
  let err = TreeConfig::default().with_periodic(periodic).validate().unwrap_err();
  assert_eq!(err, TreeError::UnpairedPeriodicFace { face: 2 });
}

#[test]
fn test_periodic_mask_ignores_z_faces_in_2d() {
  let config = TreeConfig::new(2).with_periodic([true; 6]);
  assert_eq!(config.periodic_mask(), 0b1111);
  let config = TreeConfig::new(3).with_periodic_axis(2);
  assert_eq!(config.periodic_mask(), 0b11_0000);
}

// =========================================================================
// Physical mapping
// =========================================================================

#[test]
fn test_map_node_scales_and_translates() {
  let c = &TREE_CONSTANTS_3D;
  let config = TreeConfig::default()
    .with_origin(DVec3::new(10.0, -5.0, 0.0))
    .with_length(8.0);
  let top = c.max_length();
  assert_eq!(config.map_node(c, [0, 0, 0]), DVec3::new(10.0, -5.0, 0.0));
  assert_eq!(config.map_node(c, [top, top / 2, top]), DVec3::new(18.0, -1.0, 8.0));
}

#[test]
fn test_octant_center_and_size() {
  let c = &TREE_CONSTANTS_3D;
  let config = TreeConfig::default().with_length(4.0);
  let octant = Octant::new(c, 1, [c.length(1), 0, 0]);
  assert_eq!(config.octant_size(&octant), 2.0);
  assert_eq!(config.octant_min(&octant), DVec3::new(2.0, 0.0, 0.0));
  assert_eq!(config.octant_center(&octant), DVec3::new(3.0, 1.0, 1.0));
}
