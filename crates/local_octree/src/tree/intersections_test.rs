use super::*;
use crate::config::TreeConfig;
use crate::test_utils::uniform_tree;

#[test]
fn test_uniform_quadtree_faces() {
  let mut tree = uniform_tree(TreeConfig::new(2), 1);
  let intersections = tree.compute_intersections();
  assert_eq!(intersections.interior.len(), 4);
  assert_eq!(intersections.boundary.len(), 8);
  assert!(intersections.border.is_empty());
  assert!(intersections.iter().all(|i| !i.periodic));
}

#[test]
fn test_uniform_octree_faces() {
  let mut tree = uniform_tree(TreeConfig::default(), 1);
  let intersections = tree.compute_intersections();
  assert_eq!(intersections.interior.len(), 12);
  assert_eq!(intersections.boundary.len(), 24);
  assert_eq!(intersections.len(), 36);
}

#[test]
fn test_hanging_faces_emitted_from_finer_side() {
  let mut tree = uniform_tree(TreeConfig::new(2), 1);
  tree.set_marker(1, 1).unwrap();
  tree.refine();
  let intersections = tree.compute_intersections().clone();

  assert_eq!(intersections.interior.len(), 10);
  assert_eq!(intersections.boundary.len(), 10);
  let hanging: Vec<_> = intersections
    .interior
    .iter()
    .filter(|i| i.owners[1] == 0 && i.face == 0)
    .collect();
  assert_eq!(hanging.len(), 2, "two children face the coarse quadrant");
  assert!(hanging.iter().all(|i| i.finer == 0 && i.kind == IntersectionKind::Interior));
}

#[test]
fn test_periodic_faces_become_interior() {
  let mut tree = uniform_tree(TreeConfig::new(2).with_periodic_axis(0), 1);
  let intersections = tree.compute_intersections();
  assert_eq!(intersections.interior.len(), 6);
  assert_eq!(intersections.boundary.len(), 4);
  assert_eq!(intersections.interior.iter().filter(|i| i.periodic).count(), 2);
}

#[test]
fn test_ghost_faces_are_border() {
  let full = uniform_tree(TreeConfig::new(2), 1);
  let octants = full.octants().to_vec();
  let mut tree = LocalTree::from_octants(TreeConfig::new(2), octants[..2].to_vec()).unwrap();
  tree.set_ghosts(octants[2..].to_vec(), vec![2, 3]).unwrap();

  let intersections = tree.compute_intersections();
  assert_eq!(intersections.interior.len(), 1);
  assert_eq!(intersections.border.len(), 2);
  assert_eq!(intersections.boundary.len(), 4);
  assert_eq!(intersections.border[0].owners, [0, 0]);
  assert_eq!(intersections.border[0].face, 3);
}

#[test]
fn test_mutation_drops_intersections() {
  let mut tree = uniform_tree(TreeConfig::new(2), 1);
  tree.compute_intersections();
  assert!(tree.intersections().is_some());
  tree.global_refine();
  assert!(tree.intersections().is_none());
  tree.compute_intersections();
  tree.clear_intersections();
  assert!(tree.intersections().is_none());
}
