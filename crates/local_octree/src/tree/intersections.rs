//! Shared faces between octants, grouped by kind.
//!
//! Every face between two leaves is recorded once:
//!
//! - **Interior**: two local octants. Emitted from the finer side, or from the
//!   `+` face when both have the same level.
//! - **Border**: a local octant and a ghost. Emitted from the local side.
//! - **Boundary**: a local face on a non-periodic domain face.

use tracing::debug;

use super::LocalTree;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntersectionKind {
  Interior,
  Border,
  Boundary,
}

/// One shared face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Intersection {
  /// Local octant, then the neighbor (a ghost index for border faces, the
  /// same octant for boundary faces).
  pub owners: [u32; 2],
  /// Face of `owners[0]`.
  pub face: u8,
  /// Which owner is finer (0 when both have the same level).
  pub finer: u8,
  pub kind: IntersectionKind,
  /// True if the face wraps around a periodic domain face.
  pub periodic: bool,
}

/// Intersections of the current octants.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Intersections {
  pub interior: Vec<Intersection>,
  pub border: Vec<Intersection>,
  pub boundary: Vec<Intersection>,
}

impl Intersections {
  pub fn len(&self) -> usize {
    self.interior.len() + self.border.len() + self.boundary.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// All intersections: interior, then border, then boundary.
  pub fn iter(&self) -> impl Iterator<Item = &Intersection> {
    self.interior.iter().chain(&self.border).chain(&self.boundary)
  }
}

impl LocalTree {
  /// Enumerate every face of the local octants.
  #[tracing::instrument(skip_all, name = "local_tree::compute_intersections")]
  pub fn compute_intersections(&mut self) -> &Intersections {
    let mut out = Intersections::default();
    for (index, octant) in self.octants.iter().enumerate() {
      let index = index as u32;
      for face in 0..self.constants.n_faces {
        let periodic = self.is_periodic(octant, face);
        let neighbors = self.find_neighbors(octant, face, false);
        if neighbors.is_empty() {
          if octant.is_bound(face) && !periodic {
            out.boundary.push(Intersection {
              owners: [index, index],
              face,
              finer: 0,
              kind: IntersectionKind::Boundary,
              periodic: false,
            });
          }
          continue;
        }

        for (neighbor, is_ghost) in neighbors.iter() {
          let other = if is_ghost {
            &self.ghosts[neighbor as usize]
          } else {
            &self.octants[neighbor as usize]
          };
          let finer = u8::from(other.level() > octant.level());
          if is_ghost {
            out.border.push(Intersection {
              owners: [index, neighbor],
              face,
              finer,
              kind: IntersectionKind::Border,
              periodic,
            });
            continue;
          }
          let emit = other.level() < octant.level() || (other.level() == octant.level() && face % 2 == 1);
          if emit {
            out.interior.push(Intersection {
              owners: [index, neighbor],
              face,
              finer,
              kind: IntersectionKind::Interior,
              periodic,
            });
          }
        }
      }
    }
    debug!(
      interior = out.interior.len(),
      border = out.border.len(),
      boundary = out.boundary.len(),
      "compute_intersections"
    );
    self.intersections.insert(out)
  }

  /// Cached intersections, if computed since the last change.
  pub fn intersections(&self) -> Option<&Intersections> {
    self.intersections.as_ref()
  }

  pub fn clear_intersections(&mut self) {
    self.intersections = None;
  }
}

#[cfg(test)]
#[path = "intersections_test.rs"]
mod intersections_test;
