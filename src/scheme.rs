//! Numerical schemes: how a [`crate::mesh::Mesh::solve`] step turns the
//! current leaf values into the next ones.

use rayon::prelude::*;

use crate::node::{Direction, NodeId, Tree};

/// A capability that advances every leaf's value by one timestep.
///
/// Implementations must honor the snapshot discipline: every neighbor
/// value read during the sweep must reflect the tree as it was *before*
/// the sweep started, so that the result does not depend on which order
/// the leaves are visited in. [`SecondOrderCenteredFiniteDifferences`]
/// achieves this by computing every leaf's next value from `&Tree` (read-
/// only, safely parallelizable) before writing any of them back.
pub trait NumericalScheme {
  /// Advance every leaf in `leaves` by one step, in place.
  fn apply(&self, tree: &mut Tree, leaves: &[NodeId]);
}

/// A five-point, second-order-accurate finite-difference discretization of
/// diffusion: `next = center + laplacian_factor * (d²u/dx² + d²u/dy²)`,
/// where the second derivatives use the standard centered stencil
/// `(neighbor_plus + neighbor_minus - 2*center) / spacing²`.
///
/// Cell size is ignored when picking a neighbor's contribution: a coarser
/// or finer neighbor's value is read exactly as a same-level one would be,
/// using the nominal spacings `d1`/`d2` regardless of the neighbor's
/// actual level. This keeps the stencil a fixed five-point shape at any
/// refinement boundary, at the cost of formal accuracy right at a
/// hanging face - acceptable since [`RefinementCriterion`](crate::refinement::RefinementCriterion)-driven
/// refinement keeps those boundaries away from the steepest gradients.
///
/// A missing neighbor (domain boundary) is treated as a Neumann
/// (zero-gradient) boundary: it contributes the cell's own value, rather
/// than being skipped.
pub struct SecondOrderCenteredFiniteDifferences {
  /// Timestep-and-material factor multiplying the Laplacian (folds in
  /// `dt`, thermal conductivity, density, and heat capacity for the
  /// thermal-diffusion use case; dimensionless here).
  pub laplacian_factor: f64,
  /// Grid spacing along the first axis (x).
  pub d1: f64,
  /// Grid spacing along the second axis (y).
  pub d2: f64,
}

impl SecondOrderCenteredFiniteDifferences {
  /// Construct a scheme with the given Laplacian factor and grid spacings.
  pub fn new(laplacian_factor: f64, d1: f64, d2: f64) -> Self {
    Self { laplacian_factor, d1, d2 }
  }

  fn next_value(&self, tree: &Tree, id: NodeId) -> f64 {
    let center = tree.value(id);
    let right = self.sample(tree, id, Direction::Right, center);
    let left = self.sample(tree, id, Direction::Left, center);
    let up = self.sample(tree, id, Direction::Up, center);
    let down = self.sample(tree, id, Direction::Down, center);

    let d2x = (right + left - 2.0 * center) / (self.d1 * self.d1);
    let d2y = (up + down - 2.0 * center) / (self.d2 * self.d2);

    center + self.laplacian_factor * (d2x + d2y)
  }

  /// Read a cardinal neighbor's value, falling back to `center` (Neumann /
  /// zero-gradient) if there is no neighbor in that direction.
  fn sample(&self, tree: &Tree, id: NodeId, direction: Direction, center: f64) -> f64 {
    tree
      .neighbor(id, direction)
      .map(|neighbor| tree.value(neighbor))
      .unwrap_or(center)
  }
}

impl NumericalScheme for SecondOrderCenteredFiniteDifferences {
  fn apply(&self, tree: &mut Tree, leaves: &[NodeId]) {
    // Read phase: entirely against `&Tree`, so every neighbor lookup sees
    // pre-sweep values no matter what order `leaves` is processed in, and
    // the map itself can run in parallel.
    let snapshot: &Tree = tree;
    let updates: Vec<(NodeId, f64)> = leaves.par_iter().map(|&id| (id, self.next_value(snapshot, id))).collect();

    // Commit phase: no reads happen past this point, so write order does
    // not matter either.
    for (id, value) in updates {
      tree.set_value(id, value);
    }
  }
}

#[cfg(test)]
#[path = "scheme_test.rs"]
mod scheme_test;
