//! Refinement criteria: the predicate a [`crate::mesh::Mesh::refine`] sweep
//! uses to decide whether a leaf is "interesting enough" to subdivide.

use crate::node::{Direction, NodeId, Tree};

/// Guards the denominator of a relative-gradient ratio against
/// division-by-near-zero at cells whose value is close to 0.
const RELATIVE_EPS: f64 = 1e-6;

/// Distance-normalization factors applied to a neighbor's contribution to
/// the gradient magnitude, depending on how its level compares to the
/// cell being evaluated. A same-level neighbor's cell center is exactly
/// one cell-width away; a coarser or finer neighbor's effective center is
/// closer or farther, so its raw value difference is rescaled before
/// being compared against the same-level case.
mod distance_factor {
  pub const SAME_LEVEL: f64 = 1.0;
  pub const COARSER_NEIGHBOR: f64 = 0.7905;
  pub const FINER_NEIGHBOR: f64 = 0.75;
}

/// A capability that decides whether a leaf should be refined.
///
/// Implementations may read (but must not structurally mutate) the tree;
/// `&mut Tree` is required only because [`Tree::neighbor`] walks parent
/// links that are themselves immutable, but [`Tree::set_gradient`] (used
/// by [`Gradient`]/[`GradientLog`] for telemetry) needs `&mut`.
pub trait RefinementCriterion {
  /// `true` if `id` should be refined (or, under `shall_coarsen`, should
  /// *not* be coarsened).
  fn eval(&self, tree: &mut Tree, id: NodeId) -> bool;
}

/// Wraps an arbitrary closure as a [`RefinementCriterion`].
pub struct Custom<F>
where
  F: Fn(&mut Tree, NodeId) -> bool,
{
  predicate: F,
}

impl<F> Custom<F>
where
  F: Fn(&mut Tree, NodeId) -> bool,
{
  /// Wrap `predicate` as a criterion.
  pub fn new(predicate: F) -> Self {
    Self { predicate }
  }
}

impl<F> RefinementCriterion for Custom<F>
where
  F: Fn(&mut Tree, NodeId) -> bool,
{
  fn eval(&self, tree: &mut Tree, id: NodeId) -> bool {
    (self.predicate)(tree, id)
  }
}

/// Refines where the relative gradient of the raw cell value, across its
/// four cardinal neighbors, exceeds `threshold`.
pub struct Gradient {
  /// Cells whose relative gradient exceeds this are flagged for refinement.
  pub threshold: f64,
}

impl Gradient {
  /// Construct a criterion with the given threshold.
  pub fn new(threshold: f64) -> Self {
    Self { threshold }
  }
}

impl RefinementCriterion for Gradient {
  fn eval(&self, tree: &mut Tree, id: NodeId) -> bool {
    let Some(ratio) = relative_gradient(tree, id) else {
      return false;
    };
    tree.set_gradient(id, ratio);
    ratio > self.threshold
  }
}

/// Like [`Gradient`], but measures the gradient of `ln(|value| + eps)`
/// rather than the raw value - useful for quantities spanning several
/// orders of magnitude, where a fixed relative threshold on the raw value
/// would over- or under-refine depending on scale.
pub struct GradientLog {
  /// Cells whose relative log-gradient exceeds this are flagged for
  /// refinement.
  pub threshold: f64,
}

impl GradientLog {
  /// Construct a criterion with the given threshold.
  pub fn new(threshold: f64) -> Self {
    Self { threshold }
  }
}

impl RefinementCriterion for GradientLog {
  fn eval(&self, tree: &mut Tree, id: NodeId) -> bool {
    let Some(ratio) = relative_gradient(tree, id) else {
      return false;
    };
    let log_ratio = 10.0 * (1.0 + ratio).ln();
    tree.set_gradient(id, log_ratio);
    log_ratio > self.threshold
  }
}

/// `(value, distance_factor)` contributed by one cardinal neighbor of `id`,
/// or `None` if the criterion does not apply at `id` at all (any cardinal
/// neighbor missing aborts the whole evaluation, not just that direction).
///
/// A non-leaf neighbor's contribution is the mean of the two children
/// facing `id` across that direction (already I4-consistent), weighted by
/// the finer-neighbor distance factor.
fn neighbor_contribution(tree: &Tree, id: NodeId, direction: Direction, self_level: u32) -> Option<(f64, f64)> {
  let neighbor = tree.neighbor(id, direction)?;
  if tree.is_leaf(neighbor) {
    let factor = if tree.level(neighbor) < self_level {
      distance_factor::COARSER_NEIGHBOR
    } else {
      distance_factor::SAME_LEVEL
    };
    Some((tree.value(neighbor), factor))
  } else {
    let [a, b] = tree.facing_children(neighbor, direction);
    let mean = (tree.value(a) + tree.value(b)) / 2.0;
    Some((mean, distance_factor::FINER_NEIGHBOR))
  }
}

/// Relative gradient magnitude of the raw cell value at `id`, against its
/// four cardinal neighbors, per the level-aware finite difference: `dx` and
/// `dy` each combine both sides of an axis through a single division by
/// their summed distance factors, rather than a per-direction average.
///
/// Returns `None` ("criterion does not apply here") if any cardinal
/// neighbor is absent (a domain boundary).
fn relative_gradient(tree: &Tree, id: NodeId) -> Option<f64> {
  let self_level = tree.level(id);
  let (right_value, right_factor) = neighbor_contribution(tree, id, Direction::Right, self_level)?;
  let (left_value, left_factor) = neighbor_contribution(tree, id, Direction::Left, self_level)?;
  let (up_value, up_factor) = neighbor_contribution(tree, id, Direction::Up, self_level)?;
  let (down_value, down_factor) = neighbor_contribution(tree, id, Direction::Down, self_level)?;

  // raster convention: up contributes positively, matching the sign in §4.3.
  let dx = (right_value - left_value) / (right_factor + left_factor);
  let dy = (up_value - down_value) / (up_factor + down_factor);
  let magnitude = (dx * dx + dy * dy).sqrt();

  Some(magnitude / tree.value(id).abs().max(RELATIVE_EPS))
}

#[cfg(test)]
#[path = "refinement_test.rs"]
mod refinement_test;
