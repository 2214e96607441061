use super::*;
use crate::mesh::Mesh;
use crate::node::{Dimension, Origin, Tree};

#[test]
fn custom_criterion_wraps_closure() {
  let mut tree = Tree::new(Dimension::TwoD);
  let root = tree.create_root(1.0, Origin::root(Dimension::TwoD)).unwrap();
  let always = Custom::new(|_tree: &mut Tree, _id: NodeId| true);
  let never = Custom::new(|_tree: &mut Tree, _id: NodeId| false);
  assert!(always.eval(&mut tree, root));
  assert!(!never.eval(&mut tree, root));
}

#[test]
fn gradient_does_not_apply_at_a_domain_boundary() {
  // every cell of a 2x2 uniform mesh is missing at least one cardinal
  // neighbor (the root has no parent), so the criterion never applies.
  let mut mesh = Mesh::uniform(2, || 5.0, 8.0, 8.0, None).unwrap();
  let flat = Gradient::new(0.0);
  for &leaf in &mesh.leafs().unwrap() {
    assert!(!flat.eval(mesh.tree_mut(), leaf));
  }
}

#[test]
fn gradient_is_zero_for_a_uniform_interior_cell() {
  // a 4x4 uniform mesh has interior cells with all four cardinal
  // neighbors present; a flat field has zero gradient everywhere.
  let mut mesh = Mesh::uniform(4, || 3.0, 8.0, 8.0, None).unwrap();
  let interior = interior_leaf(&mesh);
  let flat = Gradient::new(0.01);
  assert!(!flat.eval(mesh.tree_mut(), interior));
}

#[test]
fn gradient_reacts_to_a_sharp_step_at_an_interior_cell() {
  let mut mesh = Mesh::uniform(4, || 1.0, 8.0, 8.0, None).unwrap();
  let interior = interior_leaf(&mesh);
  // spike the interior cell itself so its neighbors (all value 1.0)
  // differ sharply from it.
  mesh.tree_mut().set_value(interior, 100.0);
  let steep = Gradient::new(1.0);
  assert!(steep.eval(mesh.tree_mut(), interior));
}

#[test]
fn gradient_log_compresses_large_ratios() {
  let mut mesh = Mesh::uniform(4, || 1.0, 8.0, 8.0, None).unwrap();
  let interior = interior_leaf(&mesh);
  mesh.tree_mut().set_value(interior, 1_000_000.0);

  let raw = Gradient::new(1.0);
  let log = GradientLog::new(1.0);

  let _ = raw.eval(mesh.tree_mut(), interior);
  let raw_ratio = mesh.tree().gradient(interior);

  let _ = log.eval(mesh.tree_mut(), interior);
  let log_ratio = mesh.tree().gradient(interior);

  assert!(log_ratio < raw_ratio);
  assert!(log_ratio > 0.0);
}

#[test]
fn gradient_eval_records_relative_gradient_as_telemetry() {
  let mut mesh = Mesh::uniform(4, || 1.0, 8.0, 8.0, None).unwrap();
  let interior = interior_leaf(&mesh);
  assert_eq!(mesh.tree().gradient(interior), 0.0);
  let criterion = Gradient::new(0.0);
  let _ = criterion.eval(mesh.tree_mut(), interior);
  // uniform field: relative gradient is exactly zero, still recorded.
  assert_eq!(mesh.tree().gradient(interior), 0.0);
}

/// A leaf of the 4x4 uniform mesh with all four cardinal neighbors present
/// (i.e. not touching the domain boundary on any side).
fn interior_leaf(mesh: &Mesh) -> NodeId {
  mesh
    .leafs()
    .unwrap()
    .into_iter()
    .find(|&leaf| {
      let tree = mesh.tree();
      Direction::CARDINAL.iter().all(|&d| tree.neighbor(leaf, d).is_some())
    })
    .expect("a 4x4 uniform mesh has interior cells")
}
