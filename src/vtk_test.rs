use super::*;
use crate::node::Origin;

#[test]
fn write_produces_a_well_formed_legacy_vtk_file() {
  let mut tree = Tree::new(Dimension::TwoD);
  let root = tree.create_root(0.0, Origin::root(Dimension::TwoD)).unwrap();
  let values = [1.0, 2.0, 3.0, 4.0];
  let mut i = 0;
  tree.refine_with(root, || {
    let v = values[i];
    i += 1;
    v
  });

  let dir = std::env::temp_dir().join("amr_core_vtk_test");
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("quads.vtk");
  write(&tree, root, 2.0, 2.0, None, &path).unwrap();

  let contents = std::fs::read_to_string(&path).unwrap();
  assert!(contents.starts_with("# vtk DataFile Version 3.0"));
  assert!(contents.contains("DATASET UNSTRUCTURED_GRID"));
  assert!(contents.contains("CELL_TYPES 4"));
  assert!(contents.contains("9\n9\n9\n9\n") || contents.matches('9').count() >= 4);
  assert!(contents.contains("SCALARS value float 1"));
  assert!(contents.contains("SCALARS gradient float 1"));

  // a quad-tree of 4 uniform leaves shares its interior corner: 9 unique
  // points, not 16.
  let points_line = contents.lines().find(|l| l.starts_with("POINTS")).unwrap();
  assert_eq!(points_line, "POINTS 9 float");

  std::fs::remove_file(&path).ok();
}
