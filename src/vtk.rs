//! Legacy ASCII VTK `UNSTRUCTURED_GRID` writer for the current leaf
//! decomposition of a [`Tree`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;
use crate::node::{Dimension, NodeId, Tree};

/// VTK cell-type code for a quadrilateral.
const VTK_QUAD: u8 = 9;
/// VTK cell-type code for a hexahedron.
const VTK_HEXAHEDRON: u8 = 12;

/// Write every leaf under `root` as one cell of a legacy-format VTK file at
/// `path`. Points shared by adjacent cells are written once: a leaf's
/// corners are looked up by exact bit pattern (cell geometry is built from
/// repeated halving, so coincident corners compare bit-equal).
pub fn write(tree: &Tree, root: NodeId, lx: f64, ly: f64, lz: Option<f64>, path: &Path) -> Result<()> {
  let leaves = tree.leaves(root);
  let is_3d = matches!(tree.dimension(), Dimension::ThreeD);

  let mut points: Vec<(f64, f64, f64)> = Vec::new();
  let mut point_index: HashMap<(u64, u64, u64), usize> = HashMap::new();
  let mut cells: Vec<Vec<usize>> = Vec::with_capacity(leaves.len());
  let mut values: Vec<f64> = Vec::with_capacity(leaves.len());
  let mut gradients: Vec<f64> = Vec::with_capacity(leaves.len());

  for &leaf in &leaves {
    let cell_size = 2f64.powi(-(tree.level(leaf) as i32));
    let (ox, oy, oz) = tree.absolute_origin(leaf);
    let sx = ox * lx;
    let sy = oy * ly;
    let sz = oz.unwrap_or(0.0) * lz.unwrap_or(0.0);
    let dx = cell_size * lx;
    let dy = cell_size * ly;
    let dz = cell_size * lz.unwrap_or(0.0);

    let corners: Vec<(f64, f64, f64)> = if is_3d {
      vec![
        (sx, sy, sz),
        (sx + dx, sy, sz),
        (sx + dx, sy + dy, sz),
        (sx, sy + dy, sz),
        (sx, sy, sz + dz),
        (sx + dx, sy, sz + dz),
        (sx + dx, sy + dy, sz + dz),
        (sx, sy + dy, sz + dz),
      ]
    } else {
      vec![(sx, sy, 0.0), (sx + dx, sy, 0.0), (sx + dx, sy + dy, 0.0), (sx, sy + dy, 0.0)]
    };

    let mut cell = Vec::with_capacity(corners.len());
    for corner in corners {
      let key = (corner.0.to_bits(), corner.1.to_bits(), corner.2.to_bits());
      let index = *point_index.entry(key).or_insert_with(|| {
        points.push(corner);
        points.len() - 1
      });
      cell.push(index);
    }
    cells.push(cell);
    values.push(tree.value(leaf));
    gradients.push(tree.gradient(leaf));
  }

  let mut out = String::new();
  let _ = writeln!(out, "# vtk DataFile Version 3.0");
  let _ = writeln!(out, "amr_core mesh");
  let _ = writeln!(out, "ASCII");
  let _ = writeln!(out, "DATASET UNSTRUCTURED_GRID");

  let _ = writeln!(out, "POINTS {} float", points.len());
  for (x, y, z) in &points {
    let _ = writeln!(out, "{x} {y} {z}");
  }

  let list_size: usize = cells.iter().map(|c| c.len() + 1).sum();
  let _ = writeln!(out, "CELLS {} {}", cells.len(), list_size);
  for cell in &cells {
    let _ = write!(out, "{}", cell.len());
    for index in cell {
      let _ = write!(out, " {index}");
    }
    let _ = writeln!(out);
  }

  let _ = writeln!(out, "CELL_TYPES {}", cells.len());
  let cell_type = if is_3d { VTK_HEXAHEDRON } else { VTK_QUAD };
  for _ in &cells {
    let _ = writeln!(out, "{cell_type}");
  }

  let _ = writeln!(out, "CELL_DATA {}", cells.len());
  let _ = writeln!(out, "SCALARS value float 1");
  let _ = writeln!(out, "LOOKUP_TABLE default");
  for value in &values {
    let _ = writeln!(out, "{value}");
  }
  let _ = writeln!(out, "SCALARS gradient float 1");
  let _ = writeln!(out, "LOOKUP_TABLE default");
  for gradient in &gradients {
    let _ = writeln!(out, "{gradient}");
  }

  std::fs::write(path, out)?;
  Ok(())
}

#[cfg(test)]
#[path = "vtk_test.rs"]
mod vtk_test;
