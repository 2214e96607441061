//! `Mesh`: owns a [`Tree`] together with its physical extent and drives
//! the solve/refine/save lifecycle.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{AmrError, Result};
use crate::node::{Dimension, NodeId, Origin, Tree};
use crate::refinement::{Custom, RefinementCriterion};
use crate::scheme::NumericalScheme;
use crate::vtk;

/// Chebyshev radius used to pre-widen refinement zones before the grading
/// check would otherwise reject a neighbor as too coarse. A larger radius
/// trades extra refined cells for fewer multi-round refine/regrade cycles.
const BUFFER_RADIUS: i32 = 4;

/// Outcome of one [`Mesh::refine`] call.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefinementStats {
  /// Leaves that were subdivided this round.
  pub refined: usize,
  /// Parents whose children were collapsed back into them this round.
  pub coarsened: usize,
}

/// A physical domain `[0, lx] x [0, ly] x [0, lz]` (`lz` absent in 2D)
/// discretized by a single [`Tree`].
pub struct Mesh {
  lx: f64,
  ly: f64,
  lz: Option<f64>,
  tree: Tree,
  root: Option<NodeId>,
}

impl Mesh {
  /// An empty mesh over the given physical extent; call [`Mesh::create_root`]
  /// or use [`Mesh::uniform`] before doing anything else with it.
  pub fn new(dimension: Dimension, lx: f64, ly: f64, lz: Option<f64>) -> Self {
    Self {
      lx,
      ly,
      lz,
      tree: Tree::new(dimension),
      root: None,
    }
  }

  /// Give this (currently empty) mesh a root cell.
  pub fn create_root(&mut self, value: f64, origin: Origin) -> Result<()> {
    let root = self.tree.create_root(value, origin)?;
    self.root = Some(root);
    Ok(())
  }

  /// Build a mesh uniformly refined so that each axis has `n` cells
  /// (`n` must be a power of two), with each leaf's value supplied by
  /// `generator`.
  pub fn uniform(n: u32, mut generator: impl FnMut() -> f64, lx: f64, ly: f64, lz: Option<f64>) -> Result<Self> {
    if n == 0 || !n.is_power_of_two() {
      return Err(AmrError::NotPowerOfTwo(n));
    }
    let dimension = if lz.is_some() { Dimension::ThreeD } else { Dimension::TwoD };
    let mut mesh = Self::new(dimension, lx, ly, lz);
    let root = mesh.tree.create_root(generator(), Origin::root(dimension))?;
    mesh.root = Some(root);

    let levels = n.trailing_zeros();
    let mut frontier = vec![root];
    for _ in 0..levels {
      let mut next = Vec::new();
      for node in frontier {
        let children = mesh.tree.refine_with(node, &mut generator);
        next.extend(children);
      }
      frontier = next;
    }
    Ok(mesh)
  }

  /// Physical extent along x.
  pub fn lx(&self) -> f64 {
    self.lx
  }

  /// Physical extent along y.
  pub fn ly(&self) -> f64 {
    self.ly
  }

  /// Physical extent along z, if this is a 3D mesh.
  pub fn lz(&self) -> Option<f64> {
    self.lz
  }

  /// Read-only access to the underlying arena.
  pub fn tree(&self) -> &Tree {
    &self.tree
  }

  /// Mutable access to the underlying arena, for callers who need direct
  /// node-level operations ([`RefinementCriterion`] implementations doing
  /// ad hoc inspection, tests, etc).
  pub fn tree_mut(&mut self) -> &mut Tree {
    &mut self.tree
  }

  /// The root node, if this mesh has been given one.
  pub fn root(&self) -> Option<NodeId> {
    self.root
  }

  fn root_or(&self, operation: &'static str) -> Result<NodeId> {
    self.root.ok_or(AmrError::EmptyMesh { operation })
  }

  /// All current leaves, in DFS order.
  pub fn leafs(&self) -> Result<Vec<NodeId>> {
    let root = self.root_or("enumerate leafs")?;
    Ok(self.tree.leaves(root))
  }

  /// Apply `f` to the root and every descendant.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "mesh::inject"))]
  pub fn inject(&mut self, mut f: impl FnMut(&mut Tree, NodeId)) -> Result<()> {
    let root = self.root_or("inject")?;
    self.tree.inject(root, &mut f);
    Ok(())
  }

  /// Advance every leaf by one step of `scheme`.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "mesh::solve"))]
  pub fn solve(&mut self, scheme: &dyn NumericalScheme) -> Result<()> {
    let leaves = self.leafs()?;
    scheme.apply(&mut self.tree, &leaves);
    Ok(())
  }

  /// Write the current leaf decomposition to `output/<name>.vtk` (`.vtk`
  /// appended if `name` lacks it) as a legacy VTK `UNSTRUCTURED_GRID` file.
  /// The `output/` directory is created if missing.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "mesh::save"))]
  pub fn save(&self, name: impl AsRef<Path>) -> Result<()> {
    let root = self.root_or("save")?;
    let mut filename = name.as_ref().to_path_buf();
    let has_vtk_extension = filename.extension().map(|ext| ext == "vtk").unwrap_or(false);
    if !has_vtk_extension {
      let mut with_ext = filename.into_os_string();
      with_ext.push(".vtk");
      filename = with_ext.into();
    }
    let dir = Path::new("output");
    std::fs::create_dir_all(dir)?;
    vtk::write(&self.tree, root, self.lx, self.ly, self.lz, &dir.join(filename))
  }

  /// Two-pass refine/coarsen sweep, matching the scheduler's buffer-zone
  /// propagation algorithm:
  ///
  /// Pass 1 (refinement): for every leaf `L` the criterion flags, walk its
  /// radius-[`BUFFER_RADIUS`] buffer and immediately refine any buffer
  /// leaf `B` whose refinement is grading-legal (bypassing the criterion
  /// itself — only the 2:1 invariant gates it), pre-widening the
  /// high-resolution zone. A buffer node that cannot refine this way has
  /// its *parent* protected from coarsening instead (collapsing it would
  /// erase the fine zone `L` depends on). Once buffer widening for `L` is
  /// done, `L` itself is queued for refinement if it is still grading-legal
  /// under the real criterion. All queued leaves are refined only after
  /// every flagged leaf has been through this process.
  ///
  /// Pass 2 (coarsening): re-enumerate leaves post-Pass-1, group them by
  /// parent, and coarsen any parent with a full leaf child set that is not
  /// itself protected or queued for refinement, is at or above `min_depth`,
  /// and for which `shall_coarsen` (evaluated on the parent, not its
  /// children) agrees.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "mesh::refine", fields(min_depth, max_depth)))]
  pub fn refine(&mut self, criterion: &dyn RefinementCriterion, min_depth: u32, max_depth: u32) -> Result<RefinementStats> {
    let root = self.root_or("refine")?;
    let leaves = self.tree.leaves(root);
    let bypass = Custom::new(|_tree: &mut Tree, _id: NodeId| true);

    let mut to_refine: HashSet<NodeId> = HashSet::new();
    let mut protected: HashSet<NodeId> = HashSet::new();
    let mut stats = RefinementStats::default();

    for &leaf in &leaves {
      // an earlier leaf's buffer widening may already have refined this one.
      if !self.tree.is_leaf(leaf) {
        continue;
      }
      if !criterion.eval(&mut self.tree, leaf) {
        continue;
      }
      if self.tree.level(leaf) < max_depth {
        for buffered in self.tree.buffer(leaf, BUFFER_RADIUS) {
          let eligible =
            self.tree.is_leaf(buffered) && self.tree.level(buffered) < max_depth && self.tree.shall_refine(buffered, &bypass);
          if eligible {
            self.tree.refine(buffered);
            stats.refined += 1;
            protected.insert(buffered);
          } else if let Some(parent) = self.tree.parent(buffered) {
            protected.insert(parent);
          }
        }
      }
      if self.tree.level(leaf) < max_depth && self.tree.shall_refine(leaf, criterion) {
        to_refine.insert(leaf);
      }
    }

    for &leaf in &to_refine {
      if self.tree.is_leaf(leaf) {
        self.tree.refine(leaf);
        stats.refined += 1;
      }
    }

    let leaves = self.tree.leaves(root);
    let mut by_parent: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for &leaf in &leaves {
      if let Some(parent) = self.tree.parent(leaf) {
        by_parent.entry(parent).or_default().push(leaf);
      }
    }

    let child_count = self.tree.dimension().child_count();
    let mut to_coarsen = Vec::new();
    for (parent, children) in by_parent {
      if protected.contains(&parent) || to_refine.contains(&parent) {
        continue;
      }
      if children.len() != child_count || children.iter().any(|&child| !self.tree.is_leaf(child)) {
        continue;
      }
      if self.tree.level(parent) >= min_depth && self.tree.shall_coarsen(parent, criterion) {
        to_coarsen.push(parent);
      }
    }

    for parent in to_coarsen {
      self.tree.coarsen(parent);
      stats.coarsened += 1;
    }

    Ok(stats)
  }
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
