//! Tree - arena-backed quad/oct-tree with 2:1 grading-aware neighbor
//! resolution.
//!
//! Nodes live in a slab (`Tree`); parent/child relationships are plain
//! `NodeId` indices rather than `Rc`/`RefCell` links, per the arena
//! strategy described for this data model: it avoids lifetime
//! annotations entirely and makes `copy()` a matter of allocating a new
//! slot and copying scalar fields.
//!
//! # LOD convention
//!
//! `level` is depth from the root (root = level 0, deeper = finer),
//! the opposite sense of the teacher crate's LOD numbering but matching
//! the AMR domain this crate targets.
//!
//! # Raster convention
//!
//! `Direction::Up` decreases `y` and `Direction::Down` increases it -
//! this matches image-row order and the VTK output, not the
//! mathematical convention. All neighbor-finding and buffer logic is
//! built on this convention.

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::error::{AmrError, Result};
use crate::refinement::RefinementCriterion;

/// Damping factor applied to the centered finite difference used during
/// interpolated refinement. Calibrated empirically for the reference
/// thermal problem; not exposed as a configuration knob.
pub const INTERPOLATION_DAMPING: f64 = 0.1;

/// Opaque index into a [`Tree`] arena.
///
/// Indices are reused after a [`Tree::coarsen`] frees a subtree; callers
/// must not retain a `NodeId` across a `coarsen()` of one of its
/// ancestors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

/// Whether a tree uses the 4-child (quad-tree) or 8-child (oct-tree)
/// refinement shape.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dimension {
  /// Quad-tree: 4 children, no `z` coordinate.
  TwoD,
  /// Oct-tree: 8 children with a `z` coordinate.
  ///
  /// Neighbor/grading resolution (`neighbor`, `buffer`,
  /// `shall_refine`/`shall_coarsen`) is defined only for [`Dimension::TwoD`];
  /// 3D trees support child-completeness (I3) and value transfer but not
  /// the cardinal neighbor machinery, matching the declared non-goal of
  /// 3D neighbor resolution.
  ThreeD,
}

impl Dimension {
  /// Number of children a non-leaf has in this dimension.
  #[inline]
  pub fn child_count(self) -> usize {
    match self {
      Dimension::TwoD => 4,
      Dimension::ThreeD => 8,
    }
  }
}

/// In-parent cell origin: each coordinate is 0 or 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Origin {
  /// In-parent X coordinate (0 or 1).
  pub x: u8,
  /// In-parent Y coordinate (0 or 1).
  pub y: u8,
  /// In-parent Z coordinate (0 or 1), `None` for 2D trees.
  pub z: Option<u8>,
}

impl Origin {
  /// The root's conventional origin, `(0, 0[, 0])`.
  pub fn root(dimension: Dimension) -> Self {
    Self {
      x: 0,
      y: 0,
      z: matches!(dimension, Dimension::ThreeD).then_some(0),
    }
  }

  /// Canonical child-slot index, matching the fixed DFS order used by
  /// `leaves()`: `(0,0), (0,1), (1,0), (1,1)` for 2D (x varies slowest),
  /// analogously `x*4 + y*2 + z` for 3D.
  fn child_slot(self) -> usize {
    match self.z {
      Some(z) => (self.x as usize) * 4 + (self.y as usize) * 2 + (z as usize),
      None => (self.x as usize) * 2 + (self.y as usize),
    }
  }

  fn from_slot(slot: usize, dimension: Dimension) -> Self {
    match dimension {
      Dimension::TwoD => Origin {
        x: (slot / 2) as u8,
        y: (slot % 2) as u8,
        z: None,
      },
      Dimension::ThreeD => Origin {
        x: (slot / 4) as u8,
        y: ((slot / 2) % 2) as u8,
        z: Some((slot % 2) as u8),
      },
    }
  }
}

/// Cardinal direction for 2D neighbor queries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
  /// +X.
  Right,
  /// -X.
  Left,
  /// -Y (raster convention: up decreases y).
  Up,
  /// +Y (raster convention: down increases y).
  Down,
}

impl Direction {
  /// All four cardinal directions, in a fixed order.
  pub const CARDINAL: [Direction; 4] = [Direction::Right, Direction::Left, Direction::Up, Direction::Down];

  /// `(dx, dy)` step taken in-parent coordinates when moving one cell in
  /// this direction.
  #[inline]
  fn delta(self) -> (i32, i32) {
    match self {
      Direction::Right => (1, 0),
      Direction::Left => (-1, 0),
      Direction::Up => (0, -1),
      Direction::Down => (0, 1),
    }
  }

  /// The fixed in-parent coordinate used when descending into a coarser
  /// neighbor's children after crossing this direction's axis: `(Some(x), None)`
  /// for a horizontal direction, `(None, Some(y))` for a vertical one.
  #[inline]
  fn mirror(self) -> (Option<u8>, Option<u8>) {
    match self {
      Direction::Right => (Some(0), None),
      Direction::Left => (Some(1), None),
      Direction::Up => (None, Some(1)),
      Direction::Down => (None, Some(0)),
    }
  }
}

/// Node payload stored in the arena.
#[derive(Clone, Debug)]
struct NodeData {
  value: f64,
  level: u32,
  origin: Origin,
  parent: Option<NodeId>,
  children: Option<SmallVec<[NodeId; 8]>>,
  absolute_origin: (f64, f64, Option<f64>),
  /// Last relative gradient computed by a `RefinementCriterion`; telemetry
  /// only, never read by the solver.
  gradient: f64,
}

enum Slot {
  Occupied(NodeData),
  Free,
}

/// Arena-backed quad/oct-tree.
///
/// Owns every [`NodeId`] it hands out; parent and child links are plain
/// indices into the same slab. A `Tree` has no implicit root - callers
/// track the root `NodeId` themselves (this is what [`crate::mesh::Mesh`]
/// does).
pub struct Tree {
  slots: Vec<Slot>,
  free: Vec<u32>,
  dimension: Dimension,
}

impl Tree {
  /// Create an empty arena for the given dimensionality.
  pub fn new(dimension: Dimension) -> Self {
    Self {
      slots: Vec::new(),
      free: Vec::new(),
      dimension,
    }
  }

  /// Dimensionality this tree was constructed with.
  pub fn dimension(&self) -> Dimension {
    self.dimension
  }

  fn alloc(&mut self, data: NodeData) -> NodeId {
    if let Some(index) = self.free.pop() {
      self.slots[index as usize] = Slot::Occupied(data);
      NodeId(index)
    } else {
      let index = self.slots.len() as u32;
      self.slots.push(Slot::Occupied(data));
      NodeId(index)
    }
  }

  fn free_slot(&mut self, id: NodeId) {
    self.slots[id.0 as usize] = Slot::Free;
    self.free.push(id.0);
  }

  fn data(&self, id: NodeId) -> &NodeData {
    match &self.slots[id.0 as usize] {
      Slot::Occupied(data) => data,
      Slot::Free => panic!("Tree: use of a freed NodeId"),
    }
  }

  fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
    match &mut self.slots[id.0 as usize] {
      Slot::Occupied(data) => data,
      Slot::Free => panic!("Tree: use of a freed NodeId"),
    }
  }

  /// Create a new root node with the given value and origin.
  pub fn create_root(&mut self, value: f64, origin: Origin) -> Result<NodeId> {
    if origin.x > 1 || origin.y > 1 || origin.z.is_some_and(|z| z > 1) {
      return Err(AmrError::InvalidOrigin);
    }
    let absolute_origin = (origin.x as f64, origin.y as f64, origin.z.map(|z| z as f64));
    Ok(self.alloc(NodeData {
      value,
      level: 0,
      origin,
      parent: None,
      children: None,
      absolute_origin,
      gradient: 0.0,
    }))
  }

  // -- accessors ----------------------------------------------------

  /// `true` iff the node has no children. O(1).
  #[inline]
  pub fn is_leaf(&self, id: NodeId) -> bool {
    self.data(id).children.is_none()
  }

  /// Cell-centered scalar value.
  #[inline]
  pub fn value(&self, id: NodeId) -> f64 {
    self.data(id).value
  }

  /// Overwrite the cell-centered scalar value.
  #[inline]
  pub fn set_value(&mut self, id: NodeId, value: f64) {
    self.data_mut(id).value = value;
  }

  /// Depth from the root; root has level 0.
  #[inline]
  pub fn level(&self, id: NodeId) -> u32 {
    self.data(id).level
  }

  /// In-parent origin coordinate.
  #[inline]
  pub fn origin(&self, id: NodeId) -> Origin {
    self.data(id).origin
  }

  /// Back-reference to the parent; `None` only at the root.
  #[inline]
  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.data(id).parent
  }

  /// Children, in the fixed DFS order, or `&[]` if `id` is a leaf.
  #[inline]
  pub fn children(&self, id: NodeId) -> &[NodeId] {
    match &self.data(id).children {
      Some(children) => children,
      None => &[],
    }
  }

  /// Cached absolute origin in `[0, 1)`, recursively
  /// `parent.absolute_origin + origin * 2^(-level)`.
  #[inline]
  pub fn absolute_origin(&self, id: NodeId) -> (f64, f64, Option<f64>) {
    self.data(id).absolute_origin
  }

  /// Absolute origin of the cell center: `absolute_origin + 0.5 * cell_size`.
  pub fn absolute_centered_origin(&self, id: NodeId) -> (f64, f64, Option<f64>) {
    let (ox, oy, oz) = self.absolute_origin(id);
    let half_cell = 0.5 * 2f64.powi(-(self.level(id) as i32));
    (ox + half_cell, oy + half_cell, oz.map(|z| z + half_cell))
  }

  /// Last relative gradient recorded by a [`RefinementCriterion`] (debug/
  /// telemetry only).
  #[inline]
  pub fn gradient(&self, id: NodeId) -> f64 {
    self.data(id).gradient
  }

  #[inline]
  pub(crate) fn set_gradient(&mut self, id: NodeId, gradient: f64) {
    self.data_mut(id).gradient = gradient;
  }

  fn child_at(&self, id: NodeId, origin: Origin) -> Option<NodeId> {
    let children = self.data(id).children.as_ref()?;
    children.get(origin.child_slot()).copied()
  }

  // -- neighbor resolution -------------------------------------------

  /// Same-level or coarser neighbor across the face in `direction`, or
  /// `None` if outside the root domain.
  ///
  /// See the module docs for the raster (up-decreases-y) convention.
  pub fn neighbor(&self, id: NodeId, direction: Direction) -> Option<NodeId> {
    let node = self.data(id);
    let parent_id = node.parent?;
    let (dx, dy) = direction.delta();
    let sx = node.origin.x as i32 + dx;
    let sy = node.origin.y as i32 + dy;

    if (0..=1).contains(&sx) && (0..=1).contains(&sy) {
      let sibling = Origin {
        x: sx as u8,
        y: sy as u8,
        z: node.origin.z,
      };
      return self.child_at(parent_id, sibling);
    }

    let p = self.neighbor(parent_id, direction)?;
    if self.is_leaf(p) {
      return Some(p);
    }

    let (mx, my) = direction.mirror();
    let target = Origin {
      x: mx.unwrap_or(node.origin.x),
      y: my.unwrap_or(node.origin.y),
      z: node.origin.z,
    };
    self.child_at(p, target)
  }

  /// Apply `neighbor` left-to-right, short-circuiting to `None` on any
  /// missing link. Used for diagonal queries.
  pub fn chain(&self, id: NodeId, directions: &[Direction]) -> Option<NodeId> {
    let mut current = id;
    for &direction in directions {
      current = self.neighbor(current, direction)?;
    }
    Some(current)
  }

  /// Nodes whose in-plane integer offset from `id` is in `[-n, n]^2`,
  /// excluding `id` itself.
  ///
  /// Composed from cardinal chains; when several offsets resolve onto the
  /// same coarser ancestor (a hanging face), it is included only once.
  pub fn buffer(&self, id: NodeId, n: i32) -> Vec<NodeId> {
    let mut found: HashSet<NodeId> = HashSet::new();
    for dx in -n..=n {
      for dy in -n..=n {
        if dx == 0 && dy == 0 {
          continue;
        }
        if let Some(other) = self.offset(id, dx, dy) {
          found.insert(other);
        }
      }
    }
    found.into_iter().collect()
  }

  fn offset(&self, id: NodeId, dx: i32, dy: i32) -> Option<NodeId> {
    let mut current = id;
    let x_direction = if dx >= 0 { Direction::Right } else { Direction::Left };
    for _ in 0..dx.abs() {
      current = self.neighbor(current, x_direction)?;
    }
    // raster convention: positive dy moves down.
    let y_direction = if dy >= 0 { Direction::Down } else { Direction::Up };
    for _ in 0..dy.abs() {
      current = self.neighbor(current, y_direction)?;
    }
    Some(current)
  }

  // -- refinement eligibility -----------------------------------------

  /// Whether `id` is eligible to refine under `criterion`: the criterion
  /// must accept, and refining must not open a grading gap of more than
  /// one level against any existing cardinal neighbor.
  pub fn shall_refine(&mut self, id: NodeId, criterion: &dyn RefinementCriterion) -> bool {
    if !criterion.eval(self, id) {
      return false;
    }
    let next_level = self.level(id) + 1;
    for direction in Direction::CARDINAL {
      if let Some(neighbor) = self.neighbor(id, direction) {
        let diff = neighbor_level_diff(self.level(neighbor), next_level);
        if diff > 1 {
          return false;
        }
      }
    }
    true
  }

  /// Whether `id` is eligible to coarsen under `criterion`: for every
  /// cardinal direction the finest relevant neighbor level (accounting for
  /// a possibly-subdivided neighbor) must stay within one level of `id`,
  /// and the criterion must say refinement is not needed here.
  pub fn shall_coarsen(&mut self, id: NodeId, criterion: &dyn RefinementCriterion) -> bool {
    let self_level = self.level(id);
    for direction in Direction::CARDINAL {
      let Some(neighbor) = self.neighbor(id, direction) else {
        continue;
      };
      let finest = if self.is_leaf(neighbor) {
        self.level(neighbor)
      } else {
        let [a, b] = self.facing_children(neighbor, direction);
        let base = self.level(a).max(self.level(b));
        let deeper = !self.is_leaf(a) || !self.is_leaf(b);
        if deeper { base + 1 } else { base }
      };
      if neighbor_level_diff(finest, self_level) > 1 {
        return false;
      }
    }
    !criterion.eval(self, id)
  }

  /// The two children of `neighbor` that share a face with whatever
  /// crossed into it via `direction` (i.e. the children on the mirrored
  /// side of `neighbor`).
  pub(crate) fn facing_children(&self, neighbor: NodeId, direction: Direction) -> [NodeId; 2] {
    let (mx, my) = direction.mirror();
    match (mx, my) {
      (Some(fx), None) => [
        self.child_at(neighbor, Origin { x: fx, y: 0, z: None }).expect("child completeness"),
        self.child_at(neighbor, Origin { x: fx, y: 1, z: None }).expect("child completeness"),
      ],
      (None, Some(fy)) => [
        self.child_at(neighbor, Origin { x: 0, y: fy, z: None }).expect("child completeness"),
        self.child_at(neighbor, Origin { x: 1, y: fy, z: None }).expect("child completeness"),
      ],
      _ => unreachable!("direction mirror always fixes exactly one axis"),
    }
  }

  // -- mutation: refine / coarsen / inject / copy ----------------------

  /// Subdivide `id` into 4 (2D) or 8 (3D) children, each taking
  /// `generator()`. `id`'s own value is then set to the children's mean
  /// (I4, applied in reverse).
  ///
  /// No-op if `id` is already refined... actually refining an already
  /// non-leaf node is a programming error in every caller in this crate;
  /// callers are expected to check `is_leaf` first via `shall_refine`.
  pub fn refine_with(&mut self, id: NodeId, mut generator: impl FnMut() -> f64) -> SmallVec<[NodeId; 8]> {
    let child_count = self.dimension.child_count();
    let mut children = SmallVec::new();
    for slot in 0..child_count {
      let value = generator();
      let child_id = self.spawn_child(id, slot, value);
      children.push(child_id);
    }
    self.attach_children(id, children.clone());
    self.recompute_mean(id);
    self.propagate_mean_upward(id);
    children
  }

  /// Subdivide `id` by gradient-aware interpolation against its four
  /// cardinal neighbors (the default adaptive-refinement mode).
  pub fn refine(&mut self, id: NodeId) -> SmallVec<[NodeId; 8]> {
    let center_value = self.value(id);
    let right = self.neighbor(id, Direction::Right).map(|n| self.value(n));
    let left = self.neighbor(id, Direction::Left).map(|n| self.value(n));
    let up = self.neighbor(id, Direction::Up).map(|n| self.value(n));
    let down = self.neighbor(id, Direction::Down).map(|n| self.value(n));

    let dx = centered_difference(right, left, center_value) * INTERPOLATION_DAMPING;
    // image-row order: dy is (down - up) per the up/down raster convention.
    let dy = centered_difference(down, up, center_value) * INTERPOLATION_DAMPING;

    let child_count = self.dimension.child_count();
    let mut children = SmallVec::new();
    for slot in 0..child_count {
      let origin = Origin::from_slot(slot, self.dimension);
      let cx = origin.x as f64 * 0.5 + 0.25;
      let cy = origin.y as f64 * 0.5 + 0.25;
      let value = center_value + (cx - 0.5) * dx + (cy - 0.5) * dy;
      let child_id = self.spawn_child(id, slot, value);
      children.push(child_id);
    }
    self.attach_children(id, children.clone());
    self.recompute_mean(id);
    self.propagate_mean_upward(id);
    children
  }

  fn spawn_child(&mut self, parent_id: NodeId, slot: usize, value: f64) -> NodeId {
    let parent = self.data(parent_id);
    let level = parent.level + 1;
    let origin = Origin::from_slot(slot, self.dimension);
    let scale = 2f64.powi(-(level as i32));
    let (pox, poy, poz) = parent.absolute_origin;
    let absolute_origin = (
      pox + origin.x as f64 * scale,
      poy + origin.y as f64 * scale,
      origin.z.map(|z| poz.unwrap_or(0.0) + z as f64 * scale),
    );
    self.alloc(NodeData {
      value,
      level,
      origin,
      parent: Some(parent_id),
      children: None,
      absolute_origin,
      gradient: 0.0,
    })
  }

  fn attach_children(&mut self, id: NodeId, children: SmallVec<[NodeId; 8]>) {
    self.data_mut(id).children = Some(children);
  }

  fn recompute_mean(&mut self, id: NodeId) {
    let children = self.data(id).children.clone().unwrap_or_default();
    let mean = children.iter().map(|&c| self.value(c)).sum::<f64>() / children.len() as f64;
    self.data_mut(id).value = mean;
  }

  /// Recompute the mean (I4) of every non-leaf ancestor of `id`, from `id`'s
  /// parent upward. Keeps internal-node values equal to their children's
  /// mean even after a deeper descendant refines or coarsens.
  fn propagate_mean_upward(&mut self, id: NodeId) {
    let mut current = self.parent(id);
    while let Some(node_id) = current {
      self.recompute_mean(node_id);
      current = self.parent(node_id);
    }
  }

  /// Collapse `id`'s children into `id` (I4: mean of children's values),
  /// destroying the children (and, transitively, any grandchildren). No-op
  /// if `id` is already a leaf.
  pub fn coarsen(&mut self, id: NodeId) {
    let Some(children) = self.data(id).children.clone() else {
      return;
    };
    self.recompute_mean(id);
    for child in children {
      self.destroy_subtree(child);
    }
    self.data_mut(id).children = None;
    self.propagate_mean_upward(id);
  }

  fn destroy_subtree(&mut self, id: NodeId) {
    if let Some(children) = self.data(id).children.clone() {
      for child in children {
        self.destroy_subtree(child);
      }
    }
    self.free_slot(id);
  }

  /// Apply `f` to `id` then recursively to all descendants.
  pub fn inject(&mut self, id: NodeId, f: &mut dyn FnMut(&mut Tree, NodeId)) {
    f(self, id);
    let children: SmallVec<[NodeId; 8]> = self.children(id).into();
    for child in children {
      self.inject(child, f);
    }
  }

  /// Duplicate a leaf: same value, level, origin, and parent
  /// back-reference, no children. Fails on a non-leaf.
  pub fn copy(&mut self, id: NodeId) -> Result<NodeId> {
    if !self.is_leaf(id) {
      return Err(AmrError::NonLeafCopy);
    }
    let data = self.data(id).clone();
    Ok(self.alloc(data))
  }

  /// All descendant leaves of `id`, depth-first, in the fixed child order.
  pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    self.collect_leaves(id, &mut out);
    out
  }

  fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
    if self.is_leaf(id) {
      out.push(id);
      return;
    }
    for &child in self.children(id) {
      self.collect_leaves(child, out);
    }
  }
}

/// Centered difference `(a - b) / 2`, falling back to a one-sided
/// difference against whichever neighbor exists, or `0` if neither does.
fn centered_difference(a: Option<f64>, b: Option<f64>, center: f64) -> f64 {
  match (a, b) {
    (Some(a), Some(b)) => (a - b) / 2.0,
    (Some(a), None) => a - center,
    (None, Some(b)) => center - b,
    (None, None) => 0.0,
  }
}

/// Absolute difference between a neighbor's level and a reference level,
/// saturating rather than panicking on underflow (levels are `u32`).
fn neighbor_level_diff(neighbor_level: u32, reference_level: u32) -> u32 {
  neighbor_level.abs_diff(reference_level)
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
