//! amr_core - adaptive mesh refinement core for a 2D (with a 3D
//! data-model extension) quad/oct-tree, independent of any particular
//! PDE solver or output driver.
//!
//! This crate provides the pieces that make AMR non-trivial:
//!
//! - [`node`]: an arena-backed quad/oct-tree with a strict 2:1
//!   level-difference grading invariant, and the neighbor-finding
//!   algorithm that resolves same-level, coarser, and finer neighbors
//!   across cell boundaries.
//! - [`mesh`]: the tree owner that drives the solve/refine/save
//!   lifecycle.
//! - [`refinement`]: the capability that decides whether a leaf is
//!   "interesting enough" to subdivide (custom predicates, and a
//!   level-aware gradient criterion).
//! - [`scheme`]: the capability that advances leaf values by one
//!   timestep; the reference instance is a centered finite-difference
//!   thermal diffusion stencil with Neumann boundaries.
//! - [`vtk`]: a legacy ASCII VTK writer over the current leaf set.
//! - [`benchmark`]: engine-agnostic timing/space telemetry, feature-gated
//!   and zero-overhead when disabled.
//!
//! # Example
//!
//! ```ignore
//! use amr_core::mesh::Mesh;
//! use amr_core::refinement::Gradient;
//! use amr_core::scheme::SecondOrderCenteredFiniteDifferences;
//!
//! let mut mesh = Mesh::uniform(16, || 0.0, 1.0, 1.0, None)?;
//! mesh.inject(|tree, id| {
//!     if tree.is_leaf(id) {
//!         tree.set_value(id, 1.0);
//!     }
//! })?;
//!
//! let scheme = SecondOrderCenteredFiniteDifferences::new(0.01, 1.0 / 16.0, 1.0 / 16.0);
//! let criterion = Gradient::new(0.1);
//! for _ in 0..10 {
//!     mesh.solve(&scheme)?;
//!     mesh.refine(&criterion, 2, 8)?;
//! }
//! ```

pub mod error;
pub use error::{AmrError, Result};

pub mod node;
pub use node::{Dimension, Direction, NodeId, Origin, Tree};

pub mod refinement;
pub use refinement::{Custom, Gradient, GradientLog, RefinementCriterion};

pub mod scheme;
pub use scheme::{NumericalScheme, SecondOrderCenteredFiniteDifferences};

pub mod mesh;
pub use mesh::{Mesh, RefinementStats};

pub mod vtk;

pub mod metrics;
pub mod benchmark;
