//! Error taxonomy for mesh and node operations.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AmrError>;

/// Errors surfaced by core mesh/node operations.
///
/// None of these are retried inside the core; a failed operation leaves
/// the mesh unchanged.
#[derive(Debug, Error)]
pub enum AmrError {
  /// `Mesh::uniform` was called with a cell count that is not a power of two.
  #[error("n must be a power of 2, got {0}")]
  NotPowerOfTwo(u32),

  /// A root was created with an origin coordinate outside `{0, 1}`.
  #[error("origin coordinates must be 0 or 1")]
  InvalidOrigin,

  /// Any operation other than `create_root`/`uniform` was attempted on a
  /// mesh with no root.
  #[error("mesh is empty: cannot {operation} on a mesh with no root")]
  EmptyMesh {
    /// Name of the operation that was attempted, for diagnostics.
    operation: &'static str,
  },

  /// `Tree::copy` was called on a non-leaf node.
  #[error("copy() called on a non-leaf node")]
  NonLeafCopy,

  /// The VTK writer could not open or write its output file.
  #[error("vtk write failed: {0}")]
  Io(#[from] std::io::Error),
}
