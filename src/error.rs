//! Error types.

use thiserror::Error;

/// Errors raised while building trees or refining collisions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BBTreeError {
    /// Entities of the requested dimension are not available on the mesh.
    #[error("entities of dimension {dim} are not available on a mesh of topological dimension {tdim}")]
    InvalidDimension {
        /// Requested dimension.
        dim: usize,
        /// Topological dimension of the mesh.
        tdim: usize,
    },

    /// An explicit entity index does not exist on the mesh.
    #[error("entity {entity} of dimension {dim} is out of range (number of entities: {num_entities})")]
    EntityOutOfRange {
        /// The offending entity index.
        entity: usize,
        /// Number of local entities (owned and ghosts) of that dimension.
        num_entities: usize,
        /// Dimension of the entity.
        dim: usize,
    },

    /// Padding must be finite and non-negative.
    #[error("invalid padding {0}, padding must be finite and non-negative")]
    InvalidPadding(f64),

    /// The number of query points differs from the number of candidate lists.
    #[error("expected {expected} points, found {found}")]
    PointCountMismatch {
        /// Number of nodes in the candidate adjacency list.
        expected: usize,
        /// Number of points passed in.
        found: usize,
    },
}

/// Result type of this crate.
pub type Result<T> = std::result::Result<T, BBTreeError>;
