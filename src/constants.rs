//! Numerical constants used throughout the crate.

/// Default padding applied to leaf boxes.
pub const DEFAULT_PADDING: f64 = 0.0;

/// Default absolute distance below which two geometries are considered to touch.
///
/// Queries that refine bounding box candidates take the tolerance as an argument.
/// This value is only a sensible starting point for meshes of unit size.
pub const DEFAULT_COLLISION_TOLERANCE: f64 = 1E-10;

/// Maximum number of GJK iterations before the current estimate is returned.
pub const GJK_MAX_ITERATIONS: usize = 100;

/// Relative convergence threshold of the GJK iteration.
pub const GJK_EPSILON: f64 = 1E-12;

/// Number of coordinates stored per bounding box.
pub const BOX_RECORD_SIZE: usize = 6;
