//! Bounding box trees and collision queries for (distributed) meshes.
//!
//! A [tree::BoundingBoxTree] is built over the entities of one dimension of a
//! [mesh::Mesh]. The routines in [search] find colliding boxes and closest entities,
//! [gjk] computes exact distances between convex point sets, and [parallel] combines
//! the trees of all MPI processes into a global tree.
#![cfg_attr(feature = "strict", deny(warnings), deny(unused_crate_dependencies))]
#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod geometry;
pub mod gjk;
pub mod graph;
pub mod mesh;
pub mod parallel;
pub mod search;
pub mod tools;
pub mod tree;
