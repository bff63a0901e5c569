//! # vortess
//!
//! Incremental three-dimensional Delaunay tetrahedralization and Voronoi statistics, built on
//! exact geometric predicates (Shewchuk-style adaptive-precision expansion arithmetic).
//!
//! A [`Builder`] owns a mutable tetrahedral mesh. Each [`Builder::insert`] locates the enclosing
//! tetrahedron, splits it (1→4), and drains a cascade of 2→3/3→2 bistellar flips until every face
//! is locally Delaunay. Per-vertex Voronoi statistics (coordination, atomic volume, cavity radius,
//! Voronoi index histogram) are derived on demand by traversing the dual.

#![forbid(unsafe_code)]
#![deny(unused, clippy::incompatible_msrv)]
#![warn(clippy::all, clippy::missing_const_for_fn)]

pub use builder::{Builder, Vertex};
pub use mesh::Tet;
pub use stats::{Threshold, VertexFace, VertexStats};
pub use types::{FaceOrdinal, TetIdx, Vertex3, VertexIdx};

mod builder;
mod expansion;
mod mesh;
mod oriented_face;
mod predicates;
mod stats;
mod types;
