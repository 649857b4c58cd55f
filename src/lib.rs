//! Planar crease-pattern meshes for origami editing.
//!
//! The mesh is a FOLD-style planar graph kept in parallel index arrays
//! ([`mesh::Mesh`]), with hit-testing queries ([`query`]), per-face folded
//! transforms ([`matrices`]), crease insertion ([`split`]), and move-set
//! resolution for fold gestures ([`moveset`]).
//!
//! An edit runs in three phases: [`split::insert_crease`] slices every
//! face the line crosses and reports a [`split::Diff`]; [`remap::apply`]
//! commits it, rewriting adjacency by ownership and compacting the face
//! arrays; [`moveset::fold`] then decides which faces move and folds them.

pub mod check;
pub mod geom;
pub mod matrices;
pub mod mesh;
pub mod moveset;
pub mod query;
pub mod remap;
pub mod ser_de;
pub mod split;
mod test_utils;

pub use mesh::{Edge, EdgeAssignment, Face, Mesh, Vertex};
