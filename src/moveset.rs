//! Deciding what moves when the user folds: the topmost face under the
//! touch point picks a side of the fresh creases, a flood fill bounded by
//! those creases collects the moving faces, and the fold reflects them
//! across the crease line and restacks them on top.

use std::fmt::Display;

use indexmap::IndexSet;
use nalgebra::Vector2;

use crate::geom;
use crate::matrices::{Affine2, FoldState};
use crate::mesh::{Edge, Face, Mesh};

#[derive(Clone, Debug, PartialEq)]
pub enum MoveError {
    /// The touch point lies outside every folded face.
    NoFaceUnderPoint { point: Vector2<f64> },
    /// There is nothing to fold across.
    NoCreaseEdges,
}

impl Display for MoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFaceUnderPoint { point } =>
                write!(f, "no face under the folded point ({}, {})", point.x, point.y),
            Self::NoCreaseEdges =>
                write!(f, "no crease edges to fold across"),
        }
    }
}

impl std::error::Error for MoveError {}

/// The topmost face whose folded polygon contains `point`. Faces overlap
/// in the folded form, so the stacking order breaks the tie.
pub fn touched_face(state: &FoldState, point: &Vector2<f64>) -> Option<Face> {
    (0..state.mesh.num_faces()).map(Face)
        .filter(|&f| geom::point_in_convex_polygon(&state.folded_polygon(f), point))
        .max_by_key(|&f| state.mesh.faces_layer[f])
}

/// All faces reachable from `start` through shared edges, never crossing
/// a barrier edge. The result is in visit order and includes `start`.
pub fn flood_fill(mesh: &Mesh, start: Face, barrier: &IndexSet<Edge>) -> IndexSet<Face> {
    let mut seen = IndexSet::new();
    seen.insert(start);
    let mut queue = vec![start];
    while let Some(f) = queue.pop() {
        for &e in &mesh.faces_edges[f] {
            if barrier.contains(&e) {
                continue;
            }
            for &g in &mesh.edges_faces[e] {
                if seen.insert(g) {
                    queue.push(g);
                }
            }
        }
    }
    seen
}

/// What [`fold`] did: the faces that moved, and the state after the move.
#[derive(Clone, Debug)]
pub struct MoveOutcome {
    pub moving: Vec<Face>,
    pub state: FoldState,
}

/// Folds the side of `creases` under the folded point `touch`.
///
/// `state` must be a snapshot of `mesh` (same faces, same layers). The
/// moving set is everything flood-reachable from the touched face without
/// crossing a crease; each moving face's transform is composed with one
/// reflection across the crease line as the touched face sees it folded.
/// The moving faces restack above every stationary face with their order
/// reversed, the way a physical flap lands. On error the mesh and state
/// are left untouched.
pub fn fold(
    mesh: &mut Mesh,
    state: &FoldState,
    creases: &[Edge],
    touch: &Vector2<f64>,
) -> Result<MoveOutcome, MoveError> {
    let Some(&first) = creases.first() else {
        return Err(MoveError::NoCreaseEdges);
    };
    let touched = touched_face(state, touch)
        .ok_or(MoveError::NoFaceUnderPoint { point: *touch })?;
    let barrier: IndexSet<Edge> = creases.iter().copied().collect();
    let moving = flood_fill(mesh, touched, &barrier);

    // the crease line in folded coordinates, as the touched face sees it
    let [a, b] = mesh.edges_vertices[first];
    let matrix = &state.faces_matrix[touched];
    let pa = matrix.transform_point(&mesh.vertices_coords[a]);
    let pb = matrix.transform_point(&mesh.vertices_coords[b]);
    let reflect = Affine2::reflection(&pa, &(pb - pa));

    let mut faces_matrix = state.faces_matrix.clone();
    let mut faces_matrix_inv = state.faces_matrix_inv.clone();
    for &f in &moving {
        faces_matrix[f] = reflect.compose(&faces_matrix[f]);
        faces_matrix_inv[f] = faces_matrix_inv[f].compose(&reflect);
    }

    // restack: the flap lands above everything stationary, flipped over,
    // so its deepest face comes out on top
    let mut stationary: Vec<Face> = (0..mesh.num_faces()).map(Face)
        .filter(|f| !moving.contains(f))
        .collect();
    stationary.sort_by_key(|&f| mesh.faces_layer[f]);
    let mut flipped: Vec<Face> = moving.iter().copied().collect();
    flipped.sort_by_key(|&f| std::cmp::Reverse(mesh.faces_layer[f]));
    for (rank, &f) in stationary.iter().chain(&flipped).enumerate() {
        mesh.faces_layer[f] = rank;
    }

    let state = FoldState {
        mesh: mesh.clone(),
        root: state.root,
        faces_matrix,
        faces_matrix_inv,
    };
    Ok(MoveOutcome { moving: moving.into_iter().collect(), state })
}
