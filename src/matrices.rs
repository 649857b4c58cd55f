//! Per-face rigid transforms for the folded state.
//!
//! A spanning tree over the face-adjacency graph is walked breadth-first
//! from a root face; every step across a crease composes a reflection
//! across that crease's line. Both composition orders are exposed, since
//! callers map flat→folded when rendering and folded→flat when picking.

use std::fmt::Display;

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use typed_index_collections::{ti_vec, TiVec};

use crate::geom;
use crate::mesh::{Edge, Face, Mesh};
use crate::remap::CommitOutcome;

/// A 2D affine transform, serialized in the FOLD 6-number form
/// `[a, b, c, d, tx, ty]` where `x' = a·x + c·y + tx`, `y' = b·x + d·y + ty`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct Affine2 {
    pub linear: Matrix2<f64>,
    pub translation: Vector2<f64>,
}

impl Affine2 {
    pub fn identity() -> Self {
        Self { linear: Matrix2::identity(), translation: Vector2::zeros() }
    }

    /// Reflection across the line through `point` with direction `vector`.
    ///
    /// # Requirements
    /// * `vector` must not be the zero vector.
    pub fn reflection(point: &Vector2<f64>, vector: &Vector2<f64>) -> Self {
        let norm2 = vector.norm_squared();
        let (x, y) = (vector.x, vector.y);
        let linear = Matrix2::new(
            (x * x - y * y) / norm2, 2.0 * x * y / norm2,
            2.0 * x * y / norm2, (y * y - x * x) / norm2,
        );
        Self { linear, translation: point - linear * point }
    }

    /// Applies `rhs` first, then `self`.
    pub fn compose(&self, rhs: &Self) -> Self {
        Self {
            linear: self.linear * rhs.linear,
            translation: self.linear * rhs.translation + self.translation,
        }
    }

    pub fn transform_point(&self, p: &Vector2<f64>) -> Vector2<f64> {
        self.linear * p + self.translation
    }

    /// The inverse transform, or `None` if the linear part is singular
    /// (never the case for compositions of reflections).
    pub fn try_inverse(&self) -> Option<Self> {
        let linear = self.linear.try_inverse()?;
        Some(Self { linear, translation: -(linear * self.translation) })
    }
}

impl From<[f64; 6]> for Affine2 {
    fn from([a, b, c, d, tx, ty]: [f64; 6]) -> Self {
        Self { linear: Matrix2::new(a, c, b, d), translation: geom::vec2(tx, ty) }
    }
}

impl From<Affine2> for [f64; 6] {
    fn from(m: Affine2) -> Self {
        [m.linear.m11, m.linear.m21, m.linear.m12, m.linear.m22, m.translation.x, m.translation.y]
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum WalkError {
    RootFaceOutOfRange { root: Face, num_faces: usize },
}

impl Display for WalkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootFaceOutOfRange { root, num_faces } =>
                write!(f, "root {root} is out of range for a mesh with {num_faces} faces"),
        }
    }
}

impl std::error::Error for WalkError {}

/// One visited face in the fold tree: how it was reached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WalkStep {
    pub face: Face,
    /// `None` for the root.
    pub parent: Option<Face>,
    /// The shared crease crossed to reach this face; `None` for the root.
    pub edge: Option<Edge>,
}

/// Breadth-first spanning tree over the face-adjacency graph, as levels.
/// Each face is visited exactly once; the first edge reaching it wins,
/// with ties broken by edge index order within a face.
pub fn face_walk_tree(mesh: &Mesh, root: Face) -> Result<Vec<Vec<WalkStep>>, WalkError> {
    if root.0 >= mesh.num_faces() {
        return Err(WalkError::RootFaceOutOfRange { root, num_faces: mesh.num_faces() });
    }
    let mut visited: TiVec<Face, bool> = ti_vec![false; mesh.num_faces()];
    visited[root] = true;
    let mut levels = vec![vec![WalkStep { face: root, parent: None, edge: None }]];
    loop {
        let mut next = vec![];
        for step in levels.last().into_iter().flatten() {
            let mut edges = mesh.faces_edges[step.face].clone();
            edges.sort();
            for e in edges {
                for &f in &mesh.edges_faces[e] {
                    if !visited[f] {
                        visited[f] = true;
                        next.push(WalkStep { face: f, parent: Some(step.face), edge: Some(e) });
                    }
                }
            }
        }
        if next.is_empty() {
            return Ok(levels);
        }
        levels.push(next);
    }
}

fn propagate(mesh: &Mesh, root: Face, parent_first: bool) -> Result<TiVec<Face, Affine2>, WalkError> {
    let mut faces_matrix: TiVec<Face, Affine2> = ti_vec![Affine2::identity(); mesh.num_faces()];
    for level in face_walk_tree(mesh, root)? {
        for step in level {
            let (Some(parent), Some(edge)) = (step.parent, step.edge) else { continue };
            let [a, b] = mesh.edges_vertices[edge];
            let point = mesh.vertices_coords[a];
            let vector = mesh.vertices_coords[b] - point;
            let local = Affine2::reflection(&point, &vector);
            faces_matrix[step.face] = if parent_first {
                faces_matrix[parent].compose(&local)
            } else {
                local.compose(&faces_matrix[parent])
            };
        }
    }
    Ok(faces_matrix)
}

/// One matrix per face mapping flat crease-pattern coordinates to folded
/// coordinates, rooted at `root` (identity).
pub fn faces_matrix(mesh: &Mesh, root: Face) -> Result<TiVec<Face, Affine2>, WalkError> {
    propagate(mesh, root, true)
}

/// The reverse composition: one matrix per face mapping folded coordinates
/// back to flat crease-pattern coordinates.
pub fn faces_matrix_inv(mesh: &Mesh, root: Face) -> Result<TiVec<Face, Affine2>, WalkError> {
    propagate(mesh, root, false)
}

/// An immutable folded-state snapshot: a mesh plus its per-face transforms.
#[derive(Clone, Debug)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
#[serde(try_from = "crate::ser_de::SerDeFoldState", into = "crate::ser_de::SerDeFoldState")]
pub struct FoldState {
    pub mesh: Mesh,
    pub root: Face,
    /// flat → folded
    pub faces_matrix: TiVec<Face, Affine2>,
    /// folded → flat
    pub faces_matrix_inv: TiVec<Face, Affine2>,
}

impl FoldState {
    /// Snapshots `mesh` and computes both transform directions from `root`.
    pub fn new(mesh: &Mesh, root: Face) -> Result<Self, WalkError> {
        Ok(Self {
            faces_matrix: faces_matrix(mesh, root)?,
            faces_matrix_inv: faces_matrix_inv(mesh, root)?,
            mesh: mesh.clone(),
            root,
        })
    }

    /// The face's polygon in folded coordinates.
    pub fn folded_polygon(&self, face: Face) -> Vec<Vector2<f64>> {
        let matrix = &self.faces_matrix[face];
        self.mesh.face_polygon(face).iter().map(|p| matrix.transform_point(p)).collect()
    }

    /// Carries this state across a committed split on `mesh`: surviving
    /// faces keep their transforms and replacement halves inherit their
    /// parent's, so nothing folds or unfolds at commit time. A split root
    /// hands the role to its first half.
    pub fn remapped(&self, mesh: &Mesh, outcome: &CommitOutcome) -> FoldState {
        let mut faces_matrix: TiVec<Face, Affine2> = ti_vec![Affine2::identity(); mesh.num_faces()];
        let mut faces_matrix_inv = faces_matrix.clone();
        for (old, new) in outcome.face_map.iter_enumerated() {
            if old.0 >= self.faces_matrix.len() {
                continue; // appended replacement half, handled below
            }
            if let Some(new) = *new {
                faces_matrix[new] = self.faces_matrix[old];
                faces_matrix_inv[new] = self.faces_matrix_inv[old];
            }
        }
        for r in &outcome.replacements {
            for &half in &r.new {
                faces_matrix[half] = self.faces_matrix[r.old];
                faces_matrix_inv[half] = self.faces_matrix_inv[r.old];
            }
        }
        let root = outcome.face_map.get(self.root).copied().flatten()
            .or_else(|| {
                outcome.replacements.iter()
                    .find(|r| r.old == self.root)
                    .map(|r| r.new[0])
            })
            .unwrap_or(Face(0));
        FoldState { mesh: mesh.clone(), root, faces_matrix, faces_matrix_inv }
    }
}

#[cfg(test)]
mod test {
    use crate::geom::{vec2, EPSILON};
    use crate::matrices::{face_walk_tree, faces_matrix, faces_matrix_inv, Affine2, FoldState, WalkError};
    use crate::mesh::{EdgeAssignment, Face, Mesh};
    use crate::split;
    use crate::remap;

    fn assert_close(a: &Affine2, b: &Affine2) {
        assert!((a.linear - b.linear).norm() < 1e-9 && (a.translation - b.translation).norm() < 1e-9,
            "{a:?} != {b:?}");
    }

    /// Unit square split along y = 0.5 into a bottom face and a top face.
    fn split_square() -> Mesh {
        let mut mesh = Mesh::unit_square();
        let diff = split::insert_crease(&mut mesh, &vec2(0.0, 0.5), &vec2(1.0, 0.0), EdgeAssignment::Valley);
        remap::apply(&mut mesh, &diff).unwrap();
        mesh
    }

    #[test]
    fn test_reflection() {
        let r = Affine2::reflection(&vec2(0.0, 0.5), &vec2(1.0, 0.0));
        assert!((r.transform_point(&vec2(0.3, 0.0)) - vec2(0.3, 1.0)).norm() < EPSILON);
        assert!((r.transform_point(&vec2(0.3, 0.5)) - vec2(0.3, 0.5)).norm() < EPSILON);
        // reflections are involutions
        assert_close(&r.compose(&r), &Affine2::identity());
    }

    #[test]
    fn test_affine_six_number_form() {
        let r = Affine2::reflection(&vec2(0.0, 0.0), &vec2(0.0, 1.0));
        let raw: [f64; 6] = r.into();
        assert_eq!(raw, [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(Affine2::from(raw), r);
    }

    #[test]
    fn test_walk_tree_single_face() {
        let mesh = Mesh::unit_square();
        let tree = face_walk_tree(&mesh, Face(0)).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0][0].face, Face(0));
        assert_eq!(tree[0][0].parent, None);
        assert_eq!(face_walk_tree(&mesh, Face(5)),
            Err(WalkError::RootFaceOutOfRange { root: Face(5), num_faces: 1 }));
    }

    #[test]
    fn test_walk_tree_two_faces() {
        let mesh = split_square();
        let tree = face_walk_tree(&mesh, Face(0)).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].len(), 1);
        let step = tree[1][0];
        assert_eq!(step.parent, Some(Face(0)));
        // the shared edge is the inserted crease
        let edge = step.edge.unwrap();
        assert_eq!(mesh.edges_assignment[edge], EdgeAssignment::Valley);
    }

    #[test]
    fn test_root_matrix_is_identity() {
        let mesh = split_square();
        let matrices = faces_matrix(&mesh, Face(0)).unwrap();
        assert_close(&matrices[Face(0)], &Affine2::identity());
    }

    #[test]
    fn test_child_matrix_reflects_across_crease() {
        let mesh = split_square();
        let matrices = faces_matrix(&mesh, Face(0)).unwrap();
        let expected = Affine2::reflection(&vec2(0.0, 0.5), &vec2(1.0, 0.0));
        assert_close(&matrices[Face(1)], &expected.compose(&Affine2::identity()));
    }

    #[test]
    fn test_matrix_times_inverse_is_identity() {
        let mesh = split_square();
        let forward = faces_matrix(&mesh, Face(0)).unwrap();
        let backward = faces_matrix_inv(&mesh, Face(0)).unwrap();
        for f in (0..mesh.num_faces()).map(Face) {
            assert_close(&forward[f].compose(&backward[f]), &Affine2::identity());
            let inverse = forward[f].try_inverse().unwrap();
            assert_close(&forward[f].compose(&inverse), &Affine2::identity());
        }
    }

    #[test]
    fn test_fold_state_snapshot() {
        let mesh = split_square();
        let state = FoldState::new(&mesh, Face(0)).unwrap();
        assert_eq!(state.mesh, mesh);
        assert_eq!(state.faces_matrix.len(), mesh.num_faces());
        assert_eq!(state.faces_matrix_inv.len(), mesh.num_faces());
        // folding is rigid: the folded polygon keeps its area
        let folded = state.folded_polygon(Face(1));
        let flat = mesh.face_polygon(Face(1));
        let area = |poly: &[nalgebra::Vector2<f64>]| crate::geom::twice_signed_area(poly).abs();
        assert!((area(&folded) - area(&flat)).abs() < EPSILON);
    }
}
