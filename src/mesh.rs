//! The planar crease-pattern mesh: parallel index arrays keyed by typed
//! indices, plus the controlled mutation primitives every edit goes through.
//!
//! Index = identity. Indices are never reused within an editing session
//! except through the explicit remap returned by [`Mesh::remove_faces`].

use std::fmt::{Debug, Display};

use derive_more::{Add, AddAssign, Div, DivAssign, From, Into, Mul, MulAssign, Rem, RemAssign, Sub, SubAssign};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use typed_index_collections::{ti_vec, TiVec};

use crate::geom;

macro_rules! impl_display_index {
    (impl Debug, Display for $ty:ty { $fmt:literal }) => {
        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, $fmt, self.0)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                <$ty as Debug>::fmt(&self, f)
            }
        }
    };
}

/// Type-safe vertex index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into,
    Add, AddAssign, Sub, SubAssign, Mul, MulAssign, Div, DivAssign, Rem, RemAssign)]
#[derive(Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Vertex(pub usize);
impl_display_index! { impl Debug, Display for Vertex { "v_{}" } }

/// Type-safe edge index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into,
    Add, AddAssign, Sub, SubAssign, Mul, MulAssign, Div, DivAssign, Rem, RemAssign)]
#[derive(Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Edge(pub usize);
impl_display_index! { impl Debug, Display for Edge { "e_{}" } }

/// Type-safe face index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into,
    Add, AddAssign, Sub, SubAssign, Mul, MulAssign, Div, DivAssign, Rem, RemAssign)]
#[derive(Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Face(pub usize);
impl_display_index! { impl Debug, Display for Face { "f_{}" } }

/// For each edge, its fold direction assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub enum EdgeAssignment {
    /// border/boundary edge (only one incident face)
    #[serde(rename = "B")]
    Boundary,
    /// mountain crease
    #[serde(rename = "M")]
    Mountain,
    /// valley crease
    #[serde(rename = "V")]
    Valley,
    /// flat (unfolded) crease
    #[serde(rename = "F")]
    Flat,
    /// unassigned/unknown crease
    #[serde(rename = "U")]
    Unassigned,
}

impl EdgeAssignment {
    /// The fold angle (deviation from flatness) in degrees, derived from the
    /// assignment: negative for mountain folds, positive for valley folds,
    /// zero for flat, boundary and unassigned.
    pub fn fold_angle(self) -> f64 {
        match self {
            EdgeAssignment::Mountain => -180.0,
            EdgeAssignment::Valley => 180.0,
            _ => 0.0,
        }
    }
}

/// Errors constructing a [`Mesh`] from raw index arrays.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum BuildError {
    VertexOutOfRange { vertex: Vertex, num_vertices: usize },
    FaceOutOfRange { face: Face, num_faces: usize },
    /// A face cycle names a vertex pair with no edge connecting it.
    MissingEdge { face: Face, vertices: [Vertex; 2] },
    CountMismatch { what: &'static str, expected: usize, got: usize },
    LayersNotAPermutation,
}

impl Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VertexOutOfRange { vertex, num_vertices } =>
                write!(f, "{vertex} referenced, but there are only {num_vertices} vertices"),
            Self::FaceOutOfRange { face, num_faces } =>
                write!(f, "{face} referenced, but there are only {num_faces} faces"),
            Self::MissingEdge { face, vertices } =>
                write!(f, "{face} lists consecutive vertices {} and {} but no edge connects them", vertices[0], vertices[1]),
            Self::CountMismatch { what, expected, got } =>
                write!(f, "expected {expected} {what}, got {got}"),
            Self::LayersNotAPermutation =>
                write!(f, "faces_layer is not a permutation of the face indices"),
        }
    }
}

impl std::error::Error for BuildError {}

/// The vertex and edge cycles of one face, in counterclockwise order.
/// `edges[i]` joins `vertices[i]` and `vertices[(i + 1) % n]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceData {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

/// Result of [`Mesh::subdivide_edge`]. All edges whose index was greater than
/// the subdivided edge before the call have shifted up by one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubdividedEdge {
    /// The vertex inserted at the split point.
    pub vertex: Vertex,
    /// The second half of the split edge; the first half keeps the old index.
    /// Edge indices at or above this one are the ones that shifted.
    pub second_edge: Edge,
}

/// A planar crease-pattern mesh.
///
/// All arrays are kept mutually consistent by the mutation primitives;
/// read them freely, but write only through the primitives. `faces_layer`
/// is a permutation of the face indices, higher = visually on top.
#[derive(Clone, Debug)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
#[serde(try_from = "crate::ser_de::SerDeMesh", into = "crate::ser_de::SerDeMesh")]
pub struct Mesh {
    /// For each vertex, its crease-pattern (flat) coordinates.
    pub vertices_coords: TiVec<Vertex, Vector2<f64>>,
    /// For each vertex, the vertices it shares an edge with.
    pub vertices_vertices: TiVec<Vertex, Vec<Vertex>>,
    /// For each vertex, the faces it is a corner of.
    pub vertices_faces: TiVec<Vertex, Vec<Face>>,
    /// For each edge, its two endpoint vertices.
    pub edges_vertices: TiVec<Edge, [Vertex; 2]>,
    /// For each edge, the faces incident to it (at most 2).
    pub edges_faces: TiVec<Edge, Vec<Face>>,
    /// For each edge, its fold direction assignment.
    pub edges_assignment: TiVec<Edge, EdgeAssignment>,
    /// For each edge, the fold angle in degrees, derived from the assignment.
    pub edges_fold_angle: TiVec<Edge, f64>,
    /// For each edge, its cached length.
    pub edges_length: TiVec<Edge, f64>,
    /// For each face, its vertex cycle in counterclockwise order.
    pub faces_vertices: TiVec<Face, Vec<Vertex>>,
    /// For each face, its edge cycle; `faces_edges[f][i]` joins
    /// `faces_vertices[f][i]` and `faces_vertices[f][(i + 1) % n]`.
    pub faces_edges: TiVec<Face, Vec<Edge>>,
    /// Stacking order, a permutation of the face indices; higher is on top.
    pub faces_layer: TiVec<Face, usize>,
    /// Faces replaced by [`Mesh::replace_face`] but not yet compacted away.
    removed_faces: Vec<Face>,
}

impl Mesh {
    /// The default document: the unit square, one face, four boundary edges.
    pub fn unit_square() -> Self {
        Self::from_parts(
            vec![geom::vec2(0.0, 0.0), geom::vec2(1.0, 0.0), geom::vec2(1.0, 1.0), geom::vec2(0.0, 1.0)].into(),
            vec![[Vertex(0), Vertex(1)], [Vertex(1), Vertex(2)], [Vertex(2), Vertex(3)], [Vertex(3), Vertex(0)]].into(),
            vec![EdgeAssignment::Boundary; 4].into(),
            vec![vec![Vertex(0), Vertex(1), Vertex(2), Vertex(3)]].into(),
            vec![0].into(),
        ).unwrap()
    }

    /// Builds a mesh from the plain-data arrays, deriving all adjacency.
    ///
    /// Adjacency derivation is deterministic: `vertices_vertices` follows
    /// edge-index order, `vertices_faces` and `edges_faces` follow face-index
    /// order. Importing an exported mesh therefore reproduces it exactly.
    pub fn from_parts(
        vertices_coords: TiVec<Vertex, Vector2<f64>>,
        edges_vertices: TiVec<Edge, [Vertex; 2]>,
        edges_assignment: TiVec<Edge, EdgeAssignment>,
        faces_vertices: TiVec<Face, Vec<Vertex>>,
        faces_layer: TiVec<Face, usize>,
    ) -> Result<Self, BuildError> {
        let num_vertices = vertices_coords.len();
        if edges_assignment.len() != edges_vertices.len() {
            return Err(BuildError::CountMismatch {
                what: "edge assignments", expected: edges_vertices.len(), got: edges_assignment.len(),
            });
        }
        if faces_layer.len() != faces_vertices.len() {
            return Err(BuildError::CountMismatch {
                what: "face layers", expected: faces_vertices.len(), got: faces_layer.len(),
            });
        }
        let mut layer_seen = vec![false; faces_layer.len()];
        for &layer in &faces_layer {
            if layer >= layer_seen.len() || layer_seen[layer] {
                return Err(BuildError::LayersNotAPermutation);
            }
            layer_seen[layer] = true;
        }
        for &[a, b] in &edges_vertices {
            for v in [a, b] {
                if v.0 >= num_vertices {
                    return Err(BuildError::VertexOutOfRange { vertex: v, num_vertices });
                }
            }
        }

        let edges_fold_angle = edges_assignment.iter().map(|a| a.fold_angle()).collect::<TiVec<Edge, _>>();
        let edges_length = edges_vertices.iter()
            .map(|&[a, b]| (vertices_coords[b] - vertices_coords[a]).norm())
            .collect::<TiVec<Edge, _>>();

        let mut vertices_vertices: TiVec<Vertex, Vec<Vertex>> = ti_vec![vec![]; num_vertices];
        for &[a, b] in &edges_vertices {
            vertices_vertices[a].push(b);
            vertices_vertices[b].push(a);
        }

        // sorted vertex pair -> edge index, first edge wins
        let pair_key = |a: Vertex, b: Vertex| if a < b { (a, b) } else { (b, a) };
        let mut edge_lookup = indexmap::IndexMap::new();
        for (e, &[a, b]) in edges_vertices.iter_enumerated() {
            edge_lookup.entry(pair_key(a, b)).or_insert(e);
        }

        let mut faces_edges: TiVec<Face, Vec<Edge>> = ti_vec![vec![]; faces_vertices.len()];
        let mut vertices_faces: TiVec<Vertex, Vec<Face>> = ti_vec![vec![]; num_vertices];
        let mut edges_faces: TiVec<Edge, Vec<Face>> = ti_vec![vec![]; edges_vertices.len()];
        for (f, vertices) in faces_vertices.iter_enumerated() {
            for (i, &v) in vertices.iter().enumerate() {
                if v.0 >= num_vertices {
                    return Err(BuildError::VertexOutOfRange { vertex: v, num_vertices });
                }
                let next = vertices[(i + 1) % vertices.len()];
                let &e = edge_lookup.get(&pair_key(v, next))
                    .ok_or(BuildError::MissingEdge { face: f, vertices: [v, next] })?;
                faces_edges[f].push(e);
                vertices_faces[v].push(f);
                edges_faces[e].push(f);
            }
        }

        Ok(Self {
            vertices_coords,
            vertices_vertices,
            vertices_faces,
            edges_vertices,
            edges_faces,
            edges_assignment,
            edges_fold_angle,
            edges_length,
            faces_vertices,
            faces_edges,
            faces_layer,
            removed_faces: vec![],
        })
    }

    pub fn num_vertices(&self) -> usize { self.vertices_coords.len() }
    pub fn num_edges(&self) -> usize { self.edges_vertices.len() }
    pub fn num_faces(&self) -> usize { self.faces_vertices.len() }

    /// Faces replaced but not yet compacted away by [`Mesh::remove_faces`].
    pub fn pending_removals(&self) -> &[Face] {
        &self.removed_faces
    }

    /// The face's vertex coordinates in cycle order.
    pub fn face_polygon(&self, face: Face) -> Vec<Vector2<f64>> {
        self.faces_vertices[face].iter().map(|&v| self.vertices_coords[v]).collect()
    }

    /// Sum of all face areas. Equals the sheet area while the faces tile it.
    pub fn total_face_area(&self) -> f64 {
        (0..self.num_faces()).map(Face)
            .filter(|f| !self.removed_faces.contains(f))
            .map(|f| geom::twice_signed_area(&self.face_polygon(f)).abs() / 2.0)
            .sum()
    }

    /// Appends an isolated vertex and returns its index.
    pub fn add_vertex(&mut self, coord: Vector2<f64>) -> Vertex {
        self.vertices_coords.push(coord);
        self.vertices_vertices.push(vec![]);
        self.vertices_faces.push(vec![]);
        Vertex(self.vertices_coords.len() - 1)
    }

    /// Splits `edge` into two at a new vertex placed at `coord`.
    ///
    /// The first half keeps `edge`'s index and attributes; the second half is
    /// inserted directly after it, so every edge index greater than `edge`
    /// shifts up by one. The cycles of both incident faces are patched in
    /// place, preserving winding.
    pub fn subdivide_edge(&mut self, edge: Edge, coord: Vector2<f64>) -> SubdividedEdge {
        let [va, vb] = self.edges_vertices[edge];
        let new_v = self.add_vertex(coord);
        let second = edge + Edge(1);

        self.edges_vertices[edge] = [va, new_v];
        self.edges_vertices.insert(second, [new_v, vb]);
        self.edges_assignment.insert(second, self.edges_assignment[edge]);
        self.edges_fold_angle.insert(second, self.edges_fold_angle[edge]);
        self.edges_faces.insert(second, self.edges_faces[edge].clone());
        self.edges_length.insert(second, 0.0);
        self.edges_length[edge] = (self.vertices_coords[new_v] - self.vertices_coords[va]).norm();
        self.edges_length[second] = (self.vertices_coords[vb] - self.vertices_coords[new_v]).norm();

        // every stored edge index above the insertion point shifts by +1
        for edges in self.faces_edges.iter_mut() {
            for e in edges.iter_mut() {
                if *e >= second { *e += Edge(1) }
            }
        }

        // va and vb are no longer neighbors; both now neighbor the new vertex
        if let Some(pos) = self.vertices_vertices[va].iter().position(|&v| v == vb) {
            self.vertices_vertices[va][pos] = new_v;
        }
        if let Some(pos) = self.vertices_vertices[vb].iter().position(|&v| v == va) {
            self.vertices_vertices[vb][pos] = new_v;
        }
        self.vertices_vertices[new_v] = vec![va, vb];
        self.vertices_faces[new_v] = self.edges_faces[edge].clone();

        // patch the cycles of the incident faces
        for f in self.edges_faces[edge].clone() {
            let Some(pos) = self.faces_edges[f].iter().position(|&e| e == edge) else { continue };
            let forward = self.faces_vertices[f][pos] == va;
            self.faces_vertices[f].insert(pos + 1, new_v);
            if forward {
                self.faces_edges[f].insert(pos + 1, second);
            } else {
                self.faces_edges[f][pos] = second;
                self.faces_edges[f].insert(pos + 1, edge);
            }
        }

        SubdividedEdge { vertex: new_v, second_edge: second }
    }

    /// Appends a new edge with the given attributes; adjacency for it starts
    /// empty except for `vertices_vertices`, which is updated on both ends.
    pub fn add_edge(&mut self, vertices: [Vertex; 2], assignment: EdgeAssignment) -> Edge {
        let [a, b] = vertices;
        self.edges_vertices.push(vertices);
        self.edges_assignment.push(assignment);
        self.edges_fold_angle.push(assignment.fold_angle());
        self.edges_length.push((self.vertices_coords[b] - self.vertices_coords[a]).norm());
        self.edges_faces.push(vec![]);
        self.vertices_vertices[a].push(b);
        self.vertices_vertices[b].push(a);
        Edge(self.edges_vertices.len() - 1)
    }

    /// Marks `face` as removed and appends its two replacement halves.
    /// Arrays are not compacted yet; [`Mesh::remove_faces`] does that.
    /// The appended faces take the top two layer values for now; the caller
    /// fixes the stacking when it commits.
    pub fn replace_face(&mut self, face: Face, new_faces: [FaceData; 2]) -> [Face; 2] {
        let first = Face(self.faces_vertices.len());
        for data in new_faces {
            let layer = self.faces_layer.len();
            self.faces_vertices.push(data.vertices);
            self.faces_edges.push(data.edges);
            self.faces_layer.push(layer);
        }
        self.removed_faces.push(face);
        [first, first + Face(1)]
    }

    /// Compacts the face arrays, dropping `faces`, and returns the old→new
    /// index map (`None` = removed). Every stored face reference is
    /// renumbered; references to removed faces are dropped, so callers must
    /// substitute replacements into the adjacency arrays *before* calling.
    /// Layer values are re-ranked densely, preserving their relative order.
    pub fn remove_faces(&mut self, faces: &[Face]) -> TiVec<Face, Option<Face>> {
        let old_count = self.faces_vertices.len();
        let mut removed = vec![false; old_count];
        for &f in faces {
            removed[f.0] = true;
        }

        let mut map: TiVec<Face, Option<Face>> = ti_vec![None; old_count];
        let mut next = 0;
        for old in (0..old_count).map(Face) {
            if !removed[old.0] {
                map[old] = Some(Face(next));
                next += 1;
            }
        }

        fn keep<T>(arr: TiVec<Face, T>, removed: &[bool]) -> TiVec<Face, T> {
            arr.into_iter_enumerated()
                .filter(|(f, _)| !removed[f.0])
                .map(|(_, x)| x)
                .collect()
        }
        self.faces_vertices = keep(std::mem::take(&mut self.faces_vertices), &removed);
        self.faces_edges = keep(std::mem::take(&mut self.faces_edges), &removed);
        let layers = keep(std::mem::take(&mut self.faces_layer), &removed);

        // dense re-rank preserving relative order
        let mut order: Vec<Face> = (0..layers.len()).map(Face).collect();
        order.sort_by_key(|&f| layers[f]);
        let mut new_layers: TiVec<Face, usize> = ti_vec![0; layers.len()];
        for (rank, &f) in order.iter().enumerate() {
            new_layers[f] = rank;
        }
        self.faces_layer = new_layers;

        for list in self.vertices_faces.iter_mut() {
            *list = list.iter().filter_map(|&f| map[f]).collect();
        }
        for list in self.edges_faces.iter_mut() {
            *list = list.iter().filter_map(|&f| map[f]).collect();
        }
        self.removed_faces.retain(|f| !removed[f.0]);
        for f in self.removed_faces.iter_mut() {
            if let Some(new) = map[*f] { *f = new }
        }

        map
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::unit_square()
    }
}
