//! Consistency checking for the mesh's parallel index arrays.
//! There's a bunch of conditions; a mesh that passes has no dangling index,
//! its cycles agree with its edges, and its layer values form a permutation.
//!
//! Checks apply to committed meshes: call after [`crate::remap::apply`],
//! not while a face replacement is pending.

use std::fmt::Display;

use crate::geom;
use crate::mesh::{Edge, EdgeAssignment, Face, Mesh, Vertex};

#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum CheckError {
    EdgeEndpointOutOfRange { edge: Edge, vertex: Vertex },
    FaceVertexOutOfRange { face: Face, vertex: Vertex },
    /// `faces_edges[f][i]` does not join `faces_vertices[f][i]` and its successor.
    FaceCycleBroken { face: Face, position: usize },
    /// An edge and a face disagree about being incident.
    EdgeFaceMismatch { edge: Edge, face: Face },
    /// An edge lists more than two incident faces.
    TooManyIncidentFaces { edge: Edge, count: usize },
    VertexFaceMismatch { vertex: Vertex, face: Face },
    VertexVertexMismatch { vertex: Vertex, other: Vertex },
    /// `faces_layer` is not a permutation of `0..num_faces`.
    LayersNotAPermutation,
    FoldAngleMismatch { edge: Edge },
    LengthMismatch { edge: Edge },
    /// A face's winding is clockwise or degenerate.
    BadWinding { face: Face },
    /// A face has a reflex corner.
    NotConvex { face: Face },
    /// The face areas do not sum to the area the boundary edges enclose,
    /// so the faces overlap or leave a gap.
    NotATiling { sheet_area: f64, face_area: f64 },
    CountMismatch { what: &'static str, expected: usize, got: usize },
}

impl Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EdgeEndpointOutOfRange { edge, vertex } =>
                write!(f, "{edge} references {vertex}, which does not exist"),
            Self::FaceVertexOutOfRange { face, vertex } =>
                write!(f, "{face} references {vertex}, which does not exist"),
            Self::FaceCycleBroken { face, position } =>
                write!(f, "{face}'s edge at cycle position {position} does not join the vertices beside it"),
            Self::EdgeFaceMismatch { edge, face } =>
                write!(f, "{edge} and {face} disagree about being incident"),
            Self::TooManyIncidentFaces { edge, count } =>
                write!(f, "{edge} lists {count} incident faces; at most two are allowed"),
            Self::VertexFaceMismatch { vertex, face } =>
                write!(f, "{vertex} and {face} disagree about being incident"),
            Self::VertexVertexMismatch { vertex, other } =>
                write!(f, "{vertex} lists neighbor {other} but no edge connects them"),
            Self::LayersNotAPermutation =>
                write!(f, "faces_layer is not a permutation of the face indices"),
            Self::FoldAngleMismatch { edge } =>
                write!(f, "{edge}'s fold angle does not match its assignment"),
            Self::LengthMismatch { edge } =>
                write!(f, "{edge}'s cached length does not match its endpoints"),
            Self::BadWinding { face } =>
                write!(f, "{face} is not wound counterclockwise"),
            Self::NotConvex { face } =>
                write!(f, "{face} has a reflex corner"),
            Self::NotATiling { sheet_area, face_area } =>
                write!(f, "face areas sum to {face_area}, but the boundary encloses {sheet_area}"),
            Self::CountMismatch { what, expected, got } =>
                write!(f, "expected {expected} {what}, got {got}"),
        }
    }
}

impl Mesh {
    /// Checks the mesh's invariants and gets a list of everything that is wrong.
    ///
    /// If this function returns `Ok`, every index array is mutually
    /// consistent: cycles close, incidences agree in both directions, and
    /// no array holds a dangling index.
    pub fn check(&self) -> Result<(), Vec<CheckError>> {
        let mut errors = vec![];
        errors.extend(self.check_counts());
        errors.extend(self.check_edges());
        errors.extend(self.check_face_cycles());
        errors.extend(self.check_incidence());
        errors.extend(self.check_tiling());
        errors.extend(self.check_layers());
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn check_counts(&self) -> Vec<CheckError> {
        let mut errors = vec![];
        let pairs = [
            ("edge assignments", self.num_edges(), self.edges_assignment.len()),
            ("edge fold angles", self.num_edges(), self.edges_fold_angle.len()),
            ("edge lengths", self.num_edges(), self.edges_length.len()),
            ("edge face lists", self.num_edges(), self.edges_faces.len()),
            ("face edge cycles", self.num_faces(), self.faces_edges.len()),
            ("face layers", self.num_faces(), self.faces_layer.len()),
            ("vertex neighbor lists", self.num_vertices(), self.vertices_vertices.len()),
            ("vertex face lists", self.num_vertices(), self.vertices_faces.len()),
        ];
        for (what, expected, got) in pairs {
            if expected != got {
                errors.push(CheckError::CountMismatch { what, expected, got });
            }
        }
        errors
    }

    fn check_edges(&self) -> Vec<CheckError> {
        let mut errors = vec![];
        for (e, &[a, b]) in self.edges_vertices.iter_enumerated() {
            for v in [a, b] {
                if v.0 >= self.num_vertices() {
                    errors.push(CheckError::EdgeEndpointOutOfRange { edge: e, vertex: v });
                }
            }
            if a.0 < self.num_vertices() && b.0 < self.num_vertices() {
                let length = (self.vertices_coords[b] - self.vertices_coords[a]).norm();
                if (self.edges_length[e] - length).abs() > geom::EPSILON {
                    errors.push(CheckError::LengthMismatch { edge: e });
                }
            }
            if self.edges_fold_angle[e] != self.edges_assignment[e].fold_angle() {
                errors.push(CheckError::FoldAngleMismatch { edge: e });
            }
        }
        for (v, neighbors) in self.vertices_vertices.iter_enumerated() {
            for &other in neighbors {
                let connected = self.edges_vertices.iter()
                    .any(|&[a, b]| (a, b) == (v, other) || (a, b) == (other, v));
                if !connected {
                    errors.push(CheckError::VertexVertexMismatch { vertex: v, other });
                }
            }
        }
        errors
    }

    fn check_face_cycles(&self) -> Vec<CheckError> {
        let mut errors = vec![];
        for (f, vertices) in self.faces_vertices.iter_enumerated() {
            for &v in vertices {
                if v.0 >= self.num_vertices() {
                    errors.push(CheckError::FaceVertexOutOfRange { face: f, vertex: v });
                }
            }
            if vertices.iter().any(|v| v.0 >= self.num_vertices()) {
                continue;
            }
            for (i, &e) in self.faces_edges[f].iter().enumerate() {
                let v0 = vertices[i];
                let v1 = vertices[(i + 1) % vertices.len()];
                let [a, b] = self.edges_vertices[e];
                if (a, b) != (v0, v1) && (a, b) != (v1, v0) {
                    errors.push(CheckError::FaceCycleBroken { face: f, position: i });
                }
            }
            let polygon = self.face_polygon(f);
            if geom::polygon_orientation(&polygon) != 1 {
                errors.push(CheckError::BadWinding { face: f });
            } else if !geom::polygon_is_convex(&polygon) {
                errors.push(CheckError::NotConvex { face: f });
            }
        }
        errors
    }

    /// Incidence agreement in both directions, for edges and vertices.
    fn check_incidence(&self) -> Vec<CheckError> {
        let mut errors = vec![];
        for (e, faces) in self.edges_faces.iter_enumerated() {
            if faces.len() > 2 {
                errors.push(CheckError::TooManyIncidentFaces { edge: e, count: faces.len() });
            }
            for &f in faces {
                if !self.faces_edges[f].contains(&e) {
                    errors.push(CheckError::EdgeFaceMismatch { edge: e, face: f });
                }
            }
        }
        for (f, edges) in self.faces_edges.iter_enumerated() {
            for &e in edges {
                if !self.edges_faces[e].contains(&f) {
                    errors.push(CheckError::EdgeFaceMismatch { edge: e, face: f });
                }
            }
        }
        for (v, faces) in self.vertices_faces.iter_enumerated() {
            for &f in faces {
                if !self.faces_vertices[f].contains(&v) {
                    errors.push(CheckError::VertexFaceMismatch { vertex: v, face: f });
                }
            }
        }
        for (f, vertices) in self.faces_vertices.iter_enumerated() {
            for &v in vertices {
                if !self.vertices_faces[v].contains(&f) {
                    errors.push(CheckError::VertexFaceMismatch { vertex: v, face: f });
                }
            }
        }
        errors
    }

    /// The faces must cover the region the boundary edges enclose exactly
    /// once. Each boundary edge is oriented the way its face traverses it,
    /// so the boundary winds counterclockwise like the faces; the sheet
    /// area then comes out of the shoelace sum over those oriented edges.
    fn check_tiling(&self) -> Vec<CheckError> {
        let mut twice_sheet = 0.0;
        for (e, &[a, b]) in self.edges_vertices.iter_enumerated() {
            if self.edges_assignment[e] != EdgeAssignment::Boundary {
                continue;
            }
            if a.0 >= self.num_vertices() || b.0 >= self.num_vertices() {
                continue;
            }
            let Some(&f) = self.edges_faces[e].first() else { continue };
            let Some(edges) = self.faces_edges.get(f) else { continue };
            let Some(position) = edges.iter().position(|&fe| fe == e) else { continue };
            let forward = self.faces_vertices[f].get(position) == Some(&a);
            let (va, vb) = if forward { (a, b) } else { (b, a) };
            twice_sheet += geom::cross2(&self.vertices_coords[va], &self.vertices_coords[vb]);
        }
        let sheet_area = twice_sheet / 2.0;
        let face_area = self.total_face_area();
        if (face_area - sheet_area).abs() > geom::EPSILON {
            return vec![CheckError::NotATiling { sheet_area, face_area }];
        }
        vec![]
    }

    fn check_layers(&self) -> Vec<CheckError> {
        let mut seen = vec![false; self.num_faces()];
        for &layer in &self.faces_layer {
            if layer >= seen.len() || seen[layer] {
                return vec![CheckError::LayersNotAPermutation];
            }
            seen[layer] = true;
        }
        vec![]
    }
}
