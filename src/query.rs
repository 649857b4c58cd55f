//! Read-only hit-testing queries over a mesh snapshot.
//!
//! All queries are pure functions of the mesh and the query point; calling
//! one twice on an unmodified mesh returns the same result. Empty meshes
//! report "no result" rather than fabricating an index.

use float_ord::FloatOrd;
use nalgebra::Vector2;

use crate::geom;
use crate::mesh::{Edge, Face, Mesh, Vertex};

/// The nearest mesh element to a query point, as a tagged variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NearestTarget {
    Vertex(Vertex),
    Edge(Edge),
    Face(Face),
    None,
}

/// Index of the vertex nearest to `point` by Euclidean distance,
/// ties broken by lowest index. `None` if the mesh has no vertices.
pub fn nearest_vertex(mesh: &Mesh, point: &Vector2<f64>) -> Option<Vertex> {
    mesh.vertices_coords.iter_enumerated()
        .min_by_key(|(_, coord)| FloatOrd((*coord - point).norm_squared()))
        .map(|(v, _)| v)
}

/// Index of the edge nearest to `point`, measuring distance to the segment
/// itself rather than the infinite line. Ties break to the lowest index.
pub fn nearest_edge(mesh: &Mesh, point: &Vector2<f64>) -> Option<Edge> {
    mesh.edges_vertices.iter_enumerated()
        .min_by_key(|(_, &[a, b])| {
            FloatOrd(geom::distance_to_segment(&mesh.vertices_coords[a], &mesh.vertices_coords[b], point))
        })
        .map(|(e, _)| e)
}

/// The first face (in index order) whose polygon contains `point`.
/// Faces tile the sheet without overlap, so at most one interior match
/// exists; `None` outside the sheet boundary.
pub fn face_containing_point(mesh: &Mesh, point: &Vector2<f64>) -> Option<Face> {
    (0..mesh.num_faces()).map(Face)
        .find(|&f| geom::point_in_convex_polygon(&mesh.face_polygon(f), point))
}

/// Every face whose closed region contains `point`. More than one only
/// when the point lies on a shared edge or vertex.
pub fn faces_containing_point(mesh: &Mesh, point: &Vector2<f64>) -> Vec<Face> {
    (0..mesh.num_faces()).map(Face)
        .filter(|&f| geom::point_in_convex_polygon(&mesh.face_polygon(f), point))
        .collect()
}

/// The element under `point`, with an explicit priority rule:
/// a vertex within [`geom::EPSILON`] wins over an edge within epsilon,
/// which wins over the containing face. Away from all elements the nearest
/// vertex is reported; on an empty mesh, [`NearestTarget::None`].
pub fn nearest(mesh: &Mesh, point: &Vector2<f64>) -> NearestTarget {
    let vertex = nearest_vertex(mesh, point);
    if let Some(v) = vertex {
        if (mesh.vertices_coords[v] - point).norm() < geom::EPSILON {
            return NearestTarget::Vertex(v);
        }
    }
    if let Some(e) = nearest_edge(mesh, point) {
        let [a, b] = mesh.edges_vertices[e];
        let distance = geom::distance_to_segment(&mesh.vertices_coords[a], &mesh.vertices_coords[b], point);
        if distance < geom::EPSILON {
            return NearestTarget::Edge(e);
        }
    }
    if let Some(f) = face_containing_point(mesh, point) {
        return NearestTarget::Face(f);
    }
    match vertex {
        Some(v) => NearestTarget::Vertex(v),
        None => NearestTarget::None,
    }
}
