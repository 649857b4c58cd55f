//! Crease insertion: slicing every face an infinite line crosses.
//!
//! Each crossed face is cut into two halves joined by a fresh crease edge.
//! The replaced faces are only tombstoned here; the mesh is left in a
//! pending state that [`crate::remap::apply`] commits. Everything that
//! changed is reported in a [`Diff`] so the caller can rewrite its own
//! references and find the new creases afterwards.

use nalgebra::Vector2;
use typed_index_collections::TiVec;

use crate::geom;
use crate::mesh::{Edge, EdgeAssignment, Face, FaceData, Mesh, Vertex};

/// A crease edge inserted between the two halves of a split face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CreaseEdge {
    pub edge: Edge,
    pub vertices: [Vertex; 2],
    /// The two replacement faces it separates.
    pub faces: [Face; 2],
}

/// One face replaced by its two halves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceReplacement {
    pub old: Face,
    pub new: [Face; 2],
    /// The replaced face's stacking layer at split time.
    pub old_layer: usize,
}

/// Everything [`insert_crease`] changed. All indices are the ones current
/// when the call returned; `edge_map` translates pre-call edge indices,
/// which shift when an edge is subdivided.
#[derive(Clone, Debug)]
pub struct Diff {
    /// Vertices created by subdividing crossed edges, with their coordinates.
    pub new_vertices: Vec<(Vertex, Vector2<f64>)>,
    /// Second halves of subdivided edges; the first half keeps the old index.
    pub split_edges: Vec<Edge>,
    /// Freshly inserted crease edges, one per replaced face.
    pub crease_edges: Vec<CreaseEdge>,
    pub replacements: Vec<FaceReplacement>,
    /// For each edge index before the call, its index after.
    pub edge_map: TiVec<Edge, Edge>,
}

impl Diff {
    /// `true` when the line missed every face and the mesh is unchanged.
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    pub fn crease_edge_indices(&self) -> Vec<Edge> {
        self.crease_edges.iter().map(|c| c.edge).collect()
    }
}

/// Splits every face crossed by the infinite line through `line_point`
/// with direction `line_vector`, inserting a crease edge with the given
/// assignment into each.
///
/// A face is split only when the line enters and leaves it through two
/// distinct points: across two edge interiors, across an edge interior and
/// a vertex, or across two non-adjacent vertices. Grazing contact (a single
/// vertex, a run along an existing edge, or two crossings closer than
/// [`geom::EPSILON`]) leaves the face alone. Faces already pending removal
/// are skipped.
pub fn insert_crease(
    mesh: &mut Mesh,
    line_point: &Vector2<f64>,
    line_vector: &Vector2<f64>,
    assignment: EdgeAssignment,
) -> Diff {
    let mut diff = Diff {
        new_vertices: vec![],
        split_edges: vec![],
        crease_edges: vec![],
        replacements: vec![],
        edge_map: (0..mesh.num_edges()).map(Edge).collect(),
    };
    let skip = mesh.pending_removals().to_vec();
    // replacement halves are appended past this count and never re-split
    let original_faces = mesh.num_faces();
    for f in (0..original_faces).map(Face) {
        if skip.contains(&f) {
            continue;
        }
        split_face(mesh, f, line_point, line_vector, assignment, &mut diff);
    }
    diff
}

/// Shifts every recorded edge index at or above a freshly inserted one.
fn bump(diff: &mut Diff, inserted: Edge) {
    for e in diff.edge_map.iter_mut() {
        if *e >= inserted { *e += Edge(1) }
    }
    for e in diff.split_edges.iter_mut() {
        if *e >= inserted { *e += Edge(1) }
    }
    for c in diff.crease_edges.iter_mut() {
        if c.edge >= inserted { c.edge += Edge(1) }
    }
}

fn split_face(
    mesh: &mut Mesh,
    face: Face,
    line_point: &Vector2<f64>,
    line_vector: &Vector2<f64>,
    assignment: EdgeAssignment,
    diff: &mut Diff,
) {
    let cycle = mesh.faces_vertices[face].clone();
    let n = cycle.len();

    let vertex_hits: Vec<usize> = (0..n)
        .filter(|&i| geom::point_on_line(line_point, line_vector, &mesh.vertices_coords[cycle[i]]))
        .collect();
    let mut edge_hits: Vec<(usize, Vector2<f64>)> = vec![];
    for i in 0..n {
        let a = mesh.vertices_coords[cycle[i]];
        let b = mesh.vertices_coords[cycle[(i + 1) % n]];
        if let Some(p) = geom::line_segment_intersection_exclusive(line_point, line_vector, &a, &b) {
            edge_hits.push((i, p));
        }
    }

    match (vertex_hits.len(), edge_hits.len()) {
        (0, 2) => {
            if (edge_hits[0].1 - edge_hits[1].1).norm() < geom::EPSILON {
                return;
            }
        }
        (1, 1) => {
            let iv = vertex_hits[0];
            let ie = edge_hits[0].0;
            // crossing an edge right next to the hit vertex would leave a
            // two-vertex half
            if ie == iv || (ie + 1) % n == iv {
                return;
            }
            if (edge_hits[0].1 - mesh.vertices_coords[cycle[iv]]).norm() < geom::EPSILON {
                return;
            }
        }
        (2, 0) => {
            let gap = vertex_hits[1] - vertex_hits[0];
            if gap == 1 || gap == n - 1 {
                return; // the line runs along an existing edge
            }
        }
        _ => return,
    }

    let mut cut: Vec<Vertex> = vertex_hits.iter().map(|&i| cycle[i]).collect();
    let mut hits: Vec<(Edge, Vector2<f64>)> = edge_hits.iter()
        .map(|&(i, p)| (mesh.faces_edges[face][i], p))
        .collect();
    // subdividing shifts every higher edge index, so cut high to low
    hits.sort_by_key(|&(e, _)| std::cmp::Reverse(e));
    for (e, p) in hits {
        let sub = mesh.subdivide_edge(e, p);
        bump(diff, sub.second_edge);
        diff.new_vertices.push((sub.vertex, p));
        diff.split_edges.push(sub.second_edge);
        cut.push(sub.vertex);
    }

    // partition the (now augmented) cycle into the two arcs between the cuts
    let cycle = mesh.faces_vertices[face].clone();
    let edges = mesh.faces_edges[face].clone();
    let n = cycle.len();
    let Some(ia) = cycle.iter().position(|&v| v == cut[0]) else { return };
    let Some(ib) = cycle.iter().position(|&v| v == cut[1]) else { return };
    let arc = |from: usize, to: usize| {
        let mut vs = vec![];
        let mut es = vec![];
        let mut i = from;
        loop {
            vs.push(cycle[i]);
            if i == to {
                break;
            }
            es.push(edges[i]);
            i = (i + 1) % n;
        }
        (vs, es)
    };
    let (vs1, mut es1) = arc(ia, ib);
    let (vs2, mut es2) = arc(ib, ia);

    let crease = mesh.add_edge([cut[0], cut[1]], assignment);
    es1.push(crease);
    es2.push(crease);

    let children = mesh.replace_face(face, [
        FaceData { vertices: vs1, edges: es1 },
        FaceData { vertices: vs2, edges: es2 },
    ]);
    mesh.edges_faces[crease] = children.to_vec();

    diff.crease_edges.push(CreaseEdge { edge: crease, vertices: [cut[0], cut[1]], faces: children });
    diff.replacements.push(FaceReplacement {
        old: face,
        new: children,
        old_layer: mesh.faces_layer[face],
    });
}

/// Clips the infinite line to the sheet, returning its two extreme boundary
/// crossings ordered along `line_vector`. `None` when the line misses the
/// sheet or only grazes a corner.
pub fn clip_line(
    mesh: &Mesh,
    line_point: &Vector2<f64>,
    line_vector: &Vector2<f64>,
) -> Option<[Vector2<f64>; 2]> {
    let norm2 = line_vector.norm_squared();
    let mut ts: Vec<f64> = vec![];
    for (e, &[a, b]) in mesh.edges_vertices.iter_enumerated() {
        if mesh.edges_assignment[e] != EdgeAssignment::Boundary {
            continue;
        }
        let pa = mesh.vertices_coords[a];
        let pb = mesh.vertices_coords[b];
        let seg = pb - pa;
        let denom = geom::cross2(line_vector, &seg);
        if denom.abs() < geom::EPSILON {
            if geom::point_on_line(line_point, line_vector, &pa) {
                ts.push((pa - line_point).dot(line_vector) / norm2);
                ts.push((pb - line_point).dot(line_vector) / norm2);
            }
            continue;
        }
        let s = geom::cross2(line_vector, &(line_point - pa)) / denom;
        if (-geom::EPSILON..=1.0 + geom::EPSILON).contains(&s) {
            let p = pa + seg * s;
            ts.push((p - line_point).dot(line_vector) / norm2);
        }
    }
    let first = *ts.first()?;
    let (lo, hi) = ts.iter().fold((first, first), |(lo, hi), &t| (lo.min(t), hi.max(t)));
    if (hi - lo) * line_vector.norm() < geom::EPSILON {
        return None;
    }
    Some([line_point + line_vector * lo, line_point + line_vector * hi])
}

#[cfg(test)]
mod test {
    use crate::geom::{polygon_is_convex, vec2, EPSILON};
    use crate::mesh::{Edge, EdgeAssignment, Face, Mesh, Vertex};
    use crate::split::{self, clip_line};

    #[test]
    fn test_horizontal_crease_pending_state() {
        let mut mesh = Mesh::unit_square();
        let diff = split::insert_crease(&mut mesh, &vec2(0.0, 0.5), &vec2(1.0, 0.0), EdgeAssignment::Valley);

        assert_eq!(diff.replacements.len(), 1);
        assert_eq!(diff.new_vertices.len(), 2);
        assert_eq!(diff.split_edges.len(), 2);
        assert_eq!(diff.crease_edges.len(), 1);
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_edges(), 7);
        // the old face is tombstoned, its halves appended
        assert_eq!(mesh.num_faces(), 3);
        assert_eq!(mesh.pending_removals(), &[Face(0)]);
        assert_eq!(diff.replacements[0].old, Face(0));
        assert_eq!(diff.replacements[0].new, [Face(1), Face(2)]);
        assert_eq!(diff.replacements[0].old_layer, 0);

        // left and right edges were cut, shifting the ones above them
        assert_eq!(diff.edge_map.raw, vec![Edge(0), Edge(1), Edge(3), Edge(4)]);
        let crease = diff.crease_edges[0];
        assert_eq!(crease.edge, Edge(6));
        assert_eq!(mesh.edges_vertices[crease.edge], [Vertex(4), Vertex(5)]);
        assert_eq!(mesh.edges_assignment[crease.edge], EdgeAssignment::Valley);
        assert_eq!(mesh.edges_faces[crease.edge], vec![Face(1), Face(2)]);

        // both halves wound counterclockwise, and still convex
        assert_eq!(mesh.faces_vertices[Face(1)], vec![Vertex(4), Vertex(0), Vertex(1), Vertex(5)]);
        assert_eq!(mesh.faces_vertices[Face(2)], vec![Vertex(5), Vertex(2), Vertex(3), Vertex(4)]);
        assert!(polygon_is_convex(&mesh.face_polygon(Face(1))));
        assert!(polygon_is_convex(&mesh.face_polygon(Face(2))));
        assert!((mesh.total_face_area() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_line_missing_sheet_is_a_noop() {
        let mut mesh = Mesh::unit_square();
        let before = mesh.clone();
        let diff = split::insert_crease(&mut mesh, &vec2(0.0, 5.0), &vec2(1.0, 0.0), EdgeAssignment::Valley);
        assert!(diff.is_empty());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_line_along_existing_edge_is_a_noop() {
        let mut mesh = Mesh::unit_square();
        let before = mesh.clone();
        let diff = split::insert_crease(&mut mesh, &vec2(0.0, 0.0), &vec2(1.0, 0.0), EdgeAssignment::Mountain);
        assert!(diff.is_empty());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_line_grazing_a_corner_is_a_noop() {
        let mut mesh = Mesh::unit_square();
        let before = mesh.clone();
        // through v_0 only, heading away from the interior
        let diff = split::insert_crease(&mut mesh, &vec2(0.0, 0.0), &vec2(1.0, -1.0), EdgeAssignment::Valley);
        assert!(diff.is_empty());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_diagonal_through_two_vertices() {
        let mut mesh = Mesh::unit_square();
        let diff = split::insert_crease(&mut mesh, &vec2(0.0, 0.0), &vec2(1.0, 1.0), EdgeAssignment::Mountain);

        // no edges were cut: the crease joins two existing corners
        assert_eq!(diff.new_vertices.len(), 0);
        assert_eq!(diff.split_edges.len(), 0);
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 5);
        let crease = diff.crease_edges[0];
        assert_eq!(mesh.edges_vertices[crease.edge], [Vertex(0), Vertex(2)]);
        assert_eq!(mesh.edges_fold_angle[crease.edge], -180.0);
        assert_eq!(mesh.faces_vertices[Face(1)], vec![Vertex(0), Vertex(1), Vertex(2)]);
        assert_eq!(mesh.faces_vertices[Face(2)], vec![Vertex(2), Vertex(3), Vertex(0)]);
    }

    #[test]
    fn test_crease_through_vertex_and_edge() {
        let mut mesh = Mesh::unit_square();
        // through v_0 and the middle of the top edge
        let diff = split::insert_crease(&mut mesh, &vec2(0.0, 0.0), &vec2(1.0, 2.0), EdgeAssignment::Valley);

        assert_eq!(diff.new_vertices.len(), 1);
        let (v, coord) = diff.new_vertices[0];
        assert_eq!(v, Vertex(4));
        assert!((coord - vec2(0.5, 1.0)).norm() < EPSILON);
        assert_eq!(mesh.num_edges(), 6);
        let crease = diff.crease_edges[0];
        assert_eq!(mesh.edges_vertices[crease.edge], [Vertex(0), Vertex(4)]);
        assert!((mesh.total_face_area() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_clip_line() {
        let mesh = Mesh::unit_square();
        let [a, b] = clip_line(&mesh, &vec2(-2.0, 0.5), &vec2(1.0, 0.0))
            .expect("horizontal line should cross the sheet");
        assert!((a - vec2(0.0, 0.5)).norm() < EPSILON);
        assert!((b - vec2(1.0, 0.5)).norm() < EPSILON);

        // collinear with the bottom edge: clips to that edge
        let [a, b] = clip_line(&mesh, &vec2(5.0, 0.0), &vec2(-1.0, 0.0))
            .expect("line along the bottom edge should clip to it");
        assert!((a - vec2(1.0, 0.0)).norm() < EPSILON);
        assert!((b - vec2(0.0, 0.0)).norm() < EPSILON);

        assert_eq!(clip_line(&mesh, &vec2(0.0, 5.0), &vec2(1.0, 0.0)), None);
        // grazing a single corner
        assert_eq!(clip_line(&mesh, &vec2(-1.0, 1.0), &vec2(1.0, -1.0)), None);
    }
}
