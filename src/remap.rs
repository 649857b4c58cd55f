//! Committing a pending split: every adjacency reference to a replaced
//! face is rewritten to whichever replacement half actually owns it, the
//! face arrays are compacted, and the stacking order is repaired so each
//! pair of halves slots in where its parent was.
//!
//! All resolution happens before the first write, so a failed commit
//! leaves the mesh exactly as [`crate::split::insert_crease`] left it.

use std::fmt::Display;

use indexmap::IndexMap;
use typed_index_collections::TiVec;

use crate::mesh::{Edge, Face, Mesh, Vertex};
use crate::split::{Diff, FaceReplacement};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RemapError {
    /// A vertex listed a replaced face, but neither half contains it.
    NoVertexOwner { vertex: Vertex, face: Face },
    /// An edge listed a replaced face, but neither half contains it.
    NoEdgeOwner { edge: Edge, face: Face },
}

impl Display for RemapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoVertexOwner { vertex, face } =>
                write!(f, "{vertex} references replaced {face}, but neither replacement contains it"),
            Self::NoEdgeOwner { edge, face } =>
                write!(f, "{edge} references replaced {face}, but neither replacement contains it"),
        }
    }
}

impl std::error::Error for RemapError {}

/// The result of committing a [`Diff`], in post-compaction face indices.
#[derive(Clone, Debug)]
pub struct CommitOutcome {
    /// Pre-compaction face index to post-compaction index; `None` = removed.
    pub face_map: TiVec<Face, Option<Face>>,
    /// The diff's replacements with `new` renumbered to the compacted indices.
    pub replacements: Vec<FaceReplacement>,
}

/// Commits `diff`: substitutes replacement faces into `vertices_faces` and
/// `edges_faces` by ownership, compacts the face arrays, and re-ranks the
/// stacking order. A vertex or edge of a split face belongs to whichever
/// halves list it in their cycles, so shared cut vertices and the crease
/// edge end up owned by both halves.
pub fn apply(mesh: &mut Mesh, diff: &Diff) -> Result<CommitOutcome, RemapError> {
    if diff.replacements.is_empty() {
        return Ok(CommitOutcome {
            face_map: (0..mesh.num_faces()).map(|f| Some(Face(f))).collect(),
            replacements: vec![],
        });
    }

    let children_of: IndexMap<Face, [Face; 2]> =
        diff.replacements.iter().map(|r| (r.old, r.new)).collect();

    // resolve everything first; write nothing until resolution succeeds
    let mut vertex_fixes: Vec<(Vertex, Vec<Face>)> = vec![];
    for (v, faces) in mesh.vertices_faces.iter_enumerated() {
        if !faces.iter().any(|f| children_of.contains_key(f)) {
            continue;
        }
        let mut list = vec![];
        for &f in faces {
            let Some(children) = children_of.get(&f) else {
                list.push(f);
                continue;
            };
            let before = list.len();
            list.extend(children.iter().copied().filter(|&c| mesh.faces_vertices[c].contains(&v)));
            if list.len() == before {
                return Err(RemapError::NoVertexOwner { vertex: v, face: f });
            }
        }
        vertex_fixes.push((v, list));
    }
    let mut edge_fixes: Vec<(Edge, Vec<Face>)> = vec![];
    for (e, faces) in mesh.edges_faces.iter_enumerated() {
        if !faces.iter().any(|f| children_of.contains_key(f)) {
            continue;
        }
        let mut list = vec![];
        for &f in faces {
            let Some(children) = children_of.get(&f) else {
                list.push(f);
                continue;
            };
            let before = list.len();
            list.extend(children.iter().copied().filter(|&c| mesh.faces_edges[c].contains(&e)));
            if list.len() == before {
                return Err(RemapError::NoEdgeOwner { edge: e, face: f });
            }
        }
        edge_fixes.push((e, list));
    }

    for (v, list) in vertex_fixes {
        mesh.vertices_faces[v] = list;
    }
    for (e, list) in edge_fixes {
        mesh.edges_faces[e] = list;
    }

    // each half sorts right above its parent's old slot, first half lower
    let mut child_key: IndexMap<Face, (usize, usize)> = IndexMap::new();
    for r in &diff.replacements {
        for (i, &c) in r.new.iter().enumerate() {
            child_key.insert(c, (r.old_layer, i + 1));
        }
    }

    let pre_layers = mesh.faces_layer.clone();
    let olds: Vec<Face> = mesh.pending_removals().to_vec();
    let face_map = mesh.remove_faces(&olds);

    let mut keyed: Vec<((usize, usize), Face)> = vec![];
    for (old, new) in face_map.iter_enumerated() {
        let Some(new) = *new else { continue };
        let key = child_key.get(&old).copied().unwrap_or((pre_layers[old], 0));
        keyed.push((key, new));
    }
    keyed.sort_by_key(|&(key, _)| key);
    for (rank, &(_, f)) in keyed.iter().enumerate() {
        mesh.faces_layer[f] = rank;
    }

    // replacement halves are never removed, so the map always has them
    let renumber = |f: Face| face_map[f].unwrap_or(f);
    let replacements = diff.replacements.iter()
        .map(|r| FaceReplacement {
            old: r.old,
            new: [renumber(r.new[0]), renumber(r.new[1])],
            old_layer: r.old_layer,
        })
        .collect();

    Ok(CommitOutcome { face_map, replacements })
}
