//! FOLD-flavored JSON import and export.
//!
//! Only the plain-data arrays go over the wire; all derived adjacency is
//! rebuilt on import through [`Mesh::from_parts`], whose derivation order
//! is deterministic, so exporting and re-importing reproduces the mesh.
//! `edges_foldAngle` is written for FOLD consumers but ignored on import,
//! where the assignment alone decides the angle.

use serde::{Deserialize, Serialize};

use crate::geom;
use crate::matrices::{Affine2, FoldState};
use crate::mesh::{BuildError, EdgeAssignment, Face, Mesh, Vertex};

const FILE_SPEC: f64 = 1.1;

fn default_file_spec() -> f64 {
    FILE_SPEC
}

fn default_file_creator() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

/// Wire form of a [`Mesh`], with FOLD field names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SerDeMesh {
    #[serde(default = "default_file_spec")]
    pub file_spec: f64,
    #[serde(default = "default_file_creator")]
    pub file_creator: String,
    pub vertices_coords: Vec<[f64; 2]>,
    pub edges_vertices: Vec<[usize; 2]>,
    pub edges_assignment: Vec<EdgeAssignment>,
    #[serde(rename = "edges_foldAngle", default)]
    pub edges_fold_angle: Vec<f64>,
    pub faces_vertices: Vec<Vec<usize>>,
    /// Missing in plain crease patterns; defaults to face-index order.
    #[serde(default)]
    pub faces_layer: Vec<usize>,
}

impl From<Mesh> for SerDeMesh {
    fn from(mesh: Mesh) -> Self {
        Self {
            file_spec: FILE_SPEC,
            file_creator: default_file_creator(),
            vertices_coords: mesh.vertices_coords.iter().map(|c| [c.x, c.y]).collect(),
            edges_vertices: mesh.edges_vertices.iter().map(|&[a, b]| [a.0, b.0]).collect(),
            edges_assignment: mesh.edges_assignment.iter().copied().collect(),
            edges_fold_angle: mesh.edges_fold_angle.iter().copied().collect(),
            faces_vertices: mesh.faces_vertices.iter()
                .map(|cycle| cycle.iter().map(|v| v.0).collect())
                .collect(),
            faces_layer: mesh.faces_layer.iter().copied().collect(),
        }
    }
}

impl TryFrom<SerDeMesh> for Mesh {
    type Error = BuildError;

    fn try_from(raw: SerDeMesh) -> Result<Self, BuildError> {
        let faces_layer = if raw.faces_layer.is_empty() {
            (0..raw.faces_vertices.len()).collect()
        } else {
            raw.faces_layer
        };
        Mesh::from_parts(
            raw.vertices_coords.iter().map(|&[x, y]| geom::vec2(x, y)).collect(),
            raw.edges_vertices.iter().map(|&[a, b]| [Vertex(a), Vertex(b)]).collect(),
            raw.edges_assignment.into(),
            raw.faces_vertices.into_iter()
                .map(|cycle| cycle.into_iter().map(Vertex).collect())
                .collect(),
            faces_layer.into(),
        )
    }
}

/// Wire form of a [`FoldState`]: the mesh fields plus the transforms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SerDeFoldState {
    #[serde(flatten)]
    pub mesh: SerDeMesh,
    pub root_face: usize,
    pub faces_matrix: Vec<Affine2>,
    pub faces_matrix_inv: Vec<Affine2>,
}

impl From<FoldState> for SerDeFoldState {
    fn from(state: FoldState) -> Self {
        Self {
            root_face: state.root.0,
            faces_matrix: state.faces_matrix.iter().copied().collect(),
            faces_matrix_inv: state.faces_matrix_inv.iter().copied().collect(),
            mesh: state.mesh.into(),
        }
    }
}

impl TryFrom<SerDeFoldState> for FoldState {
    type Error = BuildError;

    fn try_from(raw: SerDeFoldState) -> Result<Self, BuildError> {
        let mesh = Mesh::try_from(raw.mesh)?;
        let num_faces = mesh.num_faces();
        for (what, got) in [
            ("face matrices", raw.faces_matrix.len()),
            ("inverse face matrices", raw.faces_matrix_inv.len()),
        ] {
            if got != num_faces {
                return Err(BuildError::CountMismatch { what, expected: num_faces, got });
            }
        }
        if raw.root_face >= num_faces {
            return Err(BuildError::FaceOutOfRange { face: Face(raw.root_face), num_faces });
        }
        Ok(Self {
            mesh,
            root: Face(raw.root_face),
            faces_matrix: raw.faces_matrix.into(),
            faces_matrix_inv: raw.faces_matrix_inv.into(),
        })
    }
}

pub fn mesh_to_json(mesh: &Mesh) -> serde_json::Result<String> {
    serde_json::to_string_pretty(mesh)
}

pub fn mesh_from_json(json: &str) -> serde_json::Result<Mesh> {
    serde_json::from_str(json)
}

pub fn fold_state_to_json(state: &FoldState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

pub fn fold_state_from_json(json: &str) -> serde_json::Result<FoldState> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod test {
    use crate::matrices::FoldState;
    use crate::mesh::{EdgeAssignment, Face, Mesh, Vertex};
    use crate::ser_de::{self, SerDeMesh};
    use crate::test_utils::creased_square;

    #[test]
    fn test_mesh_round_trip() {
        let mesh = Mesh::unit_square();
        let json = ser_de::mesh_to_json(&mesh).unwrap();
        assert_eq!(ser_de::mesh_from_json(&json).unwrap(), mesh);

        let (mesh, _, _) = creased_square(EdgeAssignment::Valley);
        let json = ser_de::mesh_to_json(&mesh).unwrap();
        let imported = ser_de::mesh_from_json(&json).unwrap();
        assert_eq!(imported, mesh);
        assert_eq!(imported.check(), Ok(()));
    }

    #[test]
    fn test_wire_field_names() {
        let json = ser_de::mesh_to_json(&Mesh::unit_square()).unwrap();
        for field in ["vertices_coords", "edges_vertices", "edges_assignment",
                "edges_foldAngle", "faces_vertices", "faces_layer", "file_spec"] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
        assert!(json.contains("\"B\""));
    }

    #[test]
    fn test_import_minimal_crease_pattern() {
        // no layers, no fold angles, no file metadata
        let json = r#"{
            "vertices_coords": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            "edges_vertices": [[0, 1], [1, 2], [2, 3], [3, 0]],
            "edges_assignment": ["B", "B", "B", "B"],
            "faces_vertices": [[0, 1, 2, 3]]
        }"#;
        let mesh = ser_de::mesh_from_json(json).unwrap();
        assert_eq!(mesh, Mesh::unit_square());
    }

    #[test]
    fn test_import_rejects_missing_edge() {
        let raw = SerDeMesh {
            faces_vertices: vec![vec![0, 1, 2]],
            ..SerDeMesh::from(Mesh::unit_square())
        };
        let err = Mesh::try_from(raw).unwrap_err();
        assert_eq!(err, crate::mesh::BuildError::MissingEdge {
            face: Face(0),
            vertices: [Vertex(2), Vertex(0)],
        });
    }

    #[test]
    fn test_fold_state_round_trip() {
        let (mesh, _, _) = creased_square(EdgeAssignment::Mountain);
        let state = FoldState::new(&mesh, Face(0)).unwrap();
        let json = ser_de::fold_state_to_json(&state).unwrap();
        assert!(json.contains("faces_matrix"));
        assert_eq!(ser_de::fold_state_from_json(&json).unwrap(), state);
    }
}
