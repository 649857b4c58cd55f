#![cfg(test)]
//! Helpers shared by the module tests.

use nalgebra::Vector2;

use crate::geom::{vec2, EPSILON};
use crate::mesh::{EdgeAssignment, Mesh};
use crate::remap::{self, CommitOutcome};
use crate::split::{self, Diff};

/// A unit square creased along `y = 0.5` and committed: the bottom half is
/// `f_0`, the top half `f_1`, and the crease `e_6`.
pub fn creased_square(assignment: EdgeAssignment) -> (Mesh, Diff, CommitOutcome) {
    let mut mesh = Mesh::unit_square();
    let diff = split::insert_crease(&mut mesh, &vec2(0.0, 0.5), &vec2(1.0, 0.0), assignment);
    let outcome = remap::apply(&mut mesh, &diff).unwrap();
    (mesh, diff, outcome)
}

pub fn assert_vec2_eq(a: &Vector2<f64>, b: &Vector2<f64>) {
    assert!((a - b).norm() < EPSILON, "{a:?} != {b:?}");
}
