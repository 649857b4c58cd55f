//! Pure 2D geometry over `f64` coordinates.
//! Every incidence test in the crate goes through the one epsilon defined here.

use nalgebra::{Scalar, Vector2};

/// Numeric tolerance for "on vertex"/"on edge" tests, in source units.
/// Applied consistently across crease insertion and hit-testing.
pub const EPSILON: f64 = 1e-8;

/// Convenience function for constructing `Vector2`
pub fn vec2<T: Scalar>(x: T, y: T) -> Vector2<T> {
    Vector2::new(x, y)
}

/// 2D cross product (z component of the 3D cross product).
pub fn cross2(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Returns twice the signed area of the polygon defined by the input points.
/// Positive for counterclockwise winding.
pub fn twice_signed_area(points: &[Vector2<f64>]) -> f64 {
    points.iter().zip(points.iter().cycle().skip(1))
        .map(|(v0, v1)| v0.x * v1.y - v1.x * v0.y)
        .sum()
}

/// Returns the orientation of the polygon defined by the input points.
/// +1 for counterclockwise, -1 for clockwise, 0 for degenerate.
pub fn polygon_orientation(points: &[Vector2<f64>]) -> i32 {
    let area = twice_signed_area(points);
    if area > EPSILON { 1 } else if area < -EPSILON { -1 } else { 0 }
}

/// Whether `p` lies on the infinite line through `line_point` with direction `line_vector`.
///
/// # Requirements
/// * `line_vector` must not be the zero vector.
pub fn point_on_line(line_point: &Vector2<f64>, line_vector: &Vector2<f64>, p: &Vector2<f64>) -> bool {
    let deviation = cross2(line_vector, &(p - line_point)) / line_vector.norm();
    deviation.abs() < EPSILON
}

/// Intersection of the infinite line `(line_point, line_vector)` with the
/// *open* segment `(a, b)`. Endpoints are excluded so that a crease passing
/// through a vertex is reported by the vertex test alone, never twice.
pub fn line_segment_intersection_exclusive(
    line_point: &Vector2<f64>,
    line_vector: &Vector2<f64>,
    a: &Vector2<f64>,
    b: &Vector2<f64>,
) -> Option<Vector2<f64>> {
    let seg = b - a;
    let denom = cross2(line_vector, &seg);
    if denom.abs() < EPSILON {
        return None; // parallel or collinear
    }
    let s = cross2(line_vector, &(line_point - a)) / denom;
    if s > EPSILON && s < 1.0 - EPSILON {
        Some(a + seg * s)
    } else {
        None
    }
}

/// Intersection of the ray `(origin, direction)` with the *closed* segment `(a, b)`.
pub fn ray_segment_intersection(
    origin: &Vector2<f64>,
    direction: &Vector2<f64>,
    a: &Vector2<f64>,
    b: &Vector2<f64>,
) -> Option<Vector2<f64>> {
    let seg = b - a;
    let denom = cross2(direction, &seg);
    if denom.abs() < EPSILON {
        return None;
    }
    let s = cross2(direction, &(origin - a)) / denom;
    let t = cross2(&seg, &(origin - a)) / denom;
    if s >= -EPSILON && s <= 1.0 + EPSILON && t >= -EPSILON {
        Some(a + seg * s)
    } else {
        None
    }
}

/// The point on segment `(a, b)` nearest to `p`.
pub fn nearest_point_on_segment(a: &Vector2<f64>, b: &Vector2<f64>, p: &Vector2<f64>) -> Vector2<f64> {
    let seg = b - a;
    let len2 = seg.norm_squared();
    if len2 < EPSILON * EPSILON {
        return *a;
    }
    let t = ((p - a).dot(&seg) / len2).clamp(0.0, 1.0);
    a + seg * t
}

/// Distance from `p` to the segment `(a, b)`, not the infinite line.
pub fn distance_to_segment(a: &Vector2<f64>, b: &Vector2<f64>, p: &Vector2<f64>) -> f64 {
    (nearest_point_on_segment(a, b, p) - p).norm()
}

/// Whether `p` lies inside or on the boundary of the convex polygon `points`.
/// Works for either winding; the boundary is inclusive within [`EPSILON`].
pub fn point_in_convex_polygon(points: &[Vector2<f64>], p: &Vector2<f64>) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut has_pos = false;
    let mut has_neg = false;
    for (a, b) in points.iter().zip(points.iter().cycle().skip(1)) {
        let side = cross2(&(b - a), &(p - a));
        if side > EPSILON { has_pos = true }
        if side < -EPSILON { has_neg = true }
    }
    !(has_pos && has_neg)
}

/// Whether the counterclockwise polygon `points` is convex: every corner
/// turns left (or is straight, within [`EPSILON`]).
pub fn polygon_is_convex(points: &[Vector2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }
    (0..points.len()).all(|i| {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let c = points[(i + 2) % points.len()];
        cross2(&(b - a), &(c - b)) >= -EPSILON
    })
}

/// Convex hull of the input points, counterclockwise, via Andrew's monotone chain.
/// Collinear boundary points are dropped.
pub fn convex_hull(points: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        (a.x, a.y).partial_cmp(&(b.x, b.y)).unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.dedup_by(|a, b| (*a - *b).norm() < EPSILON);
    if sorted.len() < 3 {
        return sorted;
    }

    fn chain<'a>(iter: impl Iterator<Item = &'a Vector2<f64>>) -> Vec<Vector2<f64>> {
        let mut hull: Vec<Vector2<f64>> = vec![];
        for p in iter {
            while hull.len() >= 2 {
                let last = hull[hull.len() - 1];
                let prev = hull[hull.len() - 2];
                if cross2(&(last - prev), &(p - prev)) <= EPSILON {
                    hull.pop();
                } else {
                    break;
                }
            }
            hull.push(*p);
        }
        hull.pop(); // endpoint repeats as the other chain's start
        hull
    }

    let mut lower = chain(sorted.iter());
    let upper = chain(sorted.iter().rev());
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod test {
    use crate::geom::*;

    #[test]
    fn test_twice_signed_area() {
        assert_eq!(twice_signed_area(&[vec2(0.0, 0.0), vec2(2.0, 0.0)]), 0.0);
        assert_eq!(twice_signed_area(&[vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(1.0, 1.0), vec2(0.0, 1.0)]), 2.0);
        assert_eq!(twice_signed_area(&[vec2(0.0, 1.0), vec2(1.0, 1.0), vec2(1.0, 0.0), vec2(0.0, 0.0)]), -2.0);
    }

    #[test]
    fn test_polygon_orientation() {
        assert_eq!(polygon_orientation(&[vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 1.0)]), 1);
        assert_eq!(polygon_orientation(&[vec2(0.0, 0.0), vec2(0.0, 1.0), vec2(1.0, 0.0)]), -1);
        assert_eq!(polygon_orientation(&[vec2(0.0, 0.0), vec2(1.0, 1.0), vec2(2.0, 2.0)]), 0);
    }

    #[test]
    fn test_point_on_line() {
        assert!(point_on_line(&vec2(0.0, 0.5), &vec2(1.0, 0.0), &vec2(7.0, 0.5)));
        assert!(point_on_line(&vec2(0.0, 0.5), &vec2(1.0, 0.0), &vec2(-3.0, 0.5)));
        assert!(!point_on_line(&vec2(0.0, 0.5), &vec2(1.0, 0.0), &vec2(0.0, 0.6)));
        // scaling the direction must not change the verdict
        assert!(!point_on_line(&vec2(0.0, 0.5), &vec2(1000.0, 0.0), &vec2(0.0, 0.5 + 1e-6)));
        assert!(point_on_line(&vec2(0.0, 0.0), &vec2(1.0, 1.0), &vec2(0.5, 0.5)));
    }

    #[test]
    fn test_line_segment_intersection_exclusive() {
        let p = vec2(0.0, 0.5);
        let v = vec2(1.0, 0.0);
        let hit = line_segment_intersection_exclusive(&p, &v, &vec2(1.0, 0.0), &vec2(1.0, 1.0))
            .expect("line should cross the segment interior");
        assert!((hit - vec2(1.0, 0.5)).norm() < EPSILON);
        // endpoint incidences are excluded
        assert_eq!(line_segment_intersection_exclusive(&vec2(0.0, 0.0), &v, &vec2(1.0, 0.0), &vec2(1.0, 1.0)), None);
        assert_eq!(line_segment_intersection_exclusive(&vec2(0.0, 1.0), &v, &vec2(1.0, 0.0), &vec2(1.0, 1.0)), None);
        // parallel
        assert_eq!(line_segment_intersection_exclusive(&p, &v, &vec2(0.0, 0.0), &vec2(1.0, 0.0)), None);
    }

    #[test]
    fn test_ray_segment_intersection() {
        let hit = ray_segment_intersection(&vec2(0.5, 0.5), &vec2(1.0, 0.0), &vec2(1.0, 0.0), &vec2(1.0, 1.0))
            .expect("ray should hit the right side");
        assert!((hit - vec2(1.0, 0.5)).norm() < EPSILON);
        // pointing away
        assert_eq!(ray_segment_intersection(&vec2(0.5, 0.5), &vec2(-1.0, 0.0), &vec2(1.0, 0.0), &vec2(1.0, 1.0)), None);
        // endpoints included, unlike the line/segment test
        assert!(ray_segment_intersection(&vec2(0.0, 0.0), &vec2(1.0, 0.0), &vec2(1.0, 0.0), &vec2(1.0, 1.0)).is_some());
    }

    #[test]
    fn test_distance_to_segment() {
        let a = vec2(0.0, 0.0);
        let b = vec2(1.0, 0.0);
        assert!((distance_to_segment(&a, &b, &vec2(0.5, 1.0)) - 1.0).abs() < EPSILON);
        assert!((distance_to_segment(&a, &b, &vec2(2.0, 0.0)) - 1.0).abs() < EPSILON);
        assert!((distance_to_segment(&a, &b, &vec2(-3.0, 4.0)) - 5.0).abs() < EPSILON);
        assert!(distance_to_segment(&a, &a, &vec2(0.0, 0.0)) < EPSILON);
    }

    #[test]
    fn test_point_in_convex_polygon() {
        let square = [vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(1.0, 1.0), vec2(0.0, 1.0)];
        assert!(point_in_convex_polygon(&square, &vec2(0.5, 0.5)));
        assert!(point_in_convex_polygon(&square, &vec2(0.0, 0.0))); // corner, inclusive
        assert!(point_in_convex_polygon(&square, &vec2(0.5, 0.0))); // boundary, inclusive
        assert!(!point_in_convex_polygon(&square, &vec2(1.5, 0.5)));
        assert!(!point_in_convex_polygon(&square[..2], &vec2(0.5, 0.5)));
        // clockwise winding works too
        let square_cw = [vec2(0.0, 0.0), vec2(0.0, 1.0), vec2(1.0, 1.0), vec2(1.0, 0.0)];
        assert!(point_in_convex_polygon(&square_cw, &vec2(0.5, 0.5)));
    }

    #[test]
    fn test_polygon_is_convex() {
        let square = [vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(1.0, 1.0), vec2(0.0, 1.0)];
        assert!(polygon_is_convex(&square));
        assert!(polygon_is_convex(&[vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 1.0)]));
        // a dart: counterclockwise overall, but reflex at the last corner
        assert!(!polygon_is_convex(&[vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 4.0), vec2(3.0, 1.0)]));
        assert!(!polygon_is_convex(&square[..2]));
    }

    #[test]
    fn test_convex_hull() {
        let hull = convex_hull(&[
            vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(1.0, 1.0), vec2(0.0, 1.0), vec2(0.5, 0.5),
        ]);
        assert_eq!(hull.len(), 4);
        assert_eq!(polygon_orientation(&hull), 1);
        assert!(point_in_convex_polygon(&hull, &vec2(0.5, 0.5)));

        // clockwise input comes out counterclockwise
        let hull = convex_hull(&[vec2(0.0, 0.0), vec2(0.0, 1.0), vec2(1.0, 1.0), vec2(1.0, 0.0)]);
        assert_eq!(polygon_orientation(&hull), 1);
    }
}
