use super::{Point2, Point3, Vector3, TOLERANCE};

/// Computes the normal of a polygon loop with Newell's method.
///
/// Works for non-planar and non-convex loops. The result points to the side from
/// which the loop runs counter-clockwise. Returns `None` for degenerate loops.
#[must_use]
pub fn newell_normal(points: &[Point3]) -> Option<Vector3> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    let len = normal.norm();
    if len < TOLERANCE || !len.is_finite() {
        return None;
    }
    Some(normal / len)
}

/// Unnormalized normal of triangle `(a, b, c)`; its length is twice the area.
#[must_use]
pub fn triangle_normal(a: &Point3, b: &Point3, c: &Point3) -> Vector3 {
    (b - a).cross(&(c - a))
}

/// Returns an orthonormal `(u, v)` basis of the plane orthogonal to `normal`,
/// oriented so that `u x v` points along `normal`.
#[must_use]
pub fn plane_basis(normal: &Vector3) -> (Vector3, Vector3) {
    let n = normal.normalize();
    // Seed with the world axis least aligned with the normal.
    let seed = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
        Vector3::x()
    } else if n.y.abs() <= n.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = seed.cross(&n).normalize();
    let v = n.cross(&u);
    (u, v)
}

/// Projects points onto the plane through `origin` spanned by `u` and `v`.
#[must_use]
pub fn project_to_plane(points: &[Point3], origin: &Point3, u: &Vector3, v: &Vector3) -> Vec<Point2> {
    points
        .iter()
        .map(|p| {
            let d = p - origin;
            Point2::new(d.dot(u), d.dot(v))
        })
        .collect()
}

/// Signed area of a 2D loop (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Returns `true` if a counter-clockwise 2D loop is convex.
///
/// Collinear corners are tolerated; a single reflex corner makes the loop concave.
#[must_use]
pub fn is_convex_ccw(points: &[Point2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        let c = &points[(i + 2) % n];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross < -TOLERANCE {
            return false;
        }
    }
    true
}

/// Even-odd containment test of `point` against a closed 2D loop.
///
/// Points exactly on a side may land either way.
#[must_use]
pub fn contains_point(points: &[Point2], point: &Point2) -> bool {
    let n = points.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (&points[i], &points[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn unit_square() -> Vec<Point3> {
        vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn contains_point_handles_concave_notch() {
        // L shape with the notch in the upper right.
        let l = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 2.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        assert!(contains_point(&l, &Point2::new(1.0, 3.0)));
        assert!(contains_point(&l, &Point2::new(3.0, 1.0)));
        assert!(!contains_point(&l, &Point2::new(3.0, 3.0)));
        assert!(!contains_point(&l, &Point2::new(-1.0, 1.0)));
        assert!(!contains_point(&[], &Point2::new(0.0, 0.0)));
    }

    #[test]
    fn newell_normal_of_ccw_square_is_plus_z() {
        let n = newell_normal(&unit_square()).unwrap();
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn newell_normal_flips_with_winding() {
        let mut sq = unit_square();
        sq.reverse();
        let n = newell_normal(&sq).unwrap();
        assert_relative_eq!(n, -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn newell_normal_of_collinear_points_is_none() {
        let pts = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0)];
        assert!(newell_normal(&pts).is_none());
    }

    #[test]
    fn plane_basis_is_right_handed() {
        let n = Vector3::new(1.0, 2.0, -3.0).normalize();
        let (u, v) = plane_basis(&n);
        assert_relative_eq!(u.dot(&n), 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.dot(&n), 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.cross(&v), n, epsilon = 1e-12);
    }

    #[test]
    fn projected_square_stays_ccw_and_convex() {
        let sq = unit_square();
        let (u, v) = plane_basis(&Vector3::z());
        let flat = project_to_plane(&sq, &sq[0], &u, &v);
        assert!(is_convex_ccw(&flat));
    }

    #[test]
    fn l_shape_is_not_convex() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert!(!is_convex_ccw(&pts));
    }

    #[test]
    fn signed_area_tracks_winding() {
        let ccw = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), Point2::new(0.0, 2.0)];
        assert_relative_eq!(signed_area(&ccw), 2.0);
        let cw = [ccw[0], ccw[2], ccw[1]];
        assert_relative_eq!(signed_area(&cw), -2.0);
    }

    #[test]
    fn triangle_normal_length_is_twice_area() {
        let n = triangle_normal(&p(0.0, 0.0, 0.0), &p(2.0, 0.0, 0.0), &p(0.0, 2.0, 0.0));
        assert_relative_eq!(n.norm(), 4.0);
    }
}
