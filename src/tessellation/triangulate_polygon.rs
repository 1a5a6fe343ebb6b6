use std::collections::HashMap;

use spade::handles::FixedVertexHandle;
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation as _};

use crate::error::{Result, TessellationError};
use crate::math::polygon_3d::{contains_point, is_convex_ccw, plane_basis, project_to_plane, signed_area};
use crate::math::{Point2, Point3, Vector3, TOLERANCE};

use super::{Triangulation, TriangulationMethod};

/// Splits one polygon boundary loop into triangles.
///
/// Triangles are emitted as-is, convex loops are fanned from their first point and
/// everything else goes through a constrained Delaunay triangulation in the plane
/// orthogonal to `normal`, with the loop sides as mandatory edges. When the projected
/// loop cannot be triangulated (self-intersection after projection, coincident
/// points) the fan is used instead.
pub struct TriangulatePolygon<'a> {
    points: &'a [Point3],
    normal: Vector3,
}

impl<'a> TriangulatePolygon<'a> {
    /// Creates a new `TriangulatePolygon` operation.
    #[must_use]
    pub fn new(points: &'a [Point3], normal: Vector3) -> Self {
        Self { points, normal }
    }

    /// Executes the triangulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the loop has fewer than three points.
    pub fn execute(&self) -> Result<Triangulation> {
        let n = self.points.len();
        if n < 3 {
            return Err(TessellationError::InvalidLoop(format!(
                "loop needs at least 3 points, got {n}"
            ))
            .into());
        }
        if n == 3 {
            return Ok(Triangulation {
                triangles: vec![[0, 1, 2]],
                method: TriangulationMethod::Single,
            });
        }

        let normal_len = self.normal.norm();
        if normal_len < TOLERANCE || !normal_len.is_finite() {
            return Ok(fan(n, TriangulationMethod::FanFallback));
        }

        let (u, v) = plane_basis(&self.normal);
        let flat = project_to_plane(self.points, &self.points[0], &u, &v);
        let ccw = signed_area(&flat) >= 0.0;

        let convex = if ccw {
            is_convex_ccw(&flat)
        } else {
            let reversed: Vec<Point2> = flat.iter().rev().copied().collect();
            is_convex_ccw(&reversed)
        };
        if convex {
            return Ok(fan(n, TriangulationMethod::Fan));
        }

        match constrained_delaunay(&flat) {
            Ok(mut triangles) => {
                // Spade emits counter-clockwise faces; match the loop's winding.
                if !ccw {
                    for tri in &mut triangles {
                        tri.swap(1, 2);
                    }
                }
                Ok(Triangulation {
                    triangles,
                    method: TriangulationMethod::Delaunay,
                })
            }
            Err(err) => {
                tracing::debug!(points = n, error = %err, "delaunay failed, using fan");
                Ok(fan(n, TriangulationMethod::FanFallback))
            }
        }
    }
}

fn fan(n: usize, method: TriangulationMethod) -> Triangulation {
    Triangulation {
        triangles: (1..n - 1).map(|i| [0, i, i + 1]).collect(),
        method,
    }
}

/// Triangulates a projected loop, returning triangles as loop indices.
fn constrained_delaunay(flat: &[Point2]) -> Result<Vec<[usize; 3]>> {
    let n = flat.len();
    let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
    let mut handles = Vec::with_capacity(n);
    let mut loop_index: HashMap<FixedVertexHandle, usize> = HashMap::with_capacity(n);

    for (i, p) in flat.iter().enumerate() {
        let h = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        if loop_index.insert(h, i).is_some() {
            return Err(TessellationError::Failed("coincident points after projection".into()).into());
        }
        handles.push(h);
    }

    for i in 0..n {
        let from = handles[i];
        let to = handles[(i + 1) % n];
        if !cdt.can_add_constraint(from, to) {
            return Err(TessellationError::Failed("loop self-intersects after projection".into()).into());
        }
        cdt.add_constraint(from, to);
    }

    // Loop sides are constraints, so every CDT triangle is wholly inside or outside
    // the loop and its centroid decides which.
    let mut triangles = Vec::with_capacity(n - 2);
    for face in cdt.inner_faces() {
        let mut tri = [0usize; 3];
        for (slot, vh) in tri.iter_mut().zip(face.vertices()) {
            *slot = *loop_index
                .get(&vh.fix())
                .ok_or_else(|| TessellationError::Failed("CDT produced a foreign vertex".into()))?;
        }
        let [a, b, c] = tri;
        let centroid = Point2::from((flat[a].coords + flat[b].coords + flat[c].coords) / 3.0);
        if contains_point(flat, &centroid) {
            triangles.push(tri);
        }
    }

    if triangles.len() != n - 2 {
        return Err(TessellationError::Failed(format!(
            "expected {} triangles, CDT produced {}",
            n - 2,
            triangles.len()
        ))
        .into());
    }
    Ok(triangles)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::polygon_3d::{newell_normal, triangle_normal};
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn run(points: &[Point3]) -> Triangulation {
        let normal = newell_normal(points).unwrap();
        TriangulatePolygon::new(points, normal).execute().unwrap()
    }

    fn area(points: &[Point3], tris: &[[usize; 3]]) -> f64 {
        tris.iter()
            .map(|t| triangle_normal(&points[t[0]], &points[t[1]], &points[t[2]]).norm() * 0.5)
            .sum()
    }

    fn l_shape() -> Vec<Point3> {
        vec![
            p(0.0, 0.0),
            p(4.0, 0.0),
            p(4.0, 2.0),
            p(2.0, 2.0),
            p(2.0, 4.0),
            p(0.0, 4.0),
        ]
    }

    #[test]
    fn triangle_is_passed_through() {
        let pts = [p(0.0, 0.0), p(4.0, 0.0), p(2.0, 3.0)];
        let result = run(&pts);
        assert_eq!(result.method, TriangulationMethod::Single);
        assert_eq!(result.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn convex_quad_is_fanned_from_first_point() {
        let pts = [p(0.0, 0.0), p(4.0, 0.0), p(4.0, 4.0), p(0.0, 4.0)];
        let result = run(&pts);
        assert_eq!(result.method, TriangulationMethod::Fan);
        assert_eq!(result.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn concave_loop_uses_delaunay_and_covers_area() {
        let pts = l_shape();
        let result = run(&pts);
        assert_eq!(result.method, TriangulationMethod::Delaunay);
        assert_eq!(result.triangles.len(), 4);
        assert_relative_eq!(area(&pts, &result.triangles), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn delaunay_keeps_loop_winding() {
        for pts in [l_shape(), l_shape().into_iter().rev().collect()] {
            let normal = newell_normal(&pts).unwrap();
            let result = TriangulatePolygon::new(&pts, normal).execute().unwrap();
            for t in &result.triangles {
                let n = triangle_normal(&pts[t[0]], &pts[t[1]], &pts[t[2]]);
                assert!(n.dot(&normal) > 0.0, "triangle {t:?} faces away from the loop normal");
            }
        }
    }

    #[test]
    fn self_intersecting_loop_falls_back_to_fan() {
        // Bowtie-shaped hexagon whose projected sides cross.
        let pts = [
            p(0.0, 0.0),
            p(2.0, 2.0),
            p(4.0, 0.0),
            p(4.0, 3.0),
            p(2.0, 1.0),
            p(0.0, 3.0),
        ];
        let normal = Vector3::z();
        let result = TriangulatePolygon::new(&pts, normal).execute().unwrap();
        assert_eq!(result.triangles.len(), 4);
        assert!(matches!(
            result.method,
            TriangulationMethod::FanFallback | TriangulationMethod::Delaunay
        ));
    }

    #[test]
    fn coincident_points_fall_back_to_fan() {
        let pts = [p(0.0, 0.0), p(4.0, 0.0), p(2.0, 1.0), p(4.0, 4.0), p(2.0, 1.0), p(0.0, 4.0)];
        let result = TriangulatePolygon::new(&pts, Vector3::z()).execute().unwrap();
        assert_eq!(result.method, TriangulationMethod::FanFallback);
        assert_eq!(result.triangles.len(), 4);
    }

    #[test]
    fn zero_normal_falls_back_to_fan() {
        let pts = [p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0)];
        let result = TriangulatePolygon::new(&pts, Vector3::zeros()).execute().unwrap();
        assert_eq!(result.method, TriangulationMethod::FanFallback);
        assert_eq!(result.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn non_planar_quad_is_triangulated() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.3),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.3),
        ];
        let result = run(&pts);
        assert_eq!(result.triangles.len(), 2);
    }

    #[test]
    fn short_loop_is_rejected() {
        let pts = [p(0.0, 0.0), p(1.0, 0.0)];
        let err = TriangulatePolygon::new(&pts, Vector3::z()).execute();
        assert!(err.is_err());
    }
}
