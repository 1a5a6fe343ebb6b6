//! Quadric error metric.
//!
//! A quadric sums the squared distances from a point to a set of planes. Vertices
//! accumulate the planes of their triangles; an edge is scored with the sum of its
//! endpoints' quadrics.

use std::ops::AddAssign;

use crate::math::{Matrix4, Point3, Vector3, Vector4};

const SINGULAR: f64 = 1e-10;

/// Symmetric 4x4 error quadric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric(Matrix4);

impl Default for Quadric {
    fn default() -> Self {
        Self(Matrix4::zeros())
    }
}

impl Quadric {
    /// Quadric of the plane `normal . x + d = 0`; `normal` must be unit length.
    #[must_use]
    pub fn from_plane(normal: &Vector3, d: f64) -> Self {
        let p = Vector4::new(normal.x, normal.y, normal.z, d);
        Self(p * p.transpose())
    }

    /// Quadric of the plane through a triangle, or `None` for a degenerate triangle.
    #[must_use]
    pub fn from_triangle(a: &Point3, b: &Point3, c: &Point3) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len < SINGULAR || !len.is_finite() {
            return None;
        }
        let n = n / len;
        Some(Self::from_plane(&n, -n.dot(&a.coords)))
    }

    /// Sum of squared plane distances at `p`.
    #[must_use]
    pub fn evaluate(&self, p: &Point3) -> f64 {
        let v = Vector4::new(p.x, p.y, p.z, 1.0);
        v.dot(&(self.0 * v))
    }

    /// The point minimising the error, or `None` when the system is singular.
    #[must_use]
    pub fn optimal_point(&self) -> Option<Point3> {
        let a = self.0.fixed_view::<3, 3>(0, 0).into_owned();
        if a.determinant().abs() < SINGULAR {
            return None;
        }
        let b: Vector3 = -self.0.fixed_view::<3, 1>(0, 3).into_owned();
        let x = a.try_inverse()? * b;
        x.iter().all(|c| c.is_finite()).then(|| Point3::from(x))
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}
