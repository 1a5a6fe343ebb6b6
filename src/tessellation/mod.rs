mod triangulate_polygon;

pub use triangulate_polygon::TriangulatePolygon;

/// How a polygon loop was split into triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangulationMethod {
    /// The loop already was a triangle.
    Single,
    /// Convex loop, fanned from its first point.
    Fan,
    /// Constrained Delaunay triangulation of the projected loop.
    Delaunay,
    /// Delaunay failed on the projected loop; fanned from its first point instead.
    FanFallback,
}

/// Triangles covering one polygon loop.
///
/// Corners index into the loop and keep its winding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triangulation {
    /// Triangle corners as loop indices.
    pub triangles: Vec<[usize; 3]>,
    /// Strategy that produced the triangles.
    pub method: TriangulationMethod,
}
