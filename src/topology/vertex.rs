use crate::host::PointId;
use crate::math::Point3;

use super::edge::EdgeId;
use super::triangle::TriangleId;

slotmap::new_key_type! {
    /// Unique identifier for a vertex in the topology graph.
    pub struct VertexId;
}

/// Data associated with a graph vertex.
///
/// One host point maps to one vertex per connected fan around it, so a point on a
/// non-manifold seam may own several vertices.
#[derive(Debug, Clone)]
pub struct VertexData {
    /// Current position.
    pub point: Point3,
    /// Host point this vertex writes back to.
    pub host_point: PointId,
    /// Incident edges.
    pub edges: Vec<EdgeId>,
    /// Incident triangles.
    pub triangles: Vec<TriangleId>,
    /// Merged into another vertex by a collapse.
    pub collapsed: bool,
}

impl VertexData {
    /// Creates an unconnected vertex.
    #[must_use]
    pub fn new(point: Point3, host_point: PointId) -> Self {
        Self {
            point,
            host_point,
            edges: Vec::new(),
            triangles: Vec::new(),
            collapsed: false,
        }
    }
}
