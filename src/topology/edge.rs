use super::triangle::TriangleId;
use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for an edge in the topology graph.
    pub struct EdgeId;
}

/// Data associated with a graph edge.
///
/// Endpoints are unordered. At most one live edge exists per endpoint pair.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// First endpoint.
    pub v0: VertexId,
    /// Second endpoint.
    pub v1: VertexId,
    /// Triangles that have this edge as a side.
    pub triangles: Vec<TriangleId>,
    /// The simplifier must not collapse this edge.
    pub protected: bool,
    /// Removed by a collapse or merged into a parallel edge.
    pub collapsed: bool,
}

impl EdgeData {
    /// Creates an edge with no triangles.
    #[must_use]
    pub fn new(v0: VertexId, v1: VertexId) -> Self {
        Self {
            v0,
            v1,
            triangles: Vec::new(),
            protected: false,
            collapsed: false,
        }
    }

    /// Returns `true` if the edge joins `a` and `b`, in either order.
    #[must_use]
    pub fn connects(&self, a: VertexId, b: VertexId) -> bool {
        (self.v0 == a && self.v1 == b) || (self.v0 == b && self.v1 == a)
    }

    /// The endpoint opposite `v`, if `v` is an endpoint.
    #[must_use]
    pub fn other(&self, v: VertexId) -> Option<VertexId> {
        if self.v0 == v {
            Some(self.v1)
        } else if self.v1 == v {
            Some(self.v0)
        } else {
            None
        }
    }

    /// Replaces endpoint `from` with `to`.
    pub fn retarget(&mut self, from: VertexId, to: VertexId) {
        if self.v0 == from {
            self.v0 = to;
        }
        if self.v1 == from {
            self.v1 = to;
        }
    }
}
