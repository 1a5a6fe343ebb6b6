use super::face::FaceId;
use super::part::PartId;
use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for a triangle in the topology graph.
    pub struct TriangleId;
}

/// Data associated with a graph triangle.
#[derive(Debug, Clone)]
pub struct TriangleData {
    /// Corners, in the winding of the owning face.
    pub corners: [VertexId; 3],
    /// Face this triangle tiles.
    pub face: FaceId,
    /// Part the triangle belongs to, once partitioned.
    pub part: Option<PartId>,
    /// A corner was retargeted by a collapse.
    pub updated: bool,
    /// Degenerated by a collapse.
    pub deleted: bool,
}

impl TriangleData {
    /// Creates a live triangle.
    #[must_use]
    pub fn new(corners: [VertexId; 3], face: FaceId) -> Self {
        Self {
            corners,
            face,
            part: None,
            updated: false,
            deleted: false,
        }
    }

    /// The three sides as corner pairs, following the winding.
    #[must_use]
    pub fn sides(&self) -> [(VertexId, VertexId); 3] {
        let [a, b, c] = self.corners;
        [(a, b), (b, c), (c, a)]
    }

    /// Returns `true` if `v` is a corner.
    #[must_use]
    pub fn has_corner(&self, v: VertexId) -> bool {
        self.corners.contains(&v)
    }

    /// Returns `true` if two corners coincide.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.corners;
        a == b || b == c || a == c
    }

    /// Replaces corner `from` with `to`; returns whether anything changed.
    pub fn replace_corner(&mut self, from: VertexId, to: VertexId) -> bool {
        let mut changed = false;
        for c in &mut self.corners {
            if *c == from {
                *c = to;
                changed = true;
            }
        }
        changed
    }
}
