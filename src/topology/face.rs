use crate::host::{MaterialTag, PointId, PolygonId};

use super::part::PartId;
use super::triangle::TriangleId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology graph.
    pub struct FaceId;
}

/// Data associated with a graph face: one host polygon and the triangles tiling it.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// Host polygon this face came from.
    pub polygon: PolygonId,
    /// Boundary loop as ingested.
    pub points: Vec<PointId>,
    /// Material tag as ingested.
    pub material: MaterialTag,
    /// Triangles tiling the face, in triangulation order.
    pub triangles: Vec<TriangleId>,
    /// Owning part, once partitioned.
    pub part: Option<PartId>,
}

impl FaceData {
    /// Creates a face with no triangles yet.
    #[must_use]
    pub fn new(polygon: PolygonId, points: Vec<PointId>, material: MaterialTag) -> Self {
        Self {
            polygon,
            points,
            material,
            triangles: Vec::new(),
            part: None,
        }
    }

    /// The loop neighbours `(previous, next)` of `point`, if it is on the loop.
    #[must_use]
    pub fn loop_neighbours(&self, point: PointId) -> Option<(PointId, PointId)> {
        let n = self.points.len();
        let i = self.points.iter().position(|&p| p == point)?;
        Some((self.points[(i + n - 1) % n], self.points[(i + 1) % n]))
    }

    /// Returns `true` if `(a, b)` is a side of the loop, in either direction.
    #[must_use]
    pub fn has_side(&self, a: PointId, b: PointId) -> bool {
        self.loop_neighbours(a)
            .is_some_and(|(prev, next)| prev == b || next == b)
    }
}
