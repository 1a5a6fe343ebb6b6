use tracing::debug;

use crate::error::{Result, TopologyError};
use crate::host::{HostMesh, PointId, PolygonId};
use crate::topology::{EdgeId, FaceId, TopologyGraph};

/// Which policies protect edges from collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstraintPolicy {
    /// Protect edges with fewer than two incident polygons.
    pub preserve_boundary: bool,
    /// Protect edges between two polygons with different materials.
    pub preserve_material: bool,
}

/// Labels each live edge of the graph as protected or free.
///
/// An edge is protected when any of these holds:
/// - the host carries a lock mark on it;
/// - boundary preservation is on and it is a polygon side used by fewer than two
///   host polygons;
/// - material preservation is on, exactly two host polygons use it and their
///   materials differ;
/// - a host polygon that is not in the graph also uses it.
pub struct ClassifyConstraints {
    policy: ConstraintPolicy,
}

impl ClassifyConstraints {
    /// Creates a new `ClassifyConstraints` operation.
    #[must_use]
    pub fn new(policy: ConstraintPolicy) -> Self {
        Self { policy }
    }

    /// Executes the classification, returning the number of protected edges.
    ///
    /// # Errors
    ///
    /// Returns an error if a host query fails.
    pub fn execute<H: HostMesh + ?Sized>(&self, graph: &mut TopologyGraph, host: &H) -> Result<usize> {
        let live: Vec<EdgeId> = graph
            .edges()
            .filter(|(_, e)| !e.collapsed)
            .map(|(id, _)| id)
            .collect();

        let mut protected = 0;
        for edge in live {
            let (v0, v1) = {
                let data = graph.edge(edge)?;
                (data.v0, data.v1)
            };
            let a = graph.vertex(v0)?.host_point;
            let b = graph.vertex(v1)?.host_point;
            let is_protected = self.is_protected(graph, host, a, b)?;
            graph.edge_mut(edge)?.protected = is_protected;
            if is_protected {
                protected += 1;
            }
        }

        debug!(protected, "classified edge constraints");
        Ok(protected)
    }

    fn is_protected<H: HostMesh + ?Sized>(
        &self,
        graph: &TopologyGraph,
        host: &H,
        a: PointId,
        b: PointId,
    ) -> Result<bool> {
        if host.is_edge_locked(a, b)? {
            return Ok(true);
        }

        let polygons = host.edge_polygons(a, b)?;
        // Diagonals added by triangulation lie inside a single polygon.
        if polygons.is_empty() {
            return Ok(false);
        }
        if polygons.iter().any(|&p| graph.face_for_polygon(p).is_none()) {
            return Ok(true);
        }
        if self.policy.preserve_boundary && polygons.len() < 2 {
            return Ok(true);
        }
        if self.policy.preserve_material && polygons.len() == 2 {
            let m0 = &graph.face(face_of(graph, polygons[0])?)?.material;
            let m1 = &graph.face(face_of(graph, polygons[1])?)?.material;
            if m0 != m1 {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn face_of(graph: &TopologyGraph, polygon: PolygonId) -> Result<FaceId> {
    graph
        .face_for_polygon(polygon)
        .ok_or_else(|| TopologyError::EntityNotFound(format!("face for polygon {polygon:?}")).into())
}
