use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{ReduceError, Result, TessellationError};
use crate::host::{HostMesh, PolygonId, PolygonInfo};
use crate::math::polygon_3d::newell_normal;
use crate::math::{Point3, Vector3};
use crate::tessellation::{Triangulation, TriangulatePolygon};
use crate::topology::TopologyGraph;

/// A polygon left out of the graph because it could not be triangulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPolygon {
    /// Host polygon.
    pub polygon: PolygonId,
    /// Why it was skipped.
    pub reason: String,
}

/// Summary of one ingest pass.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Polygons that are not standard, visible, unlocked faces.
    pub ignored: usize,
    /// Participating polygons that failed to triangulate.
    pub skipped: Vec<SkippedPolygon>,
}

/// Builds the topology graph of one host layer.
///
/// Every visible, unlocked standard face is triangulated and registered as a
/// face; polygons that fail to triangulate are recorded and left alone.
#[derive(Debug, Default)]
pub struct BuildTopology;

impl BuildTopology {
    /// Creates a new `BuildTopology` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the ingest, returning the graph and a report.
    ///
    /// # Errors
    ///
    /// Returns an error if a host query fails.
    pub fn execute<H: HostMesh + ?Sized>(&self, host: &H) -> Result<(TopologyGraph, IngestReport)> {
        let mut graph = TopologyGraph::new();
        let mut report = IngestReport::default();

        // Every face is registered before any triangle so the fan walk that resolves
        // vertices can cross polygons later in host order.
        let mut pending = Vec::new();
        for polygon in host.polygons()? {
            let info = host.polygon(polygon)?;
            if !info.participates() {
                report.ignored += 1;
                continue;
            }

            let triangulation = match triangulate(host, &info) {
                Ok(t) => t,
                Err(ReduceError::Tessellation(err)) => {
                    warn!(polygon = polygon.0, error = %err, "skipping polygon");
                    report.skipped.push(SkippedPolygon {
                        polygon,
                        reason: err.to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };

            let face = graph.add_polygon(polygon, &info);
            pending.push((face, info.points, triangulation));
        }

        for (face, points, triangulation) in pending {
            for [a, b, c] in triangulation.triangles {
                graph.add_triangle(host, face, [points[a], points[b], points[c]])?;
            }
        }

        debug!(
            faces = graph.face_count(),
            triangles = graph.triangle_count(),
            vertices = graph.vertex_count(),
            edges = graph.live_edge_count(),
            skipped = report.skipped.len(),
            "built topology graph"
        );
        Ok((graph, report))
    }
}

fn triangulate<H: HostMesh + ?Sized>(host: &H, info: &PolygonInfo) -> Result<Triangulation> {
    let mut seen = HashSet::with_capacity(info.points.len());
    if let Some(dup) = info.points.iter().find(|p| !seen.insert(**p)) {
        return Err(TessellationError::InvalidLoop(format!("point {dup:?} repeats in the loop")).into());
    }
    let positions = info
        .points
        .iter()
        .map(|&p| host.point_position(p))
        .collect::<std::result::Result<Vec<Point3>, _>>()?;
    let normal = newell_normal(&positions).unwrap_or_else(Vector3::zeros);
    TriangulatePolygon::new(&positions, normal).execute()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::{MaterialTag, MemoryMesh, PointId, PolygonKind};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn grid_2x1() -> (MemoryMesh, [PolygonId; 2]) {
        let mut mesh = MemoryMesh::new();
        let pts: Vec<PointId> = [
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(2.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(2.0, 1.0, 0.0),
        ]
        .into_iter()
        .map(|q| mesh.add_point(q))
        .collect();
        let f0 = mesh.add_face(&[pts[0], pts[1], pts[4], pts[3]]);
        let f1 = mesh.add_face(&[pts[1], pts[2], pts[5], pts[4]]);
        (mesh, [f0, f1])
    }

    #[test]
    fn quads_share_vertices_along_common_side() {
        let (mesh, _) = grid_2x1();
        let (graph, report) = BuildTopology::new().execute(&mesh).unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(graph.face_count(), 2);
        assert_eq!(graph.triangle_count(), 4);
        assert_eq!(graph.vertex_count(), 6);
        // 7 grid sides + 2 diagonals
        assert_eq!(graph.live_edge_count(), 9);
        graph.check_invariants().unwrap();
    }

    #[test]
    fn polygon_order_does_not_split_vertices() {
        // 2x2 quads over a 3x3 point grid, given as bottom-left, top-right,
        // bottom-right, top-left. The centre point's fan only closes through the
        // last two quads.
        let mut mesh = MemoryMesh::new();
        let mut pts = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                pts.push(mesh.add_point(p(f64::from(x), f64::from(y), 0.0)));
            }
        }
        for i in [0, 4, 1, 3] {
            mesh.add_face(&[pts[i], pts[i + 1], pts[i + 4], pts[i + 3]]);
        }
        let (graph, _) = BuildTopology::new().execute(&mesh).unwrap();

        let centre = graph.vertices().filter(|(_, v)| v.host_point == pts[4]).count();
        assert_eq!(centre, 1);
        assert_eq!(graph.vertex_count(), 9);
        // 12 grid sides + 4 diagonals
        assert_eq!(graph.live_edge_count(), 16);
        graph.check_invariants().unwrap();
    }

    #[test]
    fn hidden_and_curve_polygons_are_ignored() {
        let (mut mesh, [f0, _]) = grid_2x1();
        mesh.set_hidden(f0, true).unwrap();
        let a = mesh.add_point(p(5.0, 5.0, 0.0));
        let b = mesh.add_point(p(6.0, 5.0, 0.0));
        mesh.add_polygon_info(PolygonInfo {
            points: vec![a, b],
            kind: PolygonKind::Curve,
            material: MaterialTag::default(),
            hidden: false,
            locked: false,
        });
        let (graph, report) = BuildTopology::new().execute(&mesh).unwrap();
        assert_eq!(report.ignored, 2);
        assert_eq!(graph.face_count(), 1);
        assert!(graph.face_for_polygon(f0).is_none());
    }

    #[test]
    fn broken_loop_is_skipped_not_fatal() {
        let (mut mesh, _) = grid_2x1();
        let a = mesh.add_point(p(5.0, 5.0, 0.0));
        let b = mesh.add_point(p(6.0, 5.0, 0.0));
        let bad = mesh.add_face(&[a, b, a, b]);
        let (graph, report) = BuildTopology::new().execute(&mesh).unwrap();
        assert_eq!(graph.face_count(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].polygon, bad);
    }

    #[test]
    fn missing_point_is_a_host_failure() {
        let (mut mesh, _) = grid_2x1();
        let a = mesh.add_point(p(5.0, 5.0, 0.0));
        let b = mesh.add_point(p(6.0, 5.0, 0.0));
        let c = mesh.add_point(p(6.0, 6.0, 0.0));
        mesh.add_face(&[a, b, c]);
        mesh.delete_point(c).unwrap();
        let err = BuildTopology::new().execute(&mesh).unwrap_err();
        assert!(matches!(err, ReduceError::Host(_)));
    }

    #[test]
    fn triangle_winding_follows_polygon_loop() {
        let (mesh, [f0, _]) = grid_2x1();
        let (graph, _) = BuildTopology::new().execute(&mesh).unwrap();
        let face = graph.face(graph.face_for_polygon(f0).unwrap()).unwrap();
        let first = graph.triangle(face.triangles[0]).unwrap();
        let hosts: Vec<PointId> = first
            .corners
            .iter()
            .map(|&v| graph.vertex(v).unwrap().host_point)
            .collect();
        assert_eq!(hosts, vec![face.points[0], face.points[1], face.points[2]]);
    }
}
