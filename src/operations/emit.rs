use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::host::{HostMesh, PointId};
use crate::topology::{FaceId, TopologyGraph, VertexId};

/// How surviving faces are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitMode {
    /// Every surviving triangle becomes its own polygon; the original polygons go away.
    Triangulated,
    /// Each face keeps its polygon; only faces touched by a collapse are rewritten.
    #[default]
    PreservePolygons,
}

/// Counts of host writes made by one emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Points whose position was written.
    pub points_moved: usize,
    /// Points deleted because every vertex on them collapsed.
    pub points_deleted: usize,
    /// Polygons whose loop was replaced.
    pub faces_rewritten: usize,
    /// Polygons deleted.
    pub faces_deleted: usize,
    /// Polygons created.
    pub faces_added: usize,
}

impl EmitReport {
    /// Returns `true` if the host was written at all.
    #[must_use]
    pub fn changed(&self) -> bool {
        *self != Self::default()
    }
}

/// Writes the reduced graph back into the host layer.
///
/// Point positions are written first, then polygons, and finally points that no
/// surviving vertex and no host polygon still uses are deleted.
pub struct EmitMesh {
    mode: EmitMode,
}

impl EmitMesh {
    /// Creates a new `EmitMesh` operation.
    #[must_use]
    pub fn new(mode: EmitMode) -> Self {
        Self { mode }
    }

    /// Executes the emission.
    ///
    /// # Errors
    ///
    /// Returns an error if a host write fails. Writes already made are not undone.
    pub fn execute<H: HostMesh + ?Sized>(&self, graph: &TopologyGraph, host: &mut H) -> Result<EmitReport> {
        let mut report = EmitReport::default();

        let mut alive_on_point: BTreeMap<PointId, bool> = BTreeMap::new();
        for (_, vertex) in graph.vertices() {
            *alive_on_point.entry(vertex.host_point).or_default() |= !vertex.collapsed;
            if vertex.collapsed {
                continue;
            }
            if host.point_position(vertex.host_point)? != vertex.point {
                host.set_point_position(vertex.host_point, vertex.point)?;
                report.points_moved += 1;
            }
        }

        let faces: Vec<FaceId> = graph.faces().map(|(id, _)| id).collect();
        for face in faces {
            match self.mode {
                EmitMode::Triangulated => emit_triangles(graph, host, face, &mut report)?,
                EmitMode::PreservePolygons => emit_polygon(graph, host, face, &mut report)?,
            }
        }

        for (point, alive) in alive_on_point {
            if !alive && host.point_polygons(point)?.is_empty() {
                host.delete_point(point)?;
                report.points_deleted += 1;
            }
        }

        debug!(
            points_moved = report.points_moved,
            points_deleted = report.points_deleted,
            faces_rewritten = report.faces_rewritten,
            faces_deleted = report.faces_deleted,
            faces_added = report.faces_added,
            "emitted reduced mesh"
        );
        Ok(report)
    }
}

/// The face's live triangles as host point triples.
fn live_triangles(graph: &TopologyGraph, face: FaceId) -> Result<Vec<[PointId; 3]>> {
    let host_point = |v: VertexId| graph.vertex(v).map(|data| data.host_point);
    let mut out = Vec::new();
    for &tri in &graph.face(face)?.triangles {
        let data = graph.triangle(tri)?;
        if data.deleted {
            continue;
        }
        let [a, b, c] = data.corners;
        out.push([host_point(a)?, host_point(b)?, host_point(c)?]);
    }
    Ok(out)
}

fn emit_triangles<H: HostMesh + ?Sized>(
    graph: &TopologyGraph,
    host: &mut H,
    face: FaceId,
    report: &mut EmitReport,
) -> Result<()> {
    let polygon = graph.face(face)?.polygon;
    for tri in live_triangles(graph, face)? {
        host.add_polygon(&tri, polygon)?;
        report.faces_added += 1;
    }
    host.delete_polygon(polygon)?;
    report.faces_deleted += 1;
    Ok(())
}

fn emit_polygon<H: HostMesh + ?Sized>(
    graph: &TopologyGraph,
    host: &mut H,
    face: FaceId,
    report: &mut EmitReport,
) -> Result<()> {
    if !graph.face_is_updated(face)? {
        return Ok(());
    }
    let polygon = graph.face(face)?.polygon;
    let triangles = live_triangles(graph, face)?;
    let (boundary, leftovers) = stitch_loop(triangles);

    if boundary.len() < 3 {
        host.delete_polygon(polygon)?;
        report.faces_deleted += 1;
        return Ok(());
    }
    host.set_polygon_points(polygon, &boundary)?;
    report.faces_rewritten += 1;

    for tri in leftovers {
        debug!(polygon = polygon.0, "face split by collapse, emitting extra triangle");
        host.add_polygon(&tri, polygon)?;
        report.faces_added += 1;
    }
    Ok(())
}

/// Grows a boundary loop from the first triangle by absorbing neighbours across
/// its sides. Triangles that cannot be attached without repeating a point are
/// returned separately.
fn stitch_loop(mut triangles: Vec<[PointId; 3]>) -> (Vec<PointId>, Vec<[PointId; 3]>) {
    if triangles.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let mut boundary = triangles.remove(0).to_vec();

    let mut progress = true;
    while progress && !triangles.is_empty() {
        progress = false;
        let mut i = 0;
        while i < triangles.len() {
            if let Some((at, apex)) = attach(&boundary, &triangles[i]) {
                boundary.insert(at, apex);
                triangles.remove(i);
                progress = true;
            } else {
                i += 1;
            }
        }
    }
    (boundary, triangles)
}

/// Where `tri` joins the loop: the insertion index and the point to insert.
fn attach(boundary: &[PointId], tri: &[PointId; 3]) -> Option<(usize, PointId)> {
    let n = boundary.len();
    for i in 0..n {
        let (p, q) = (boundary[i], boundary[(i + 1) % n]);
        for k in 0..3 {
            // Neighbours run the shared side the other way round.
            if tri[k] == q && tri[(k + 1) % 3] == p {
                let apex = tri[(k + 2) % 3];
                if !boundary.contains(&apex) {
                    return Some((i + 1, apex));
                }
            }
        }
    }
    None
}
