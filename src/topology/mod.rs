pub mod edge;
pub mod face;
pub mod part;
pub mod triangle;
pub mod vertex;

pub use edge::{EdgeData, EdgeId};
pub use face::{FaceData, FaceId};
pub use part::{PartData, PartId};
pub use triangle::{TriangleData, TriangleId};
pub use vertex::{VertexData, VertexId};

use std::collections::{HashMap, HashSet, VecDeque};

use slotmap::SlotMap;

use crate::error::{Result, TopologyError};
use crate::host::{HostMesh, PointId, PolygonId, PolygonInfo};

/// Central arena that owns every vertex, edge, triangle, face and part of one layer.
///
/// Entities reference each other through typed keys. Nothing is removed while a
/// reduction runs: collapsed and deleted entities keep their slot and are flagged,
/// so keys captured before a collapse stay valid after it.
#[derive(Debug, Default)]
pub struct TopologyGraph {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    triangles: SlotMap<TriangleId, TriangleData>,
    faces: SlotMap<FaceId, FaceData>,
    parts: SlotMap<PartId, PartData>,
    face_of_polygon: HashMap<PolygonId, FaceId>,
}

impl TopologyGraph {
    /// Creates a new, empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Vertex access ---

    /// Returns a reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the graph.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData> {
        self.vertices
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()).into())
    }

    /// Returns a mutable reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the graph.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut VertexData> {
        self.vertices
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()).into())
    }

    /// All vertices in creation order, collapsed ones included.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &VertexData)> {
        self.vertices.iter()
    }

    // --- Edge access ---

    /// Returns a reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the graph.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData> {
        self.edges
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()).into())
    }

    /// Returns a mutable reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the graph.
    pub fn edge_mut(&mut self, id: EdgeId) -> Result<&mut EdgeData> {
        self.edges
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()).into())
    }

    /// All edges in creation order, collapsed ones included.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &EdgeData)> {
        self.edges.iter()
    }

    /// Mutable iteration over all edges.
    pub fn edges_mut(&mut self) -> impl Iterator<Item = (EdgeId, &mut EdgeData)> {
        self.edges.iter_mut()
    }

    // --- Triangle access ---

    /// Returns a reference to the triangle data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the graph.
    pub fn triangle(&self, id: TriangleId) -> Result<&TriangleData> {
        self.triangles
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("triangle".into()).into())
    }

    /// Returns a mutable reference to the triangle data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the graph.
    pub fn triangle_mut(&mut self, id: TriangleId) -> Result<&mut TriangleData> {
        self.triangles
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("triangle".into()).into())
    }

    /// All triangles in creation order, deleted ones included.
    pub fn triangles(&self) -> impl Iterator<Item = (TriangleId, &TriangleData)> {
        self.triangles.iter()
    }

    // --- Face access ---

    /// Returns a reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the graph.
    pub fn face(&self, id: FaceId) -> Result<&FaceData> {
        self.faces
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()).into())
    }

    /// Returns a mutable reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the graph.
    pub fn face_mut(&mut self, id: FaceId) -> Result<&mut FaceData> {
        self.faces
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()).into())
    }

    /// All faces in ingest order.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &FaceData)> {
        self.faces.iter()
    }

    /// The face registered for a host polygon.
    #[must_use]
    pub fn face_for_polygon(&self, polygon: PolygonId) -> Option<FaceId> {
        self.face_of_polygon.get(&polygon).copied()
    }

    // --- Part access ---

    /// Inserts a part and returns its ID.
    pub fn add_part(&mut self, data: PartData) -> PartId {
        self.parts.insert(data)
    }

    /// Returns a reference to the part data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the graph.
    pub fn part(&self, id: PartId) -> Result<&PartData> {
        self.parts
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("part".into()).into())
    }

    /// All parts in discovery order.
    pub fn parts(&self) -> impl Iterator<Item = (PartId, &PartData)> {
        self.parts.iter()
    }

    /// Number of parts.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    // --- Ingest ---

    /// Registers an empty face for a host polygon.
    pub fn add_polygon(&mut self, polygon: PolygonId, info: &PolygonInfo) -> FaceId {
        let face = self
            .faces
            .insert(FaceData::new(polygon, info.points.clone(), info.material.clone()));
        self.face_of_polygon.insert(polygon, face);
        face
    }

    /// Adds a triangle to `face` over three host points and links its edges.
    ///
    /// Each point resolves to a vertex already used by a face reachable around the
    /// point's polygon fan, or to a new vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is unknown, the corners are not distinct, or a
    /// host query fails.
    pub fn add_triangle<H: HostMesh + ?Sized>(
        &mut self,
        host: &H,
        face: FaceId,
        points: [PointId; 3],
    ) -> Result<TriangleId> {
        let [p0, p1, p2] = points;
        if p0 == p1 || p1 == p2 || p0 == p2 {
            return Err(TopologyError::InvalidTopology("triangle corners must be distinct".into()).into());
        }
        let v0 = self.resolve_vertex(host, face, p0)?;
        let v1 = self.resolve_vertex(host, face, p1)?;
        let v2 = self.resolve_vertex(host, face, p2)?;

        let tri = self.triangles.insert(TriangleData::new([v0, v1, v2], face));
        self.face_mut(face)?.triangles.push(tri);
        for v in [v0, v1, v2] {
            self.vertex_mut(v)?.triangles.push(tri);
        }
        self.add_edge(v0, v1, tri)?;
        self.add_edge(v1, v2, tri)?;
        self.add_edge(v2, v0, tri)?;
        Ok(tri)
    }

    /// Records `tri` on the edge between `v0` and `v1`, creating the edge if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if either vertex is unknown.
    pub fn add_edge(&mut self, v0: VertexId, v1: VertexId, tri: TriangleId) -> Result<EdgeId> {
        if let Some(edge) = self.find_edge(v0, v1) {
            let data = self.edge_mut(edge)?;
            if !data.triangles.contains(&tri) {
                data.triangles.push(tri);
            }
            return Ok(edge);
        }
        self.vertex(v1)?;
        let mut data = EdgeData::new(v0, v1);
        data.triangles.push(tri);
        let edge = self.edges.insert(data);
        self.vertex_mut(v0)?.edges.push(edge);
        self.vertex_mut(v1)?.edges.push(edge);
        Ok(edge)
    }

    fn resolve_vertex<H: HostMesh + ?Sized>(
        &mut self,
        host: &H,
        face: FaceId,
        point: PointId,
    ) -> Result<VertexId> {
        if let Some(v) = self.find_fan_vertex(host, face, point)? {
            return Ok(v);
        }
        let position = host.point_position(point)?;
        Ok(self.vertices.insert(VertexData::new(position, point)))
    }

    /// Walks the faces around `point`, starting at `face` and crossing only sides that
    /// contain `point`, looking for a triangle that already resolved the point.
    fn find_fan_vertex<H: HostMesh + ?Sized>(
        &self,
        host: &H,
        face: FaceId,
        point: PointId,
    ) -> Result<Option<VertexId>> {
        let around: Vec<FaceId> = host
            .point_polygons(point)?
            .into_iter()
            .filter_map(|p| self.face_for_polygon(p))
            .collect();

        let mut visited = HashSet::from([face]);
        let mut queue = VecDeque::from([face]);
        while let Some(current) = queue.pop_front() {
            let data = self.face(current)?;
            for &tri in &data.triangles {
                for &corner in &self.triangle(tri)?.corners {
                    if self.vertex(corner)?.host_point == point {
                        return Ok(Some(corner));
                    }
                }
            }
            let Some((prev, next)) = data.loop_neighbours(point) else {
                continue;
            };
            for &other in &around {
                if visited.contains(&other) {
                    continue;
                }
                let od = self.face(other)?;
                if od.has_side(point, prev) || od.has_side(point, next) {
                    visited.insert(other);
                    queue.push_back(other);
                }
            }
        }
        Ok(None)
    }

    // --- Queries ---

    /// The live edge between `a` and `b`, if any.
    #[must_use]
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        let vertex = self.vertices.get(a)?;
        vertex.edges.iter().copied().find(|&e| {
            self.edges
                .get(e)
                .is_some_and(|data| !data.collapsed && data.connects(a, b))
        })
    }

    /// Number of vertices not merged away.
    #[must_use]
    pub fn live_vertex_count(&self) -> usize {
        self.vertices.values().filter(|v| !v.collapsed).count()
    }

    /// Number of edges not collapsed.
    #[must_use]
    pub fn live_edge_count(&self) -> usize {
        self.edges.values().filter(|e| !e.collapsed).count()
    }

    /// Number of triangles not deleted.
    #[must_use]
    pub fn live_triangle_count(&self) -> usize {
        self.triangles.values().filter(|t| !t.deleted).count()
    }

    /// Total number of vertices ever created.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Total number of triangles ever created.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Returns `true` if any triangle of the face was retargeted or deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its triangles is unknown.
    pub fn face_is_updated(&self, face: FaceId) -> Result<bool> {
        for &tri in &self.face(face)?.triangles {
            let data = self.triangle(tri)?;
            if data.updated || data.deleted {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Checks the structural invariants of the graph.
    ///
    /// Live triangles have three distinct live corners and are listed by the live edge
    /// on each side; live edges join two live vertices and no two share endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTopology`] describing the first violation.
    pub fn check_invariants(&self) -> Result<()> {
        for (_, tri) in self.triangles.iter().filter(|(_, t)| !t.deleted) {
            if tri.is_degenerate() {
                return Err(invalid("live triangle has repeated corners"));
            }
            for c in tri.corners {
                if self.vertex(c)?.collapsed {
                    return Err(invalid("live triangle references a collapsed vertex"));
                }
            }
        }
        for (tid, tri) in self.triangles.iter().filter(|(_, t)| !t.deleted) {
            for (a, b) in tri.sides() {
                let edge = self
                    .find_edge(a, b)
                    .ok_or_else(|| invalid("live triangle side has no edge"))?;
                if !self.edge(edge)?.triangles.contains(&tid) {
                    return Err(invalid("edge does not list its triangle"));
                }
            }
        }
        let mut seen = HashSet::new();
        for (_, edge) in self.edges.iter().filter(|(_, e)| !e.collapsed) {
            if self.vertex(edge.v0)?.collapsed || self.vertex(edge.v1)?.collapsed {
                return Err(invalid("live edge references a collapsed vertex"));
            }
            let key = if edge.v0 < edge.v1 {
                (edge.v0, edge.v1)
            } else {
                (edge.v1, edge.v0)
            };
            if !seen.insert(key) {
                return Err(invalid("parallel live edges"));
            }
            for &t in &edge.triangles {
                let tri = self.triangle(t)?;
                if !tri.deleted && !(tri.has_corner(edge.v0) && tri.has_corner(edge.v1)) {
                    return Err(invalid("edge lists a triangle that does not use it"));
                }
            }
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> crate::error::ReduceError {
    TopologyError::InvalidTopology(msg.into()).into()
}
