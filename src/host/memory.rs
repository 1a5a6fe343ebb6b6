use std::collections::HashSet;

use crate::error::HostError;
use crate::math::Point3;

use super::{HostMesh, MaterialTag, PointId, PolygonId, PolygonInfo, PolygonKind};

/// An in-memory mesh layer.
///
/// Points and polygons live in index-stable vectors; deletion leaves a tombstone so
/// identities are never reused.
#[derive(Debug, Clone, Default)]
pub struct MemoryMesh {
    points: Vec<Option<Point3>>,
    polygons: Vec<Option<PolygonInfo>>,
    locked_edges: HashSet<(PointId, PointId)>,
    geometry_changed: bool,
}

fn edge_key(a: PointId, b: PointId) -> (PointId, PointId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn next_id(len: usize) -> u32 {
    len as u32
}

impl MemoryMesh {
    /// Creates an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a point and returns its identity.
    pub fn add_point(&mut self, position: Point3) -> PointId {
        let id = PointId(next_id(self.points.len()));
        self.points.push(Some(position));
        id
    }

    /// Adds a standard surface face with an empty material tag.
    pub fn add_face(&mut self, points: &[PointId]) -> PolygonId {
        self.add_polygon_info(PolygonInfo {
            points: points.to_vec(),
            kind: PolygonKind::Face,
            material: MaterialTag::default(),
            hidden: false,
            locked: false,
        })
    }

    /// Adds a polygon from a full description.
    pub fn add_polygon_info(&mut self, info: PolygonInfo) -> PolygonId {
        let id = PolygonId(next_id(self.polygons.len()));
        self.polygons.push(Some(info));
        id
    }

    /// Places an explicit lock mark on edge `(a, b)`.
    pub fn lock_edge(&mut self, a: PointId, b: PointId) {
        self.locked_edges.insert(edge_key(a, b));
    }

    /// Sets a polygon's material tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the polygon does not exist.
    pub fn set_material(&mut self, id: PolygonId, material: impl Into<MaterialTag>) -> Result<(), HostError> {
        self.polygon_mut(id)?.material = material.into();
        Ok(())
    }

    /// Sets a polygon's hidden mark.
    ///
    /// # Errors
    ///
    /// Returns an error if the polygon does not exist.
    pub fn set_hidden(&mut self, id: PolygonId, hidden: bool) -> Result<(), HostError> {
        self.polygon_mut(id)?.hidden = hidden;
        Ok(())
    }

    /// Sets a polygon's lock mark.
    ///
    /// # Errors
    ///
    /// Returns an error if the polygon does not exist.
    pub fn set_locked(&mut self, id: PolygonId, locked: bool) -> Result<(), HostError> {
        self.polygon_mut(id)?.locked = locked;
        Ok(())
    }

    /// Live polygons with their descriptions, in host order.
    #[must_use]
    pub fn live_polygons(&self) -> Vec<(PolygonId, &PolygonInfo)> {
        self.polygons
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|info| (PolygonId(next_id(i)), info)))
            .collect()
    }

    /// Number of live points.
    #[must_use]
    pub fn live_point_count(&self) -> usize {
        self.points.iter().flatten().count()
    }

    /// Whether the geometry-changed flag was raised.
    #[must_use]
    pub fn geometry_changed(&self) -> bool {
        self.geometry_changed
    }

    fn polygon_ref(&self, id: PolygonId) -> Result<&PolygonInfo, HostError> {
        self.polygons
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(HostError::PolygonNotFound(id))
    }

    fn polygon_mut(&mut self, id: PolygonId) -> Result<&mut PolygonInfo, HostError> {
        self.polygons
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(HostError::PolygonNotFound(id))
    }

    fn check_points(&self, points: &[PointId]) -> Result<(), HostError> {
        for &p in points {
            if !matches!(self.points.get(p.0 as usize), Some(Some(_))) {
                return Err(HostError::PointNotFound(p));
            }
        }
        Ok(())
    }
}

impl HostMesh for MemoryMesh {
    fn points(&self) -> Result<Vec<PointId>, HostError> {
        Ok(self
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .map(|(i, _)| PointId(next_id(i)))
            .collect())
    }

    fn polygons(&self) -> Result<Vec<PolygonId>, HostError> {
        Ok(self.live_polygons().into_iter().map(|(id, _)| id).collect())
    }

    fn polygon(&self, id: PolygonId) -> Result<PolygonInfo, HostError> {
        self.polygon_ref(id).cloned()
    }

    fn point_position(&self, id: PointId) -> Result<Point3, HostError> {
        self.points
            .get(id.0 as usize)
            .copied()
            .flatten()
            .ok_or(HostError::PointNotFound(id))
    }

    fn point_polygons(&self, id: PointId) -> Result<Vec<PolygonId>, HostError> {
        self.point_position(id)?;
        Ok(self
            .live_polygons()
            .into_iter()
            .filter(|(_, info)| info.points.contains(&id))
            .map(|(pid, _)| pid)
            .collect())
    }

    fn edge_polygons(&self, a: PointId, b: PointId) -> Result<Vec<PolygonId>, HostError> {
        Ok(self
            .live_polygons()
            .into_iter()
            .filter(|(_, info)| info.has_side(a, b))
            .map(|(pid, _)| pid)
            .collect())
    }

    fn is_edge_locked(&self, a: PointId, b: PointId) -> Result<bool, HostError> {
        Ok(self.locked_edges.contains(&edge_key(a, b)))
    }

    fn set_point_position(&mut self, id: PointId, position: Point3) -> Result<(), HostError> {
        match self.points.get_mut(id.0 as usize) {
            Some(Some(p)) => {
                *p = position;
                Ok(())
            }
            _ => Err(HostError::PointNotFound(id)),
        }
    }

    fn delete_point(&mut self, id: PointId) -> Result<(), HostError> {
        match self.points.get_mut(id.0 as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(HostError::PointNotFound(id)),
        }
    }

    fn add_polygon(&mut self, points: &[PointId], template: PolygonId) -> Result<PolygonId, HostError> {
        self.check_points(points)?;
        let template = self.polygon_ref(template)?;
        let info = PolygonInfo {
            points: points.to_vec(),
            kind: template.kind,
            material: template.material.clone(),
            hidden: false,
            locked: false,
        };
        Ok(self.add_polygon_info(info))
    }

    fn set_polygon_points(&mut self, id: PolygonId, points: &[PointId]) -> Result<(), HostError> {
        self.check_points(points)?;
        self.polygon_mut(id)?.points = points.to_vec();
        Ok(())
    }

    fn delete_polygon(&mut self, id: PolygonId) -> Result<(), HostError> {
        match self.polygons.get_mut(id.0 as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(HostError::PolygonNotFound(id)),
        }
    }

    fn mark_geometry_changed(&mut self) {
        self.geometry_changed = true;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square() -> (MemoryMesh, [PointId; 4], PolygonId) {
        let mut mesh = MemoryMesh::new();
        let a = mesh.add_point(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_point(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_point(Point3::new(1.0, 1.0, 0.0));
        let d = mesh.add_point(Point3::new(0.0, 1.0, 0.0));
        let f = mesh.add_face(&[a, b, c, d]);
        (mesh, [a, b, c, d], f)
    }

    #[test]
    fn edge_queries_are_undirected() {
        let (mut mesh, [a, b, c, _], f) = square();
        assert_eq!(mesh.edge_polygons(b, a).unwrap(), vec![f]);
        assert!(mesh.edge_polygons(a, c).unwrap().is_empty());
        mesh.lock_edge(b, a);
        assert!(mesh.is_edge_locked(a, b).unwrap());
        assert!(!mesh.is_edge_locked(b, c).unwrap());
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let (mut mesh, [a, ..], f) = square();
        mesh.delete_point(a).unwrap();
        let e = mesh.add_point(Point3::new(2.0, 2.0, 2.0));
        assert_ne!(a, e);
        assert!(matches!(mesh.point_position(a), Err(HostError::PointNotFound(_))));

        mesh.delete_polygon(f).unwrap();
        assert!(mesh.polygon(f).is_err());
        assert!(mesh.delete_polygon(f).is_err());
    }

    #[test]
    fn added_polygon_copies_template_material() {
        let (mut mesh, [a, b, c, _], f) = square();
        mesh.set_material(f, "steel").unwrap();
        let g = mesh.add_polygon(&[a, b, c], f).unwrap();
        assert_eq!(mesh.polygon(g).unwrap().material, MaterialTag::from("steel"));
    }

    #[test]
    fn add_polygon_rejects_dead_points() {
        let (mut mesh, [a, b, c, d], f) = square();
        mesh.delete_point(d).unwrap();
        assert!(mesh.add_polygon(&[a, b, d], f).is_err());
        assert!(mesh.set_polygon_points(f, &[a, b, c]).is_ok());
    }

    #[test]
    fn hidden_polygon_does_not_participate() {
        let (mut mesh, _, f) = square();
        assert!(mesh.polygon(f).unwrap().participates());
        mesh.set_hidden(f, true).unwrap();
        assert!(!mesh.polygon(f).unwrap().participates());
    }
}
