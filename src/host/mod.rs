//! Interface to the host application's polygon mesh.
//!
//! One [`HostMesh`] value stands for a single mesh layer. The reduction pipeline reads
//! the layer once to build its topology graph and writes the result back through the
//! same trait.

mod memory;

pub use memory::MemoryMesh;

use crate::error::HostError;
use crate::math::Point3;

/// Host-side identity of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub u32);

/// Host-side identity of a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolygonId(pub u32);

/// Opaque material tag carried by a polygon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MaterialTag(pub String);

impl From<&str> for MaterialTag {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

/// Primitive type of a host polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonKind {
    /// A standard surface face. Only these take part in reduction.
    #[default]
    Face,
    /// A curve or line primitive.
    Curve,
    /// Any other primitive (subdivision cage, text, ...).
    Other,
}

/// Snapshot of one host polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonInfo {
    /// Ordered boundary loop.
    pub points: Vec<PointId>,
    /// Primitive type.
    pub kind: PolygonKind,
    /// Material tag.
    pub material: MaterialTag,
    /// Hidden in the host.
    pub hidden: bool,
    /// Locked in the host.
    pub locked: bool,
}

impl PolygonInfo {
    /// Returns `true` if the polygon takes part in reduction.
    #[must_use]
    pub fn participates(&self) -> bool {
        self.kind == PolygonKind::Face && !self.hidden && !self.locked
    }

    /// Returns `true` if `(a, b)` is a side of the boundary loop, in either direction.
    #[must_use]
    pub fn has_side(&self, a: PointId, b: PointId) -> bool {
        let n = self.points.len();
        (0..n).any(|i| {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            (p == a && q == b) || (p == b && q == a)
        })
    }
}

/// Read/write access to one mesh layer of the host.
///
/// # Errors
///
/// Every method may fail with a [`HostError`]; the pipeline propagates it unchanged.
pub trait HostMesh {
    /// All live points of the layer, in host order.
    fn points(&self) -> Result<Vec<PointId>, HostError>;

    /// All live polygons of the layer, in host order.
    fn polygons(&self) -> Result<Vec<PolygonId>, HostError>;

    /// Reads one polygon.
    fn polygon(&self, id: PolygonId) -> Result<PolygonInfo, HostError>;

    /// Reads one point position.
    fn point_position(&self, id: PointId) -> Result<Point3, HostError>;

    /// Polygons whose loop contains the point.
    fn point_polygons(&self, id: PointId) -> Result<Vec<PolygonId>, HostError>;

    /// Polygons that have `(a, b)` as a side, whatever their kind or marks.
    fn edge_polygons(&self, a: PointId, b: PointId) -> Result<Vec<PolygonId>, HostError>;

    /// Returns `true` if the host carries an explicit lock mark on edge `(a, b)`.
    fn is_edge_locked(&self, a: PointId, b: PointId) -> Result<bool, HostError>;

    /// Moves a point.
    fn set_point_position(&mut self, id: PointId, position: Point3) -> Result<(), HostError>;

    /// Deletes a point.
    fn delete_point(&mut self, id: PointId) -> Result<(), HostError>;

    /// Creates a polygon that inherits kind and material from `template`.
    fn add_polygon(&mut self, points: &[PointId], template: PolygonId)
        -> Result<PolygonId, HostError>;

    /// Replaces a polygon's boundary loop.
    fn set_polygon_points(&mut self, id: PolygonId, points: &[PointId]) -> Result<(), HostError>;

    /// Deletes a polygon.
    fn delete_polygon(&mut self, id: PolygonId) -> Result<(), HostError>;

    /// Raises the layer's geometry-changed flag.
    fn mark_geometry_changed(&mut self);
}
